//! Telemetry record parsing.
use std::fmt;
use std::num::ParseFloatError;

use thiserror::Error;

/// Plot channel names, in field order after the reserved leading field.
pub const CHANNELS: [&str; 8] = [
    "altitude",
    "temperature",
    "accel_x",
    "accel_y",
    "accel_z",
    "gyro_x",
    "gyro_y",
    "gyro_z",
];

/// Fields in a telemetry frame: one reserved slot plus one per channel.
pub const FIELD_COUNT: usize = CHANNELS.len() + 1;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("telemetry frame has {found} fields, expected {expected}")]
    FieldCount { expected: usize, found: usize },

    #[error("field {index} ({channel}) is not numeric: {value:?}")]
    NotNumeric {
        index: usize,
        channel: &'static str,
        value: String,
        #[source]
        source: ParseFloatError,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// One decoded sample from the flight computer.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TelemetryRecord {
    pub altitude: f64,
    pub temperature: f64,
    pub accel: Vec3,
    pub gyro: Vec3,
}

impl TelemetryRecord {
    /// Parse raw frame fields. Field 0 is ignored, as is anything past the gyro.
    pub fn parse<S: AsRef<str>>(fields: &[S]) -> Result<Self, ParseError> {
        if fields.len() < FIELD_COUNT {
            return Err(ParseError::FieldCount {
                expected: FIELD_COUNT,
                found: fields.len(),
            });
        }

        let mut values = [0.0f64; CHANNELS.len()];
        for (i, (slot, channel)) in values.iter_mut().zip(CHANNELS).enumerate() {
            let index = i + 1;
            let raw = fields[index].as_ref();
            *slot = raw.trim().parse().map_err(|source| ParseError::NotNumeric {
                index,
                channel,
                value: raw.to_string(),
                source,
            })?;
        }

        let [altitude, temperature, ax, ay, az, gx, gy, gz] = values;
        Ok(Self {
            altitude,
            temperature,
            accel: Vec3 { x: ax, y: ay, z: az },
            gyro: Vec3 { x: gx, y: gy, z: gz },
        })
    }

    /// `(channel, value)` pairs in `CHANNELS` order.
    pub fn channels(&self) -> [(&'static str, f64); 8] {
        let values = [
            self.altitude,
            self.temperature,
            self.accel.x,
            self.accel.y,
            self.accel.z,
            self.gyro.x,
            self.gyro.y,
            self.gyro.z,
        ];
        let mut out = [("", 0.0); 8];
        for (slot, (name, value)) in out.iter_mut().zip(CHANNELS.into_iter().zip(values)) {
            *slot = (name, value);
        }
        out
    }
}

impl fmt::Display for TelemetryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Altitude: {}", self.altitude)?;
        writeln!(f, "Temperature: {}", self.temperature)?;
        writeln!(f, "Accel X: {}", self.accel.x)?;
        writeln!(f, "Accel Y: {}", self.accel.y)?;
        writeln!(f, "Accel Z: {}", self.accel.z)?;
        writeln!(f, "Gyro X: {}", self.gyro.x)?;
        writeln!(f, "Gyro Y: {}", self.gyro.y)?;
        writeln!(f, "Gyro Z: {}", self.gyro.z)?;
        writeln!(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::framing::{FrameEvent, FrameExtractor};

    #[test]
    fn test_parse_extracted_frame() {
        let mut ex = FrameExtractor::new();
        let events = ex.ingest(b"TSPx,100.5,25.0,1.0,2.0,3.0,0.1,0.2,0.3TEP");
        let fields = match &events[..] {
            [FrameEvent::Telemetry(fields)] => fields,
            other => panic!("unexpected events: {:?}", other),
        };

        let rec = TelemetryRecord::parse(fields.as_slice()).unwrap();
        assert_eq!(rec.altitude, 100.5);
        assert_eq!(rec.temperature, 25.0);
        assert_eq!(rec.accel, Vec3 { x: 1.0, y: 2.0, z: 3.0 });
        assert_eq!(rec.gyro, Vec3 { x: 0.1, y: 0.2, z: 0.3 });
    }

    #[test]
    fn test_too_few_fields() {
        let err = TelemetryRecord::parse(&["x", "1", "2"]).unwrap_err();
        assert!(matches!(err, ParseError::FieldCount { expected: 9, found: 3 }));
    }

    #[test]
    fn test_non_numeric_field() {
        let fields = ["x", "abc", "25", "1", "2", "3", "4", "5", "6"];
        match TelemetryRecord::parse(&fields).unwrap_err() {
            ParseError::NotNumeric { index, channel, value, .. } => {
                assert_eq!(index, 1);
                assert_eq!(channel, "altitude");
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_whitespace_and_extra_fields() {
        let fields = ["", " -3.5", "20\r\n", "0", "0", "9.81", "0", "0", "0", "extra"];
        let rec = TelemetryRecord::parse(&fields).unwrap();
        assert_eq!(rec.altitude, -3.5);
        assert_eq!(rec.temperature, 20.0);
        assert_eq!(rec.accel.z, 9.81);
    }

    #[test]
    fn test_channels_follow_field_order() {
        let fields = ["_", "1", "2", "3", "4", "5", "6", "7", "8"];
        let rec = TelemetryRecord::parse(&fields).unwrap();
        let channels = rec.channels();
        assert_eq!(channels[0], ("altitude", 1.0));
        assert_eq!(channels[4], ("accel_z", 5.0));
        assert_eq!(channels[7], ("gyro_z", 8.0));
    }

    #[test]
    fn test_display_block() {
        let fields = ["_", "1", "2", "3", "4", "5", "6", "7", "8"];
        let text = TelemetryRecord::parse(&fields).unwrap().to_string();
        assert!(text.starts_with("Altitude: 1\nTemperature: 2\nAccel X: 3\n"));
        assert!(text.ends_with("Gyro Z: 8\n\n"));
    }
}
