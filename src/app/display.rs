//! Routing of extracted frames to logs and plots.
use super::framing::FrameEvent;
use super::telemetry::{ParseError, TelemetryRecord};

/// Which text log a line belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LogView {
    /// Formatted telemetry records.
    Telemetry,
    /// Free-form text from message frames.
    Messages,
}

/// Where decoded frames end up. Write-only from the dispatcher's side.
pub trait DisplaySink {
    fn append_log(&mut self, view: LogView, text: &str);
    fn plot_sample(&mut self, channel: &'static str, value: f64, index: u64);
}

/// Turns frame events into sink calls and owns the shared sample index.
#[derive(Debug, Default)]
pub struct Dispatcher {
    sample_index: u64,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the most recent plotted sample; 0 before the first one.
    pub fn sample_index(&self) -> u64 {
        self.sample_index
    }

    /// Apply one event. A telemetry frame that fails to parse touches
    /// nothing and leaves the index unchanged.
    pub fn handle<S: DisplaySink + ?Sized>(
        &mut self,
        event: &FrameEvent,
        sink: &mut S,
    ) -> Result<(), ParseError> {
        match event {
            FrameEvent::Telemetry(fields) => {
                let record = TelemetryRecord::parse(fields.as_slice())?;
                self.sample_index += 1;
                sink.append_log(LogView::Telemetry, &record.to_string());
                for (channel, value) in record.channels() {
                    sink.plot_sample(channel, value, self.sample_index);
                }
            }
            FrameEvent::Message(text) => {
                sink.append_log(LogView::Messages, &format!("{}\n", text));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::framing::FrameExtractor;

    #[derive(Default)]
    struct RecordingSink {
        logs: Vec<(LogView, String)>,
        samples: Vec<(&'static str, f64, u64)>,
    }

    impl DisplaySink for RecordingSink {
        fn append_log(&mut self, view: LogView, text: &str) {
            self.logs.push((view, text.to_string()));
        }

        fn plot_sample(&mut self, channel: &'static str, value: f64, index: u64) {
            self.samples.push((channel, value, index));
        }
    }

    fn feed(bytes: &[u8], ex: &mut FrameExtractor, d: &mut Dispatcher, sink: &mut RecordingSink) -> usize {
        let mut failures = 0;
        for event in ex.ingest(bytes) {
            if d.handle(&event, sink).is_err() {
                failures += 1;
            }
        }
        failures
    }

    #[test]
    fn test_telemetry_plots_every_channel_at_one_index() {
        let mut ex = FrameExtractor::new();
        let mut d = Dispatcher::new();
        let mut sink = RecordingSink::default();

        assert_eq!(feed(b"TSP0,10,20,1,2,3,4,5,6TEP", &mut ex, &mut d, &mut sink), 0);
        assert_eq!(d.sample_index(), 1);
        assert_eq!(sink.samples.len(), 8);
        assert!(sink.samples.iter().all(|&(_, _, idx)| idx == 1));
        assert_eq!(sink.samples[0], ("altitude", 10.0, 1));
        assert_eq!(sink.logs.len(), 1);
        assert_eq!(sink.logs[0].0, LogView::Telemetry);
        assert!(sink.logs[0].1.starts_with("Altitude: 10\n"));
    }

    #[test]
    fn test_bad_frame_does_not_advance_index() {
        let mut ex = FrameExtractor::new();
        let mut d = Dispatcher::new();
        let mut sink = RecordingSink::default();

        assert_eq!(feed(b"TSPx,abc,1,1,1,1,1,1,1TEP", &mut ex, &mut d, &mut sink), 1);
        assert_eq!(d.sample_index(), 0);
        assert!(sink.samples.is_empty());
        assert!(sink.logs.is_empty());

        assert_eq!(feed(b"TSPx,5,1,1,1,1,1,1,1TEP", &mut ex, &mut d, &mut sink), 0);
        assert_eq!(d.sample_index(), 1);
        assert_eq!(sink.samples[0], ("altitude", 5.0, 1));
    }

    #[test]
    fn test_message_goes_to_message_log() {
        let mut ex = FrameExtractor::new();
        let mut d = Dispatcher::new();
        let mut sink = RecordingSink::default();

        feed(b"MSPapogee reachedMEP", &mut ex, &mut d, &mut sink);
        assert_eq!(sink.logs, vec![(LogView::Messages, "apogee reached\n".to_string())]);
        assert_eq!(d.sample_index(), 0);
    }
}
