//! Message framing utilities.
//!
//! The flight computer interleaves two kinds of ASCII frames on one stream:
//! telemetry (`TSP<fields>TEP`) and free-form messages (`MSP<text>MEP`).
//! There are no length prefixes or checksums; frames are found purely by
//! searching for their markers.

/// A start/end marker pair delimiting one kind of frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Markers {
    pub start: &'static str,
    pub end: &'static str,
}

/// Markers around a comma-separated telemetry record.
pub const TELEMETRY_MARKERS: Markers = Markers { start: "TSP", end: "TEP" };
/// Markers around a text message.
pub const MESSAGE_MARKERS: Markers = Markers { start: "MSP", end: "MEP" };

/// A frame found in the stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FrameEvent {
    /// Raw telemetry fields, split on `,` but not yet converted.
    Telemetry(Vec<String>),
    /// Message text between the markers. Never empty.
    Message(String),
}

/// Accumulates stream text and pulls complete frames out of it.
///
/// Marker search is first-occurrence for start and end independently, so a
/// stray end marker ahead of its start yields an empty or wrong payload
/// instead of an error. Transmitters in the field depend on this behaviour.
#[derive(Debug, Default)]
pub struct FrameExtractor {
    buffer: String,
}

impl FrameExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `chunk` and extract at most one frame of each kind.
    ///
    /// Invalid UTF-8 is replaced with U+FFFD. A second complete frame of the
    /// same kind stays buffered until the next call; calling with an empty
    /// chunk is enough to flush it.
    pub fn ingest(&mut self, chunk: &[u8]) -> Vec<FrameEvent> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));

        let mut events = Vec::new();
        if let Some(payload) = self.take_frame(TELEMETRY_MARKERS) {
            let fields = payload.split(',').map(str::to_string).collect();
            events.push(FrameEvent::Telemetry(fields));
        }
        if let Some(text) = self.take_frame(MESSAGE_MARKERS) {
            if !text.is_empty() {
                events.push(FrameEvent::Message(text));
            }
        }
        events
    }

    /// Text received but not yet consumed by an extraction.
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    fn take_frame(&mut self, markers: Markers) -> Option<String> {
        let start = self.buffer.find(markers.start)?;
        let end = self.buffer.find(markers.end)?;

        let payload_start = start + markers.start.len();
        let payload = if payload_start <= end {
            self.buffer[payload_start..end].to_string()
        } else {
            String::new()
        };
        self.buffer.drain(..end + markers.end.len());
        Some(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(list: &[&str]) -> FrameEvent {
        FrameEvent::Telemetry(list.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_single_telemetry_frame() {
        let mut ex = FrameExtractor::new();
        let events = ex.ingest(b"TSPx,100.5,25.0TEP");
        assert_eq!(events, vec![fields(&["x", "100.5", "25.0"])]);
        assert_eq!(ex.pending(), "");
    }

    #[test]
    fn test_frame_split_across_chunks() {
        let mut ex = FrameExtractor::new();
        assert!(ex.ingest(b"noiseTSP1,2").is_empty());
        assert!(ex.ingest(b",3T").is_empty());
        let events = ex.ingest(b"EPtail");
        assert_eq!(events, vec![fields(&["1", "2", "3"])]);
        assert_eq!(ex.pending(), "tail");
    }

    #[test]
    fn test_message_frame() {
        let mut ex = FrameExtractor::new();
        let events = ex.ingest(b"MSP hello MEP");
        assert_eq!(events, vec![FrameEvent::Message(" hello ".to_string())]);
    }

    #[test]
    fn test_empty_message_is_consumed_without_event() {
        let mut ex = FrameExtractor::new();
        assert!(ex.ingest(b"MSPMEPrest").is_empty());
        assert_eq!(ex.pending(), "rest");
    }

    #[test]
    fn test_one_frame_per_kind_per_call() {
        let mut ex = FrameExtractor::new();
        let events = ex.ingest(b"TSPa,1TEPTSPb,2TEP");
        assert_eq!(events, vec![fields(&["a", "1"])]);
        assert_eq!(ex.pending(), "TSPb,2TEP");

        let events = ex.ingest(b"");
        assert_eq!(events, vec![fields(&["b", "2"])]);
        assert!(ex.ingest(b"").is_empty());
    }

    #[test]
    fn test_both_kinds_in_one_chunk() {
        let mut ex = FrameExtractor::new();
        let events = ex.ingest(b"TSP0,1TEPMSParmedMEP");
        assert_eq!(
            events,
            vec![fields(&["0", "1"]), FrameEvent::Message("armed".to_string())]
        );
    }

    #[test]
    fn test_telemetry_extraction_discards_earlier_message_bytes() {
        // Truncating through TEP also drops a message frame that sat before it.
        let mut ex = FrameExtractor::new();
        let events = ex.ingest(b"MSPhiMEPTSP1TEP");
        assert_eq!(events, vec![fields(&["1"])]);
        assert_eq!(ex.pending(), "");
    }

    #[test]
    fn test_stray_end_marker_before_start() {
        let mut ex = FrameExtractor::new();
        let events = ex.ingest(b"9TEPTSP1,2TEP");
        assert_eq!(events, vec![fields(&[""])]);
        assert_eq!(ex.pending(), "TSP1,2TEP");

        let events = ex.ingest(b"");
        assert_eq!(events, vec![fields(&["1", "2"])]);
    }

    #[test]
    fn test_interleaved_marker_inside_payload() {
        let mut ex = FrameExtractor::new();
        let events = ex.ingest(b"TSPaMEPbTEP");
        assert_eq!(events, vec![fields(&["aMEPb"])]);
        assert_eq!(ex.pending(), "");
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut ex = FrameExtractor::new();
        let events = ex.ingest(b"MSPa\xffbMEP");
        assert_eq!(events, vec![FrameEvent::Message("a\u{fffd}b".to_string())]);
    }

    #[test]
    fn test_buffer_grows_without_markers() {
        let mut ex = FrameExtractor::new();
        for _ in 0..100 {
            assert!(ex.ingest(b"TSP0,0,0").is_empty());
        }
        assert_eq!(ex.pending().len(), 800);
    }
}
