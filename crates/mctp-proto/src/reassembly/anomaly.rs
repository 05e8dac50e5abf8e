/// Irregularities in a fragment sequence detected while reassembling a message.
///
/// Anomalies are advisory. They are reported alongside the outcome of the fragment that
/// triggered them and never stop reassembly of the flow or affect any other flow.
#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone, Copy)]
pub enum Anomaly {
    /// The fragment opened reassembly state without a start-of-message packet.
    #[error("fragment received without a preceding start of message")]
    OrphanFragment,
    /// The fragment repeats an already buffered fragment with identical content.
    #[error("message fragment overlap")]
    Overlap,
    /// The fragment repeats the position of an already buffered fragment with different
    /// content. The first fragment received for the position is kept.
    #[error("message fragment overlapping with conflicting data")]
    OverlapConflict,
    /// An end-of-message fragment was received for a message that already had one. The most
    /// recent one ends the message.
    #[error("message has multiple tail fragments")]
    MultipleTails,
    /// The fragment is positioned after the end of the message and is not part of it.
    #[error("message fragment too long")]
    TooLongFragment,
    /// The end of the message was received but the message cannot be assembled.
    ///
    /// `missing` counts the fragments missing between the start and the end of the message,
    /// and is `None` if the start of the message was never received.
    #[error("message defragmentation error{}", DesegmentationDetail(.missing))]
    DesegmentationError {
        /// The number of missing fragments, if the start of the message is known.
        missing: Option<usize>,
    },
}

struct DesegmentationDetail<'a>(&'a Option<usize>);

impl std::fmt::Display for DesegmentationDetail<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self.0 {
            Some(missing) => write!(f, ": {missing} fragment(s) missing"),
            None => write!(f, ": start of message not seen"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn desegmentation_display() {
        assert_eq!(
            Anomaly::DesegmentationError { missing: Some(2) }.to_string(),
            "message defragmentation error: 2 fragment(s) missing"
        );
        assert_eq!(
            Anomaly::DesegmentationError { missing: None }.to_string(),
            "message defragmentation error: start of message not seen"
        );
    }
}
