use super::{MctpHeader, Version};

/// Errors raised when failing to decode an [`MctpPacket`][super::MctpPacket] or its header.
///
/// Neither error is fatal: the offending frame is reported and skipped.
#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone, Copy)]
pub enum DecodeError {
    /// The frame cannot hold the header and the message-type byte.
    #[error("bogus length {0}, minimum {}", MctpHeader::MIN_FRAME_LENGTH)]
    TooShort(usize),
    /// The header version nibble is not a version this library can decode.
    #[error("cannot decode packet with unsupported header version {0}")]
    UnsupportedVersion(Version),
}

/// Raised if the buffer does not have sufficient capacity for encoding an MCTP header.
#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone, Copy, Default)]
#[error("the provided buffer did not have sufficient size")]
pub struct InadequateBufferSize;
