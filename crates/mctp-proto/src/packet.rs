//! Representation of MCTP packets and their constituent types.
//!
//! This module contains the MCTP transport header, its wire format, the flow identity used to
//! reassemble fragmented messages, and errors encountered while decoding packets.

use bytes::{Buf, BufMut, Bytes};

use crate::wire_encoding::{WireDecode, WireEncode};

mod header;
pub use header::{EndpointId, FragmentPosition, MctpHeader, Sequence, Tag, TagValue, Version};

mod error;
pub use error::{DecodeError, InadequateBufferSize};

mod flow;
pub use flow::FlowKey;

/// Instances of an object associated with both a source and destination endpoint.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct ByEndpoint<T> {
    /// The value for the destination endpoint.
    pub destination: T,
    /// The value for the source endpoint.
    pub source: T,
}

impl<T: Clone> ByEndpoint<T> {
    /// Create a new instance where both the source and destination have the same value.
    pub fn with_cloned(source_and_destination: T) -> Self {
        Self {
            destination: source_and_destination.clone(),
            source: source_and_destination,
        }
    }
}

impl<T> ByEndpoint<T> {
    /// Returns the values as seen from the other endpoint.
    pub fn swapped(self) -> Self {
        Self {
            destination: self.source,
            source: self.destination,
        }
    }
}

/// Decodes the header at the start of a raw frame.
///
/// Returns the header and the offset at which the message payload begins.
pub fn decode_header(frame: &[u8]) -> Result<(MctpHeader, usize), DecodeError> {
    let header = MctpHeader::decode(&mut &frame[..])?;
    Ok((header, MctpHeader::LENGTH))
}

/// An MCTP packet: the transport header and the packet payload.
///
/// The payload is a fragment of an MCTP message; for the first packet of a message, it starts
/// with the message-type byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MctpPacket {
    /// The transport header.
    pub header: MctpHeader,
    /// The packet payload.
    pub payload: Bytes,
}

impl MctpPacket {
    /// The reassembly identity of the message to which this packet belongs.
    pub fn flow_key(&self) -> FlowKey {
        FlowKey::from_header(&self.header)
    }

    /// The first payload byte, which holds the message type for start-of-message packets.
    pub fn type_byte(&self) -> Option<u8> {
        self.payload.first().copied()
    }
}

impl<T: Buf> WireDecode<T> for MctpPacket {
    type Error = DecodeError;

    /// Decodes the header and takes all remaining data as the payload.
    fn decode(data: &mut T) -> Result<Self, Self::Error> {
        let header = MctpHeader::decode(data)?;
        let payload = data.copy_to_bytes(data.remaining());

        Ok(Self { header, payload })
    }
}

impl WireEncode for MctpPacket {
    type Error = InadequateBufferSize;

    fn encoded_length(&self) -> usize {
        MctpHeader::LENGTH + self.payload.len()
    }

    fn encode_to<T: BufMut>(&self, buffer: &mut T) -> Result<(), Self::Error> {
        if buffer.remaining_mut() < self.encoded_length() {
            return Err(InadequateBufferSize);
        }
        self.header.encode_to(buffer)?;
        buffer.put_slice(&self.payload);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use test_utils::{frame, Flags};

    use super::*;

    #[test]
    fn decode_header_returns_payload_offset() -> test_utils::Result {
        let data = [0x01, 0x08, 0x10, 0xc8, 0x01];

        let (header, offset) = decode_header(&data)?;

        assert_eq!(offset, 4);
        assert_eq!(header.endpoints.destination, EndpointId(8));
        assert_eq!(header.endpoints.source, EndpointId(16));
        assert_eq!(header.position(), FragmentPosition::Single);
        assert_eq!(&data[offset..], [0x01]);

        Ok(())
    }

    #[test]
    fn decode_header_rejects_header_only() {
        assert_eq!(
            decode_header(&[0x01, 0x08, 0x10, 0xc8]),
            Err(DecodeError::TooShort(4))
        );
    }

    #[test]
    fn decode_packet() -> test_utils::Result {
        let data = frame(9, 20, Flags::first(0, 3), &[0x05, 0xaa, 0xbb]);

        let packet = MctpPacket::decode(&mut Bytes::from(data.clone()))?;

        assert_eq!(packet.header.position(), FragmentPosition::First);
        assert_eq!(packet.payload.as_ref(), [0x05, 0xaa, 0xbb]);
        assert_eq!(packet.type_byte(), Some(0x05));
        assert_eq!(packet.encode_to_bytes().as_ref(), data.as_slice());

        Ok(())
    }

    #[test]
    fn encode_packet_inadequate_buffer() -> test_utils::Result {
        let packet = MctpPacket::decode(&mut frame(9, 20, Flags::single(0), &[1, 2]).as_slice())?;

        let mut buffer = [0u8; 5];
        assert_eq!(
            packet.encode_to(&mut buffer.as_mut()),
            Err(InadequateBufferSize)
        );

        Ok(())
    }

    #[test]
    fn swapped_endpoints() {
        let endpoints = ByEndpoint {
            destination: EndpointId(1),
            source: EndpointId(2),
        };

        assert_eq!(
            endpoints.swapped(),
            ByEndpoint {
                destination: EndpointId(2),
                source: EndpointId(1),
            }
        );
    }
}
