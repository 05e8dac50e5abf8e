use std::fmt::{self, Display, Formatter};

use bytes::{Buf, BufMut};

use super::{ByEndpoint, DecodeError, InadequateBufferSize};
use crate::wire_encoding::{self, WireDecode, WireEncode};

wire_encoding::bounded_uint! {
    /// 4-bit MCTP header version.
    pub struct Version(u8 : 4);
}

impl Version {
    /// Header version 1, the only version defined by DSP0236.
    pub const V1: Self = Self(1);
}

wire_encoding::bounded_uint! {
    /// 2-bit packet sequence number, incremented modulo 4 for each packet of a message.
    pub struct Sequence(u8 : 2);
}

impl Sequence {
    /// The sequence number of the packet following this one.
    pub const fn next(self) -> Self {
        Self((self.0 + 1) & Self::MAX.0)
    }

    /// The number of increments needed to get from this sequence number to `other`.
    pub const fn distance_to(self, other: Self) -> u8 {
        other.0.wrapping_sub(self.0) & Self::MAX.0
    }
}

wire_encoding::bounded_uint! {
    /// 3-bit message tag value.
    pub struct TagValue(u8 : 3);
}

/// An MCTP endpoint identifier (EID).
#[derive(Debug, Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash, Default)]
pub struct EndpointId(pub u8);

impl EndpointId {
    /// The null EID, used when an endpoint has not been assigned one.
    pub const NULL: Self = Self(0x00);
    /// The broadcast EID.
    pub const BROADCAST: Self = Self(0xff);
}

impl Display for EndpointId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u8> for EndpointId {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

/// The message tag and tag-owner (TO) bit.
///
/// The tag owner is the endpoint that originated the tag, typically the requester. Responses
/// echo the tag value with the owner bit cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Tag {
    /// Set if the sender of the packet owns the tag.
    pub owner: bool,
    /// The tag value.
    pub value: TagValue,
}

impl Tag {
    /// Position of the tag-owner bit within the 4-bit tag field.
    pub const OWNER_BIT: u8 = 0x08;

    /// Creates a tag from the low 4 bits of the flags byte.
    pub const fn from_bits(bits: u8) -> Self {
        Self {
            owner: bits & Self::OWNER_BIT != 0,
            value: TagValue::new_truncated(bits),
        }
    }

    /// The 4-bit wire form of the tag, `TO << 3 | value`.
    pub const fn bits(self) -> u8 {
        (self.owner as u8) << 3 | self.value.get()
    }

    /// Returns the tag as seen from the other end of the exchange.
    ///
    /// The tag-owner bit is inverted, the value is kept.
    pub const fn flip_owner(self) -> Self {
        Self::from_bits(self.bits() ^ Self::OWNER_BIT)
    }
}

impl Display for Tag {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.owner {
            write!(f, "TO:{}", self.value)
        } else {
            write!(f, "{}", self.value)
        }
    }
}

/// Position of a packet within its message, as given by the SOM and EOM flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentPosition {
    /// Both SOM and EOM: the message fits in one packet.
    Single,
    /// SOM only.
    First,
    /// Neither flag.
    Middle,
    /// EOM only.
    Last,
}

/// The fixed 4-byte MCTP transport header.
///
/// ```text
/// Byte 0: [ rsvd:4 | version:4 ]
/// Byte 1: destination endpoint id
/// Byte 2: source endpoint id
/// Byte 3: [ SOM:1 | EOM:1 | seq:2 | TO:1 | tag:3 ]
/// ```
///
/// See [DSP0236](https://www.dmtf.org/dsp/DSP0236) for details. The reserved bits are ignored
/// when decoding and written as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MctpHeader {
    /// The header version, always [`Version::V1`] for decoded headers.
    pub version: Version,
    /// The source and destination endpoint ids.
    pub endpoints: ByEndpoint<EndpointId>,
    /// Start of message.
    pub som: bool,
    /// End of message.
    pub eom: bool,
    /// Packet sequence number.
    pub sequence: Sequence,
    /// Message tag and tag owner.
    pub tag: Tag,
}

impl MctpHeader {
    /// The length of the header in bytes.
    pub const LENGTH: usize = 4;

    /// The minimum length of a frame: the header plus the message-type byte.
    pub const MIN_FRAME_LENGTH: usize = Self::LENGTH + 1;

    /// The supported header versions.
    pub const SUPPORTED_VERSIONS: &'static [Version] = &[Version::V1];

    const SOM_BIT: u8 = 0x80;
    const EOM_BIT: u8 = 0x40;
    const SEQUENCE_SHIFT: u8 = 4;

    /// Returns the position of this packet within its message.
    pub fn position(&self) -> FragmentPosition {
        match (self.som, self.eom) {
            (true, true) => FragmentPosition::Single,
            (true, false) => FragmentPosition::First,
            (false, false) => FragmentPosition::Middle,
            (false, true) => FragmentPosition::Last,
        }
    }

    /// Returns true unless the packet carries a complete message.
    pub fn is_fragmented(&self) -> bool {
        self.position() != FragmentPosition::Single
    }

    /// The flags byte: SOM, EOM, sequence, tag owner and tag value.
    pub fn flags_byte(&self) -> u8 {
        let mut byte = self.sequence.get() << Self::SEQUENCE_SHIFT | self.tag.bits();
        if self.som {
            byte |= Self::SOM_BIT;
        }
        if self.eom {
            byte |= Self::EOM_BIT;
        }
        byte
    }

    fn with_flags_byte(version: Version, endpoints: ByEndpoint<EndpointId>, byte: u8) -> Self {
        Self {
            version,
            endpoints,
            som: byte & Self::SOM_BIT != 0,
            eom: byte & Self::EOM_BIT != 0,
            sequence: Sequence::new_truncated(byte >> Self::SEQUENCE_SHIFT),
            tag: Tag::from_bits(byte),
        }
    }
}

impl Display for MctpHeader {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let flags = match self.position() {
            FragmentPosition::Single => "SOM|EOM",
            FragmentPosition::First => "SOM",
            FragmentPosition::Middle => "none",
            FragmentPosition::Last => "EOM",
        };
        write!(f, "Flags {flags}, seq {}, tag {}", self.sequence, self.tag)
    }
}

impl<T: Buf> WireDecode<T> for MctpHeader {
    type Error = DecodeError;

    /// Decodes the header, leaving the buffer positioned at the start of the message payload.
    ///
    /// At least [`MctpHeader::MIN_FRAME_LENGTH`] bytes must be available, since a frame without a
    /// message-type byte cannot be attributed to any message.
    fn decode(data: &mut T) -> Result<Self, Self::Error> {
        if data.remaining() < Self::MIN_FRAME_LENGTH {
            return Err(DecodeError::TooShort(data.remaining()));
        }

        // Check the version without advancing the buffer.
        let version = Version::new_truncated(data.chunk()[0]);
        if !Self::SUPPORTED_VERSIONS.contains(&version) {
            return Err(DecodeError::UnsupportedVersion(version));
        }
        data.advance(1);

        let destination = EndpointId(data.get_u8());
        let source = EndpointId(data.get_u8());
        let flags = data.get_u8();

        Ok(Self::with_flags_byte(
            version,
            ByEndpoint {
                destination,
                source,
            },
            flags,
        ))
    }
}

impl WireEncode for MctpHeader {
    type Error = InadequateBufferSize;

    fn encoded_length(&self) -> usize {
        Self::LENGTH
    }

    fn encode_to<T: BufMut>(&self, buffer: &mut T) -> Result<(), Self::Error> {
        if buffer.remaining_mut() < Self::LENGTH {
            return Err(InadequateBufferSize);
        }

        buffer.put_u8(self.version.get());
        buffer.put_u8(self.endpoints.destination.0);
        buffer.put_u8(self.endpoints.source.0);
        buffer.put_u8(self.flags_byte());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_header() -> ([u8; 5], MctpHeader) {
        let data: [u8; 5] = [0x01, 0x08, 0x10, 0xc8, 0x01];
        let header = MctpHeader {
            version: Version::V1,
            endpoints: ByEndpoint {
                destination: EndpointId(8),
                source: EndpointId(16),
            },
            som: true,
            eom: true,
            sequence: Sequence(0),
            tag: Tag {
                owner: true,
                value: TagValue(0),
            },
        };

        (data, header)
    }

    mod decode {
        use super::*;

        #[test]
        fn single_packet_message() {
            let (data, expected) = base_header();
            let mut buffer = data.as_slice();

            let decoded = MctpHeader::decode(&mut buffer).expect("must successfully decode");

            assert_eq!(decoded, expected);
            assert_eq!(decoded.position(), FragmentPosition::Single);
            assert!(!decoded.is_fragmented());
            assert_eq!(buffer, [0x01]);
        }

        macro_rules! test_flags {
            ($name:ident, $flags:literal, $position:expr, $sequence:literal, $owner:literal, $tag:literal) => {
                #[test]
                fn $name() {
                    let (mut data, _) = base_header();
                    data[3] = $flags;

                    let decoded =
                        MctpHeader::decode(&mut data.as_slice()).expect("must successfully decode");

                    assert_eq!(decoded.position(), $position);
                    assert_eq!(decoded.sequence, Sequence($sequence));
                    assert_eq!(decoded.tag.owner, $owner);
                    assert_eq!(decoded.tag.value, TagValue($tag));
                }
            };
        }

        test_flags!(first_fragment, 0x83, FragmentPosition::First, 0, false, 3);
        test_flags!(last_fragment, 0x43, FragmentPosition::Last, 0, false, 3);
        test_flags!(middle_fragment, 0x2f, FragmentPosition::Middle, 2, true, 7);
        test_flags!(wrapped_sequence, 0x30, FragmentPosition::Middle, 3, false, 0);

        #[test]
        fn header_only_is_too_short() {
            let (data, _) = base_header();

            assert_eq!(
                MctpHeader::decode(&mut &data[..4]).expect_err("must fail to decode"),
                DecodeError::TooShort(4)
            );
        }

        #[test]
        fn empty_is_too_short() {
            assert_eq!(
                MctpHeader::decode(&mut [0u8; 0].as_slice()).expect_err("must fail to decode"),
                DecodeError::TooShort(0)
            );
        }

        #[test]
        fn unsupported_version() {
            let (mut data, _) = base_header();
            data[0] = 0x02;

            assert_eq!(
                MctpHeader::decode(&mut data.as_slice()).expect_err("must fail to decode"),
                DecodeError::UnsupportedVersion(Version(2))
            );
        }

        #[test]
        fn reserved_bits_are_ignored() {
            let (mut data, expected) = base_header();
            data[0] = 0xf1;

            assert_eq!(
                MctpHeader::decode(&mut data.as_slice()).expect("must successfully decode"),
                expected
            );
        }
    }

    mod encode {
        use super::*;

        #[test]
        fn single_packet_message() {
            let (data, header) = base_header();

            assert_eq!(header.encode_to_bytes().as_ref(), &data[..4]);
        }

        #[test]
        fn inadequate_buffer_size() {
            let (_, header) = base_header();

            let mut buffer = [0u8; MctpHeader::LENGTH - 1];
            assert_eq!(
                header.encode_to(&mut buffer.as_mut()),
                Err(InadequateBufferSize)
            );

            let mut buffer = [0u8; MctpHeader::LENGTH];
            assert_eq!(header.encode_to(&mut buffer.as_mut()), Ok(()));
        }

        #[test]
        fn round_trips_every_flags_byte() {
            let (_, header) = base_header();

            for flags in 0..=u8::MAX {
                let header = MctpHeader::with_flags_byte(header.version, header.endpoints, flags);
                let mut encoded = header.encode_to_bytes().to_vec();
                encoded.push(0x00);

                assert_eq!(encoded[3], flags);
                assert_eq!(MctpHeader::decode(&mut encoded.as_slice()), Ok(header));
            }
        }
    }

    mod tag {
        use super::*;

        #[test]
        fn flip_owner() {
            let tag = Tag::from_bits(0x0b);

            assert_eq!(tag.flip_owner(), Tag::from_bits(0x03));
            assert_eq!(tag.flip_owner().flip_owner(), tag);
            assert_eq!(tag.bits(), 0x0b);
        }

        #[test]
        fn display() {
            assert_eq!(Tag::from_bits(0x0d).to_string(), "TO:5");
            assert_eq!(Tag::from_bits(0x05).to_string(), "5");
        }
    }

    mod sequence {
        use super::*;

        #[test]
        fn next_wraps() {
            assert_eq!(Sequence(2).next(), Sequence(3));
            assert_eq!(Sequence(3).next(), Sequence(0));
        }

        #[test]
        fn distance_wraps() {
            assert_eq!(Sequence(1).distance_to(Sequence(3)), 2);
            assert_eq!(Sequence(3).distance_to(Sequence(0)), 1);
            assert_eq!(Sequence(2).distance_to(Sequence(1)), 3);
        }
    }

    #[test]
    fn display_flags() {
        let (_, header) = base_header();
        assert_eq!(header.to_string(), "Flags SOM|EOM, seq 0, tag TO:0");

        let middle = MctpHeader::with_flags_byte(header.version, header.endpoints, 0x13);
        assert_eq!(middle.to_string(), "Flags none, seq 1, tag 3");
    }
}
