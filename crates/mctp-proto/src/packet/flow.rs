use std::fmt::{self, Display, Formatter};

use super::{ByEndpoint, EndpointId, MctpHeader, Tag};

/// The identity of one logical message exchange, used to key reassembly state.
///
/// Packets belong to the same message when they share the source endpoint, destination
/// endpoint and tag (including the tag-owner bit). A request and its response travel in
/// opposite directions with the owner bit flipped, so they are always distinct flows; see
/// [`FlowKey::reply_key`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlowKey {
    /// The source and destination endpoint ids.
    pub endpoints: ByEndpoint<EndpointId>,
    /// The message tag as sent by the source.
    pub tag: Tag,
}

impl FlowKey {
    /// Derives the flow key of the message to which the packet belongs.
    pub fn from_header(header: &MctpHeader) -> Self {
        Self {
            endpoints: header.endpoints,
            tag: header.tag,
        }
    }

    /// The tag-derived port numbers of this flow.
    ///
    /// The source port is the 4-bit tag as sent. The destination port is the same tag with the
    /// owner bit flipped, which is what the peer sends back as its source port when replying.
    pub fn ports(&self) -> ByEndpoint<u8> {
        ByEndpoint {
            destination: self.tag.flip_owner().bits(),
            source: self.tag.bits(),
        }
    }

    /// The key on which the other endpoint answers this flow.
    pub fn reply_key(&self) -> Self {
        Self {
            endpoints: self.endpoints.swapped(),
            tag: self.tag.flip_owner(),
        }
    }
}

impl Display for FlowKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} tag {}",
            self.endpoints.source, self.endpoints.destination, self.tag
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::TagValue;

    fn request_key() -> FlowKey {
        FlowKey {
            endpoints: ByEndpoint {
                destination: EndpointId(8),
                source: EndpointId(16),
            },
            tag: Tag {
                owner: true,
                value: TagValue::new_truncated(3),
            },
        }
    }

    #[test]
    fn ports_flip_owner_bit() {
        let key = request_key();

        assert_eq!(
            key.ports(),
            ByEndpoint {
                destination: 0x03,
                source: 0x0b
            }
        );
    }

    #[test]
    fn reply_key_is_distinct() {
        let request = request_key();
        let reply = request.reply_key();

        assert_ne!(request, reply);
        assert_eq!(reply.endpoints.source, EndpointId(8));
        assert_eq!(reply.endpoints.destination, EndpointId(16));
        assert!(!reply.tag.owner);
        assert_eq!(reply.tag.value, request.tag.value);
        assert_eq!(reply.reply_key(), request);
    }

    #[test]
    fn reply_ports_mirror_request_ports() {
        let request = request_key();

        assert_eq!(request.reply_key().ports(), request.ports().swapped());
    }

    #[test]
    fn same_direction_differs_by_owner() {
        let request = request_key();
        let echoed = FlowKey {
            tag: request.tag.flip_owner(),
            ..request
        };

        assert_ne!(request, echoed);
    }

    #[test]
    fn display() {
        assert_eq!(request_key().to_string(), "16 -> 8 tag TO:3");
    }
}
