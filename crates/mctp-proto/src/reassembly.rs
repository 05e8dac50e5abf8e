//! Reassembly of MCTP messages from possibly fragmented, possibly interleaved packets.
//!
//! A [`ReassemblyTable`] is owned by whatever processes a single capture stream. Packets are
//! ingested one at a time, in the order in which they were observed, and each call reports
//! whether the packet was buffered, completed a message, or carried a whole message by itself.
//!
//! Irregular fragment sequences are reported as [`Anomaly`] values next to the outcome;
//! reassembly continues on a best-effort basis and a flow never affects any other flow. The
//! table never evicts incomplete state on its own; the owner may do so with
//! [`ReassemblyTable::retain`] or [`ReassemblyTable::remove`].

use std::{
    collections::{hash_map::Entry, HashMap},
    fmt::{self, Display, Formatter},
};

use bytes::Bytes;

use crate::{
    message::MessageType,
    packet::{FlowKey, MctpHeader, MctpPacket},
};

mod anomaly;
pub use anomaly::Anomaly;

mod state;
use state::Completion;
pub use state::ReassemblyState;

/// The identifier of a captured frame, increasing in the order frames are observed.
#[derive(Debug, Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash, Default)]
pub struct FrameId(pub u64);

impl Display for FrameId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A packet handed to the reassembly engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// The header of the packet.
    pub header: MctpHeader,
    /// The packet payload following the header.
    pub payload: Bytes,
    /// The frame in which the packet was captured.
    pub frame: FrameId,
}

impl Fragment {
    /// Creates a fragment from a decoded packet.
    pub fn new(packet: MctpPacket, frame: FrameId) -> Self {
        Self {
            header: packet.header,
            payload: packet.payload,
            frame,
        }
    }
}

/// A message assembled from two or more fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledMessage {
    /// The flow on which the message was received.
    pub flow: FlowKey,
    /// The concatenated payloads of all fragments, starting with the message-type byte.
    pub payload: Bytes,
    /// The frame that carried the start of the message.
    pub start_frame: FrameId,
    /// The frame whose packet completed the message, usually the end of the message.
    pub reassembled_in: FrameId,
    /// The frames of all fragments, in message order.
    pub fragment_frames: Vec<FrameId>,
    /// True if conflicting fragments were received; the first one received was used.
    pub conflicted: bool,
}

impl AssembledMessage {
    /// The length of the reassembled message in bytes.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Returns true if the reassembled message has no content.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// The number of fragments that make up the message.
    pub fn fragment_count(&self) -> usize {
        self.fragment_frames.len()
    }

    /// The message type, read from the first byte of the message.
    pub fn message_type(&self) -> Option<MessageType> {
        self.payload.first().copied().map(MessageType::from_type_byte)
    }
}

/// The result of ingesting a single packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentOutcome {
    /// The message is not yet complete. The fragment was buffered, or discarded as reported by
    /// the accompanying anomalies.
    Buffered,
    /// The fragment completed a message.
    Completed(AssembledMessage),
    /// The packet carried a whole message and was not buffered.
    SinglePacket(Bytes),
}

/// The outcome of ingesting a packet along with any anomalies it revealed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ingestion {
    /// What happened to the packet.
    pub outcome: FragmentOutcome,
    /// Irregularities detected while handling the packet.
    pub anomalies: Vec<Anomaly>,
}

/// In-progress messages, keyed by their flow.
#[derive(Debug, Default)]
pub struct ReassemblyTable {
    states: HashMap<FlowKey, ReassemblyState>,
}

impl ReassemblyTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Processes the next packet of the flow identified by `key`.
    ///
    /// Packets with both SOM and EOM set are returned as [`FragmentOutcome::SinglePacket`]
    /// without touching the table. Other packets are appended to the message of their flow in
    /// arrival order; a start-of-message packet always begins a new message. When the end of
    /// the message arrives and no fragment since the start was lost, the fragments are
    /// concatenated, the state for `key` is removed, and [`FragmentOutcome::Completed`] is
    /// returned.
    pub fn ingest(&mut self, key: FlowKey, fragment: Fragment) -> Ingestion {
        let frame = fragment.frame;

        if !fragment.header.is_fragmented() {
            tracing::trace!(%key, %frame, "unfragmented message");
            return Ingestion {
                outcome: FragmentOutcome::SinglePacket(fragment.payload),
                anomalies: vec![],
            };
        }

        let mut anomalies = vec![];
        let ends_message = fragment.header.eom;

        let state = match self.states.entry(key) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                if !fragment.header.som {
                    tracing::debug!(%key, %frame, "fragment without a preceding start of message");
                    anomalies.push(Anomaly::OrphanFragment);
                }
                entry.insert(ReassemblyState::new(&fragment))
            }
        };

        let buffered = state.insert(fragment, &mut anomalies);

        if ends_message && buffered {
            match state.completion() {
                Completion::Ready => {
                    if let Some(state) = self.states.remove(&key) {
                        let message = state.into_message(key, frame);
                        tracing::trace!(
                            %key,
                            %frame,
                            length = message.len(),
                            fragments = message.fragment_count(),
                            "message reassembled"
                        );
                        return Ingestion {
                            outcome: FragmentOutcome::Completed(message),
                            anomalies,
                        };
                    }
                }
                Completion::Incomplete { missing } => {
                    tracing::debug!(%key, %frame, ?missing, "cannot reassemble message");
                    anomalies.push(Anomaly::DesegmentationError { missing });
                }
                Completion::Open => (),
            }
        }

        tracing::trace!(%key, %frame, buffered, "fragment processed");
        Ingestion {
            outcome: FragmentOutcome::Buffered,
            anomalies,
        }
    }

    /// The number of flows with an incomplete message.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Returns true if no message is being reassembled.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Returns true if a message is being reassembled on the flow.
    pub fn contains(&self, key: &FlowKey) -> bool {
        self.states.contains_key(key)
    }

    /// Returns the reassembly state of the flow, if any.
    pub fn get(&self, key: &FlowKey) -> Option<&ReassemblyState> {
        self.states.get(key)
    }

    /// Iterates over the flows with an incomplete message.
    pub fn pending(&self) -> impl Iterator<Item = (&FlowKey, &ReassemblyState)> {
        self.states.iter()
    }

    /// Discards the incomplete message of the flow, returning its state.
    pub fn remove(&mut self, key: &FlowKey) -> Option<ReassemblyState> {
        self.states.remove(key)
    }

    /// Keeps only the incomplete messages for which the predicate returns true.
    pub fn retain<F>(&mut self, mut predicate: F)
    where
        F: FnMut(&FlowKey, &ReassemblyState) -> bool,
    {
        self.states.retain(|key, state| predicate(key, state))
    }

    /// Discards all incomplete messages.
    pub fn clear(&mut self) {
        self.states.clear()
    }
}
