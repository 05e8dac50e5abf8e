use bytes::{Bytes, BytesMut};

use super::{Anomaly, AssembledMessage, FrameId, Fragment};
use crate::packet::{FlowKey, MctpHeader, Sequence};

#[derive(Debug, Clone)]
struct BufferedFragment {
    payload: Bytes,
    frame: FrameId,
    sequence: Sequence,
    som: bool,
    eom: bool,
}

impl BufferedFragment {
    /// True if the header carries the same sequence number and flags as this fragment.
    fn is_repeated_by(&self, header: &MctpHeader) -> bool {
        self.sequence == header.sequence && self.som == header.som && self.eom == header.eom
    }
}

/// Whether the buffered fragments of a message can be assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Completion {
    /// The message runs from a start to an end of message without lost fragments.
    Ready,
    /// The end is known but fragments were lost, or the start was never seen.
    Incomplete { missing: Option<usize> },
    /// No end-of-message fragment has been received.
    Open,
}

/// Fragments buffered for one in-progress message.
///
/// Fragments are kept in the order in which they arrive. Their sequence numbers are only used to
/// recognise a repeat of the most recent fragment and to count fragments skipped in between; a
/// sequence number that advances by two or three counts one or two lost fragments.
#[derive(Debug, Clone)]
pub struct ReassemblyState {
    fragments: Vec<BufferedFragment>,
    missing: usize,
    has_tail: bool,
    start_frame: Option<FrameId>,
    last_frame: FrameId,
    orphan: bool,
    conflicted: bool,
}

impl ReassemblyState {
    pub(super) fn new(first: &Fragment) -> Self {
        Self {
            fragments: vec![],
            missing: 0,
            has_tail: false,
            start_frame: None,
            last_frame: first.frame,
            orphan: !first.header.som,
            conflicted: false,
        }
    }

    /// The number of buffered fragments.
    pub fn fragment_count(&self) -> usize {
        self.fragments.len()
    }

    /// The total number of buffered payload bytes.
    pub fn buffered_length(&self) -> usize {
        self.fragments.iter().map(|f| f.payload.len()).sum()
    }

    /// The frames of the buffered fragments, in arrival order.
    pub fn frames(&self) -> impl Iterator<Item = FrameId> + '_ {
        self.fragments.iter().map(|f| f.frame)
    }

    /// The frame carrying the start of the message, if it was received.
    pub fn start_frame(&self) -> Option<FrameId> {
        self.start_frame
    }

    /// The frame of the most recently received fragment.
    pub fn last_frame(&self) -> FrameId {
        self.last_frame
    }

    /// The number of fragments lost between the buffered ones, judged by sequence numbers.
    pub fn missing(&self) -> usize {
        self.missing
    }

    /// True if reassembly began with a fragment other than the start of a message.
    pub fn is_orphan(&self) -> bool {
        self.orphan
    }

    /// True if an end-of-message fragment has been received.
    pub fn has_tail(&self) -> bool {
        self.has_tail
    }

    /// True if two fragments with different content were received for the same position.
    pub fn has_conflict(&self) -> bool {
        self.conflicted
    }

    /// Buffers the fragment, returning false if it was discarded.
    ///
    /// A fragment repeating the sequence number and flags of the most recent fragment is a
    /// retransmission and is discarded; the first copy is kept. A start of message abandons
    /// whatever was buffered before it.
    pub(super) fn insert(&mut self, fragment: Fragment, anomalies: &mut Vec<Anomaly>) -> bool {
        let header = fragment.header;
        self.last_frame = fragment.frame;

        if let Some(latest) = self
            .fragments
            .last()
            .filter(|latest| latest.is_repeated_by(&header))
        {
            if latest.payload == fragment.payload {
                tracing::trace!(frame = %fragment.frame, "duplicate fragment");
                anomalies.push(Anomaly::Overlap);
            } else {
                tracing::debug!(
                    frame = %fragment.frame,
                    kept = %latest.frame,
                    "fragment overlaps with conflicting data"
                );
                self.conflicted = true;
                anomalies.push(Anomaly::OverlapConflict);
            }
            return false;
        }

        if header.som && !self.fragments.is_empty() {
            tracing::debug!(
                stale = self.fragments.len(),
                frame = %fragment.frame,
                "start of message supersedes buffered fragments"
            );
            *self = Self::new(&fragment);
        }

        if self.has_tail {
            if !header.eom {
                tracing::debug!(frame = %fragment.frame, "fragment past the end of message");
                anomalies.push(Anomaly::TooLongFragment);
                return false;
            }
            tracing::debug!(frame = %fragment.frame, "message has multiple tails");
            anomalies.push(Anomaly::MultipleTails);
        }

        // A fragment that does not advance the sequence number still continues the message.
        if let Some(latest) = self.fragments.last() {
            let lost = latest.sequence.distance_to(header.sequence).saturating_sub(1);
            if lost > 0 {
                tracing::debug!(lost, frame = %fragment.frame, "gap in fragment sequence");
                self.missing += usize::from(lost);
            }
        }

        if header.som {
            self.start_frame = Some(fragment.frame);
        }
        self.has_tail |= header.eom;
        self.fragments.push(BufferedFragment {
            payload: fragment.payload,
            frame: fragment.frame,
            sequence: header.sequence,
            som: header.som,
            eom: header.eom,
        });

        true
    }

    pub(super) fn completion(&self) -> Completion {
        if !self.has_tail {
            Completion::Open
        } else if self.start_frame.is_none() {
            Completion::Incomplete { missing: None }
        } else if self.missing > 0 {
            Completion::Incomplete {
                missing: Some(self.missing),
            }
        } else {
            Completion::Ready
        }
    }

    /// Concatenates the buffered fragments.
    ///
    /// Must only be called once [`Self::completion`] returns [`Completion::Ready`].
    pub(super) fn into_message(self, flow: FlowKey, reassembled_in: FrameId) -> AssembledMessage {
        let mut payload = BytesMut::with_capacity(self.buffered_length());
        let mut fragment_frames = Vec::with_capacity(self.fragments.len());
        for fragment in &self.fragments {
            payload.extend_from_slice(&fragment.payload);
            fragment_frames.push(fragment.frame);
        }

        AssembledMessage {
            flow,
            payload: payload.freeze(),
            start_frame: self.start_frame.unwrap_or(reassembled_in),
            reassembled_in,
            fragment_frames,
            conflicted: self.conflicted,
        }
    }
}
