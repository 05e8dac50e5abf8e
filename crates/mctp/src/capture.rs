//! A capture stream: decoding, reassembly, and dispatch of the frames of one capture.

use std::fmt::{self, Display, Formatter};

use bytes::Bytes;
use mctp_proto::{
    dispatch::{dispatch_message, Dispatch, DispatchOutcome, FlowContext, LinkContext},
    packet::{DecodeError, FlowKey, MctpHeader, MctpPacket},
    reassembly::{Anomaly, AssembledMessage, Fragment, FragmentOutcome, FrameId, ReassemblyTable},
    wire_encoding::WireDecode,
};

use crate::config::CaptureConfig;

/// The processing pipeline of a single capture stream.
///
/// A stream owns the reassembly table for its frames, which must be delivered in the order in
/// which they were observed. Independent captures processed in parallel each use their own
/// stream.
#[derive(Debug)]
pub struct CaptureStream<D> {
    table: ReassemblyTable,
    dispatcher: D,
    config: CaptureConfig,
}

impl<D: Dispatch> CaptureStream<D> {
    /// Creates a stream with the default configuration that hands complete messages to
    /// `dispatcher`.
    pub fn new(dispatcher: D) -> Self {
        Self::with_config(dispatcher, CaptureConfig::default())
    }

    /// Creates a stream with the provided configuration.
    pub fn with_config(dispatcher: D, config: CaptureConfig) -> Self {
        Self {
            table: ReassemblyTable::new(),
            dispatcher,
            config,
        }
    }

    /// The configuration of the stream.
    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// The messages currently being reassembled.
    pub fn table(&self) -> &ReassemblyTable {
        &self.table
    }

    /// Mutable access to the reassembly table, to discard abandoned messages.
    pub fn table_mut(&mut self) -> &mut ReassemblyTable {
        &mut self.table
    }

    /// The dispatcher of the stream.
    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    /// Mutable access to the dispatcher of the stream.
    pub fn dispatcher_mut(&mut self) -> &mut D {
        &mut self.dispatcher
    }

    /// Consumes the stream, returning its dispatcher.
    pub fn into_dispatcher(self) -> D {
        self.dispatcher
    }

    /// Processes the next raw frame of the capture.
    ///
    /// Frames that cannot be decoded are reported and skipped. Complete messages, whether carried
    /// by a single packet or reassembled from fragments, are dispatched exactly once.
    #[tracing::instrument(skip(self, frame, link), fields(length = frame.len()))]
    pub fn deliver_frame(
        &mut self,
        frame: Bytes,
        frame_id: FrameId,
        link: LinkContext,
    ) -> FrameReport {
        let packet = match MctpPacket::decode(&mut frame.clone()) {
            Ok(packet) => packet,
            Err(error) => {
                tracing::debug!(%error, "skipping frame");
                return FrameReport::Rejected(error);
            }
        };
        let header = packet.header;
        let key = packet.flow_key();

        if header.is_fragmented() && !self.config.reassemble {
            tracing::trace!(%key, "reassembly disabled, reporting fragment");
            return FrameReport::Fragment {
                header,
                anomalies: vec![],
                reassembled: None,
            };
        }

        let ingestion = self.table.ingest(key, Fragment::new(packet, frame_id));
        for anomaly in &ingestion.anomalies {
            tracing::debug!(%key, %anomaly, "reassembly anomaly");
        }

        match ingestion.outcome {
            FragmentOutcome::SinglePacket(message) => FrameReport::Message {
                header,
                dispatch: self.dispatch(&message, frame_id, key, link),
            },
            FragmentOutcome::Completed(message) => {
                let dispatch = self.dispatch(&message.payload, frame_id, key, link);
                FrameReport::Fragment {
                    header,
                    anomalies: ingestion.anomalies,
                    reassembled: Some(Reassembled { message, dispatch }),
                }
            }
            FragmentOutcome::Buffered => FrameReport::Fragment {
                header,
                anomalies: ingestion.anomalies,
                reassembled: None,
            },
        }
    }

    fn dispatch(
        &mut self,
        message: &Bytes,
        frame_id: FrameId,
        key: FlowKey,
        link: LinkContext,
    ) -> DispatchOutcome {
        let flow = FlowContext::new(key, link);
        dispatch_message(&mut self.dispatcher, message, frame_id, &flow)
    }
}

/// A message completed by a fragment, along with the result of dispatching it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reassembled {
    /// The reassembled message.
    pub message: AssembledMessage,
    /// The result of dispatching the message.
    pub dispatch: DispatchOutcome,
}

/// Summary of the processing of a single frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameReport {
    /// The frame could not be decoded and was skipped.
    Rejected(DecodeError),
    /// The frame carried a whole message.
    Message {
        /// The decoded header.
        header: MctpHeader,
        /// The result of dispatching the message.
        dispatch: DispatchOutcome,
    },
    /// The frame carried a fragment of a message.
    Fragment {
        /// The decoded header.
        header: MctpHeader,
        /// Irregularities detected while reassembling.
        anomalies: Vec<Anomaly>,
        /// The message completed by this fragment, if any.
        reassembled: Option<Reassembled>,
    },
}

impl FrameReport {
    /// The decoded header, unless the frame was rejected.
    pub fn header(&self) -> Option<&MctpHeader> {
        match self {
            FrameReport::Rejected(_) => None,
            FrameReport::Message { header, .. } | FrameReport::Fragment { header, .. } => {
                Some(header)
            }
        }
    }

    /// The result of dispatching the message completed by this frame, if any.
    pub fn dispatch(&self) -> Option<DispatchOutcome> {
        match self {
            FrameReport::Message { dispatch, .. } => Some(*dispatch),
            FrameReport::Fragment {
                reassembled: Some(reassembled),
                ..
            } => Some(reassembled.dispatch),
            _ => None,
        }
    }

    /// The anomalies detected while processing the frame.
    pub fn anomalies(&self) -> &[Anomaly] {
        match self {
            FrameReport::Fragment { anomalies, .. } => anomalies,
            _ => &[],
        }
    }
}

impl Display for FrameReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            FrameReport::Rejected(DecodeError::TooShort(length)) => write!(
                f,
                "Bogus length {length}, minimum {}",
                MctpHeader::MIN_FRAME_LENGTH
            ),
            FrameReport::Rejected(DecodeError::UnsupportedVersion(version)) => {
                write!(f, "Invalid version {version}")
            }
            FrameReport::Message { .. } => write!(f, "MCTP message"),
            FrameReport::Fragment { header, .. } if header.eom => {
                write!(f, "MCTP message reassembled")
            }
            FrameReport::Fragment { header, .. } => {
                write!(f, "MCTP message frag {}", header.sequence)
            }
        }
    }
}
