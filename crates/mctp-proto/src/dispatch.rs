//! Hand-off of complete messages to the handlers of their message type.
//!
//! Complete messages, whether reassembled or carried by a single packet, are dispatched exactly
//! once: [`dispatch_message`] reads the message type from the first byte and passes the rest of
//! the message to a [`Dispatch`] implementation. Messages whose type no handler claims are
//! reported as [`DispatchOutcome::Unrecognized`], which is informational only.

use std::{collections::HashMap, fmt};

use bytes::Bytes;

use crate::{
    message::MessageType,
    packet::{ByEndpoint, FlowKey},
    reassembly::FrameId,
};

/// Information about the link on which a frame was captured.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LinkContext {
    /// The index of the capturing interface, if known.
    pub interface_index: Option<u32>,
    /// The physical (bus) address of the peer, if the link layer provides one.
    pub hardware_address: Option<Bytes>,
}

/// The flow a message was received on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowContext {
    /// The reassembly identity of the message.
    pub key: FlowKey,
    /// The tag-derived port numbers of the flow.
    pub ports: ByEndpoint<u8>,
    /// The link on which the completing frame was captured.
    pub link: LinkContext,
}

impl FlowContext {
    /// Creates the context of a message received on the flow.
    pub fn new(key: FlowKey, link: LinkContext) -> Self {
        Self {
            ports: key.ports(),
            key,
            link,
        }
    }
}

/// Lookup of upper-layer handlers by message type.
pub trait Dispatch {
    /// Passes a complete message to the handler for its type.
    ///
    /// `payload` is the message without its leading message-type byte. Returns true if a
    /// handler claimed the message.
    fn dispatch(
        &mut self,
        message_type: MessageType,
        payload: Bytes,
        frame: FrameId,
        flow: &FlowContext,
    ) -> bool;
}

impl<D: Dispatch + ?Sized> Dispatch for &mut D {
    fn dispatch(
        &mut self,
        message_type: MessageType,
        payload: Bytes,
        frame: FrameId,
        flow: &FlowContext,
    ) -> bool {
        (**self).dispatch(message_type, payload, frame, flow)
    }
}

impl<D: Dispatch + ?Sized> Dispatch for Box<D> {
    fn dispatch(
        &mut self,
        message_type: MessageType,
        payload: Bytes,
        frame: FrameId,
        flow: &FlowContext,
    ) -> bool {
        (**self).dispatch(message_type, payload, frame, flow)
    }
}

/// A handler for the messages of one message type.
pub trait MessageHandler {
    /// Handles a complete message, given without its message-type byte.
    fn handle(&mut self, payload: Bytes, frame: FrameId, flow: &FlowContext);
}

impl<F> MessageHandler for F
where
    F: FnMut(Bytes, FrameId, &FlowContext),
{
    fn handle(&mut self, payload: Bytes, frame: FrameId, flow: &FlowContext) {
        self(payload, frame, flow)
    }
}

/// A table of message handlers, keyed by message type.
#[derive(Default)]
pub struct DispatchTable {
    handlers: HashMap<u8, Box<dyn MessageHandler + Send>>,
}

impl DispatchTable {
    /// Creates a table without any handlers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the handler for a message type, returning the handler it replaces.
    pub fn register<H>(
        &mut self,
        message_type: MessageType,
        handler: H,
    ) -> Option<Box<dyn MessageHandler + Send>>
    where
        H: MessageHandler + Send + 'static,
    {
        self.handlers.insert(u8::from(message_type), Box::new(handler))
    }

    /// Removes the handler for a message type.
    pub fn unregister(
        &mut self,
        message_type: MessageType,
    ) -> Option<Box<dyn MessageHandler + Send>> {
        self.handlers.remove(&u8::from(message_type))
    }

    /// Returns true if a handler is registered for the message type.
    pub fn is_registered(&self, message_type: MessageType) -> bool {
        self.handlers.contains_key(&u8::from(message_type))
    }
}

impl fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<_> = self.handlers.keys().copied().map(MessageType::from).collect();
        types.sort_by_key(|message_type| u8::from(*message_type));
        f.debug_struct("DispatchTable")
            .field("message_types", &types)
            .finish()
    }
}

impl Dispatch for DispatchTable {
    fn dispatch(
        &mut self,
        message_type: MessageType,
        payload: Bytes,
        frame: FrameId,
        flow: &FlowContext,
    ) -> bool {
        match self.handlers.get_mut(&u8::from(message_type)) {
            Some(handler) => {
                handler.handle(payload, frame, flow);
                true
            }
            None => false,
        }
    }
}

/// The result of dispatching a complete message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A handler claimed the message.
    Handled(MessageType),
    /// No handler claimed the message type; the message is not decoded further.
    Unrecognized(MessageType),
    /// The message has no message-type byte.
    Empty,
}

/// Dispatches a complete message, starting with its message-type byte.
///
/// The message type is the low 7 bits of the first byte; the remaining bytes are passed on as
/// the payload.
pub fn dispatch_message<D>(
    dispatcher: &mut D,
    message: &Bytes,
    frame: FrameId,
    flow: &FlowContext,
) -> DispatchOutcome
where
    D: Dispatch + ?Sized,
{
    let Some(&type_byte) = message.first() else {
        return DispatchOutcome::Empty;
    };
    let message_type = MessageType::from_type_byte(type_byte);

    if dispatcher.dispatch(message_type, message.slice(1..), frame, flow) {
        tracing::trace!(%message_type, %frame, "message handled");
        DispatchOutcome::Handled(message_type)
    } else {
        tracing::debug!(%message_type, %frame, key = %flow.key, "unrecognized message type");
        DispatchOutcome::Unrecognized(message_type)
    }
}
