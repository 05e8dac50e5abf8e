//! Types, parsing, and encoding for the Management Component Transport Protocol (MCTP).
//!
//! This crate decodes MCTP transport headers ([DSP0236]), reassembles messages that span several
//! packets, and hands complete messages to handlers by message type ([DSP0239]).
//!
//! [DSP0236]: https://www.dmtf.org/dsp/DSP0236
//! [DSP0239]: https://www.dmtf.org/dsp/DSP0239

pub mod dispatch;
pub mod message;
pub mod packet;
pub mod reassembly;
pub(crate) mod utils;
pub mod wire_encoding;
