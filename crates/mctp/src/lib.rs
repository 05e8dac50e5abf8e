//! Processing of captured MCTP traffic.
//!
//! A [`CaptureStream`] receives the raw frames of a capture in the order in which they were
//! observed, decodes their MCTP headers, reassembles fragmented messages, and hands every
//! complete message to a [`Dispatch`][mctp_proto::dispatch::Dispatch] implementation. Each
//! delivered frame yields a [`FrameReport`] describing what happened to it.
//!
//! The protocol types themselves live in the [`mctp_proto`] crate.

pub mod capture;
pub mod config;

pub use capture::{CaptureStream, FrameReport, Reassembled};
pub use config::{CaptureConfig, ConfigError};
