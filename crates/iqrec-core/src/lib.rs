//! Core contract between iqrec blocks and their host runtime.
//!
//! Blocks are state machines invoked serially through `work` calls. The
//! host runtime owns the buffers and delivers each call's view of a stream
//! as an [`InputWindow`] or [`OutputWindow`]; blocks implement one of the
//! [`StreamSource`] / [`StreamSink`] / [`StreamTransform`] traits over
//! those views. Out-of-band data travels as [`Tag`]s pinned to absolute
//! stream offsets, and control-plane traffic as [`Message`]s published
//! through a [`MessagePort`].

pub mod block;
pub mod error;
pub mod message;
pub mod sample;
pub mod tag;
pub mod value;

pub use block::{InputWindow, OutputWindow, StreamSink, StreamSource, StreamTransform};
pub use error::{Error, Result};
pub use message::{Message, MessagePort, MessageReceiver};
pub use sample::SampleFormat;
pub use tag::Tag;
pub use value::Value;
