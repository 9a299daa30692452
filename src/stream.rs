//! Stream transport
//!
//! Performs the message request whose response body is a line-oriented
//! event stream, splits it into frames, and hands each frame payload to the
//! caller as soon as its line is complete.

mod error;
mod frame;
mod handle;
mod transport;

#[cfg(test)]
mod proptests;
#[cfg(test)]
pub(crate) mod testing;

pub use error::{StreamError, StreamErrorKind};
pub use frame::FrameDecoder;
pub use handle::{spawn_stream, CancelHandle, StreamHandle};
pub use transport::{ByteStream, HttpTransport, StreamRequest, StreamTransport};
