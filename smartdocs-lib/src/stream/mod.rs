//! Streaming answer protocol.
//!
//! A chat response is a sequence of [`StreamEvent`]s: at most one `Sources`,
//! then `Token`s in generation order, then exactly one `Done` or `Error`.
//! The producer writes through an [`EventSink`], which refuses anything that
//! would break that shape; the HTTP layer reads the [`EventStream`] and frames
//! each event as one NDJSON line. Clients decode with [`NdjsonDecoder`] and
//! render with [`AnswerRenderer`].

pub mod codec;
pub mod event;
pub mod renderer;
pub mod sink;

pub use codec::{encode, CodecError, LineBuffer, NdjsonDecoder, CONTENT_TYPE};
pub use event::{ErrorKind, RateLimitInfo, StreamEvent};
pub use renderer::{AnswerRenderer, RenderState};
pub use sink::{channel, EventSink, EventStream, SinkError, SinkState};
