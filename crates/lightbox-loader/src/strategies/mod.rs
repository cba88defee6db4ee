//! The built-in strategy chain, in fixed priority order:
//!
//! 1. [`StreamingProgress`] — byte-level progress from a known total.
//! 2. [`ChunkedStream`] — body streaming with a bounded synthetic estimate
//!    when the total is unknown.
//! 3. [`ElementProgress`] — delegation to a platform media primitive with a
//!    polled synthetic ramp.
//! 4. [`DegradedFallback`] — last resort: elapsed-time ramp around a raw
//!    buffered fetch.

mod degraded;
mod element;
mod streaming;

pub use degraded::DegradedFallback;
pub use element::{ElementHost, ElementLoad, ElementPhase, ElementProgress};
pub use streaming::{ChunkedStream, StreamingProgress};
