#![forbid(unsafe_code)]

//! Viewer-side presentation state for progressively loaded media.
//!
//! Two layers sit on top of the `lightbox-loader` strategy chain:
//!
//! - [`ItemLoader`] — a per-item, lifecycle-safe wrapper around one load
//!   operation: observable [`LoadState`], abort/reset/retry, and idempotent
//!   disposal that can never update state after the owner is gone.
//! - [`Viewer`] — the navigation orchestrator: owns the ordered media
//!   sequence and the current-index cursor, cancels outgoing loads on
//!   navigation, warms a prefetch window of neighbours, and evicts items
//!   that drift out of range.
//!
//! The [`input`] module translates keyboard and gesture events into
//! navigation commands without any UI-framework dependency.

mod adapter;
mod error;
pub mod input;
mod session;
mod state;

pub use adapter::ItemLoader;
pub use error::ViewerError;
pub use session::{SessionPhase, Viewer};
pub use state::{LoadFailure, LoadState};
