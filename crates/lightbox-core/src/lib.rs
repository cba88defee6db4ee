#![forbid(unsafe_code)]

//! Core types shared across the lightbox workspace: media descriptors
//! supplied by external collaborators, and the object-handle store that
//! backs locally materialized media bytes.

mod descriptor;
mod handle;

pub use descriptor::{MediaDescriptor, MediaId, MediaKind};
pub use handle::{HandleStore, ObjectHandle, ObjectKey, ResolvedHandle};
