#![forbid(unsafe_code)]

//! Facade over the lightbox workspace.
//!
//! Progressive media loading with strategy fallback, per-item lifecycle-safe
//! load state, and a wrap-around gallery navigator with neighbour prefetch.
//!
//! ```ignore
//! use std::sync::Arc;
//! use lightbox::prelude::*;
//!
//! let net = Arc::new(HttpClient::new(NetOptions::default()));
//! let loader = Arc::new(ChainLoader::new(net, HandleStore::new()));
//! let viewer = Viewer::new(loader, LoadAttemptConfig::default());
//!
//! viewer.open(descriptors, 0)?;
//! viewer.next()?;
//! viewer.close();
//! ```

pub use lightbox_core as core;
pub use lightbox_loader as loader;
pub use lightbox_net as net;
pub use lightbox_viewer as viewer;

/// The types most integrations need.
pub mod prelude {
    pub use lightbox_core::{
        HandleStore, MediaDescriptor, MediaId, MediaKind, ObjectHandle, ResolvedHandle,
    };
    pub use lightbox_loader::{ChainLoader, LoadAttemptConfig, LoadError, LoadRequest};
    pub use lightbox_net::{HttpClient, Net, NetError, NetOptions};
    pub use lightbox_viewer::{
        ItemLoader, LoadFailure, LoadState, SessionPhase, Viewer, ViewerError,
        input::{Key, NavCommand, map_key, map_swipe},
    };
}
