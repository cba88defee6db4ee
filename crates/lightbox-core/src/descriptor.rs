use std::{fmt, sync::Arc};

use url::Url;

/// Stable identity of a media item within a viewer session.
///
/// Identity is the id, not the URL: two descriptors may point at the same
/// URL by coincidence and are still distinct items.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MediaId(Arc<str>);

impl MediaId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MediaId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for MediaId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What kind of asset a descriptor points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Photo,
    Video,
}

/// Immutable, externally supplied description of one media item.
///
/// Descriptors are handed to the viewer once per session and treated as
/// read-only; the loader and orchestrator never mutate them.
#[derive(Clone, Debug)]
pub struct MediaDescriptor {
    pub id: MediaId,
    pub kind: MediaKind,
    pub url: Url,
    /// Accessibility label, passed through opaquely to the presentation layer.
    pub alt_text: String,
    pub width: u32,
    pub height: u32,
}

impl MediaDescriptor {
    pub fn new(id: impl Into<MediaId>, kind: MediaKind, url: Url) -> Self {
        Self {
            id: id.into(),
            kind,
            url,
            alt_text: String::new(),
            width: 0,
            height: 0,
        }
    }

    pub fn with_alt_text(mut self, alt_text: impl Into<String>) -> Self {
        self.alt_text = alt_text.into();
        self
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}
