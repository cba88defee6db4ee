use std::{collections::HashMap, fmt, sync::Arc};

use bytes::Bytes;
use parking_lot::Mutex;
use url::Url;

/// Key of a locally materialized object handle. Unique per store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObjectKey(u64);

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "object:{}", self.0)
    }
}

/// Registry of locally created object handles backing downloaded bytes.
///
/// The analogue of a browser object-URL table: a successful download is
/// registered here and addressed by key until it is explicitly released.
/// Release is idempotent; `outstanding()` exists so sessions can assert
/// they leaked nothing on close.
#[derive(Clone, Debug, Default)]
pub struct HandleStore {
    inner: Arc<Mutex<StoreInner>>,
}

#[derive(Debug, Default)]
struct StoreInner {
    next_key: u64,
    objects: HashMap<ObjectKey, Bytes>,
}

impl HandleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Materialize an object handle from downloaded bytes.
    ///
    /// The caller owns the release of the returned handle.
    pub fn create(&self, bytes: Bytes) -> ObjectHandle {
        let mut inner = self.inner.lock();
        let key = ObjectKey(inner.next_key);
        inner.next_key += 1;
        inner.objects.insert(key, bytes);
        ObjectHandle {
            key,
            store: self.clone(),
        }
    }

    /// Release a handle's backing bytes. Returns `false` if the handle was
    /// already released (second release is a no-op).
    pub fn release(&self, handle: &ObjectHandle) -> bool {
        self.inner.lock().objects.remove(&handle.key).is_some()
    }

    /// Number of handles created and not yet released.
    pub fn outstanding(&self) -> usize {
        self.inner.lock().objects.len()
    }

    fn bytes_of(&self, key: ObjectKey) -> Option<Bytes> {
        self.inner.lock().objects.get(&key).cloned()
    }
}

/// A reference to locally stored media bytes, usable as a renderable source.
#[derive(Clone, Debug)]
pub struct ObjectHandle {
    key: ObjectKey,
    store: HandleStore,
}

impl ObjectHandle {
    pub fn key(&self) -> ObjectKey {
        self.key
    }

    /// The backing bytes, or `None` once the handle has been released.
    pub fn bytes(&self) -> Option<Bytes> {
        self.store.bytes_of(self.key)
    }

    /// Release the backing bytes. Idempotent.
    pub fn release(&self) -> bool {
        self.store.release(self)
    }
}

/// Renderable source produced by a successful load.
///
/// Never shared across adapters: the adapter that produced it owns its
/// disposal.
#[derive(Clone, Debug)]
pub enum ResolvedHandle {
    /// The original URL; the presentation layer streams it directly.
    Remote(Url),
    /// Locally materialized bytes owned by the producing adapter.
    Object(ObjectHandle),
}

impl ResolvedHandle {
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Object(_))
    }

    /// Release any backing bytes. No-op (returns `false`) for remote
    /// handles and already-released objects.
    pub fn release(&self) -> bool {
        match self {
            Self::Remote(_) => false,
            Self::Object(h) => h.release(),
        }
    }
}
