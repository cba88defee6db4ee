/// Errors surfaced by viewer navigation.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ViewerError {
    #[error("index {index} out of bounds for {len} items")]
    InvalidIndex { index: usize, len: usize },
}
