use lightbox_net::NetError;
use thiserror::Error;

/// Loader-level error taxonomy.
///
/// Strategy-level failures (`StrategyTimeout`, `StrategyNetwork`) are
/// recovered locally by advancing the chain and never reach the UI; only
/// `AllStrategiesExhausted` surfaces, carrying the last underlying error.
#[derive(Debug, Error, Clone)]
pub enum LoadError {
    #[error("strategy attempt timed out")]
    StrategyTimeout,
    #[error("strategy network failure: {0}")]
    StrategyNetwork(String),
    #[error("load cancelled")]
    Cancelled,
    #[error("all strategies exhausted: {last}")]
    AllStrategiesExhausted { last: Box<LoadError> },
}

impl LoadError {
    pub fn network<S: Into<String>>(msg: S) -> Self {
        Self::StrategyNetwork(msg.into())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// The last underlying strategy error, when the whole chain failed.
    pub fn last_strategy_error(&self) -> Option<&LoadError> {
        match self {
            Self::AllStrategiesExhausted { last } => Some(last),
            _ => None,
        }
    }
}

impl From<NetError> for LoadError {
    fn from(error: NetError) -> Self {
        if error.is_timeout() {
            Self::StrategyTimeout
        } else {
            Self::StrategyNetwork(error.to_string())
        }
    }
}

pub type LoadResult<T> = Result<T, LoadError>;
