use thiserror::Error;

/// Failure taxonomy for the monitor core.
///
/// `Rpc` is transient (skip the item or cycle and retry on the next poll),
/// `Decode` means one extraction path gave up (the other path is tried before
/// the transaction is treated as a non-outflow), `Delivery` and `Persistence`
/// are logged at the loop boundary and never abort the process.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("rpc error: {0}")]
    Rpc(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("alert delivery error: {0}")]
    Delivery(String),
    #[error("persistence error: {0}")]
    Persistence(#[from] rusqlite::Error),
}

impl From<reqwest::Error> for MonitorError {
    fn from(value: reqwest::Error) -> Self {
        Self::Rpc(value.to_string())
    }
}
