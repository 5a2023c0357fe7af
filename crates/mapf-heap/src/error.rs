use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum HeapError {
    #[error("heap handle refers to an entry that is no longer enqueued")]
    StaleHandle,

    #[error("cannot merge heaps ordered in different directions")]
    DirectionMismatch,

    #[error("new key {requested} is greater than current key {current}")]
    KeyIncrease { current: f64, requested: f64 },
}

pub type HeapResult<T> = Result<T, HeapError>;
