use thiserror::Error;

#[derive(Error, Debug)]
pub enum TensorError {
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch { expected: Vec<usize>, got: Vec<usize> },
    #[error("local memory exhausted: requested {requested} bytes, {available} available")]
    LocalMemoryExhausted { requested: usize, available: usize },
    #[error("transfer {field} = {value} does not fit a 16-bit descriptor field")]
    TransferOverflow { field: &'static str, value: usize },
}

pub type Result<T> = std::result::Result<T, TensorError>;
