use thiserror::Error;

use tp_tensor::DType;

#[derive(Error, Debug)]
pub enum KernelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("tiling data truncated: expected {expected} bytes, got {got}")]
    TilingTruncated { expected: usize, got: usize },
    #[error("{what} = {value} is not a multiple of {divisor}")]
    NotDivisible {
        what: &'static str,
        value: usize,
        divisor: usize,
    },
    #[error("raw buffer of {len} bytes is not a whole number of {dtype} elements")]
    MisalignedBuffer { len: usize, dtype: DType },
    #[error("{what} holds {got} elements, expected {expected}")]
    BufferLength {
        what: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("tile queue depth must be at least 1")]
    ZeroDepth,
    #[error("pipeline stage disconnected: {0}")]
    PipelineClosed(&'static str),
    #[error("tensor error: {0}")]
    Tensor(#[from] tp_tensor::TensorError),
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, KernelError>;
