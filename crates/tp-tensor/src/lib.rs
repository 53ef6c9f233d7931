//! `tp-tensor` - Local-memory primitives for tile-pipeline kernels.
//!
//! This crate provides:
//! - `LocalTile`, an exclusively owned fixed-size scratch buffer
//! - `Pipe`, the local-memory budget tiles and scratch buffers are carved from
//! - Strided views over bulk memory (`MatrixView`, `RegionMut`)
//! - A `VectorBackend` trait for per-tile compute, with a reference `CpuBackend`
//! - `DataCopyParams` strided transfers between local tiles and bulk memory
//! - Element type definitions (F32, F16)

pub mod backend;
pub mod copy;
pub mod cpu;
pub mod dtype;
pub mod error;
pub mod layout;
pub mod pipe;
pub mod tile;
pub mod view;

// Re-export primary types at the crate root for convenience.
pub use backend::VectorBackend;
pub use copy::{data_copy, DataCopyParams, StridedDest, DEFAULT_C0_SIZE};
pub use cpu::CpuBackend;
pub use dtype::{DType, Element};
pub use error::{Result, TensorError};
pub use layout::Layout;
pub use pipe::Pipe;
pub use tile::LocalTile;
pub use view::{MatrixView, RegionMut};
