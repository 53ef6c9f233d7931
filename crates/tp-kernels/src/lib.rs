//! `tp-kernels` - Partitioned, double-buffered compute kernels.
//!
//! Two kernels share one tiled streaming pipeline:
//! - [`softmax::SoftmaxKernel`]: block-local softmax over a large vector,
//!   computed as a reduce pass followed by a normalize pass
//! - [`matmul::MatmulReduceKernel`]: a blocked f16 matmul whose output tiles
//!   are scattered to C and folded into per-row sums
//!
//! Each unit owns a disjoint partition of the buffers ([`planner`]) and moves
//! tiles between bulk and local memory through bounded queues
//! ([`stager`]). [`launch`] runs all units of a grid in parallel.

pub mod error;
pub mod golden;
pub mod io;
pub mod launch;
pub mod matmul;
pub mod planner;
pub mod softmax;
pub mod stager;
pub mod tiling;

pub use error::{KernelError, Result};
pub use launch::{
    launch_matmul, launch_matmul_from_bytes, launch_softmax, launch_softmax_with_depth,
    UnitReport,
};
pub use matmul::{Activation, MatmulOptions, MatmulReduceKernel};
pub use softmax::SoftmaxKernel;
pub use tiling::{CubeTiling, SoftmaxTiling};
