use tp_tensor::{LocalTile, Pipe, VectorBackend};

use crate::error::Result;
use crate::stager::{Span, TileStager};
use crate::tiling::SoftmaxTiling;

/// Block-local softmax of one unit.
///
/// For the unit's block `x` the kernel writes
/// `z[i] = exp(x[i]) / sum_j exp(x[j])` in two streamed passes:
///
/// 1. every tile is exponentiated, added into a tile-sized accumulator and
///    written to `z`, which doubles as scratch for the intermediates;
/// 2. the accumulator is tree-reduced to the block denominator, and every
///    tile of `z` is read back, divided and written in place.
///
/// The maximum is not subtracted before exponentiating, so inputs above
/// roughly 88 overflow to `inf` and the block turns into `nan`. The
/// denominator covers this block only; other units are never consulted.
#[derive(Debug)]
pub struct SoftmaxKernel<'b> {
    tiling: SoftmaxTiling,
    backend: &'b dyn VectorBackend,
    stager: TileStager,
    acc: LocalTile,
}

impl<'b> SoftmaxKernel<'b> {
    /// Set up a unit with `tiling.buffer_num` slots per queue.
    pub fn new(tiling: SoftmaxTiling, backend: &'b dyn VectorBackend) -> Result<Self> {
        Self::with_queue_depth(tiling, backend, tiling.buffer_num)
    }

    /// Set up a unit with an explicit queue depth. Tile sizes still follow
    /// `tiling`; depth 1 runs the same tiles single-buffered.
    pub fn with_queue_depth(
        tiling: SoftmaxTiling,
        backend: &'b dyn VectorBackend,
        depth: usize,
    ) -> Result<Self> {
        let mut pipe = Pipe::default();
        let stager = TileStager::new(&mut pipe, depth, tiling.tile_length())?;
        let acc = pipe.init_buffer(tiling.tile_length())?;
        Ok(SoftmaxKernel {
            tiling,
            backend,
            stager,
            acc,
        })
    }

    pub fn tiling(&self) -> &SoftmaxTiling {
        &self.tiling
    }

    /// Run both passes over one unit block and return its denominator.
    ///
    /// `x` and `z` are the unit's `block_length` elements of the input and
    /// output buffers.
    pub fn process(&mut self, x: &[f32], z: &mut [f32]) -> Result<f32> {
        let SoftmaxKernel {
            tiling,
            backend,
            stager,
            acc,
        } = self;
        let backend: &dyn VectorBackend = *backend;
        let tile = tiling.tile_length();

        backend.duplicate(acc, 0.0);
        let spans = x
            .chunks_exact(tile)
            .zip(z.chunks_exact_mut(tile))
            .map(|(src, dst)| Span::Copy { src, dst });
        stager.stream(spans, |x_local, z_local| {
            backend.exp(z_local, x_local);
            backend.add_assign(acc, z_local);
            Ok(())
        })?;

        let denominator = backend.reduce_sum(acc);
        backend.duplicate(acc, denominator);

        let den: &[f32] = acc;
        stager.stream(z.chunks_exact_mut(tile).map(Span::InPlace), |e_local, z_local| {
            backend.div(z_local, e_local, den);
            Ok(())
        })?;

        Ok(denominator)
    }
}
