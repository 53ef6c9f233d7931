use crate::dtype::DType;
use crate::error::{Result, TensorError};
use crate::view::RegionMut;

/// Size in bytes of one transfer unit. Strided copy lengths and strides are
/// expressed in these units rather than in elements.
pub const DEFAULT_C0_SIZE: usize = 32;

/// Descriptor of a 2-D strided transfer out of a contiguous local tile.
///
/// The source is read as `block_count` blocks of `block_len` units, with
/// `src_stride` units skipped between blocks. Each block lands `dst_stride`
/// units after the end of the previous one in the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DataCopyParams {
    pub block_count: u16,
    pub block_len: u16,
    pub src_stride: u16,
    pub dst_stride: u16,
}

impl DataCopyParams {
    /// Parameters for scattering a dense `rows x cols` tile into a matrix
    /// whose rows are `dst_row_len` elements long.
    ///
    /// `cols` and `dst_row_len - cols` must both fill whole transfer units.
    /// Counts that do not fit the 16-bit descriptor fields are rejected.
    pub fn for_tile(
        rows: usize,
        cols: usize,
        dst_row_len: usize,
        dtype: DType,
    ) -> Result<Self> {
        let unit = dtype.elements_in(DEFAULT_C0_SIZE);
        Ok(DataCopyParams {
            block_count: field("block_count", rows)?,
            block_len: field("block_len", cols / unit)?,
            src_stride: 0,
            dst_stride: field("dst_stride", (dst_row_len - cols) / unit)?,
        })
    }
}

fn field(name: &'static str, value: usize) -> Result<u16> {
    u16::try_from(value).map_err(|_| TensorError::TransferOverflow { field: name, value })
}

/// A destination that can expose a contiguous run of elements at a flat
/// offset.
pub trait StridedDest {
    fn segment_mut(&mut self, offset: usize, len: usize) -> &mut [f32];
}

impl StridedDest for [f32] {
    fn segment_mut(&mut self, offset: usize, len: usize) -> &mut [f32] {
        &mut self[offset..offset + len]
    }
}

impl StridedDest for RegionMut<'_> {
    fn segment_mut(&mut self, offset: usize, len: usize) -> &mut [f32] {
        RegionMut::segment_mut(self, offset, len)
    }
}

/// Copy a local f32 tile to `dst` starting at flat element offset
/// `dst_offset`, following `params`.
pub fn data_copy<D: StridedDest + ?Sized>(
    dst: &mut D,
    dst_offset: usize,
    src: &[f32],
    params: &DataCopyParams,
) {
    let unit = DType::F32.elements_in(DEFAULT_C0_SIZE);
    let block = params.block_len as usize * unit;
    let src_step = block + params.src_stride as usize * unit;
    let dst_step = block + params.dst_stride as usize * unit;

    for i in 0..params.block_count as usize {
        let s = i * src_step;
        dst.segment_mut(dst_offset + i * dst_step, block)
            .copy_from_slice(&src[s..s + block]);
    }
}
