//! Raw little-endian `.bin` buffers: no header, just packed elements.
//!
//! Inputs, outputs and tiling blobs are exchanged in this form. Reads go
//! through a memory map so large inputs are decoded without an extra copy
//! of the file.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use memmap2::Mmap;
use tp_tensor::Element;

use crate::error::{KernelError, Result};
use crate::tiling::CubeTiling;

/// Decode packed little-endian elements.
pub fn decode<T: Element>(bytes: &[u8]) -> Result<Vec<T>> {
    let size = T::DTYPE.size_in_bytes();
    if bytes.len() % size != 0 {
        return Err(KernelError::MisalignedBuffer {
            len: bytes.len(),
            dtype: T::DTYPE,
        });
    }
    Ok(bytes.chunks_exact(size).map(T::from_le_slice).collect())
}

/// Encode elements as packed little-endian bytes.
pub fn encode<T: Element>(values: &[T]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * T::DTYPE.size_in_bytes());
    for &v in values {
        v.write_le(&mut out);
    }
    out
}

fn map_file(path: &Path) -> Result<Option<Mmap>> {
    let file = File::open(path)?;
    // Zero-length files cannot be mapped on every platform.
    if file.metadata()?.len() == 0 {
        return Ok(None);
    }
    let mmap = unsafe { Mmap::map(&file)? };
    Ok(Some(mmap))
}

/// Read a whole `.bin` file as elements of `T`.
pub fn read_bin<T: Element>(path: &Path) -> Result<Vec<T>> {
    match map_file(path)? {
        Some(mmap) => decode(&mmap),
        None => Ok(Vec::new()),
    }
}

/// Write `values` to `path` as a `.bin` file, replacing any existing file.
pub fn write_bin<T: Element>(path: &Path, values: &[T]) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(&encode(values))?;
    Ok(())
}

/// Read a packed matmul tiling blob.
pub fn read_tiling(path: &Path) -> Result<CubeTiling> {
    let bytes = std::fs::read(path)?;
    CubeTiling::from_bytes(&bytes)
}
