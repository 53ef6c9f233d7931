use std::io::Read;

use crate::error::{KernelError, Result};

/// Number of 32-bit words in the serialized descriptor.
pub const CUBE_TILING_WORDS: usize = 23;

/// Serialized size of [`CubeTiling`] in bytes.
pub const CUBE_TILING_SIZE: usize = CUBE_TILING_WORDS * 4;

/// Matmul tiling descriptor for the fused matmul-reduction kernel.
///
/// The host hands the kernel this block as raw bytes: a fixed sequence of
/// little-endian 32-bit words in field declaration order. The kernel copies
/// it field by field and trusts it completely; there is no version tag and no
/// validation, so producer and consumer must agree on the exact layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CubeTiling {
    pub used_core_num: u32,
    /// Rows of A and C.
    pub m: u32,
    /// Columns of B and C.
    pub n: u32,
    /// Columns of A (row pitch of A).
    pub ka: u32,
    /// Rows of B.
    pub kb: u32,
    pub single_core_m: u32,
    pub single_core_n: u32,
    pub single_core_k: u32,
    pub base_m: u32,
    pub base_n: u32,
    pub base_k: u32,
    pub depth_a1: u32,
    pub depth_b1: u32,
    pub step_m: u32,
    pub step_n: u32,
    /// Non-zero when a bias row is added to every output row.
    pub is_bias: u32,
    pub trans_length: u32,
    pub iterate_order: u32,
    pub step_ka: u32,
    pub step_kb: u32,
    pub db_l0a: u32,
    pub db_l0b: u32,
    pub db_l0c: u32,
}

impl CubeTiling {
    /// A descriptor for `C[m x n] = A[m x k] @ B[k x n]` split into
    /// `single_core_m x single_core_n` unit blocks and
    /// `base_m x base_n x base_k` base tiles.
    ///
    /// This only fills fields in; it does not search for good tile sizes.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        m: u32,
        n: u32,
        k: u32,
        single_core_m: u32,
        single_core_n: u32,
        base_m: u32,
        base_n: u32,
        base_k: u32,
    ) -> Self {
        let mut tiling = CubeTiling {
            m,
            n,
            ka: k,
            kb: k,
            single_core_m,
            single_core_n,
            single_core_k: k,
            base_m,
            base_n,
            base_k,
            depth_a1: 1,
            depth_b1: 1,
            step_m: 1,
            step_n: 1,
            step_ka: 1,
            step_kb: 1,
            db_l0a: 2,
            db_l0b: 2,
            db_l0c: 1,
            ..CubeTiling::default()
        };
        tiling.used_core_num = tiling.unit_count() as u32;
        tiling
    }

    /// Copy the descriptor from the start of a reader, one word at a time.
    pub fn from_reader(reader: &mut impl Read) -> Result<CubeTiling> {
        let mut words = [0u32; CUBE_TILING_WORDS];
        let mut buf4 = [0u8; 4];
        for word in words.iter_mut() {
            reader.read_exact(&mut buf4)?;
            *word = u32::from_le_bytes(buf4);
        }
        Ok(CubeTiling::from_words(words))
    }

    /// Copy the descriptor out of a raw tiling blob. Trailing bytes are
    /// ignored.
    pub fn from_bytes(bytes: &[u8]) -> Result<CubeTiling> {
        if bytes.len() < CUBE_TILING_SIZE {
            return Err(KernelError::TilingTruncated {
                expected: CUBE_TILING_SIZE,
                got: bytes.len(),
            });
        }
        let mut reader = bytes;
        CubeTiling::from_reader(&mut reader)
    }

    /// Serialize in the layout [`CubeTiling::from_bytes`] expects.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_words()
            .iter()
            .flat_map(|w| w.to_le_bytes())
            .collect()
    }

    fn from_words(w: [u32; CUBE_TILING_WORDS]) -> Self {
        CubeTiling {
            used_core_num: w[0],
            m: w[1],
            n: w[2],
            ka: w[3],
            kb: w[4],
            single_core_m: w[5],
            single_core_n: w[6],
            single_core_k: w[7],
            base_m: w[8],
            base_n: w[9],
            base_k: w[10],
            depth_a1: w[11],
            depth_b1: w[12],
            step_m: w[13],
            step_n: w[14],
            is_bias: w[15],
            trans_length: w[16],
            iterate_order: w[17],
            step_ka: w[18],
            step_kb: w[19],
            db_l0a: w[20],
            db_l0b: w[21],
            db_l0c: w[22],
        }
    }

    fn to_words(&self) -> [u32; CUBE_TILING_WORDS] {
        [
            self.used_core_num,
            self.m,
            self.n,
            self.ka,
            self.kb,
            self.single_core_m,
            self.single_core_n,
            self.single_core_k,
            self.base_m,
            self.base_n,
            self.base_k,
            self.depth_a1,
            self.depth_b1,
            self.step_m,
            self.step_n,
            self.is_bias,
            self.trans_length,
            self.iterate_order,
            self.step_ka,
            self.step_kb,
            self.db_l0a,
            self.db_l0b,
            self.db_l0c,
        ]
    }

    /// Unit blocks along M, rounded up.
    pub fn row_blocks(&self) -> usize {
        (self.m as usize).div_ceil(self.single_core_m as usize)
    }

    /// Unit blocks along N.
    pub fn col_blocks(&self) -> usize {
        (self.n as usize).div_ceil(self.single_core_n as usize)
    }

    /// Units needed to cover C.
    pub fn unit_count(&self) -> usize {
        self.row_blocks() * self.col_blocks()
    }

    /// Base tiles along M inside one unit block.
    pub fn round_m(&self) -> usize {
        (self.single_core_m / self.base_m) as usize
    }

    /// Base tiles along N inside one unit block; also the number of tiles
    /// that make up one full row-block of output.
    pub fn round_n(&self) -> usize {
        (self.single_core_n / self.base_n) as usize
    }

    /// Elements in one base output tile.
    pub fn base_tile_len(&self) -> usize {
        (self.base_m * self.base_n) as usize
    }

    pub fn has_bias(&self) -> bool {
        self.is_bias != 0
    }
}
