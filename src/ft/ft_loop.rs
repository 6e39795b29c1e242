//! Block-wise streaming of AO-pair transforms over the reciprocal grid.

use log::trace;
use nalgebra::Vector3;
use ndarray::{s, Array3, ArrayView2};

use super::AoPairFt;
use crate::error::{JkError, Result};

/// Smallest block the streaming loops accept.
pub const MIN_BLKSIZE: usize = 16;

/// Number of grid points per block that fits in `max_memory` MB.
///
/// Each grid point costs 16·nao²·(nkpts+1) bytes: real and imaginary transforms
/// for every ket k-point plus one slot of scratch.
pub fn block_size(max_memory: f64, nao: usize, nkpts: usize, ngrids: usize) -> Result<usize> {
    let bytes_per_g = 16.0 * (nao * nao) as f64 * (nkpts + 1) as f64;
    let blksize = (max_memory.max(0.0) * 1e6 / bytes_per_g).floor() as usize;
    if blksize < MIN_BLKSIZE {
        return Err(JkError::InsufficientMemory {
            max_memory,
            required: MIN_BLKSIZE as f64 * bytes_per_g / 1e6,
        });
    }
    Ok(blksize.min(ngrids))
}

/// One k-point slice of a transformed block, shape (nao², p1-p0).
pub struct FtBlock<'b> {
    pub k: usize,
    pub p0: usize,
    pub p1: usize,
    pub re: ArrayView2<'b, f64>,
    pub im: ArrayView2<'b, f64>,
}

/// Lending cursor over grid blocks.
///
/// Blocks come in increasing G order; within a block the ket k-points come in
/// order. The transform of a block is computed once for all k-points into
/// buffers that are reused for the next block.
pub struct FtLoop<'a, P: AoPairFt + ?Sized> {
    ft: &'a P,
    q: Vector3<f64>,
    kptjs: &'a [Vector3<f64>],
    blksize: usize,
    p0: usize,
    p1: usize,
    next_k: usize,
    buf_re: Array3<f64>,
    buf_im: Array3<f64>,
}

impl<'a, P: AoPairFt + ?Sized> FtLoop<'a, P> {
    /// Cursor whose block length is derived from the memory ceiling.
    pub fn new(
        ft: &'a P,
        q: Vector3<f64>,
        kptjs: &'a [Vector3<f64>],
        max_memory: f64,
    ) -> Result<Self> {
        let blksize = block_size(max_memory, ft.nao(), kptjs.len(), ft.grid().ngrids())?;
        Ok(Self::with_blksize(ft, q, kptjs, blksize))
    }

    pub fn with_blksize(ft: &'a P, q: Vector3<f64>, kptjs: &'a [Vector3<f64>], blksize: usize) -> Self {
        let nao2 = ft.nao() * ft.nao();
        let blksize = blksize.max(1);
        Self {
            ft,
            q,
            kptjs,
            blksize,
            p0: 0,
            p1: 0,
            next_k: 0,
            buf_re: Array3::zeros((kptjs.len(), nao2, blksize)),
            buf_im: Array3::zeros((kptjs.len(), nao2, blksize)),
        }
    }

    pub fn blksize(&self) -> usize {
        self.blksize
    }

    pub fn next_block(&mut self) -> Option<FtBlock<'_>> {
        let nk = self.kptjs.len();
        if nk == 0 {
            return None;
        }
        if self.p1 == self.p0 || self.next_k == nk {
            let ngrids = self.ft.grid().ngrids();
            if self.p1 >= ngrids {
                return None;
            }
            self.p0 = self.p1;
            self.p1 = (self.p0 + self.blksize).min(ngrids);
            let n = self.p1 - self.p0;
            trace!("transforming grid block [{}, {})", self.p0, self.p1);
            self.ft.ft_aopair(
                &self.q,
                self.kptjs,
                self.p0,
                self.p1,
                self.buf_re.slice_mut(s![.., .., ..n]),
                self.buf_im.slice_mut(s![.., .., ..n]),
            );
            self.next_k = 0;
        }
        let k = self.next_k;
        self.next_k += 1;
        let n = self.p1 - self.p0;
        Some(FtBlock {
            k,
            p0: self.p0,
            p1: self.p1,
            re: self.buf_re.slice(s![k, .., ..n]),
            im: self.buf_im.slice(s![k, .., ..n]),
        })
    }
}
