//! Fourier transforms of periodic AO pair products on the reciprocal grid.

mod analytic;
mod ft_loop;

pub use analytic::AnalyticFt;
pub use ft_loop::{block_size, FtBlock, FtLoop, MIN_BLKSIZE};

use nalgebra::Vector3;
use ndarray::ArrayViewMut3;

use crate::grid::ReciprocalGrid;

/// Source of AO-pair Fourier transforms.
///
/// For a momentum transfer `q` and ket k-points `kptjs`, implementors write
///
/// `out[k, p·nao+q', G-p0] = Σ_T exp(i kⱼ·T) ∫ χ_p(r) χ_q'(r-T) exp(-i(G+q)·r) dr`
///
/// for every G in `[p0, p1)`, real and imaginary parts separately. The bra
/// k-point of entry `k` is `kptjs[k] - q`. Outputs are overwritten.
pub trait AoPairFt {
    fn nao(&self) -> usize;

    fn grid(&self) -> &ReciprocalGrid;

    fn ft_aopair(
        &self,
        q: &Vector3<f64>,
        kptjs: &[Vector3<f64>],
        p0: usize,
        p1: usize,
        out_re: ArrayViewMut3<f64>,
        out_im: ArrayViewMut3<f64>,
    );
}
