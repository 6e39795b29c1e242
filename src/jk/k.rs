use log::{debug, info, trace};
use nalgebra::Vector3;
use ndarray::linalg::general_mat_mul;
use ndarray::{s, Array1, Array4, ArrayView1, ArrayView2, ArrayViewMut2};

use super::{AftJk, Hermi, NumericPath};
use crate::coulomb::{CoulombKernel, ExxDiv};
use crate::error::Result;
use crate::ewald::ewald_exxdiv_for_g0;
use crate::ft::{AoPairFt, FtBlock, FtLoop};
use crate::kconserv::KkTable;
use crate::kpts::{is_zero, same_kpts};
use crate::matrices::KMatrices;
use crate::utils::Timer;
use crate::zdot::{zdot_cn, zdot_nc, zdot_nn};

/// Reused buffers of one exchange stream.
///
/// `plq` holds pLq[p, G, q] = pqk[p·nao+q, G]·sqrt(v(G)) in row-major order, so it
/// reads as either (nao·n, nao) or (nao, n·nao). `ilk` is the intermediate of the
/// same size.
pub(super) struct ExchangeScratch {
    nao: usize,
    n: usize,
    plq_re: Vec<f64>,
    plq_im: Vec<f64>,
    ilk_re: Vec<f64>,
    ilk_im: Vec<f64>,
}

impl ExchangeScratch {
    pub(super) fn new(nao: usize, blksize: usize) -> Self {
        let len = nao * blksize * nao;
        Self {
            nao,
            n: 0,
            plq_re: vec![0.0; len],
            plq_im: vec![0.0; len],
            ilk_re: vec![0.0; len],
            ilk_im: vec![0.0; len],
        }
    }

    fn len(&self) -> usize {
        self.nao * self.n * self.nao
    }

    /// Transpose one block into pLq and scale by the square root of the kernel.
    pub(super) fn load(&mut self, block: &FtBlock, sqrt_coul_g: &ArrayView1<f64>) {
        let nao = self.nao;
        let n = block.p1 - block.p0;
        self.n = n;
        for p in 0..nao {
            for q in 0..nao {
                let pq = p * nao + q;
                for g in 0..n {
                    let c = sqrt_coul_g[g];
                    let idx = (p * n + g) * nao + q;
                    self.plq_re[idx] = block.re[[pq, g]] * c;
                    self.plq_im[idx] = block.im[[pq, g]] * c;
                }
            }
        }
    }

    /// vk += (pLq·D)·pLqᴴ with pLq read as (nao·n, nao) and then (nao, n·nao).
    pub(super) fn add_direct(
        &mut self,
        d_re: &ArrayView2<f64>,
        d_im: &ArrayView2<f64>,
        vk_re: &mut ArrayViewMut2<f64>,
        vk_im: &mut ArrayViewMut2<f64>,
    ) -> Result<()> {
        let (nao, n, len) = (self.nao, self.n, self.len());
        {
            let plq_re = ArrayView2::from_shape((nao * n, nao), &self.plq_re[..len])?;
            let plq_im = ArrayView2::from_shape((nao * n, nao), &self.plq_im[..len])?;
            let mut ilk_re = ArrayViewMut2::from_shape((nao * n, nao), &mut self.ilk_re[..len])?;
            let mut ilk_im = ArrayViewMut2::from_shape((nao * n, nao), &mut self.ilk_im[..len])?;
            zdot_nn(1.0, &plq_re, &plq_im, d_re, d_im, 0.0, &mut ilk_re, &mut ilk_im);
        }
        let plq_re = ArrayView2::from_shape((nao, n * nao), &self.plq_re[..len])?;
        let plq_im = ArrayView2::from_shape((nao, n * nao), &self.plq_im[..len])?;
        let ilk_re = ArrayView2::from_shape((nao, n * nao), &self.ilk_re[..len])?;
        let ilk_im = ArrayView2::from_shape((nao, n * nao), &self.ilk_im[..len])?;
        zdot_nc(1.0, &ilk_re, &ilk_im, &plq_re.t(), &plq_im.t(), 1.0, vk_re, vk_im);
        Ok(())
    }

    /// Mirrored pair: vk += pLqᴴ·(D·pLq) with pLq read as (nao, n·nao) and then (nao·n, nao).
    pub(super) fn add_swapped(
        &mut self,
        d_re: &ArrayView2<f64>,
        d_im: &ArrayView2<f64>,
        vk_re: &mut ArrayViewMut2<f64>,
        vk_im: &mut ArrayViewMut2<f64>,
    ) -> Result<()> {
        let (nao, n, len) = (self.nao, self.n, self.len());
        {
            let plq_re = ArrayView2::from_shape((nao, n * nao), &self.plq_re[..len])?;
            let plq_im = ArrayView2::from_shape((nao, n * nao), &self.plq_im[..len])?;
            let mut ilk_re = ArrayViewMut2::from_shape((nao, n * nao), &mut self.ilk_re[..len])?;
            let mut ilk_im = ArrayViewMut2::from_shape((nao, n * nao), &mut self.ilk_im[..len])?;
            zdot_nn(1.0, d_re, d_im, &plq_re, &plq_im, 0.0, &mut ilk_re, &mut ilk_im);
        }
        let plq_re = ArrayView2::from_shape((nao * n, nao), &self.plq_re[..len])?;
        let plq_im = ArrayView2::from_shape((nao * n, nao), &self.plq_im[..len])?;
        let ilk_re = ArrayView2::from_shape((nao * n, nao), &self.ilk_re[..len])?;
        let ilk_im = ArrayView2::from_shape((nao * n, nao), &self.ilk_im[..len])?;
        zdot_cn(1.0, &plq_re.t(), &plq_im.t(), &ilk_re, &ilk_im, 1.0, vk_re, vk_im);
        Ok(())
    }

    /// Real density at Γ: vk += (pLqR·D)·pLqRᵀ + (pLqI·D)·pLqIᵀ.
    pub(super) fn add_direct_real(
        &mut self,
        d_re: &ArrayView2<f64>,
        vk_re: &mut ArrayViewMut2<f64>,
    ) -> Result<()> {
        let (nao, n, len) = (self.nao, self.n, self.len());
        for part in 0..2 {
            let plq = if part == 0 { &self.plq_re } else { &self.plq_im };
            {
                let tall = ArrayView2::from_shape((nao * n, nao), &plq[..len])?;
                let mut ilk = ArrayViewMut2::from_shape((nao * n, nao), &mut self.ilk_re[..len])?;
                general_mat_mul(1.0, &tall, d_re, 0.0, &mut ilk);
            }
            let wide = ArrayView2::from_shape((nao, n * nao), &plq[..len])?;
            let ilk = ArrayView2::from_shape((nao, n * nao), &self.ilk_re[..len])?;
            general_mat_mul(1.0, &ilk, &wide.t(), 1.0, vk_re);
        }
        Ok(())
    }
}

impl<'a, P: AoPairFt> AftJk<'a, P> {
    /// Exchange matrices at `kpts_band` (default `kpts`) for densities sampled at `kpts`.
    ///
    /// Pairs of k-points are grouped by momentum transfer; when the band set is the
    /// sampling set each pair with q ≠ 0 also fills its mirror.
    pub fn get_k_kpts(
        &self,
        dm: &KMatrices,
        hermi: Hermi,
        kpts: &[Vector3<f64>],
        kpts_band: Option<&[Vector3<f64>]>,
        exxdiv: Option<&str>,
    ) -> Result<KMatrices> {
        let timer = Timer::start();
        let exxdiv = ExxDiv::parse(exxdiv)?;
        self.check_exxdiv(exxdiv)?;
        self.check_density(dm, kpts)?;
        self.log_hermi(hermi);

        let swap_2e = match kpts_band {
            None => true,
            Some(band) => same_kpts(band, kpts),
        };
        let kpts_band = kpts_band.unwrap_or(kpts);
        let path = NumericPath::for_k(kpts, kpts_band, dm);
        let (nset, nkpts, nao, _) = dm.dim();
        let nband = kpts_band.len();

        let kernel = CoulombKernel::new(self.cell, self.ft.grid(), kpts, exxdiv);
        let (dm_re, dm_im) = dm.split();
        let mut vk_re = Array4::<f64>::zeros((nset, nband, nao, nao));
        let mut vk_im = Array4::<f64>::zeros((nset, nband, nao, nao));
        debug!(
            "get_k_kpts: {:?} path, nset = {}, nkpts = {}, nband = {}, swap_2e = {}, exxdiv = {:?}",
            path, nset, nkpts, nband, swap_2e, exxdiv
        );

        let mut table = KkTable::new(kpts_band, kpts, swap_2e);
        while let Some(q) = table.next_shift() {
            let jobs = table.resolve(&q);
            let mirror = table.swap_2e() && !is_zero(&q);
            let kptjs: Vec<Vector3<f64>> = jobs.iter().map(|&(_, kj)| kpts[kj]).collect();
            let sqrt_coul_g: Array1<f64> = kernel.weighted_coul_g(&q, true).mapv(f64::sqrt);

            let njobs = jobs.len();
            let budget = self.max_memory * (njobs + 1) as f64 / (njobs + 5) as f64;
            let mut cursor = FtLoop::new(&self.ft, q, &kptjs, budget)?;
            debug!(
                "q = {:?}: {} pairs, budget = {:.1} MB, blksize = {}",
                q.as_slice(),
                njobs,
                budget,
                cursor.blksize()
            );
            let mut scratch = ExchangeScratch::new(nao, cursor.blksize());

            while let Some(block) = cursor.next_block() {
                let (ki, kj) = jobs[block.k];
                trace!("pair ({}, {}) grid [{}, {})", ki, kj, block.p0, block.p1);
                scratch.load(&block, &sqrt_coul_g.slice(s![block.p0..block.p1]));
                for i in 0..nset {
                    match path {
                        NumericPath::Real => {
                            scratch.add_direct_real(
                                &dm_re.slice(s![i, kj, .., ..]),
                                &mut vk_re.slice_mut(s![i, ki, .., ..]),
                            )?;
                        }
                        NumericPath::Complex => {
                            scratch.add_direct(
                                &dm_re.slice(s![i, kj, .., ..]),
                                &dm_im.slice(s![i, kj, .., ..]),
                                &mut vk_re.slice_mut(s![i, ki, .., ..]),
                                &mut vk_im.slice_mut(s![i, ki, .., ..]),
                            )?;
                            if mirror {
                                scratch.add_swapped(
                                    &dm_re.slice(s![i, ki, .., ..]),
                                    &dm_im.slice(s![i, ki, .., ..]),
                                    &mut vk_re.slice_mut(s![i, kj, .., ..]),
                                    &mut vk_im.slice_mut(s![i, kj, .., ..]),
                                )?;
                            }
                        }
                    }
                }
            }
        }

        let scale = 1.0 / nkpts as f64;
        vk_re.mapv_inplace(|x| x * scale);
        let mut vk = match path {
            NumericPath::Real => KMatrices::from_split(vk_re, None),
            NumericPath::Complex => {
                vk_im.mapv_inplace(|x| x * scale);
                KMatrices::from_split(vk_re, Some(vk_im))
            }
        };

        if self.cell.dimension < 3 {
            if let Some(madelung) = kernel.madelung() {
                let ovlp = self.g0_overlap(kpts_band);
                ewald_exxdiv_for_g0(madelung, kpts, kpts_band, &ovlp, dm, &mut vk);
            }
        }
        info!("{:>40} {}", "get_k_kpts:", timer);
        Ok(vk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::Array2;
    use num_complex::Complex64;

    fn random_block(nao: usize, n: usize, seed: f64) -> (Array2<f64>, Array2<f64>) {
        let re = Array2::from_shape_fn((nao * nao, n), |(a, g)| ((a * 7 + g * 3) as f64 * seed).sin());
        let im = Array2::from_shape_fn((nao * nao, n), |(a, g)| ((a * 5 + g * 11) as f64 * seed).cos());
        (re, im)
    }

    #[test]
    fn test_scratch_contractions_match_explicit_sums() {
        let (nao, n) = (3, 4);
        let (re, im) = random_block(nao, n, 0.37);
        let block = FtBlock {
            k: 0,
            p0: 0,
            p1: n,
            re: re.view(),
            im: im.view(),
        };
        let c = Array1::from_vec(vec![1.0, 0.5, 2.0, 0.25]);
        let mut scratch = ExchangeScratch::new(nao, 8);
        scratch.load(&block, &c.view());

        let d_re = Array2::from_shape_fn((nao, nao), |(p, q)| 0.1 * (p + 2 * q) as f64);
        let d_im = Array2::from_shape_fn((nao, nao), |(p, q)| 0.05 * (p as f64 - q as f64));

        let mut vk_re = Array2::zeros((nao, nao));
        let mut vk_im = Array2::zeros((nao, nao));
        scratch
            .add_direct(&d_re.view(), &d_im.view(), &mut vk_re.view_mut(), &mut vk_im.view_mut())
            .unwrap();
        let mut vs_re = Array2::zeros((nao, nao));
        let mut vs_im = Array2::zeros((nao, nao));
        scratch
            .add_swapped(&d_re.view(), &d_im.view(), &mut vs_re.view_mut(), &mut vs_im.view_mut())
            .unwrap();

        let pqk = |p: usize, q: usize, g: usize| {
            Complex64::new(re[[p * nao + q, g]], im[[p * nao + q, g]]) * c[g]
        };
        let d = |p: usize, q: usize| Complex64::new(d_re[[p, q]], d_im[[p, q]]);
        for p in 0..nao {
            for r in 0..nao {
                let mut direct = Complex64::new(0.0, 0.0);
                let mut swapped = Complex64::new(0.0, 0.0);
                for g in 0..n {
                    for a in 0..nao {
                        for b in 0..nao {
                            direct += pqk(p, a, g) * d(a, b) * pqk(r, b, g).conj();
                            swapped += pqk(a, p, g).conj() * d(a, b) * pqk(b, r, g);
                        }
                    }
                }
                assert_abs_diff_eq!(vk_re[[p, r]], direct.re, epsilon = 1e-10);
                assert_abs_diff_eq!(vk_im[[p, r]], direct.im, epsilon = 1e-10);
                assert_abs_diff_eq!(vs_re[[p, r]], swapped.re, epsilon = 1e-10);
                assert_abs_diff_eq!(vs_im[[p, r]], swapped.im, epsilon = 1e-10);
            }
        }

        // real path agrees with the real part of the complex one for a real density
        let zero = Array2::zeros((nao, nao));
        let mut vc_re = Array2::zeros((nao, nao));
        let mut vc_im = Array2::zeros((nao, nao));
        scratch
            .add_direct(&d_re.view(), &zero.view(), &mut vc_re.view_mut(), &mut vc_im.view_mut())
            .unwrap();
        let mut vr = Array2::zeros((nao, nao));
        scratch.add_direct_real(&d_re.view(), &mut vr.view_mut()).unwrap();
        for (a, b) in vr.iter().zip(vc_re.iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-12);
        }
    }
}
