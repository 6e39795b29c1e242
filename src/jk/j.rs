use log::{debug, info};
use nalgebra::Vector3;
use ndarray::linalg::general_mat_vec_mul;
use ndarray::{s, Array1, Array2, Array3, ArrayView1, ArrayViewMut1, Zip};

use super::{AftJk, Hermi, NumericPath};
use crate::coulomb::{CoulombKernel, ExxDiv};
use crate::error::Result;
use crate::ft::{AoPairFt, FtBlock, FtLoop};
use crate::matrices::KMatrices;
use crate::utils::Timer;

/// ρ(G) = Σ_pq D_pq · conj(pqk_pq(G)) for one block, written into `rho_re`/`rho_im`.
pub(super) fn block_density(
    block: &FtBlock,
    d_re: &ArrayView1<f64>,
    d_im: &ArrayView1<f64>,
    rho_re: &mut ArrayViewMut1<f64>,
    rho_im: &mut ArrayViewMut1<f64>,
) {
    general_mat_vec_mul(1.0, &block.re.t(), d_re, 0.0, rho_re);
    general_mat_vec_mul(1.0, &block.im.t(), d_im, 1.0, rho_re);
    general_mat_vec_mul(1.0, &block.re.t(), d_im, 0.0, rho_im);
    general_mat_vec_mul(-1.0, &block.im.t(), d_re, 1.0, rho_im);
}

/// vj_pq += Σ_G pqk_pq(G) · v(G); the imaginary part only on the complex path.
pub(super) fn block_potential(
    block: &FtBlock,
    v_re: &ArrayView1<f64>,
    v_im: &ArrayView1<f64>,
    vj_re: &mut ArrayViewMut1<f64>,
    vj_im: Option<&mut ArrayViewMut1<f64>>,
) {
    general_mat_vec_mul(1.0, &block.re, v_re, 1.0, vj_re);
    general_mat_vec_mul(-1.0, &block.im, v_im, 1.0, vj_re);
    if let Some(vj_im) = vj_im {
        general_mat_vec_mul(1.0, &block.im, v_re, 1.0, vj_im);
        general_mat_vec_mul(1.0, &block.re, v_im, 1.0, vj_im);
    }
}

impl<'a, P: AoPairFt> AftJk<'a, P> {
    /// Coulomb matrices at `kpts_band` (default `kpts`) for densities sampled at `kpts`.
    ///
    /// The density response is accumulated over all sampling k-points first, then
    /// contracted with the band-point transforms.
    pub fn get_j_kpts(
        &self,
        dm: &KMatrices,
        hermi: Hermi,
        kpts: &[Vector3<f64>],
        kpts_band: Option<&[Vector3<f64>]>,
    ) -> Result<KMatrices> {
        let timer = Timer::start();
        self.check_density(dm, kpts)?;
        self.log_hermi(hermi);
        let kpts_band = kpts_band.unwrap_or(kpts);
        let path = NumericPath::for_j(kpts_band, dm);

        let (nset, nkpts, nao, _) = dm.dim();
        let nao2 = nao * nao;
        let nband = kpts_band.len();
        let ngrids = self.ft.grid().ngrids();
        let q = Vector3::zeros();

        let kernel = CoulombKernel::new(self.cell, self.ft.grid(), kpts, ExxDiv::None);
        let coul_g = kernel.weighted_coul_g(&q, false);

        let (dm_re, dm_im) = dm.split();
        let dm_re = dm_re.into_shape((nset, nkpts, nao2))?;
        let dm_im = dm_im.into_shape((nset, nkpts, nao2))?;

        let mut v_re = Array2::<f64>::zeros((nset, ngrids));
        let mut v_im = Array2::<f64>::zeros((nset, ngrids));
        let mut cursor = FtLoop::new(&self.ft, q, kpts, self.max_memory)?;
        debug!(
            "get_j_kpts: {:?} path, nset = {}, nkpts = {}, nband = {}, blksize = {}",
            path,
            nset,
            nkpts,
            nband,
            cursor.blksize()
        );
        let mut rho_re = Array1::<f64>::zeros(cursor.blksize());
        let mut rho_im = Array1::<f64>::zeros(cursor.blksize());
        let scale = 1.0 / nkpts as f64;
        while let Some(block) = cursor.next_block() {
            let (p0, p1) = (block.p0, block.p1);
            let n = p1 - p0;
            for i in 0..nset {
                let mut r_re = rho_re.slice_mut(s![..n]);
                let mut r_im = rho_im.slice_mut(s![..n]);
                block_density(
                    &block,
                    &dm_re.slice(s![i, block.k, ..]),
                    &dm_im.slice(s![i, block.k, ..]),
                    &mut r_re,
                    &mut r_im,
                );
                Zip::from(v_re.slice_mut(s![i, p0..p1]))
                    .and(v_im.slice_mut(s![i, p0..p1]))
                    .and(&r_re)
                    .and(&r_im)
                    .and(coul_g.slice(s![p0..p1]))
                    .for_each(|vr, vi, &rr, &ri, &c| {
                        *vr += rr * c * scale;
                        *vi += ri * c * scale;
                    });
            }
        }

        let mut vj_re = Array3::<f64>::zeros((nset, nband, nao2));
        let mut vj_im = match path {
            NumericPath::Real => None,
            NumericPath::Complex => Some(Array3::<f64>::zeros((nset, nband, nao2))),
        };
        let mut cursor = FtLoop::new(&self.ft, q, kpts_band, self.max_memory)?;
        while let Some(block) = cursor.next_block() {
            let (p0, p1, kb) = (block.p0, block.p1, block.k);
            for i in 0..nset {
                let mut out_im = vj_im.as_mut().map(|m| m.slice_mut(s![i, kb, ..]));
                block_potential(
                    &block,
                    &v_re.slice(s![i, p0..p1]),
                    &v_im.slice(s![i, p0..p1]),
                    &mut vj_re.slice_mut(s![i, kb, ..]),
                    out_im.as_mut(),
                );
            }
        }

        let vj_re = vj_re.into_shape((nset, nband, nao, nao))?;
        let vj_im = match vj_im {
            Some(m) => Some(m.into_shape((nset, nband, nao, nao))?),
            None => None,
        };
        info!("{:>40} {}", "get_j_kpts:", timer);
        Ok(KMatrices::from_split(vj_re, vj_im))
    }
}
