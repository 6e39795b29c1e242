use log::{debug, info};
use nalgebra::Vector3;
use ndarray::{s, Array1, Array2, Array4, Zip};

use super::j::{block_density, block_potential};
use super::k::ExchangeScratch;
use super::{AftJk, Hermi, NumericPath};
use crate::coulomb::{CoulombKernel, ExxDiv};
use crate::error::{JkError, Result};
use crate::ewald::ewald_exxdiv_for_g0;
use crate::ft::{AoPairFt, FtLoop};
use crate::kpts::is_zero;
use crate::matrices::KMatrices;
use crate::utils::Timer;

impl<'a, P: AoPairFt> AftJk<'a, P> {
    /// J and/or K at a single k-point.
    ///
    /// When `kpt_band` is a different point the k-point builders are used.
    /// Otherwise one pass over the grid serves both matrices: J needs only the
    /// block-local density response because there is a single sampling point.
    #[allow(clippy::too_many_arguments)]
    pub fn get_jk(
        &self,
        dm: &KMatrices,
        hermi: Hermi,
        kpt: Vector3<f64>,
        kpt_band: Option<Vector3<f64>>,
        with_j: bool,
        with_k: bool,
        exxdiv: Option<&str>,
    ) -> Result<(Option<KMatrices>, Option<KMatrices>)> {
        if !with_j && !with_k {
            return Err(JkError::NothingRequested);
        }
        if let Some(band) = kpt_band {
            if !is_zero(&(band - kpt)) {
                return self.get_jk_kpts(dm, hermi, &[kpt], Some(&[band][..]), with_j, with_k, exxdiv);
            }
        }

        let timer = Timer::start();
        let exxdiv = if with_k {
            let exxdiv = ExxDiv::parse(exxdiv)?;
            self.check_exxdiv(exxdiv)?;
            exxdiv
        } else {
            ExxDiv::None
        };
        let kpts = [kpt];
        self.check_density(dm, &kpts)?;
        self.log_hermi(hermi);

        let path = NumericPath::for_k(&kpts, &kpts, dm);
        let (nset, _, nao, _) = dm.dim();
        let nao2 = nao * nao;
        let q = Vector3::zeros();

        let kernel = CoulombKernel::new(self.cell, self.ft.grid(), &kpts, exxdiv);
        let coul_g = kernel.weighted_coul_g(&q, false);
        let sqrt_coul_g = kernel.weighted_coul_g(&q, true).mapv(f64::sqrt);

        let (dm_re, dm_im) = dm.split();
        let dm_flat_re = dm_re.view().into_shape((nset, nao2))?;
        let dm_flat_im = dm_im.view().into_shape((nset, nao2))?;

        let budget = self.max_memory * 2.0 / 6.0;
        let mut cursor = FtLoop::new(&self.ft, q, &kpts, budget)?;
        let blksize = cursor.blksize();
        debug!(
            "get_jk: {:?} path, nset = {}, with_j = {}, with_k = {}, blksize = {}",
            path, nset, with_j, with_k, blksize
        );

        let mut vj_re = Array2::<f64>::zeros((nset, nao2));
        let mut vj_im = match path {
            NumericPath::Real => None,
            NumericPath::Complex => Some(Array2::<f64>::zeros((nset, nao2))),
        };
        let mut vk_re = Array4::<f64>::zeros((nset, 1, nao, nao));
        let mut vk_im = Array4::<f64>::zeros((nset, 1, nao, nao));
        let mut rho_re = Array1::<f64>::zeros(blksize);
        let mut rho_im = Array1::<f64>::zeros(blksize);
        let mut scratch = ExchangeScratch::new(nao, if with_k { blksize } else { 0 });

        while let Some(block) = cursor.next_block() {
            let (p0, p1) = (block.p0, block.p1);
            let n = p1 - p0;
            if with_j {
                for i in 0..nset {
                    let mut r_re = rho_re.slice_mut(s![..n]);
                    let mut r_im = rho_im.slice_mut(s![..n]);
                    block_density(
                        &block,
                        &dm_flat_re.slice(s![i, ..]),
                        &dm_flat_im.slice(s![i, ..]),
                        &mut r_re,
                        &mut r_im,
                    );
                    Zip::from(&mut r_re)
                        .and(&mut r_im)
                        .and(coul_g.slice(s![p0..p1]))
                        .for_each(|rr, ri, &c| {
                            *rr *= c;
                            *ri *= c;
                        });
                    let mut out_im = vj_im.as_mut().map(|m| m.slice_mut(s![i, ..]));
                    block_potential(
                        &block,
                        &r_re.view(),
                        &r_im.view(),
                        &mut vj_re.slice_mut(s![i, ..]),
                        out_im.as_mut(),
                    );
                }
            }
            if with_k {
                scratch.load(&block, &sqrt_coul_g.slice(s![p0..p1]));
                for i in 0..nset {
                    match path {
                        NumericPath::Real => scratch.add_direct_real(
                            &dm_re.slice(s![i, 0, .., ..]),
                            &mut vk_re.slice_mut(s![i, 0, .., ..]),
                        )?,
                        NumericPath::Complex => scratch.add_direct(
                            &dm_re.slice(s![i, 0, .., ..]),
                            &dm_im.slice(s![i, 0, .., ..]),
                            &mut vk_re.slice_mut(s![i, 0, .., ..]),
                            &mut vk_im.slice_mut(s![i, 0, .., ..]),
                        )?,
                    }
                }
            }
        }

        let vj = if with_j {
            let vj_re = vj_re.into_shape((nset, 1, nao, nao))?;
            let vj_im = match vj_im {
                Some(m) => Some(m.into_shape((nset, 1, nao, nao))?),
                None => None,
            };
            Some(KMatrices::from_split(vj_re, vj_im))
        } else {
            None
        };

        let vk = if with_k {
            let mut vk = match path {
                NumericPath::Real => KMatrices::from_split(vk_re, None),
                NumericPath::Complex => KMatrices::from_split(vk_re, Some(vk_im)),
            };
            if self.cell.dimension < 3 {
                if let Some(madelung) = kernel.madelung() {
                    let ovlp = self.g0_overlap(&kpts);
                    ewald_exxdiv_for_g0(madelung, &kpts, &kpts, &ovlp, dm, &mut vk);
                }
            }
            Some(vk)
        } else {
            None
        };
        info!("{:>40} {}", "get_jk:", timer);
        Ok((vj, vk))
    }
}
