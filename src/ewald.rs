//! Ewald sums for the G = 0 exchange divergence.

use log::debug;
use nalgebra::Vector3;
use ndarray::{Array3, Axis};
use num_complex::Complex64;
use statrs::function::erf::erfc;
use std::f64::consts::PI;

use crate::cell::{Cell, LatticeVector};
use crate::kpts::{member, monkhorst_pack_size};
use crate::matrices::KMatrices;

/// Target accuracy of the lattice sums.
const EWALD_PRECISION: f64 = 1e-16;

/// Ewald energy of a unit point charge with a neutralising background:
///
/// E = ½ Σ'_T erfc(η|T|)/|T| + (2π/Ω) Σ_{G≠0} exp(-G²/4η²)/G² - η/√π - π/(2η²Ω)
pub fn point_charge_energy(lattice: &LatticeVector) -> f64 {
    let volume = lattice.volume();
    let eta = PI.sqrt() / volume.cbrt();
    let log_prec = -EWALD_PRECISION.ln();
    let rcut = log_prec.sqrt() / eta;
    let gcut = 2.0 * eta * log_prec.sqrt();

    let nr = lattice.images_within(rcut, 3);
    let mut e_real = 0.0;
    for n0 in -nr[0]..=nr[0] {
        for n1 in -nr[1]..=nr[1] {
            for n2 in -nr[2]..=nr[2] {
                if n0 == 0 && n1 == 0 && n2 == 0 {
                    continue;
                }
                let r = lattice.translation([n0, n1, n2]).norm();
                e_real += erfc(eta * r) / r;
            }
        }
    }

    let mut ng = [0i32; 3];
    for i in 0..3 {
        ng[i] = (gcut * lattice.a(i).norm() / (2.0 * PI)).ceil() as i32;
    }
    let mut e_recip = 0.0;
    for m0 in -ng[0]..=ng[0] {
        for m1 in -ng[1]..=ng[1] {
            for m2 in -ng[2]..=ng[2] {
                if m0 == 0 && m1 == 0 && m2 == 0 {
                    continue;
                }
                let g2 = lattice.reciprocal_translation([m0, m1, m2]).norm_squared();
                e_recip += (-g2 / (4.0 * eta * eta)).exp() / g2;
            }
        }
    }

    0.5 * e_real + 2.0 * PI / volume * e_recip
        - eta / PI.sqrt()
        - PI / (2.0 * eta * eta * volume)
}

/// Madelung constant of the Born-von Karman supercell spanned by the k-point mesh.
pub fn madelung(cell: &Cell, kpts: &[Vector3<f64>]) -> f64 {
    let nk = monkhorst_pack_size(&cell.lattice, kpts);
    let supercell = cell.lattice.supercell(nk);
    let value = -2.0 * point_charge_energy(&supercell);
    debug!("Madelung constant for k-mesh {:?}: {:.12}", nk, value);
    value
}

/// Add the G = 0 exchange term vk[i,kb] += madelung · S_kb·D[i,ks]·S_kb.
///
/// Only band k-points that belong to the sampling set receive the term. `ovlp`
/// holds the band-point overlaps, shape (nband, nao, nao).
pub fn ewald_exxdiv_for_g0(
    madelung: f64,
    kpts: &[Vector3<f64>],
    kpts_band: &[Vector3<f64>],
    ovlp: &Array3<Complex64>,
    dm: &KMatrices,
    vk: &mut KMatrices,
) {
    let (nset, _, nao, _) = vk.dim();
    for (kb, kpt) in kpts_band.iter().enumerate() {
        let ks = match member(kpt, kpts) {
            Some(ks) => ks,
            None => continue,
        };
        let s = ovlp.index_axis(Axis(0), kb);
        for i in 0..nset {
            let d = dm.matrix(i, ks);
            let sds = s.dot(&d).dot(&s) * Complex64::new(madelung, 0.0);
            match vk {
                KMatrices::Real(v) => {
                    for p in 0..nao {
                        for q in 0..nao {
                            v[[i, kb, p, q]] += sds[[p, q]].re;
                        }
                    }
                }
                KMatrices::Complex(v) => {
                    for p in 0..nao {
                        for q in 0..nao {
                            v[[i, kb, p, q]] += sds[[p, q]];
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Shell;
    use approx::assert_relative_eq;
    use ndarray::Array4;

    fn cubic_cell(a: f64) -> Cell {
        Cell::new(
            LatticeVector::new_cubic(a),
            3,
            vec![Vector3::zeros()],
            vec![Shell::new(0, 0, vec![1.0], vec![1.0])],
        )
        .unwrap()
    }

    #[test]
    fn test_madelung_unit_cube() {
        let cell = cubic_cell(1.0);
        assert_relative_eq!(madelung(&cell, &[Vector3::zeros()]), 2.837297479, epsilon = 1e-8);
    }

    #[test]
    fn test_madelung_scales_with_supercell() {
        let cell = cubic_cell(4.0);
        assert_relative_eq!(madelung(&cell, &[Vector3::zeros()]), 0.709324369870, epsilon = 1e-9);
        let kpts = vec![Vector3::zeros(), cell.lattice.b(0) * 0.5];
        assert_relative_eq!(madelung(&cell, &kpts), 0.451460452613, epsilon = 1e-9);
    }

    #[test]
    fn test_correction_skips_foreign_band_points() {
        let kpts = vec![Vector3::zeros()];
        let band = vec![Vector3::zeros(), Vector3::new(0.1, 0.0, 0.0)];
        let mut ovlp = Array3::<Complex64>::zeros((2, 1, 1));
        ovlp[[0, 0, 0]] = Complex64::new(2.0, 0.0);
        ovlp[[1, 0, 0]] = Complex64::new(3.0, 0.0);
        let dm = KMatrices::from(Array3::from_elem((1, 1, 1), 0.5));
        let mut vk = KMatrices::Real(Array4::zeros((1, 2, 1, 1)));
        ewald_exxdiv_for_g0(1.5, &kpts, &band, &ovlp, &dm, &mut vk);
        match vk {
            KMatrices::Real(v) => {
                assert_relative_eq!(v[[0, 0, 0, 0]], 1.5 * 2.0 * 0.5 * 2.0);
                assert_relative_eq!(v[[0, 1, 0, 0]], 0.0);
            }
            KMatrices::Complex(_) => panic!("real input must stay real"),
        }
    }
}
