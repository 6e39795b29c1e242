//! Analytic Fourier transform of Gaussian pair products with lattice sums.
//!
//! Each product χ_p(r) χ_q(r-T) is expanded in Hermite Gaussians centred at
//! P = (aA + bB')/(a+b) with McMurchie-Davidson coefficients E_t. Along one
//! Cartesian direction the transform of the expansion is
//!
//!   F(K) = sqrt(π/p) exp(-K²/4p) exp(-iK·P) Σ_t E_t (-iK)^t
//!
//! and the full transform is the product over directions.

use log::debug;
use nalgebra::Vector3;
use ndarray::{Array3, ArrayViewMut3};
use num_complex::Complex64;
use std::f64::consts::PI;

use super::AoPairFt;
use crate::cell::{hermite_e, Cell};
use crate::grid::ReciprocalGrid;

/// One surviving primitive pair for one lattice image.
#[derive(Debug, Clone)]
struct PairTerm {
    image: usize,
    exponent: f64,
    center: Vector3<f64>,
    hermite: [Vec<f64>; 3],
    coef: f64,
}

impl PairTerm {
    fn transform(&self, kv: &Vector3<f64>) -> Complex64 {
        let p = self.exponent;
        let mut value = Complex64::new(self.coef, 0.0);
        for d in 0..3 {
            let kd = kv[d];
            let step = Complex64::new(0.0, -kd);
            let mut power = Complex64::new(1.0, 0.0);
            let mut poly = Complex64::new(0.0, 0.0);
            for &e in self.hermite[d].iter() {
                poly += power * e;
                power *= step;
            }
            value *= poly * ((PI / p).sqrt() * (-kd * kd / (4.0 * p)).exp());
        }
        value * Complex64::from_polar(1.0, -kv.dot(&self.center))
    }
}

#[derive(Debug, Clone)]
pub struct AnalyticFt {
    nao: usize,
    grid: ReciprocalGrid,
    images: Vec<Vector3<f64>>,
    /// Terms of pair p·nao+q.
    pairs: Vec<Vec<PairTerm>>,
}

impl AnalyticFt {
    pub fn new(cell: &Cell, grid: ReciprocalGrid) -> Self {
        let aos = cell.aos();
        let nao = aos.len();
        let images = cell.lattice_images().to_vec();
        let cutoff = -cell.precision.ln();

        let mut pairs = Vec::with_capacity(nao * nao);
        for bra in aos.iter() {
            for ket in aos.iter() {
                let mut terms = Vec::new();
                for (image, t) in images.iter().enumerate() {
                    let b = ket.center + t;
                    let qv = bra.center - b;
                    let q2 = qv.norm_squared();
                    for (&ea, &ca) in bra.exponents.iter().zip(bra.coefficients.iter()) {
                        for (&eb, &cb) in ket.exponents.iter().zip(ket.coefficients.iter()) {
                            let p = ea + eb;
                            if ea * eb / p * q2 > cutoff {
                                continue;
                            }
                            let hermite = [
                                hermite_e(bra.powers[0], ket.powers[0], qv.x, ea, eb),
                                hermite_e(bra.powers[1], ket.powers[1], qv.y, ea, eb),
                                hermite_e(bra.powers[2], ket.powers[2], qv.z, ea, eb),
                            ];
                            terms.push(PairTerm {
                                image,
                                exponent: p,
                                center: (bra.center * ea + b * eb) / p,
                                hermite,
                                coef: ca * cb,
                            });
                        }
                    }
                }
                pairs.push(terms);
            }
        }

        let ft = Self {
            nao,
            grid,
            images,
            pairs,
        };
        debug!(
            "AO pair transform: nao = {}, {} images, {} pair terms, {} grid points",
            ft.nao,
            ft.images.len(),
            ft.npair_terms(),
            ft.grid.ngrids()
        );
        ft
    }

    pub fn npair_terms(&self) -> usize {
        self.pairs.iter().map(|terms| terms.len()).sum()
    }

    /// Bloch phases exp(i k·T) of every image for every k-point.
    fn phases(&self, kpts: &[Vector3<f64>]) -> Vec<Vec<Complex64>> {
        kpts.iter()
            .map(|k| {
                self.images
                    .iter()
                    .map(|t| Complex64::from_polar(1.0, k.dot(t)))
                    .collect()
            })
            .collect()
    }

    /// Overlap matrices S_k[p, q] = Σ_T exp(i k·T) ⟨χ_p | χ_q(· - T)⟩, shape (nk, nao, nao).
    pub fn overlap(&self, kpts: &[Vector3<f64>]) -> Array3<Complex64> {
        let nao = self.nao;
        let phases = self.phases(kpts);
        let origin = Vector3::zeros();
        let mut s = Array3::<Complex64>::zeros((kpts.len(), nao, nao));
        for (pq, terms) in self.pairs.iter().enumerate() {
            let (p, q) = (pq / nao, pq % nao);
            for term in terms.iter() {
                let v = term.transform(&origin);
                for (k, phase) in phases.iter().enumerate() {
                    s[[k, p, q]] += v * phase[term.image];
                }
            }
        }
        s
    }
}

impl AoPairFt for AnalyticFt {
    fn nao(&self) -> usize {
        self.nao
    }

    fn grid(&self) -> &ReciprocalGrid {
        &self.grid
    }

    fn ft_aopair(
        &self,
        q: &Vector3<f64>,
        kptjs: &[Vector3<f64>],
        p0: usize,
        p1: usize,
        mut out_re: ArrayViewMut3<f64>,
        mut out_im: ArrayViewMut3<f64>,
    ) {
        out_re.fill(0.0);
        out_im.fill(0.0);
        let phases = self.phases(kptjs);
        for (ig, g) in (p0..p1).enumerate() {
            let kv = self.grid.gv[g] + q;
            for (pq, terms) in self.pairs.iter().enumerate() {
                for term in terms.iter() {
                    let v = term.transform(&kv);
                    for (k, phase) in phases.iter().enumerate() {
                        let z = v * phase[term.image];
                        out_re[[k, pq, ig]] += z.re;
                        out_im[[k, pq, ig]] += z.im;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{LatticeVector, Shell};
    use approx::assert_relative_eq;

    fn sp_cell(a: f64, dimension: usize) -> Cell {
        Cell::new(
            LatticeVector::new_cubic(a),
            dimension,
            vec![Vector3::new(0.0, 0.0, 0.0), Vector3::new(0.9, 0.3, -0.2)],
            vec![
                Shell::new(0, 0, vec![1.1, 0.45], vec![0.6, 0.5]),
                Shell::new(1, 1, vec![0.8], vec![1.0]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_self_overlap_is_one_in_large_box() {
        let cell = sp_cell(30.0, 3);
        let ft = AnalyticFt::new(&cell, ReciprocalGrid::new(&cell, [1, 1, 1]));
        let s = ft.overlap(&[Vector3::zeros()]);
        for p in 0..cell.nao() {
            assert_relative_eq!(s[[0, p, p]].re, 1.0, epsilon = 1e-10);
            assert_relative_eq!(s[[0, p, p]].im, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_bloch_overlap_is_hermitian() {
        let cell = sp_cell(3.0, 3);
        let ft = AnalyticFt::new(&cell, ReciprocalGrid::new(&cell, [1, 1, 1]));
        let k = cell.lattice.b(0) * 0.25 + cell.lattice.b(1) * 0.5;
        let s = ft.overlap(&[k]);
        let nao = cell.nao();
        for p in 0..nao {
            for q in 0..nao {
                let d = s[[0, p, q]] - s[[0, q, p]].conj();
                assert!(d.norm() < 1e-12);
            }
        }
    }

    #[test]
    fn test_zero_momentum_transform_is_overlap() {
        let cell = sp_cell(3.0, 3);
        let grid = ReciprocalGrid::new(&cell, [1, 1, 1]);
        let ft = AnalyticFt::new(&cell, grid);
        let nao = cell.nao();
        let k = cell.lattice.b(2) * 0.5;
        let s = ft.overlap(&[k]);
        let mut re = Array3::zeros((1, nao * nao, 1));
        let mut im = Array3::zeros((1, nao * nao, 1));
        ft.ft_aopair(&Vector3::zeros(), &[k], 0, 1, re.view_mut(), im.view_mut());
        for p in 0..nao {
            for q in 0..nao {
                assert_relative_eq!(re[[0, p * nao + q, 0]], s[[0, p, q]].re, epsilon = 1e-12);
                assert_relative_eq!(im[[0, p * nao + q, 0]], s[[0, p, q]].im, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_transform_matches_quadrature() {
        // isolated pair, so the lattice sum reduces to one image
        let cell = sp_cell(12.0, 0);
        let grid = ReciprocalGrid::new(&cell, [1, 1, 1]);
        let ft = AnalyticFt::new(&cell, grid);
        let nao = cell.nao();
        let aos = cell.aos();
        let g = 4;
        let kv = ft.grid().gv[g];

        let mut re = Array3::zeros((1, nao * nao, 1));
        let mut im = Array3::zeros((1, nao * nao, 1));
        ft.ft_aopair(&Vector3::zeros(), &[Vector3::zeros()], g, g + 1, re.view_mut(), im.view_mut());

        let (p, q) = (0, 1);
        let h = 0.12;
        let n = 55;
        let mut acc = Complex64::new(0.0, 0.0);
        for ix in -n..=n {
            for iy in -n..=n {
                for iz in -n..=n {
                    let r = Vector3::new(ix as f64 * h, iy as f64 * h, iz as f64 * h);
                    let f = aos[p].evaluate(&r) * aos[q].evaluate(&r);
                    acc += Complex64::from_polar(f, -kv.dot(&r));
                }
            }
        }
        acc *= h * h * h;
        assert_relative_eq!(re[[0, p * nao + q, 0]], acc.re, epsilon = 1e-6);
        assert_relative_eq!(im[[0, p * nao + q, 0]], acc.im, epsilon = 1e-6);
    }
}
