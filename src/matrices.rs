//! Stacks of AO matrices indexed by (set, k-point).

use nalgebra::DMatrix;
use ndarray::{Array2, Array3, Array4, Axis};
use num_complex::Complex64;

use crate::error::{JkError, Result};

/// Matrices of shape (nset, nkpts, nao, nao), real when no k-point phase or
/// complex density is involved.
#[derive(Debug, Clone, PartialEq)]
pub enum KMatrices {
    Real(Array4<f64>),
    Complex(Array4<Complex64>),
}

impl KMatrices {
    pub fn dim(&self) -> (usize, usize, usize, usize) {
        match self {
            KMatrices::Real(m) => m.dim(),
            KMatrices::Complex(m) => m.dim(),
        }
    }

    pub fn nset(&self) -> usize {
        self.dim().0
    }

    pub fn nkpts(&self) -> usize {
        self.dim().1
    }

    pub fn nao(&self) -> usize {
        self.dim().2
    }

    pub fn is_real(&self) -> bool {
        matches!(self, KMatrices::Real(_))
    }

    pub fn to_complex(&self) -> Array4<Complex64> {
        match self {
            KMatrices::Real(m) => m.mapv(|x| Complex64::new(x, 0.0)),
            KMatrices::Complex(m) => m.clone(),
        }
    }

    /// Real and imaginary parts in standard layout.
    pub fn split(&self) -> (Array4<f64>, Array4<f64>) {
        match self {
            KMatrices::Real(m) => (m.as_standard_layout().into_owned(), Array4::zeros(m.dim())),
            KMatrices::Complex(m) => (m.mapv(|z| z.re), m.mapv(|z| z.im)),
        }
    }

    pub(crate) fn from_split(re: Array4<f64>, im: Option<Array4<f64>>) -> Self {
        match im {
            None => KMatrices::Real(re),
            Some(im) => KMatrices::Complex(
                ndarray::Zip::from(&re)
                    .and(&im)
                    .map_collect(|&r, &i| Complex64::new(r, i)),
            ),
        }
    }

    /// Matrix (set `i`, k-point `k`) as complex.
    pub fn matrix(&self, i: usize, k: usize) -> Array2<Complex64> {
        match self {
            KMatrices::Real(m) => m
                .index_axis(Axis(0), i)
                .index_axis(Axis(0), k)
                .mapv(|x| Complex64::new(x, 0.0)),
            KMatrices::Complex(m) => m.index_axis(Axis(0), i).index_axis(Axis(0), k).to_owned(),
        }
    }

    /// The only matrix of a single-set, single-k-point stack.
    pub fn single(&self) -> Result<Array2<Complex64>> {
        let (nset, nk, _, _) = self.dim();
        if nset * nk != 1 {
            return Err(JkError::ShapeMismatch {
                what: "matrix count",
                expected: 1,
                found: nset * nk,
            });
        }
        Ok(self.matrix(0, 0))
    }

    /// Σ_{i,k} Tr(M[i,k]·D[i,k]).
    pub fn trace_with(&self, dm: &KMatrices) -> Result<Complex64> {
        if self.dim() != dm.dim() {
            return Err(JkError::ShapeMismatch {
                what: "matrix stack size",
                expected: self.dim().0 * self.dim().1 * self.dim().2,
                found: dm.dim().0 * dm.dim().1 * dm.dim().2,
            });
        }
        let (nset, nk, nao, _) = self.dim();
        let mut tr = Complex64::new(0.0, 0.0);
        for i in 0..nset {
            for k in 0..nk {
                let m = self.matrix(i, k);
                let d = dm.matrix(i, k);
                for p in 0..nao {
                    for q in 0..nao {
                        tr += m[[p, q]] * d[[q, p]];
                    }
                }
            }
        }
        Ok(tr)
    }

    /// Largest deviation from M = Mᴴ over the stack.
    pub fn hermiticity_error(&self) -> f64 {
        let (nset, nk, nao, _) = self.dim();
        let mut err: f64 = 0.0;
        for i in 0..nset {
            for k in 0..nk {
                let m = self.matrix(i, k);
                for p in 0..nao {
                    for q in 0..nao {
                        err = err.max((m[[p, q]] - m[[q, p]].conj()).norm());
                    }
                }
            }
        }
        err
    }
}

impl From<Array2<f64>> for KMatrices {
    fn from(m: Array2<f64>) -> Self {
        KMatrices::Real(m.insert_axis(Axis(0)).insert_axis(Axis(0)))
    }
}

impl From<Array2<Complex64>> for KMatrices {
    fn from(m: Array2<Complex64>) -> Self {
        KMatrices::Complex(m.insert_axis(Axis(0)).insert_axis(Axis(0)))
    }
}

/// One matrix per k-point, a single set.
impl From<Array3<f64>> for KMatrices {
    fn from(m: Array3<f64>) -> Self {
        KMatrices::Real(m.insert_axis(Axis(0)))
    }
}

impl From<Array3<Complex64>> for KMatrices {
    fn from(m: Array3<Complex64>) -> Self {
        KMatrices::Complex(m.insert_axis(Axis(0)))
    }
}

impl From<Array4<f64>> for KMatrices {
    fn from(m: Array4<f64>) -> Self {
        KMatrices::Real(m)
    }
}

impl From<Array4<Complex64>> for KMatrices {
    fn from(m: Array4<Complex64>) -> Self {
        KMatrices::Complex(m)
    }
}

/// Density guess D_k = (nelectron/nao)·S_k⁻¹ for overlaps of shape (nk, nao, nao).
///
/// Tr(D_k S_k) equals `nelectron` at every k-point. The result is real when all
/// overlaps are.
pub fn inverse_overlap_guess(s: &Array3<Complex64>, nelectron: f64) -> Result<KMatrices> {
    let (nk, nao, _) = s.dim();
    let scale = nelectron / nao as f64;
    let mut dm = Array3::<Complex64>::zeros((nk, nao, nao));
    for k in 0..nk {
        let sk = DMatrix::from_fn(nao, nao, |p, q| s[[k, p, q]]);
        let inv = sk
            .try_inverse()
            .ok_or(JkError::SingularOverlap { kpt: k })?;
        for p in 0..nao {
            for q in 0..nao {
                dm[[k, p, q]] = inv[(p, q)] * scale;
            }
        }
    }
    if s.iter().all(|z| z.im.abs() < 1e-12) {
        Ok(KMatrices::from(dm.mapv(|z| z.re)))
    } else {
        Ok(KMatrices::from(dm))
    }
}
