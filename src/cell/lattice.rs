use nalgebra::{Matrix3, Vector3};
use std::f64::consts::PI;

use crate::error::{JkError, Result};

/// Direct and reciprocal lattice of a unit cell.
///
/// Rows of `lattice_vector` are the lattice vectors a₁, a₂, a₃ (Bohr); rows of
/// `reciprocal_vector` are b₁, b₂, b₃ with aᵢ·bⱼ = 2π δᵢⱼ.
#[derive(Debug, Clone, Copy)]
pub struct LatticeVector {
    pub lattice_vector: Matrix3<f64>,
    pub reciprocal_vector: Matrix3<f64>,
}

impl LatticeVector {
    pub fn new(lattice: Matrix3<f64>) -> Result<Self> {
        let inverse = lattice
            .try_inverse()
            .ok_or_else(|| JkError::InvalidCell("lattice vectors are linearly dependent".into()))?;
        Ok(Self {
            lattice_vector: lattice,
            reciprocal_vector: 2.0 * PI * inverse.transpose(),
        })
    }

    pub fn new_cubic(a: f64) -> Self {
        Self::from_orthogonal(a, a, a)
    }

    /// Rectangular box, e.g. a slab with a long vacuum axis.
    pub fn from_orthogonal(a: f64, b: f64, c: f64) -> Self {
        Self {
            lattice_vector: Matrix3::from_diagonal(&Vector3::new(a, b, c)),
            reciprocal_vector: Matrix3::from_diagonal(&Vector3::new(
                2.0 * PI / a,
                2.0 * PI / b,
                2.0 * PI / c,
            )),
        }
    }

    pub fn new_bcc(a: f64) -> Self {
        let lattice = Matrix3::new(
            -a / 2.0, a / 2.0, a / 2.0,
            a / 2.0, -a / 2.0, a / 2.0,
            a / 2.0, a / 2.0, -a / 2.0,
        );
        let reciprocal = 2.0 * PI / a
            * Matrix3::new(
                0.0, 1.0, 1.0,
                1.0, 0.0, 1.0,
                1.0, 1.0, 0.0,
            );
        Self {
            lattice_vector: lattice,
            reciprocal_vector: reciprocal,
        }
    }

    pub fn new_fcc(a: f64) -> Self {
        let lattice = Matrix3::new(
            0.0, a / 2.0, a / 2.0,
            a / 2.0, 0.0, a / 2.0,
            a / 2.0, a / 2.0, 0.0,
        );
        let reciprocal = 2.0 * PI / a
            * Matrix3::new(
                -1.0, 1.0, 1.0,
                1.0, -1.0, 1.0,
                1.0, 1.0, -1.0,
            );
        Self {
            lattice_vector: lattice,
            reciprocal_vector: reciprocal,
        }
    }

    /// Lattice vector aᵢ.
    pub fn a(&self, i: usize) -> Vector3<f64> {
        self.lattice_vector.row(i).transpose()
    }

    /// Reciprocal vector bᵢ.
    pub fn b(&self, i: usize) -> Vector3<f64> {
        self.reciprocal_vector.row(i).transpose()
    }

    pub fn volume(&self) -> f64 {
        self.lattice_vector.determinant().abs()
    }

    /// Cartesian vector of integer multiples of the lattice vectors.
    pub fn translation(&self, n: [i32; 3]) -> Vector3<f64> {
        self.a(0) * n[0] as f64 + self.a(1) * n[1] as f64 + self.a(2) * n[2] as f64
    }

    /// Cartesian vector of integer multiples of the reciprocal vectors.
    pub fn reciprocal_translation(&self, m: [i32; 3]) -> Vector3<f64> {
        self.b(0) * m[0] as f64 + self.b(1) * m[1] as f64 + self.b(2) * m[2] as f64
    }

    /// k-point in units of the reciprocal vectors.
    pub fn scaled_kpt(&self, kpt: &Vector3<f64>) -> Vector3<f64> {
        self.lattice_vector * kpt / (2.0 * PI)
    }

    /// Lattice with each aᵢ scaled by `n[i]`.
    pub fn supercell(&self, n: [usize; 3]) -> Self {
        let mut lattice = self.lattice_vector;
        let mut reciprocal = self.reciprocal_vector;
        for i in 0..3 {
            let s = n[i] as f64;
            lattice.row_mut(i).scale_mut(s);
            reciprocal.row_mut(i).scale_mut(1.0 / s);
        }
        Self {
            lattice_vector: lattice,
            reciprocal_vector: reciprocal,
        }
    }

    /// Number of images along each axis needed to cover a sphere of radius `r`.
    ///
    /// Only the first `dimension` axes are periodic; the others get zero images.
    pub fn images_within(&self, r: f64, dimension: usize) -> [i32; 3] {
        let mut n = [0i32; 3];
        for i in 0..dimension.min(3) {
            n[i] = (r * self.b(i).norm() / (2.0 * PI)).ceil() as i32;
        }
        n
    }
}
