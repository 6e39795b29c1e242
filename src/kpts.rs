//! k-point helpers: tolerance tests, membership and Monkhorst-Pack meshes.

use nalgebra::Vector3;
use ndarray::Array2;
use std::collections::BTreeSet;

use crate::cell::LatticeVector;
use crate::error::{JkError, Result};

/// Two k-points are the same when the sum of absolute component differences is below this.
pub const KPT_TOL: f64 = 1e-9;

pub fn abs_sum(k: &Vector3<f64>) -> f64 {
    k.x.abs() + k.y.abs() + k.z.abs()
}

pub fn is_zero(k: &Vector3<f64>) -> bool {
    abs_sum(k) < KPT_TOL
}

/// True when every k-point is the origin (also for an empty set).
pub fn gamma_point(kpts: &[Vector3<f64>]) -> bool {
    kpts.iter().all(is_zero)
}

/// Index of `kpt` in `set`, if present.
pub fn member(kpt: &Vector3<f64>, set: &[Vector3<f64>]) -> Option<usize> {
    set.iter().position(|k| is_zero(&(k - kpt)))
}

/// Same points in the same order.
pub fn same_kpts(a: &[Vector3<f64>], b: &[Vector3<f64>]) -> bool {
    a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| is_zero(&(x - y)))
}

/// Rows of an (n, 3) array as k-points.
pub fn kpts_from_array(kpts: &Array2<f64>) -> Result<Vec<Vector3<f64>>> {
    let (_, ncols) = kpts.dim();
    if ncols != 3 {
        return Err(JkError::InvalidKpts { ncols });
    }
    Ok(kpts
        .rows()
        .into_iter()
        .map(|row| Vector3::new(row[0], row[1], row[2]))
        .collect())
}

/// Monkhorst-Pack mesh of n₀×n₁×n₂ points, in Cartesian coordinates.
///
/// With `with_gamma` the mesh is sᵢ/nᵢ and contains the origin; otherwise the
/// symmetric offsets (2s - n + 1)/(2n) are used.
pub fn monkhorst_pack(lattice: &LatticeVector, n: [usize; 3], with_gamma: bool) -> Vec<Vector3<f64>> {
    let axis = |n: usize| -> Vec<f64> {
        (0..n)
            .map(|s| {
                if with_gamma {
                    s as f64 / n as f64
                } else {
                    (2.0 * s as f64 - n as f64 + 1.0) / (2.0 * n as f64)
                }
            })
            .collect()
    };
    let (t0, t1, t2) = (axis(n[0]), axis(n[1]), axis(n[2]));
    let mut kpts = Vec::with_capacity(n[0] * n[1] * n[2]);
    for &x in t0.iter() {
        for &y in t1.iter() {
            for &z in t2.iter() {
                kpts.push(lattice.b(0) * x + lattice.b(1) * y + lattice.b(2) * z);
            }
        }
    }
    kpts
}

/// Number of distinct scaled coordinates along each reciprocal axis.
pub fn monkhorst_pack_size(lattice: &LatticeVector, kpts: &[Vector3<f64>]) -> [usize; 3] {
    let mut sets: [BTreeSet<i64>; 3] = Default::default();
    for k in kpts.iter() {
        let s = lattice.scaled_kpt(k);
        for i in 0..3 {
            sets[i].insert((s[i] * 1e6).round() as i64);
        }
    }
    [
        sets[0].len().max(1),
        sets[1].len().max(1),
        sets[2].len().max(1),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_membership_tolerance() {
        let set = vec![Vector3::zeros(), Vector3::new(0.5, 0.0, 0.0)];
        assert_eq!(member(&Vector3::new(0.5 + 1e-12, 0.0, 0.0), &set), Some(1));
        assert_eq!(member(&Vector3::new(0.5, 1e-6, 0.0), &set), None);
        assert!(gamma_point(&[Vector3::new(1e-11, 0.0, -1e-11)]));
        assert!(!gamma_point(&set));
    }

    #[test]
    fn test_kpts_from_array() {
        let kpts = kpts_from_array(&array![[0.0, 0.0, 0.0], [0.1, 0.2, 0.3]]).unwrap();
        assert_eq!(kpts.len(), 2);
        assert_relative_eq!(kpts[1].z, 0.3);
        let err = kpts_from_array(&array![[0.0, 0.0], [0.1, 0.2]]).unwrap_err();
        assert_eq!(err, JkError::InvalidKpts { ncols: 2 });
    }

    #[test]
    fn test_monkhorst_pack() {
        let lattice = LatticeVector::new_cubic(4.0);
        let kpts = monkhorst_pack(&lattice, [2, 1, 3], true);
        assert_eq!(kpts.len(), 6);
        assert!(is_zero(&kpts[0]));
        assert_eq!(monkhorst_pack_size(&lattice, &kpts), [2, 1, 3]);

        let shifted = monkhorst_pack(&lattice, [2, 2, 2], false);
        assert!(!shifted.iter().any(is_zero));
        let s = lattice.scaled_kpt(&shifted[0]);
        assert_relative_eq!(s.x, -0.25, epsilon = 1e-12);
    }
}
