//! Periodic unit cell: lattice, atoms and Gaussian basis.

mod basis;
mod lattice;

pub use basis::{build_aos, cartesian_powers, hermite_e, CartesianAo, Shell};
pub use lattice::LatticeVector;

use nalgebra::Vector3;

use crate::error::{JkError, Result};

/// Default integral screening threshold.
pub const DEFAULT_PRECISION: f64 = 1e-8;

/// Unit cell geometry with its atomic basis.
///
/// The first `dimension` lattice vectors are periodic; the remaining ones only
/// define the box used for the reciprocal-space grid.
#[derive(Debug, Clone)]
pub struct Cell {
    pub lattice: LatticeVector,
    pub dimension: usize,
    pub atoms: Vec<Vector3<f64>>,
    pub shells: Vec<Shell>,
    pub precision: f64,
    aos: Vec<CartesianAo>,
    rcut: f64,
    images: Vec<Vector3<f64>>,
}

impl Cell {
    pub fn new(
        lattice: LatticeVector,
        dimension: usize,
        atoms: Vec<Vector3<f64>>,
        shells: Vec<Shell>,
    ) -> Result<Self> {
        Self::with_precision(lattice, dimension, atoms, shells, DEFAULT_PRECISION)
    }

    pub fn with_precision(
        lattice: LatticeVector,
        dimension: usize,
        atoms: Vec<Vector3<f64>>,
        shells: Vec<Shell>,
        precision: f64,
    ) -> Result<Self> {
        if dimension > 3 {
            return Err(JkError::InvalidCell(format!(
                "dimension must be between 0 and 3, got {}",
                dimension
            )));
        }
        if shells.is_empty() {
            return Err(JkError::InvalidCell("no basis functions".into()));
        }
        if !(precision > 0.0 && precision < 1.0) {
            return Err(JkError::InvalidCell(format!(
                "precision must lie in (0, 1), got {}",
                precision
            )));
        }
        for shell in shells.iter() {
            shell.validate(atoms.len())?;
        }

        let aos = build_aos(&atoms, &shells);

        let alpha_min = shells
            .iter()
            .flat_map(|s| s.exponents.iter().copied())
            .fold(f64::INFINITY, f64::min);
        let rcut = (2.0 * (-precision.ln()) / alpha_min).sqrt();

        // pair separations inside the cell extend the image range
        let mut dmax: f64 = 0.0;
        for a in atoms.iter() {
            for b in atoms.iter() {
                dmax = dmax.max((a - b).norm());
            }
        }
        let nimgs = lattice.images_within(rcut + dmax, dimension);
        let mut images = Vec::new();
        for n0 in -nimgs[0]..=nimgs[0] {
            for n1 in -nimgs[1]..=nimgs[1] {
                for n2 in -nimgs[2]..=nimgs[2] {
                    images.push(lattice.translation([n0, n1, n2]));
                }
            }
        }

        Ok(Self {
            lattice,
            dimension,
            atoms,
            shells,
            precision,
            aos,
            rcut,
            images,
        })
    }

    pub fn nao(&self) -> usize {
        self.shells.iter().map(|s| s.ncart()).sum()
    }

    pub fn aos(&self) -> &[CartesianAo] {
        &self.aos
    }

    pub fn volume(&self) -> f64 {
        self.lattice.volume()
    }

    /// Radius beyond which every basis-function pair product is below `precision`.
    pub fn rcut(&self) -> f64 {
        self.rcut
    }

    /// Lattice translations T entering Bloch sums, symmetric under T → -T.
    pub fn lattice_images(&self) -> &[Vector3<f64>] {
        &self.images
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h2_cell(dimension: usize) -> Cell {
        let shells = vec![
            Shell::new(0, 0, vec![1.2, 0.3], vec![0.5, 0.6]),
            Shell::new(1, 1, vec![0.8], vec![1.0]),
        ];
        Cell::new(
            LatticeVector::new_cubic(4.0),
            dimension,
            vec![Vector3::new(1.0, 2.0, 2.0), Vector3::new(2.4, 2.0, 2.0)],
            shells,
        )
        .unwrap()
    }

    #[test]
    fn test_nao_counts_cartesian_components() {
        let cell = h2_cell(3);
        assert_eq!(cell.nao(), 4);
        assert_eq!(cell.aos().len(), 4);
    }

    #[test]
    fn test_images_are_symmetric() {
        let cell = h2_cell(3);
        let images = cell.lattice_images();
        for t in images.iter() {
            assert!(images.iter().any(|u| (t + u).norm() < 1e-12));
        }
        assert!(images.iter().any(|t| t.norm() < 1e-12));
    }

    #[test]
    fn test_reduced_dimension_has_no_images_along_vacuum() {
        let cell = h2_cell(2);
        assert!(cell.lattice_images().iter().all(|t| t.z.abs() < 1e-12));
        let cell = h2_cell(0);
        assert_eq!(cell.lattice_images().len(), 1);
    }

    #[test]
    fn test_invalid_cells() {
        let lattice = LatticeVector::new_cubic(4.0);
        let atoms = vec![Vector3::zeros()];
        assert!(Cell::new(lattice, 3, atoms.clone(), vec![]).is_err());
        let shells = vec![Shell::new(0, 0, vec![1.0], vec![1.0])];
        assert!(Cell::new(lattice, 4, atoms.clone(), shells.clone()).is_err());
        assert!(Cell::with_precision(lattice, 3, atoms, shells, 0.0).is_err());
    }
}
