//! Coulomb kernel 4π/|G+q|² on the reciprocal grid.

use log::debug;
use nalgebra::Vector3;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::cell::Cell;
use crate::error::{JkError, Result};
use crate::ewald;
use crate::grid::ReciprocalGrid;
use crate::kpts::is_zero;

/// Treatment of the G+q = 0 singularity of exchange.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExxDiv {
    None,
    Ewald,
}

impl ExxDiv {
    /// `None` leaves the term out, `"ewald"` (any case) selects the Madelung correction.
    pub fn parse(exxdiv: Option<&str>) -> Result<Self> {
        match exxdiv {
            None => Ok(ExxDiv::None),
            Some(s) if s.eq_ignore_ascii_case("ewald") => Ok(ExxDiv::Ewald),
            Some(s) => Err(JkError::InvalidExxDiv(s.to_string())),
        }
    }
}

/// Weighted Coulomb kernel for one J/K build.
#[derive(Debug, Clone)]
pub struct CoulombKernel<'a> {
    grid: &'a ReciprocalGrid,
    dimension: usize,
    exxdiv: ExxDiv,
    nkpts: usize,
    madelung: Option<f64>,
}

impl<'a> CoulombKernel<'a> {
    pub fn new(cell: &Cell, grid: &'a ReciprocalGrid, kpts: &[Vector3<f64>], exxdiv: ExxDiv) -> Self {
        let madelung = match exxdiv {
            ExxDiv::Ewald => Some(ewald::madelung(cell, kpts)),
            ExxDiv::None => None,
        };
        Self {
            grid,
            dimension: cell.dimension,
            exxdiv,
            nkpts: kpts.len(),
            madelung,
        }
    }

    pub fn madelung(&self) -> Option<f64> {
        self.madelung
    }

    pub fn exxdiv(&self) -> ExxDiv {
        self.exxdiv
    }

    /// 4π/|G+q|² · 1/Ω for every grid point.
    ///
    /// At G+q = 0 the value is zero, except for exchange (`exx`) in a 3D cell with
    /// Ewald treatment where it is Nk·madelung.
    pub fn weighted_coul_g(&self, q: &Vector3<f64>, exx: bool) -> Array1<f64> {
        let q_is_zero = is_zero(q);
        let g0 = match (exx, self.exxdiv, self.madelung) {
            (true, ExxDiv::Ewald, Some(m)) if self.dimension == 3 => self.nkpts as f64 * m,
            _ => 0.0,
        };
        let weight = self.grid.weight;
        let coul_g: Array1<f64> = self
            .grid
            .gv
            .iter()
            .enumerate()
            .map(|(g, gv)| {
                let k2 = (gv + q).norm_squared();
                if (q_is_zero && g == 0) || k2 < 1e-12 {
                    g0
                } else {
                    4.0 * PI / k2 * weight
                }
            })
            .collect();
        debug!(
            "Coulomb kernel for q = {:?}, exchange = {}, G+q=0 term = {:e}",
            q.as_slice(),
            exx,
            g0
        );
        coul_g
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{LatticeVector, Shell};
    use approx::assert_relative_eq;

    fn cell(dimension: usize) -> Cell {
        Cell::new(
            LatticeVector::new_cubic(4.0),
            dimension,
            vec![Vector3::zeros()],
            vec![Shell::new(0, 0, vec![1.0], vec![1.0])],
        )
        .unwrap()
    }

    #[test]
    fn test_parse_exxdiv() {
        assert_eq!(ExxDiv::parse(None).unwrap(), ExxDiv::None);
        assert_eq!(ExxDiv::parse(Some("Ewald")).unwrap(), ExxDiv::Ewald);
        assert_eq!(
            ExxDiv::parse(Some("vcut_sph")),
            Err(JkError::InvalidExxDiv("vcut_sph".to_string()))
        );
    }

    #[test]
    fn test_kernel_values() {
        let cell = cell(3);
        let grid = ReciprocalGrid::new(&cell, [2, 2, 2]);
        let kernel = CoulombKernel::new(&cell, &grid, &[Vector3::zeros()], ExxDiv::None);
        let v = kernel.weighted_coul_g(&Vector3::zeros(), false);
        assert_eq!(v[0], 0.0);
        let g1 = grid.gv[1].norm_squared();
        assert_relative_eq!(v[1], 4.0 * PI / g1 / 64.0, epsilon = 1e-14);
    }

    #[test]
    fn test_ewald_g0_only_for_exchange_in_3d() {
        let cell3 = cell(3);
        let grid = ReciprocalGrid::new(&cell3, [1, 1, 1]);
        let kernel = CoulombKernel::new(&cell3, &grid, &[Vector3::zeros()], ExxDiv::Ewald);
        let madelung = kernel.madelung().unwrap();
        assert_relative_eq!(kernel.weighted_coul_g(&Vector3::zeros(), true)[0], madelung);
        assert_eq!(kernel.weighted_coul_g(&Vector3::zeros(), false)[0], 0.0);

        let cell2 = cell(2);
        let kernel = CoulombKernel::new(&cell2, &grid, &[Vector3::zeros()], ExxDiv::Ewald);
        assert_eq!(kernel.weighted_coul_g(&Vector3::zeros(), true)[0], 0.0);
    }

    #[test]
    fn test_shifted_origin_and_idempotence() {
        let cell = cell(3);
        let grid = ReciprocalGrid::new(&cell, [1, 1, 1]);
        let kernel = CoulombKernel::new(&cell, &grid, &[Vector3::zeros()], ExxDiv::None);
        // q = -b₀ moves the singular point to G = b₀
        let q = -cell.lattice.b(0);
        let a = kernel.weighted_coul_g(&q, true);
        let b = kernel.weighted_coul_g(&q, true);
        assert_eq!(a, b);
        let g = grid.miller.iter().position(|m| *m == [1, 0, 0]).unwrap();
        assert_eq!(a[g], 0.0);
        assert!(a[0] > 0.0);
    }
}
