//! Coulomb (J) and exchange (K) matrices from analytic Fourier transforms of
//! AO pair products.
//!
//! Both builders stream the reciprocal grid in blocks sized from the memory
//! ceiling. J needs a single momentum transfer q = 0; K walks the momentum
//! transfers of all (band, sample) k-point pairs with a [`KkTable`].
//!
//! [`KkTable`]: crate::kconserv::KkTable

mod j;
mod k;
mod single;

use log::{debug, info};
use nalgebra::Vector3;
use ndarray::{Array3, Axis};
use num_complex::Complex64;

use crate::cell::Cell;
use crate::coulomb::ExxDiv;
use crate::error::{JkError, Result};
use crate::ft::{AnalyticFt, AoPairFt};
use crate::grid::ReciprocalGrid;
use crate::io::AftJkConfig;
use crate::kpts::gamma_point;
use crate::matrices::KMatrices;

/// Symmetry of the input density. Only reported, never relied upon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hermi {
    NoSymmetry,
    Hermitian,
    AntiHermitian,
}

/// Arithmetic used for one build, fixed at entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericPath {
    Real,
    Complex,
}

impl NumericPath {
    /// J is real when every output k-point is Γ and the density is real.
    pub fn for_j(kpts_band: &[Vector3<f64>], dm: &KMatrices) -> Self {
        if gamma_point(kpts_band) && dm.is_real() {
            NumericPath::Real
        } else {
            NumericPath::Complex
        }
    }

    /// K additionally needs every sampling k-point at Γ.
    pub fn for_k(kpts: &[Vector3<f64>], kpts_band: &[Vector3<f64>], dm: &KMatrices) -> Self {
        if gamma_point(kpts) && gamma_point(kpts_band) && dm.is_real() {
            NumericPath::Real
        } else {
            NumericPath::Complex
        }
    }
}

/// J/K builder over a cell and a transform provider.
pub struct AftJk<'a, P: AoPairFt = AnalyticFt> {
    cell: &'a Cell,
    ft: P,
    max_memory: f64,
}

impl<'a> AftJk<'a, AnalyticFt> {
    pub fn new(cell: &'a Cell, config: &AftJkConfig) -> Result<Self> {
        let grid = match config.mesh {
            Some(gs) => ReciprocalGrid::new(cell, gs),
            None => ReciprocalGrid::from_cutoff(cell, config.ke_cutoff)?,
        };
        info!(
            "AFT grid: gs = {:?}, {} plane waves, max_memory = {} MB",
            grid.gs,
            grid.ngrids(),
            config.max_memory
        );
        Ok(Self::with_provider(cell, AnalyticFt::new(cell, grid), config.max_memory))
    }
}

impl<'a, P: AoPairFt> AftJk<'a, P> {
    pub fn with_provider(cell: &'a Cell, ft: P, max_memory: f64) -> Self {
        Self {
            cell,
            ft,
            max_memory,
        }
    }

    pub fn cell(&self) -> &Cell {
        self.cell
    }

    pub fn provider(&self) -> &P {
        &self.ft
    }

    pub fn max_memory(&self) -> f64 {
        self.max_memory
    }

    pub fn set_max_memory(&mut self, max_memory: f64) {
        self.max_memory = max_memory;
    }

    /// J and/or K for densities at `kpts`, evaluated at `kpts_band` (default `kpts`).
    #[allow(clippy::too_many_arguments)]
    pub fn get_jk_kpts(
        &self,
        dm: &KMatrices,
        hermi: Hermi,
        kpts: &[Vector3<f64>],
        kpts_band: Option<&[Vector3<f64>]>,
        with_j: bool,
        with_k: bool,
        exxdiv: Option<&str>,
    ) -> Result<(Option<KMatrices>, Option<KMatrices>)> {
        if !with_j && !with_k {
            return Err(JkError::NothingRequested);
        }
        if with_k {
            self.check_exxdiv(ExxDiv::parse(exxdiv)?)?;
        }
        let vj = if with_j {
            Some(self.get_j_kpts(dm, hermi, kpts, kpts_band)?)
        } else {
            None
        };
        let vk = if with_k {
            Some(self.get_k_kpts(dm, hermi, kpts, kpts_band, exxdiv)?)
        } else {
            None
        };
        Ok((vj, vk))
    }

    /// Reduced dimensionality cannot drop the G = 0 exchange term silently.
    fn check_exxdiv(&self, exxdiv: ExxDiv) -> Result<()> {
        if self.cell.dimension < 3 && exxdiv == ExxDiv::None {
            return Err(JkError::ExxDivRequired {
                dimension: self.cell.dimension,
            });
        }
        Ok(())
    }

    fn check_density(&self, dm: &KMatrices, kpts: &[Vector3<f64>]) -> Result<()> {
        let (nset, nkpts, nao, nao2) = dm.dim();
        if kpts.is_empty() {
            return Err(JkError::ShapeMismatch {
                what: "number of k-points",
                expected: nkpts.max(1),
                found: 0,
            });
        }
        if nkpts != kpts.len() {
            return Err(JkError::ShapeMismatch {
                what: "density k-points",
                expected: kpts.len(),
                found: nkpts,
            });
        }
        if nao != self.ft.nao() || nao2 != nao {
            return Err(JkError::ShapeMismatch {
                what: "basis size",
                expected: self.ft.nao(),
                found: if nao != self.ft.nao() { nao } else { nao2 },
            });
        }
        if nset == 0 {
            return Err(JkError::ShapeMismatch {
                what: "number of density sets",
                expected: 1,
                found: 0,
            });
        }
        Ok(())
    }

    fn log_hermi(&self, hermi: Hermi) {
        debug!("density symmetry hint: {:?}", hermi);
    }

    /// Overlap at each k-point from the G = 0, q = 0 transform.
    fn g0_overlap(&self, kpts: &[Vector3<f64>]) -> Array3<Complex64> {
        let nao = self.ft.nao();
        let mut re = Array3::zeros((kpts.len(), nao * nao, 1));
        let mut im = Array3::zeros((kpts.len(), nao * nao, 1));
        self.ft
            .ft_aopair(&Vector3::zeros(), kpts, 0, 1, re.view_mut(), im.view_mut());
        let mut s = Array3::<Complex64>::zeros((kpts.len(), nao, nao));
        for (k, mut sk) in s.axis_iter_mut(Axis(0)).enumerate() {
            for p in 0..nao {
                for q in 0..nao {
                    sk[[p, q]] = Complex64::new(re[[k, p * nao + q, 0]], im[[k, p * nao + q, 0]]);
                }
            }
        }
        s
    }
}
