//! Rust PBC - periodic Coulomb and exchange matrices from analytic Fourier transforms
//!
//! This crate builds J and K matrices for Gaussian basis sets in periodic cells
//! (with Brillouin-zone sampling) by transforming AO pair products analytically to a
//! reciprocal-space grid and contracting them with the Coulomb kernel.

pub mod cell;
pub mod coulomb;
pub mod error;
pub mod ewald;
pub mod ft;
pub mod grid;
pub mod io;
pub mod jk;
pub mod kconserv;
pub mod kpts;
pub mod matrices;
pub mod utils;
pub mod zdot;

// Re-export commonly used types at crate root
pub use cell::{Cell, LatticeVector, Shell};
pub use coulomb::{CoulombKernel, ExxDiv};
pub use error::{JkError, Result};
pub use ft::{AnalyticFt, AoPairFt, FtLoop};
pub use grid::ReciprocalGrid;
pub use io::{read_job_config, AftJkConfig, JobConfig};
pub use jk::{AftJk, Hermi, NumericPath};
pub use matrices::{inverse_overlap_guess, KMatrices};
