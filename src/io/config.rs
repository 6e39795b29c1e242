use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;

use crate::cell::{Cell, LatticeVector, Shell};
use crate::error::{JkError, Result};
use crate::io::defaults;
use crate::kpts::monkhorst_pack;

fn default_dimension() -> usize {
    defaults::DIMENSION
}
fn default_precision() -> f64 {
    defaults::PRECISION
}
fn default_kmesh() -> [usize; 3] {
    defaults::KMESH
}
fn default_with_gamma() -> bool {
    defaults::KMESH_WITH_GAMMA
}
fn default_ke_cutoff() -> f64 {
    defaults::KE_CUTOFF
}
fn default_max_memory() -> f64 {
    defaults::MAX_MEMORY
}
fn default_true() -> bool {
    true
}

/// Settings of the AFT J/K builder.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AftJkConfig {
    /// Grid half-extent gs per axis; overrides `ke_cutoff` when present.
    #[serde(default)]
    pub mesh: Option<[usize; 3]>,
    #[serde(default = "default_ke_cutoff")]
    pub ke_cutoff: f64,
    /// Memory ceiling in MB.
    #[serde(default = "default_max_memory")]
    pub max_memory: f64,
    #[serde(default)]
    pub exxdiv: Option<String>,
}

impl Default for AftJkConfig {
    fn default() -> Self {
        Self {
            mesh: None,
            ke_cutoff: defaults::KE_CUTOFF,
            max_memory: defaults::MAX_MEMORY,
            exxdiv: None,
        }
    }
}

/// Cell geometry and basis as written in the job file (Bohr).
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CellConfig {
    /// Lattice vectors as rows.
    pub lattice: [[f64; 3]; 3],
    #[serde(default = "default_dimension")]
    pub dimension: usize,
    pub atoms: Vec<Vector3<f64>>,
    pub basis: Vec<Shell>,
    #[serde(default = "default_precision")]
    pub precision: f64,
}

impl CellConfig {
    pub fn build(&self) -> Result<Cell> {
        let rows = self.lattice;
        let lattice = LatticeVector::new(Matrix3::new(
            rows[0][0], rows[0][1], rows[0][2],
            rows[1][0], rows[1][1], rows[1][2],
            rows[2][0], rows[2][1], rows[2][2],
        ))?;
        Cell::with_precision(
            lattice,
            self.dimension,
            self.atoms.clone(),
            self.basis.clone(),
            self.precision,
        )
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct JobConfig {
    pub cell: CellConfig,
    #[serde(default = "default_kmesh")]
    pub kmesh: [usize; 3],
    #[serde(default = "default_with_gamma")]
    pub with_gamma: bool,
    /// Electrons per cell, used for the density guess.
    pub nelectron: f64,
    #[serde(default = "default_true")]
    pub with_j: bool,
    #[serde(default = "default_true")]
    pub with_k: bool,
    #[serde(default)]
    pub jk: AftJkConfig,
}

impl JobConfig {
    pub fn kpts(&self, cell: &Cell) -> Vec<Vector3<f64>> {
        monkhorst_pack(&cell.lattice, self.kmesh, self.with_gamma)
    }
}

pub fn parse_job_config(text: &str) -> Result<JobConfig> {
    serde_yaml::from_str(text).map_err(|e| JkError::Input(e.to_string()))
}

pub fn read_job_config(filename: &str) -> Result<JobConfig> {
    let file = File::open(filename).map_err(|e| JkError::Input(format!("{}: {}", filename, e)))?;
    let reader = BufReader::new(file);
    serde_yaml::from_reader(reader).map_err(|e| JkError::Input(format!("{}: {}", filename, e)))
}

// example of yaml file
// cell:
//   lattice: [[4.0, 0.0, 0.0], [0.0, 4.0, 0.0], [0.0, 0.0, 4.0]]
//   atoms: [[1.3, 2.0, 2.0], [2.7, 2.0, 2.0]]
//   basis:
//     - atom: 0
//       l: 0
//       exponents: [3.42525091, 0.62391373, 0.16885540]
//       coefficients: [0.15432897, 0.53532814, 0.44463454]
// kmesh: [2, 1, 1]
// nelectron: 2.0
// jk:
//   mesh: [5, 5, 5]
//   exxdiv: ewald
