//! Uniform reciprocal-space grid G = Σ mᵢ bᵢ.

use nalgebra::Vector3;
use std::f64::consts::PI;

use crate::cell::{Cell, LatticeVector};
use crate::error::{JkError, Result};

#[derive(Debug, Clone)]
pub struct ReciprocalGrid {
    pub gs: [usize; 3],
    /// Miller indices in FFT order, axis 0 slowest.
    pub miller: Vec<[i32; 3]>,
    pub gv: Vec<Vector3<f64>>,
    /// Quadrature weight 1/Ω shared by all points.
    pub weight: f64,
}

/// Integer frequencies of one axis in FFT order: 0..=gs, then -gs..=-1.
fn fft_freqs(gs: usize) -> Vec<i32> {
    let gs = gs as i32;
    (0..=gs).chain(-gs..0).collect()
}

impl ReciprocalGrid {
    pub fn new(cell: &Cell, gs: [usize; 3]) -> Self {
        let lattice = &cell.lattice;
        let (f0, f1, f2) = (fft_freqs(gs[0]), fft_freqs(gs[1]), fft_freqs(gs[2]));
        let mut miller = Vec::with_capacity(f0.len() * f1.len() * f2.len());
        for &m0 in f0.iter() {
            for &m1 in f1.iter() {
                for &m2 in f2.iter() {
                    miller.push([m0, m1, m2]);
                }
            }
        }
        let gv = miller
            .iter()
            .map(|&m| lattice.reciprocal_translation(m))
            .collect();
        Self {
            gs,
            miller,
            gv,
            weight: 1.0 / cell.volume(),
        }
    }

    /// Grid whose extent along each axis covers the kinetic-energy cutoff |G|²/2.
    pub fn from_cutoff(cell: &Cell, ke_cutoff: f64) -> Result<Self> {
        let gs = cutoff_to_gs(&cell.lattice, ke_cutoff)?;
        Ok(Self::new(cell, gs))
    }

    pub fn mesh(&self) -> [usize; 3] {
        [2 * self.gs[0] + 1, 2 * self.gs[1] + 1, 2 * self.gs[2] + 1]
    }

    pub fn ngrids(&self) -> usize {
        self.gv.len()
    }
}

pub fn cutoff_to_gs(lattice: &LatticeVector, ke_cutoff: f64) -> Result<[usize; 3]> {
    if !(ke_cutoff > 0.0) {
        return Err(JkError::InvalidCell(format!(
            "kinetic energy cutoff must be positive, got {}",
            ke_cutoff
        )));
    }
    let gmax = (2.0 * ke_cutoff).sqrt();
    let mut gs = [0usize; 3];
    for i in 0..3 {
        gs[i] = (gmax * lattice.a(i).norm() / (2.0 * PI)).ceil() as usize;
    }
    Ok(gs)
}
