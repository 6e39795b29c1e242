//! Momentum-conservation bookkeeping for exchange.
//!
//! A pair (ki, kj) of a band k-point and a sampling k-point is served by the
//! momentum transfer q = kpts[kj] - kpts_band[ki]. All pairs sharing one q are
//! processed together with a single stream of AO-pair transforms.

use log::trace;
use nalgebra::Vector3;
use ndarray::Array2;

use crate::kpts::{abs_sum, is_zero, KPT_TOL};

#[derive(Debug, Clone)]
pub struct KkTable {
    kpts_band: Vec<Vector3<f64>>,
    kpts: Vec<Vector3<f64>>,
    swap_2e: bool,
    todo: Array2<bool>,
}

impl KkTable {
    /// `swap_2e` lets a pair (ki, kj) also produce (kj, ki); it is only valid when
    /// the band set is the sampling set.
    pub fn new(kpts_band: &[Vector3<f64>], kpts: &[Vector3<f64>], swap_2e: bool) -> Self {
        Self {
            kpts_band: kpts_band.to_vec(),
            kpts: kpts.to_vec(),
            swap_2e: swap_2e && kpts_band.len() == kpts.len(),
            todo: Array2::from_elem((kpts_band.len(), kpts.len()), true),
        }
    }

    pub fn swap_2e(&self) -> bool {
        self.swap_2e
    }

    pub fn is_done(&self) -> bool {
        self.todo.iter().all(|&t| !t)
    }

    pub fn remaining(&self) -> usize {
        self.todo.iter().filter(|&&t| t).count()
    }

    /// Momentum transfer of the first unserved pair, band index outermost.
    pub fn next_shift(&self) -> Option<Vector3<f64>> {
        self.todo
            .indexed_iter()
            .find(|(_, t)| **t)
            .map(|((ki, kj), _)| self.kpts[kj] - self.kpts_band[ki])
    }

    /// Claim every unserved pair conserving momentum with `q`.
    ///
    /// Pairs are returned band-outer, sample-inner. With swap symmetry and q ≠ 0
    /// the mirrored pairs (kj, ki) are claimed too; the caller is responsible for
    /// filling them.
    pub fn resolve(&mut self, q: &Vector3<f64>) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for (ki, kb) in self.kpts_band.iter().enumerate() {
            for (kj, k) in self.kpts.iter().enumerate() {
                if self.todo[[ki, kj]] && abs_sum(&(kb - k + q)) < KPT_TOL {
                    pairs.push((ki, kj));
                }
            }
        }
        let mirror = self.swap_2e && !is_zero(q);
        for &(ki, kj) in pairs.iter() {
            self.todo[[ki, kj]] = false;
            if mirror {
                self.todo[[kj, ki]] = false;
            }
        }
        trace!("q = {:?}: pairs {:?}", q.as_slice(), pairs);
        pairs
    }
}
