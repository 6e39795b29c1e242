//! Contracted Cartesian Gaussian basis functions.
//!
//! χ(r) = Σᵥ cᵥ (x-Aₓ)^lx (y-Aᵧ)^ly (z-A_z)^lz exp(-αᵥ |r-A|²)

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::error::{JkError, Result};

/// A contracted shell of angular momentum `l` on atom `atom`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Shell {
    pub atom: usize,
    pub l: usize,
    pub exponents: Vec<f64>,
    pub coefficients: Vec<f64>,
}

impl Shell {
    pub fn new(atom: usize, l: usize, exponents: Vec<f64>, coefficients: Vec<f64>) -> Self {
        Self {
            atom,
            l,
            exponents,
            coefficients,
        }
    }

    /// Number of Cartesian components, (l+1)(l+2)/2.
    pub fn ncart(&self) -> usize {
        (self.l + 1) * (self.l + 2) / 2
    }

    pub(crate) fn validate(&self, natoms: usize) -> Result<()> {
        if self.atom >= natoms {
            return Err(JkError::InvalidCell(format!(
                "shell refers to atom {} but the cell has {} atoms",
                self.atom, natoms
            )));
        }
        if self.exponents.is_empty() || self.exponents.len() != self.coefficients.len() {
            return Err(JkError::InvalidCell(format!(
                "shell on atom {} has {} exponents and {} coefficients",
                self.atom,
                self.exponents.len(),
                self.coefficients.len()
            )));
        }
        if self.exponents.iter().any(|&a| !(a > 0.0)) {
            return Err(JkError::InvalidCell(format!(
                "shell on atom {} has a non-positive exponent",
                self.atom
            )));
        }
        Ok(())
    }
}

/// One Cartesian component of a shell, normalised to unit self-overlap.
///
/// `coefficients` already contain the primitive normalisation.
#[derive(Debug, Clone)]
pub struct CartesianAo {
    pub center: Vector3<f64>,
    pub powers: [usize; 3],
    pub exponents: Vec<f64>,
    pub coefficients: Vec<f64>,
}

impl CartesianAo {
    fn new(center: Vector3<f64>, powers: [usize; 3], shell: &Shell) -> Self {
        let mut coefficients: Vec<f64> = shell
            .exponents
            .iter()
            .zip(shell.coefficients.iter())
            .map(|(&a, &c)| c * primitive_norm(a, powers))
            .collect();

        let mut overlap = 0.0;
        for (&a, &ca) in shell.exponents.iter().zip(coefficients.iter()) {
            for (&b, &cb) in shell.exponents.iter().zip(coefficients.iter()) {
                let p = a + b;
                let s: f64 = powers
                    .iter()
                    .map(|&l| double_factorial(2 * l as i64 - 1) / (2.0 * p).powi(l as i32) * (PI / p).sqrt())
                    .product();
                overlap += ca * cb * s;
            }
        }
        let scale = 1.0 / overlap.sqrt();
        coefficients.iter_mut().for_each(|c| *c *= scale);

        Self {
            center,
            powers,
            exponents: shell.exponents.clone(),
            coefficients,
        }
    }

    pub fn l(&self) -> usize {
        self.powers.iter().sum()
    }

    /// Value at `r` (non-periodic).
    pub fn evaluate(&self, r: &Vector3<f64>) -> f64 {
        let d = r - self.center;
        let angular = d.x.powi(self.powers[0] as i32)
            * d.y.powi(self.powers[1] as i32)
            * d.z.powi(self.powers[2] as i32);
        let r2 = d.norm_squared();
        let radial: f64 = self
            .exponents
            .iter()
            .zip(self.coefficients.iter())
            .map(|(&a, &c)| c * (-a * r2).exp())
            .sum();
        angular * radial
    }
}

/// Cartesian components of a shell: lx descending, then ly descending.
pub fn cartesian_powers(l: usize) -> Vec<[usize; 3]> {
    let mut powers = Vec::with_capacity((l + 1) * (l + 2) / 2);
    for lx in (0..=l).rev() {
        for ly in (0..=l - lx).rev() {
            powers.push([lx, ly, l - lx - ly]);
        }
    }
    powers
}

/// Expand shells into normalised Cartesian AOs.
pub fn build_aos(atoms: &[Vector3<f64>], shells: &[Shell]) -> Vec<CartesianAo> {
    shells
        .iter()
        .flat_map(|shell| {
            let center = atoms[shell.atom];
            cartesian_powers(shell.l)
                .into_iter()
                .map(move |powers| CartesianAo::new(center, powers, shell))
        })
        .collect()
}

fn double_factorial(n: i64) -> f64 {
    let mut r = 1.0;
    let mut k = n;
    while k > 1 {
        r *= k as f64;
        k -= 2;
    }
    r
}

fn primitive_norm(a: f64, powers: [usize; 3]) -> f64 {
    let l: usize = powers.iter().sum();
    let df: f64 = powers
        .iter()
        .map(|&li| double_factorial(2 * li as i64 - 1))
        .product();
    (2.0 * a / PI).powf(0.75) * (4.0 * a).powf(l as f64 / 2.0) / df.sqrt()
}

/// McMurchie-Davidson Hermite expansion coefficients E_t^{ij}, t = 0..=i+j.
///
/// `qx` is Aₓ - Bₓ, `a` and `b` the exponents on A and B.
pub fn hermite_e(i: usize, j: usize, qx: f64, a: f64, b: f64) -> Vec<f64> {
    let p = a + b;
    let mu = a * b / p;
    let xpa = -b / p * qx;
    let xpb = a / p * qx;
    let inv2p = 0.5 / p;

    let mut e = vec![0.0; i + j + 1];
    e[0] = (-mu * qx * qx).exp();
    let mut next = vec![0.0; i + j + 1];
    let mut order = 0;
    let step = |e: &mut Vec<f64>, next: &mut Vec<f64>, order: usize, x: f64| {
        for t in 0..=order + 1 {
            let mut v = x * e[t];
            if t > 0 {
                v += inv2p * e[t - 1];
            }
            if t < order {
                v += (t + 1) as f64 * e[t + 1];
            }
            next[t] = v;
        }
        std::mem::swap(e, next);
    };
    for _ in 0..i {
        step(&mut e, &mut next, order, xpa);
        order += 1;
    }
    for _ in 0..j {
        step(&mut e, &mut next, order, xpb);
        order += 1;
    }
    e
}
