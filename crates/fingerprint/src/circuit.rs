//! Seed-parametrized circuit layout.
//!
//! Every rotation angle is an HMAC-SHA256 of the layer/qubit coordinates keyed
//! by the input seed, so the layout is a pure function of
//! `(seed, num_qubits, depth)`.

use crate::error::{FingerprintError, Result};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::f64::consts::TAU;

type HmacSha256 = Hmac<Sha256>;

const ANGLE_SCALE: f64 = 4_294_967_296.0; // 2^32

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gate {
    Rx { qubit: usize, theta: f64 },
    Ry { qubit: usize, theta: f64 },
    Rz { qubit: usize, theta: f64 },
    Cnot { control: usize, target: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Circuit {
    num_qubits: usize,
    gates: Vec<Gate>,
}

impl Circuit {
    /// Layered rotation + entangling structure for `seed`.
    ///
    /// Layer `d` applies `Rx(theta) Ry(phi) Rz(0)` to every qubit, then a CNOT
    /// from each qubit `q` to `(q + d) mod num_qubits` whenever those differ.
    pub fn build(seed: u32, num_qubits: usize, depth: usize) -> Result<Self> {
        let mut gates = Vec::with_capacity(depth * num_qubits * 4);
        for layer in 0..depth {
            for qubit in 0..num_qubits {
                let theta = derive_angle(seed, layer, qubit, "theta")?;
                let phi = derive_angle(seed, layer, qubit, "phi")?;
                gates.push(Gate::Rx { qubit, theta });
                gates.push(Gate::Ry { qubit, theta: phi });
                gates.push(Gate::Rz { qubit, theta: 0.0 });
            }
            for qubit in 0..num_qubits {
                let target = (qubit + layer) % num_qubits;
                if qubit != target {
                    gates.push(Gate::Cnot {
                        control: qubit,
                        target,
                    });
                }
            }
        }
        Ok(Self { num_qubits, gates })
    }

    #[must_use]
    pub const fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    #[must_use]
    pub fn gates(&self) -> &[Gate] {
        &self.gates
    }
}

/// Angle in `[0, 2π)` from `HMAC(seed, "{layer}_{qubit}_{label}")`.
///
/// Only the low 32 bits of the big-endian digest are used.
pub fn derive_angle(seed: u32, layer: usize, qubit: usize, label: &str) -> Result<f64> {
    let mut mac = HmacSha256::new_from_slice(&seed.to_be_bytes())
        .map_err(|err| FingerprintError::KeyDerivation(err.to_string()))?;
    mac.update(format!("{layer}_{qubit}_{label}").as_bytes());
    let digest = mac.finalize().into_bytes();

    let mut low = [0u8; 4];
    low.copy_from_slice(&digest[digest.len() - 4..]);
    let value = u32::from_be_bytes(low);
    Ok(f64::from(value) / ANGLE_SCALE * TAU)
}
