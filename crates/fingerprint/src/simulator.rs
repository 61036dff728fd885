//! Dense state-vector simulation of a [`Circuit`], sampled with a seeded RNG.
//!
//! Qubit `q` is bit `q` of the basis-state index; bit-strings are printed with
//! the highest qubit first.

use crate::circuit::{Circuit, Gate};
use crate::{bitstring, Distribution};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Amplitude {
    re: f64,
    im: f64,
}

impl Amplitude {
    const ZERO: Self = Self { re: 0.0, im: 0.0 };
    const ONE: Self = Self { re: 1.0, im: 0.0 };

    const fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    fn mul(self, other: Self) -> Self {
        Self {
            re: self.re.mul_add(other.re, -(self.im * other.im)),
            im: self.re.mul_add(other.im, self.im * other.re),
        }
    }

    fn add(self, other: Self) -> Self {
        Self {
            re: self.re + other.re,
            im: self.im + other.im,
        }
    }

    fn norm_sqr(self) -> f64 {
        self.re.mul_add(self.re, self.im * self.im)
    }
}

type Matrix2 = [[Amplitude; 2]; 2];

pub struct StateVector {
    num_qubits: usize,
    amplitudes: Vec<Amplitude>,
}

impl StateVector {
    /// `|0…0⟩` on `num_qubits` qubits.
    pub fn new(num_qubits: usize) -> Self {
        let mut amplitudes = vec![Amplitude::ZERO; 1usize << num_qubits];
        amplitudes[0] = Amplitude::ONE;
        Self {
            num_qubits,
            amplitudes,
        }
    }

    pub fn run(circuit: &Circuit) -> Self {
        let mut state = Self::new(circuit.num_qubits());
        for gate in circuit.gates() {
            state.apply(*gate);
        }
        state
    }

    pub fn apply(&mut self, gate: Gate) {
        match gate {
            Gate::Rx { qubit, theta } => {
                let (s, c) = (theta / 2.0).sin_cos();
                self.apply_single(
                    qubit,
                    [
                        [Amplitude::new(c, 0.0), Amplitude::new(0.0, -s)],
                        [Amplitude::new(0.0, -s), Amplitude::new(c, 0.0)],
                    ],
                );
            }
            Gate::Ry { qubit, theta } => {
                let (s, c) = (theta / 2.0).sin_cos();
                self.apply_single(
                    qubit,
                    [
                        [Amplitude::new(c, 0.0), Amplitude::new(-s, 0.0)],
                        [Amplitude::new(s, 0.0), Amplitude::new(c, 0.0)],
                    ],
                );
            }
            Gate::Rz { qubit, theta } => {
                let (s, c) = (theta / 2.0).sin_cos();
                self.apply_single(
                    qubit,
                    [
                        [Amplitude::new(c, -s), Amplitude::ZERO],
                        [Amplitude::ZERO, Amplitude::new(c, s)],
                    ],
                );
            }
            Gate::Cnot { control, target } => self.apply_cnot(control, target),
        }
    }

    fn apply_single(&mut self, qubit: usize, m: Matrix2) {
        let bit = 1usize << qubit;
        for i in 0..self.amplitudes.len() {
            if i & bit != 0 {
                continue;
            }
            let j = i | bit;
            let a0 = self.amplitudes[i];
            let a1 = self.amplitudes[j];
            self.amplitudes[i] = m[0][0].mul(a0).add(m[0][1].mul(a1));
            self.amplitudes[j] = m[1][0].mul(a0).add(m[1][1].mul(a1));
        }
    }

    fn apply_cnot(&mut self, control: usize, target: usize) {
        let control_bit = 1usize << control;
        let target_bit = 1usize << target;
        for i in 0..self.amplitudes.len() {
            if i & control_bit != 0 && i & target_bit == 0 {
                self.amplitudes.swap(i, i | target_bit);
            }
        }
    }

    pub fn probabilities(&self) -> Vec<f64> {
        self.amplitudes.iter().map(|a| a.norm_sqr()).collect()
    }

    /// Draws `shots` measurements; the RNG is seeded with `seed` alone.
    pub fn sample(&self, shots: u32, seed: u32) -> Distribution {
        let probabilities = self.probabilities();
        let mut cumulative = Vec::with_capacity(probabilities.len());
        let mut running = 0.0f64;
        for p in &probabilities {
            running += p;
            cumulative.push(running);
        }

        let last = probabilities.len() - 1;
        let mut hits = vec![0u64; probabilities.len()];
        let mut rng = ChaCha8Rng::seed_from_u64(u64::from(seed));
        for _ in 0..shots {
            let u = unit_interval(rng.next_u64()) * running;
            let idx = cumulative.partition_point(|c| *c <= u).min(last);
            hits[idx] += 1;
        }

        hits.into_iter()
            .enumerate()
            .filter(|(_, count)| *count > 0)
            .map(|(idx, count)| (bitstring(idx, self.num_qubits), count))
            .collect()
    }
}

/// Uniform `[0, 1)` from the top 53 bits.
fn unit_interval(bits: u64) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let mantissa = (bits >> 11) as f64;
    mantissa * (1.0 / 9_007_199_254_740_992.0)
}
