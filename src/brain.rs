// --- File: brain.rs ---
use crate::constants::WEIGHT_LIMIT;
use crate::universe::SimRng;
use rand::Rng;

/// Online-learning controller: a fixed `inputs x outputs` weight matrix
/// whose weights are nudged by a Hebbian rule once per tick. Input and
/// output counts are fixed for the controller's lifetime.
#[derive(Debug, Clone)]
pub struct Brain {
    num_inputs: usize,
    num_outputs: usize,
    // Row-major: weights[i * num_outputs + j] connects input i to output j.
    weights: Vec<f32>,
    inputs: Vec<f32>,
    outputs: Vec<f32>,
}

impl Brain {
    pub fn new(num_inputs: usize, num_outputs: usize, rng: &mut SimRng) -> Self {
        let weights = (0..num_inputs * num_outputs)
            .map(|_| rng.gen_range(-1.0..1.0))
            .collect();
        Self {
            num_inputs,
            num_outputs,
            weights,
            inputs: vec![0.0; num_inputs],
            outputs: vec![0.0; num_outputs],
        }
    }

    #[inline]
    pub fn num_inputs(&self) -> usize {
        self.num_inputs
    }

    /// Store a percept, zero-padding up to the input width. Callers must
    /// not exceed the width.
    pub fn set_inputs(&mut self, percept: &[f32]) {
        debug_assert!(
            percept.len() <= self.num_inputs,
            "percept of {} exceeds input width {}",
            percept.len(),
            self.num_inputs
        );
        let n = percept.len().min(self.num_inputs);
        self.inputs[..n].copy_from_slice(&percept[..n]);
        self.inputs[n..].fill(0.0);
    }

    /// Propagate the stored inputs to the outputs. Deterministic for fixed
    /// weights and inputs; non-finite results are flushed to zero so a
    /// blown-up weight can never poison downstream arithmetic.
    pub fn run_net(&mut self) {
        for j in 0..self.num_outputs {
            let mut acc = 0.0;
            for i in 0..self.num_inputs {
                acc += self.inputs[i] * self.weights[i * self.num_outputs + j];
            }
            self.outputs[j] = if acc.is_finite() { acc } else { 0.0 };
        }
    }

    #[inline]
    pub fn outputs(&self) -> &[f32] {
        &self.outputs
    }

    #[inline]
    pub fn output(&self, index: usize) -> f32 {
        self.outputs.get(index).copied().unwrap_or(0.0)
    }

    /// Hebbian update over the last run: dw = input * output * rate * alpha,
    /// every weight clamped to the global magnitude limit.
    pub fn learn(&mut self, learning_rate: f32, alpha: f32) {
        let eta = learning_rate * alpha;
        for i in 0..self.num_inputs {
            let activity = self.inputs[i];
            if activity == 0.0 {
                continue;
            }
            for j in 0..self.num_outputs {
                let w = &mut self.weights[i * self.num_outputs + j];
                *w = (*w + activity * self.outputs[j] * eta).clamp(-WEIGHT_LIMIT, WEIGHT_LIMIT);
            }
        }
    }

    #[cfg(test)]
    pub fn set_weight(&mut self, input: usize, output: usize, value: f32) {
        self.weights[input * self.num_outputs + output] = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn brain(inputs: usize, outputs: usize) -> Brain {
        let mut rng = SimRng::seed_from_u64(3);
        Brain::new(inputs, outputs, &mut rng)
    }

    #[test]
    fn run_net_is_deterministic() {
        let mut b = brain(6, 4);
        b.set_inputs(&[0.5, -1.0, 2.0]);
        b.run_net();
        let first: Vec<f32> = b.outputs().to_vec();
        b.run_net();
        assert_eq!(first, b.outputs());
    }

    #[test]
    fn short_percepts_are_zero_padded() {
        let mut b = brain(4, 2);
        b.set_weight(0, 0, 1.0);
        b.set_weight(1, 0, 1.0);
        b.set_weight(2, 0, 1.0);
        b.set_weight(3, 0, 1.0);
        b.set_inputs(&[1.0, 2.0, 3.0, 4.0]);
        b.set_inputs(&[1.0]);
        b.run_net();
        // Stale tail inputs must not leak into the new propagation.
        assert_eq!(b.output(0), 1.0);
    }

    #[test]
    fn hebbian_update_strengthens_coactive_pairs() {
        let mut b = brain(2, 2);
        b.set_weight(0, 1, 0.0);
        b.set_weight(1, 0, 0.0);
        b.set_weight(1, 1, 0.0);
        b.set_weight(0, 0, 0.5);
        b.set_inputs(&[1.0, 0.0]);
        b.run_net();
        // output 0 = 0.5, output 1 = 0.0
        b.learn(1.0, 1.0);
        // dw(0,0) = 1.0 * 0.5, dw(0,1) stays, input 1 inactive.
        assert!((b.weights[0] - 1.0).abs() < 1e-6);
        assert_eq!(b.weights[1], 0.0);
        assert_eq!(b.weights[2], 0.0);
    }

    #[test]
    fn weights_stay_clamped() {
        let mut b = brain(1, 1);
        b.set_weight(0, 0, WEIGHT_LIMIT);
        b.set_inputs(&[100.0]);
        for _ in 0..50 {
            b.run_net();
            b.learn(0.01, 1.0);
        }
        assert!(b.weights[0].abs() <= WEIGHT_LIMIT);
        b.run_net();
        assert!(b.output(0).is_finite());
    }

    #[test]
    fn output_out_of_range_is_zero() {
        let b = brain(2, 2);
        assert_eq!(b.output(10), 0.0);
    }
}
