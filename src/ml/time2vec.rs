// ============================================================
// Layer 5 — Time2Vec
// ============================================================
// Learned time encoding (Kazemi et al., 2019):
//
//   t2v(x)[0]   = x·w0 + b0[step]          (trend channel)
//   t2v(x)[1..] = sin(x·w  + b[step])      (k periodic channels)
//
// Biases are indexed by position, so the layer is built for a
// maximum step count. A shorter input uses the leading rows of
// the bias tables; a longer one is rejected.

use burn::{
    module::Param,
    nn::Initializer,
    prelude::*,
};

use crate::error::ModelError;

#[derive(Config, Debug)]
pub struct Time2VecConfig {
    /// Number of periodic channels.
    pub k: usize,
    /// Longest sequence the position-indexed biases cover.
    pub max_steps: usize,
    #[config(default = 1)]
    pub input_width: usize,
}

impl Time2VecConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Time2Vec<B> {
        let uniform = Initializer::Uniform { min: -0.05, max: 0.05 };
        Time2Vec {
            w0: uniform.init([self.input_width, 1], device),
            b0: uniform.init([self.max_steps, 1], device),
            w:  uniform.init([self.input_width, self.k], device),
            b:  uniform.init([self.max_steps, self.k], device),
            k:           self.k,
            max_steps:   self.max_steps,
            input_width: self.input_width,
        }
    }
}

#[derive(Module, Debug)]
pub struct Time2Vec<B: Backend> {
    pub w0: Param<Tensor<B, 2>>,
    pub b0: Param<Tensor<B, 2>>,
    pub w:  Param<Tensor<B, 2>>,
    pub b:  Param<Tensor<B, 2>>,
    k:           usize,
    max_steps:   usize,
    input_width: usize,
}

impl<B: Backend> Time2Vec<B> {
    /// `[batch, steps, input_width]` → `[batch, steps, k + 1]`
    pub fn forward(&self, x: Tensor<B, 3>) -> Result<Tensor<B, 3>, ModelError> {
        let [batch, steps, width] = x.dims();
        if width != self.input_width || steps == 0 || steps > self.max_steps {
            return Err(ModelError::shape(
                "time2vec",
                format!("[_, 1..={}, {}]", self.max_steps, self.input_width),
                &x.dims(),
            ));
        }

        let flat = x.reshape([batch * steps, width]);

        let b0 = self.b0.val()
            .slice([0..steps, 0..1])
            .unsqueeze::<3>()
            .expand([batch, steps, 1]);
        let trend = flat.clone().matmul(self.w0.val()).reshape([batch, steps, 1]) + b0;

        let b = self.b.val()
            .slice([0..steps, 0..self.k])
            .unsqueeze::<3>()
            .expand([batch, steps, self.k]);
        let periodic = (flat.matmul(self.w.val()).reshape([batch, steps, self.k]) + b).sin();

        Ok(Tensor::cat(vec![trend, periodic], 2))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TB = NdArray;

    fn ramp(batch: usize, steps: usize) -> Tensor<TB, 3> {
        let values: Vec<f32> = (0..batch * steps).map(|i| (i % steps) as f32 / steps as f32).collect();
        Tensor::from_data(TensorData::new(values, [batch, steps, 1]), &Default::default())
    }

    #[test]
    fn test_output_width_is_k_plus_one() {
        let layer = Time2VecConfig::new(4, 50).init::<TB>(&Default::default());
        let out = layer.forward(ramp(3, 50)).unwrap();
        assert_eq!(out.dims(), [3, 50, 5]);
    }

    #[test]
    fn test_shorter_sequences_truncate_the_bias() {
        let layer = Time2VecConfig::new(4, 7).init::<TB>(&Default::default());
        for steps in 1..=7 {
            let out = layer.forward(ramp(2, steps)).unwrap();
            assert_eq!(out.dims(), [2, steps, 5]);
        }
    }

    #[test]
    fn test_prefix_output_matches_full_output() {
        let layer = Time2VecConfig::new(3, 7).init::<TB>(&Default::default());
        let full: Vec<f32> = layer.forward(ramp(1, 7)).unwrap().into_data().to_vec().unwrap();

        // first 3 steps of a 7-step ramp
        let values: Vec<f32> = (0..3).map(|i| i as f32 / 7.0).collect();
        let short = Tensor::<TB, 3>::from_data(TensorData::new(values, [1, 3, 1]), &Default::default());
        let short: Vec<f32> = layer.forward(short).unwrap().into_data().to_vec().unwrap();

        for (a, b) in short.iter().zip(&full[..3 * 4]) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_forward_is_pure() {
        let layer = Time2VecConfig::new(4, 10).init::<TB>(&Default::default());
        let a: Vec<f32> = layer.forward(ramp(2, 10)).unwrap().into_data().to_vec().unwrap();
        let b: Vec<f32> = layer.forward(ramp(2, 10)).unwrap().into_data().to_vec().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_too_many_steps_is_rejected() {
        let layer = Time2VecConfig::new(4, 7).init::<TB>(&Default::default());
        let err = layer.forward(ramp(1, 8)).unwrap_err();
        assert!(matches!(err, ModelError::ShapeMismatch { block: "time2vec", .. }));
    }

    #[test]
    fn test_wrong_input_width_is_rejected() {
        let layer = Time2VecConfig::new(4, 7).init::<TB>(&Default::default());
        let x = Tensor::<TB, 3>::zeros([1, 7, 2], &Default::default());
        assert!(layer.forward(x).is_err());
    }
}
