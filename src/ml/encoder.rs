use burn::{
    nn::{LayerNorm, LayerNormConfig, Linear, LinearConfig},
    prelude::*,
    tensor::activation::leaky_relu,
};

use crate::error::ModelError;
use crate::ml::attention::{Attention, AttentionConfig};

pub(crate) const LEAKY_SLOPE: f64 = 0.3;

#[derive(Config, Debug)]
pub struct EncoderBlockConfig {
    /// Feature width in and out of the block.
    pub hidden:    usize,
    pub heads:     usize,
    pub head_size: usize,
    #[config(default = 3)]
    pub ff_layers: usize,
    #[config(default = 0.4)]
    pub dropout:   f64,
}

impl EncoderBlockConfig {
    /// Feed-forward widths `hidden * L / (i + 1)`; the last one is `hidden`.
    pub fn ff_widths(&self) -> Vec<usize> {
        (0..self.ff_layers)
            .map(|i| self.hidden * self.ff_layers / (i + 1))
            .collect()
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> EncoderBlock<B> {
        let self_attn = AttentionConfig::new(self.hidden, self.hidden, self.heads, self.head_size)
            .with_dropout(self.dropout)
            .init(device);

        let mut feed_forward = Vec::with_capacity(self.ff_layers);
        let mut width_in = self.hidden;
        for width_out in self.ff_widths() {
            feed_forward.push(LinearConfig::new(width_in, width_out).init(device));
            width_in = width_out;
        }

        EncoderBlock {
            self_attn,
            norm_attn: LayerNormConfig::new(self.hidden).init(device),
            feed_forward,
            norm_ff: LayerNormConfig::new(self.hidden).init(device),
            hidden: self.hidden,
        }
    }
}

/// Self-attention → add & norm → LeakyReLU feed-forward → add & norm.
#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pub self_attn:    Attention<B>,
    pub norm_attn:    LayerNorm<B>,
    pub feed_forward: Vec<Linear<B>>,
    pub norm_ff:      LayerNorm<B>,
    hidden: usize,
}

impl<B: Backend> EncoderBlock<B> {
    pub fn forward(&self, x: Tensor<B, 3>) -> Result<Tensor<B, 3>, ModelError> {
        let [_, _, width] = x.dims();
        if width != self.hidden {
            return Err(ModelError::shape("encoder", format!("[_, _, {}]", self.hidden), &x.dims()));
        }

        let attended = self.self_attn.forward(x.clone(), x.clone(), false)?;
        let x = self.norm_attn.forward(x + attended);

        let ff = self
            .feed_forward
            .iter()
            .fold(x.clone(), |h, layer| leaky_relu(layer.forward(h), LEAKY_SLOPE));

        Ok(self.norm_ff.forward(ff + x))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TB = NdArray;

    #[test]
    fn test_ff_widths_end_at_hidden() {
        let cfg = EncoderBlockConfig::new(10, 16, 64);
        assert_eq!(cfg.ff_widths(), vec![30, 15, 10]);
        assert_eq!(EncoderBlockConfig::new(7, 2, 4).with_ff_layers(4).ff_widths(), vec![28, 14, 9, 7]);
    }

    #[test]
    fn test_block_preserves_shape() {
        let block = EncoderBlockConfig::new(10, 4, 8).init::<TB>(&Default::default());
        let x = Tensor::<TB, 3>::random([2, 50, 10], burn::tensor::Distribution::Normal(0.0, 1.0), &Default::default());
        assert_eq!(block.forward(x).unwrap().dims(), [2, 50, 10]);
    }

    #[test]
    fn test_wrong_width_is_rejected() {
        let block = EncoderBlockConfig::new(10, 4, 8).init::<TB>(&Default::default());
        let x = Tensor::<TB, 3>::zeros([1, 5, 9], &Default::default());
        let err = block.forward(x).unwrap_err();
        assert!(matches!(err, ModelError::ShapeMismatch { block: "encoder", .. }));
    }
}
