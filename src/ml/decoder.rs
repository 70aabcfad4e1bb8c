use burn::{
    nn::{LayerNorm, LayerNormConfig, Linear, LinearConfig},
    prelude::*,
    tensor::activation::leaky_relu,
};

use crate::error::ModelError;
use crate::ml::attention::{Attention, AttentionConfig};
use crate::ml::encoder::LEAKY_SLOPE;

#[derive(Config, Debug)]
pub struct DecoderBlockConfig {
    /// Width of the decoder stream (Time2Vec channels + close).
    pub hidden:        usize,
    /// Width of the fused encoder output used as keys and values.
    pub memory_width:  usize,
    pub heads:         usize,
    pub head_size:     usize,
    #[config(default = 4)]
    pub masked_heads:     usize,
    #[config(default = 32)]
    pub masked_head_size: usize,
    #[config(default = "vec![36, 18, 6]")]
    pub ff_widths:     Vec<usize>,
    #[config(default = 0.4)]
    pub dropout:       f64,
}

impl DecoderBlockConfig {
    pub fn validate(&self) -> Result<(), ModelError> {
        match self.ff_widths.last() {
            Some(&last) if last == self.hidden => Ok(()),
            _ => Err(ModelError::InvalidConfig(format!(
                "decoder feed-forward widths {:?} must end at the decoder width {}",
                self.ff_widths, self.hidden
            ))),
        }
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<DecoderBlock<B>, ModelError> {
        self.validate()?;

        let masked_attn = AttentionConfig::new(self.hidden, self.hidden, self.masked_heads, self.masked_head_size)
            .with_dropout(self.dropout)
            .init(device);
        let cross_attn = AttentionConfig::new(self.hidden, self.memory_width, self.heads, self.head_size)
            .with_dropout(self.dropout)
            .init(device);

        let mut feed_forward = Vec::with_capacity(self.ff_widths.len());
        let mut width_in = self.hidden;
        for &width_out in &self.ff_widths {
            feed_forward.push(LinearConfig::new(width_in, width_out).init(device));
            width_in = width_out;
        }

        Ok(DecoderBlock {
            masked_attn,
            norm_masked: LayerNormConfig::new(self.hidden).init(device),
            cross_attn,
            norm_cross: LayerNormConfig::new(self.hidden).init(device),
            feed_forward,
            norm_ff: LayerNormConfig::new(self.hidden).init(device),
            hidden: self.hidden,
        })
    }
}

/// Causal self-attention → add & norm → cross-attention over the encoder
/// memory → add & norm → feed-forward → add & norm.
#[derive(Module, Debug)]
pub struct DecoderBlock<B: Backend> {
    pub masked_attn:  Attention<B>,
    pub norm_masked:  LayerNorm<B>,
    pub cross_attn:   Attention<B>,
    pub norm_cross:   LayerNorm<B>,
    pub feed_forward: Vec<Linear<B>>,
    pub norm_ff:      LayerNorm<B>,
    hidden: usize,
}

impl<B: Backend> DecoderBlock<B> {
    /// `x` is `[b, t, hidden]`, `memory` is `[b, s, memory_width]`.
    pub fn forward(&self, x: Tensor<B, 3>, memory: Tensor<B, 3>) -> Result<Tensor<B, 3>, ModelError> {
        let [_, _, width] = x.dims();
        if width != self.hidden {
            return Err(ModelError::shape("decoder", format!("[_, _, {}]", self.hidden), &x.dims()));
        }

        let masked = self.masked_attn.forward(x.clone(), x.clone(), true)?;
        let x = self.norm_masked.forward(masked + x);

        let crossed = self.cross_attn.forward(x.clone(), memory, false)?;
        let x = self.norm_cross.forward(crossed + x);

        let ff = self
            .feed_forward
            .iter()
            .fold(x.clone(), |h, layer| leaky_relu(layer.forward(h), LEAKY_SLOPE));

        Ok(self.norm_ff.forward(ff + x))
    }
}
