// ============================================================
// Layer 5 — Multi-Head Attention
// ============================================================
// Scaled dot-product attention with independent widths:
//
//   query  [b, sq, query_width]
//   kv     [b, sk, kv_width]
//   Q,K,V  projected to heads × head_size (not tied to the model width)
//   output projected back to query_width
//
// Burn's built-in MultiHeadAttention ties head width to d_model / heads,
// which does not fit a 6-wide decoder attending with 16 heads of 64.
//
// The causal variant adds a -1e4 bias above the diagonal before the
// softmax, so position i only sees keys 0..=i.

use burn::{
    nn::{Dropout, DropoutConfig, Linear, LinearConfig},
    prelude::*,
    tensor::activation::softmax,
};

use crate::error::ModelError;

const MASKED_SCORE: f32 = -1.0e4;

#[derive(Config, Debug)]
pub struct AttentionConfig {
    pub query_width: usize,
    pub kv_width:    usize,
    pub heads:       usize,
    pub head_size:   usize,
    #[config(default = 0.0)]
    pub dropout:     f64,
}

impl AttentionConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Attention<B> {
        let inner = self.heads * self.head_size;
        Attention {
            query:   LinearConfig::new(self.query_width, inner).init(device),
            key:     LinearConfig::new(self.kv_width, inner).init(device),
            value:   LinearConfig::new(self.kv_width, inner).init(device),
            output:  LinearConfig::new(inner, self.query_width).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
            heads:       self.heads,
            head_size:   self.head_size,
            query_width: self.query_width,
            kv_width:    self.kv_width,
        }
    }
}

#[derive(Module, Debug)]
pub struct Attention<B: Backend> {
    query:   Linear<B>,
    key:     Linear<B>,
    value:   Linear<B>,
    output:  Linear<B>,
    dropout: Dropout,
    heads:       usize,
    head_size:   usize,
    query_width: usize,
    kv_width:    usize,
}

impl<B: Backend> Attention<B> {
    /// Attend from `query` over `kv`. With `causal`, both must have the
    /// same number of steps.
    pub fn forward(
        &self,
        query:  Tensor<B, 3>,
        kv:     Tensor<B, 3>,
        causal: bool,
    ) -> Result<Tensor<B, 3>, ModelError> {
        let [batch, sq, dq] = query.dims();
        let [kv_batch, sk, dk] = kv.dims();

        if dq != self.query_width {
            return Err(ModelError::shape("attention.query", format!("[_, _, {}]", self.query_width), &query.dims()));
        }
        if dk != self.kv_width || kv_batch != batch {
            return Err(ModelError::shape("attention.kv", format!("[{batch}, _, {}]", self.kv_width), &kv.dims()));
        }
        if causal && sq != sk {
            return Err(ModelError::shape("attention.causal", format!("[{batch}, {sq}, _]"), &kv.dims()));
        }

        let split_heads = |x: Tensor<B, 3>, steps: usize| {
            x.reshape([batch, steps, self.heads, self.head_size]).swap_dims(1, 2)
        };
        let q = split_heads(self.query.forward(query), sq);
        let k = split_heads(self.key.forward(kv.clone()), sk);
        let v = split_heads(self.value.forward(kv), sk);

        // [b, h, sq, sk]
        let scores = q.matmul(k.swap_dims(2, 3)).div_scalar((self.head_size as f32).sqrt());
        let scores = if causal {
            scores + self.causal_bias(batch, sq, &v.device())
        } else {
            scores
        };

        let weights = self.dropout.forward(softmax(scores, 3));
        let context = weights
            .matmul(v)
            .swap_dims(1, 2)
            .reshape([batch, sq, self.heads * self.head_size]);

        Ok(self.output.forward(context))
    }

    fn causal_bias(&self, batch: usize, steps: usize, device: &B::Device) -> Tensor<B, 4> {
        let bias: Vec<f32> = (0..steps)
            .flat_map(|i| (0..steps).map(move |j| if j > i { MASKED_SCORE } else { 0.0 }))
            .collect();
        Tensor::<B, 2>::from_data(TensorData::new(bias, [steps, steps]), device)
            .unsqueeze::<4>()
            .expand([batch, self.heads, steps, steps])
    }
}
