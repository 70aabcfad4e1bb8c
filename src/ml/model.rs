use burn::{
    nn::{LayerNorm, LayerNormConfig, Linear, LinearConfig},
    prelude::*,
};

use crate::error::ModelError;
use crate::ml::decoder::{DecoderBlock, DecoderBlockConfig};
use crate::ml::encoder::{EncoderBlock, EncoderBlockConfig};
use crate::ml::time2vec::{Time2Vec, Time2VecConfig};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize,
// do not derive them again.
#[derive(Config, Debug)]
pub struct ForecastTransformerConfig {
    #[config(default = 4)]
    pub k:                usize,
    /// Non-time channels of each encoder input (OHLCV).
    #[config(default = 5)]
    pub asset_features:   usize,
    /// Non-time channels of the decoder input (close).
    #[config(default = 1)]
    pub decoder_features: usize,
    #[config(default = 4)]
    pub encoder_number:   usize,
    #[config(default = 4)]
    pub decoder_number:   usize,
    #[config(default = 2)]
    pub fusion_number:    usize,
    #[config(default = 16)]
    pub amount_of_heads:  usize,
    #[config(default = 64)]
    pub size_of_head:     usize,
    #[config(default = 4)]
    pub masked_heads:     usize,
    #[config(default = 32)]
    pub masked_head_size: usize,
    #[config(default = 0.4)]
    pub dropout:          f64,
    #[config(default = 3)]
    pub encoder_ff_layers: usize,
    #[config(default = "vec![36, 18, 6]")]
    pub decoder_ff_widths: Vec<usize>,
    #[config(default = "vec![32, 16, 1]")]
    pub projection_widths: Vec<usize>,
    /// `week_length + sequence_length`.
    #[config(default = 50)]
    pub encoder_steps:    usize,
    #[config(default = 7)]
    pub decoder_steps:    usize,
}

impl ForecastTransformerConfig {
    /// Width of the encoder stream: Time2Vec channels plus OHLCV.
    pub fn encoder_width(&self) -> usize {
        self.k + 1 + self.asset_features
    }

    /// Width of the decoder stream: Time2Vec channels plus close.
    pub fn decoder_width(&self) -> usize {
        self.k + 1 + self.decoder_features
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        let invalid = |msg: String| Err(ModelError::InvalidConfig(msg));

        if self.amount_of_heads == 0 || self.size_of_head == 0 {
            return invalid(format!("cross attention needs heads and head size, got {}×{}", self.amount_of_heads, self.size_of_head));
        }
        if self.masked_heads == 0 || self.masked_head_size == 0 {
            return invalid(format!("masked attention needs heads and head size, got {}×{}", self.masked_heads, self.masked_head_size));
        }
        if self.encoder_ff_layers == 0 {
            return invalid("encoder feed-forward needs at least one layer".to_string());
        }
        if self.decoder_number == 0 {
            return invalid("at least one decoder block is required".to_string());
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return invalid(format!("dropout must be in [0, 1), got {}", self.dropout));
        }
        if self.encoder_steps == 0 || self.decoder_steps == 0 {
            return invalid(format!("step counts must be positive, got {}/{}", self.encoder_steps, self.decoder_steps));
        }
        if self.projection_widths.last() != Some(&1) {
            return invalid(format!("projection widths {:?} must end at 1", self.projection_widths));
        }
        self.decoder_block_config().validate()
    }

    fn encoder_block_config(&self) -> EncoderBlockConfig {
        EncoderBlockConfig::new(self.encoder_width(), self.amount_of_heads, self.size_of_head)
            .with_ff_layers(self.encoder_ff_layers)
            .with_dropout(self.dropout)
    }

    fn decoder_block_config(&self) -> DecoderBlockConfig {
        DecoderBlockConfig::new(self.decoder_width(), self.encoder_width(), self.amount_of_heads, self.size_of_head)
            .with_masked_heads(self.masked_heads)
            .with_masked_head_size(self.masked_head_size)
            .with_ff_widths(self.decoder_ff_widths.clone())
            .with_dropout(self.dropout)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<ForecastTransformer<B>, ModelError> {
        self.validate()?;

        let encoder_cfg = self.encoder_block_config();
        let decoder_cfg = self.decoder_block_config();
        let width = self.encoder_width();

        let encoder_stack = |n: usize| -> Vec<EncoderBlock<B>> {
            (0..n).map(|_| encoder_cfg.init(device)).collect()
        };

        let decoders = (0..self.decoder_number)
            .map(|_| decoder_cfg.init(device))
            .collect::<Result<Vec<_>, _>>()?;

        let mut projection = Vec::with_capacity(self.projection_widths.len());
        let mut width_in = self.decoder_width();
        for &width_out in &self.projection_widths {
            projection.push(LinearConfig::new(width_in, width_out).init(device));
            width_in = width_out;
        }

        Ok(ForecastTransformer {
            time2vec_eth:     Time2VecConfig::new(self.k, self.encoder_steps).init(device),
            time2vec_btc:     Time2VecConfig::new(self.k, self.encoder_steps).init(device),
            time2vec_decoder: Time2VecConfig::new(self.k, self.decoder_steps).init(device),
            encoders_eth:     encoder_stack(self.encoder_number),
            encoders_btc:     encoder_stack(self.encoder_number),
            norm_eth_btc:     LayerNormConfig::new(width).init(device),
            fusion:           encoder_stack(self.fusion_number),
            norm_fusion:      LayerNormConfig::new(width).init(device),
            decoders,
            projection,
            encoder_channels: 1 + self.asset_features,
            decoder_channels: 1 + self.decoder_features,
        })
    }
}

/// Two per-asset encoder stacks, a fusion stack over their normalised sum,
/// a decoder stack attending to the fused memory and a linear projection.
#[derive(Module, Debug)]
pub struct ForecastTransformer<B: Backend> {
    pub time2vec_eth:     Time2Vec<B>,
    pub time2vec_btc:     Time2Vec<B>,
    pub time2vec_decoder: Time2Vec<B>,
    pub encoders_eth:     Vec<EncoderBlock<B>>,
    pub encoders_btc:     Vec<EncoderBlock<B>>,
    pub norm_eth_btc:     LayerNorm<B>,
    pub fusion:           Vec<EncoderBlock<B>>,
    pub norm_fusion:      LayerNorm<B>,
    pub decoders:         Vec<DecoderBlock<B>>,
    pub projection:       Vec<Linear<B>>,
    encoder_channels: usize,
    decoder_channels: usize,
}

/// Split `[b, s, c]` into the leading time column and the remaining features.
fn split_time_column<B: Backend>(x: Tensor<B, 3>) -> (Tensor<B, 3>, Tensor<B, 3>) {
    let [batch, steps, channels] = x.dims();
    let time     = x.clone().slice([0..batch, 0..steps, 0..1]);
    let features = x.slice([0..batch, 0..steps, 1..channels]);
    (time, features)
}

impl<B: Backend> ForecastTransformer<B> {
    /// eth, btc: `[b, s, 6]`, decoder: `[b, t, 2]` → `[b, t, 1]`
    pub fn forward(
        &self,
        eth:     Tensor<B, 3>,
        btc:     Tensor<B, 3>,
        decoder: Tensor<B, 3>,
    ) -> Result<Tensor<B, 3>, ModelError> {
        let [batch, steps, channels] = eth.dims();
        if channels != self.encoder_channels {
            return Err(ModelError::shape("transformer.eth", format!("[_, _, {}]", self.encoder_channels), &eth.dims()));
        }
        if btc.dims() != [batch, steps, channels] {
            return Err(ModelError::shape("transformer.btc", format!("[{batch}, {steps}, {channels}]"), &btc.dims()));
        }
        let [decoder_batch, _, decoder_channels] = decoder.dims();
        if decoder_batch != batch || decoder_channels != self.decoder_channels {
            return Err(ModelError::shape(
                "transformer.decoder",
                format!("[{batch}, _, {}]", self.decoder_channels),
                &decoder.dims(),
            ));
        }

        let eth = Self::run_stack(&self.encoders_eth, self.embed(&self.time2vec_eth, eth)?)?;
        let btc = Self::run_stack(&self.encoders_btc, self.embed(&self.time2vec_btc, btc)?)?;

        let pre_fusion = self.norm_eth_btc.forward(eth + btc);
        let fused      = Self::run_stack(&self.fusion, pre_fusion.clone())?;
        let memory     = self.norm_fusion.forward(fused + pre_fusion);

        let mut x = self.embed(&self.time2vec_decoder, decoder)?;
        for block in &self.decoders {
            x = block.forward(x, memory.clone())?;
        }

        Ok(self.projection.iter().fold(x, |h, layer| layer.forward(h)))
    }

    /// Replace the raw time column with its Time2Vec encoding.
    fn embed(&self, time2vec: &Time2Vec<B>, x: Tensor<B, 3>) -> Result<Tensor<B, 3>, ModelError> {
        let (time, features) = split_time_column(x);
        Ok(Tensor::cat(vec![time2vec.forward(time)?, features], 2))
    }

    fn run_stack(stack: &[EncoderBlock<B>], x: Tensor<B, 3>) -> Result<Tensor<B, 3>, ModelError> {
        stack.iter().try_fold(x, |h, block| block.forward(h))
    }
}
