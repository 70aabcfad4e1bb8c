// ============================================================
// Layer 3 — WindowSample Domain Type
// ============================================================
// One training / inference unit. All four fields are measured
// from the same anchor day (the last daily bar inside the
// encoder windows):
//
//   encoder_input_eth  W weekly + L daily rows, [time, o, h, l, c, v]
//   encoder_input_btc  same anchor, other asset
//   decoder_input      [time, close] rows
//                        training:  7 rows, one step behind target
//                        held-out:  1 row, the last known close
//   target             the next 7 daily closes (labels only)

use serde::{Deserialize, Serialize};

use crate::domain::series::BAR_FEATURES;

/// Fixed forecast horizon in days.
pub const HORIZON: usize = 7;

/// Encoder row width: time scalar followed by the raw features.
pub const ENCODER_CHANNELS: usize = 1 + BAR_FEATURES;

/// Decoder row width: time scalar followed by the close price.
pub const DECODER_CHANNELS: usize = 2;

pub type EncoderRow = [f32; ENCODER_CHANNELS];
pub type DecoderRow = [f32; DECODER_CHANNELS];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSample {
    pub encoder_input_eth: Vec<EncoderRow>,
    pub encoder_input_btc: Vec<EncoderRow>,
    pub decoder_input:     Vec<DecoderRow>,
    pub target:            [f32; HORIZON],
}

impl WindowSample {
    /// The most recent close visible to the decoder. At inference
    /// time this is the seed of the autoregressive buffer.
    pub fn last_known_close(&self) -> Option<f32> {
        self.decoder_input.first().map(|row| row[1])
    }

    pub fn encoder_steps(&self) -> usize {
        self.encoder_input_eth.len()
    }

    pub fn decoder_steps(&self) -> usize {
        self.decoder_input.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_known_close_is_first_decoder_row() {
        let sample = WindowSample {
            encoder_input_eth: vec![[0.0; ENCODER_CHANNELS]; 3],
            encoder_input_btc: vec![[0.0; ENCODER_CHANNELS]; 3],
            decoder_input:     vec![[0.0, 4.2], [0.5, 9.9]],
            target:            [0.0; HORIZON],
        };
        assert_eq!(sample.last_known_close(), Some(4.2));
        assert_eq!(sample.encoder_steps(), 3);
        assert_eq!(sample.decoder_steps(), 2);
    }
}
