// ============================================================
// Layer 4 — Window Builder
// ============================================================
// Turns scaled daily + weekly series into fixed-length samples.
//
// Encoder window for anchor i (rows are chronological, coarse
// to fine):
//
//   weekly[i/7 .. i/7 + W]  ++  daily[i .. i + L]
//   time column: linspace(0,1,W) ++ linspace(0,1,L)
//
// Leading / trailing rows are dropped first so that the daily
// and weekly series start on the same calendar date and the
// first anchor already has W full weeks of history. The two
// partitions use different offsets because the held-out tail
// starts at an arbitrary date:
//
//                      train          held-out
//   daily  lead/tail   3 / 2          4 / 0
//   weekly lead/tail   1 / 2          0 / 0
//   history lead       W*6 + 3        W*6 + 2
//   target lead        W*6 + L + 3    W*6 + L + 2
//   decoder lead       W*6 + L + 2    W*6 + L + 1
//
// The decoder always starts one row before the target: in
// training it is the 7-row teacher-forcing sequence, held out it
// is only the single last known close.
//
// An anchor that cannot fill a whole window ends iteration; that
// is the natural end of the data, not an error.

use crate::domain::sample::{DecoderRow, EncoderRow, WindowSample, HORIZON};
use crate::domain::series::{FeatureRow, CLOSE_COLUMN};

/// Daily bars per weekly bar.
const DAYS_PER_WEEK: usize = 7;

/// Lookback geometry of one encoder window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowGeometry {
    /// Daily lookback length (L).
    pub sequence_length: usize,
    /// Weekly lookback length (W).
    pub week_length: usize,
}

impl WindowGeometry {
    pub fn new(sequence_length: usize, week_length: usize) -> Self {
        Self { sequence_length, week_length }
    }

    pub fn encoder_steps(&self) -> usize {
        self.week_length + self.sequence_length
    }

    fn history_rows(&self) -> usize {
        self.week_length * 6
    }
}

impl Default for WindowGeometry {
    fn default() -> Self {
        Self::new(42, 8)
    }
}

/// Which side of the chronological split a window is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    Train,
    HeldOut,
}

struct WindowOffsets {
    daily_lead:   usize,
    daily_tail:   usize,
    weekly_lead:  usize,
    weekly_tail:  usize,
    history_lead: usize,
    target_lead:  usize,
}

impl Partition {
    fn offsets(self) -> WindowOffsets {
        match self {
            Partition::Train => WindowOffsets {
                daily_lead:   3,
                daily_tail:   2,
                weekly_lead:  1,
                weekly_tail:  2,
                history_lead: 3,
                target_lead:  3,
            },
            Partition::HeldOut => WindowOffsets {
                daily_lead:   4,
                daily_tail:   0,
                weekly_lead:  0,
                weekly_tail:  0,
                history_lead: 2,
                target_lead:  2,
            },
        }
    }
}

/// `rows[lead .. len - tail]`, empty when nothing is left.
fn trim<T>(rows: &[T], lead: usize, tail: usize) -> &[T] {
    let end = rows.len().saturating_sub(tail);
    if lead >= end {
        return &[];
    }
    &rows[lead..end]
}

/// `n` evenly spaced values over `[0, 1]`, endpoints included.
pub fn linspace01(n: usize) -> Vec<f32> {
    match n {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => (0..n).map(|i| (i as f64 / (n - 1) as f64) as f32).collect(),
    }
}

/// Time column of an encoder window: weekly ramp then daily ramp.
pub fn encoder_time_column(geometry: &WindowGeometry) -> Vec<f32> {
    let mut column = linspace01(geometry.week_length);
    column.extend(linspace01(geometry.sequence_length));
    column
}

/// Time column of the decoder: one fixed 7-point ramp. Shorter decoder
/// buffers use its prefix.
pub fn decoder_time_column() -> Vec<f32> {
    linspace01(HORIZON)
}

fn close_column(daily: &[FeatureRow], partition: Partition) -> Vec<f32> {
    let off = partition.offsets();
    trim(daily, off.daily_lead, off.daily_tail)
        .iter()
        .map(|row| row[CLOSE_COLUMN])
        .collect()
}

/// Build one encoder block per valid anchor.
pub fn build_encoder_windows(
    daily:     &[FeatureRow],
    weekly:    &[FeatureRow],
    geometry:  &WindowGeometry,
    partition: Partition,
) -> Vec<Vec<EncoderRow>> {
    let off    = partition.offsets();
    let daily  = trim(daily, off.daily_lead, off.daily_tail);
    let weekly = trim(weekly, off.weekly_lead, off.weekly_tail);
    let daily  = trim(daily, geometry.history_rows() + off.history_lead, HORIZON);

    let seq_len = geometry.sequence_length;
    let steps   = geometry.encoder_steps();
    let time    = encoder_time_column(geometry);

    let mut windows = Vec::new();
    for i in 0..daily.len() {
        if i + seq_len > daily.len() {
            break;
        }

        let week_start = (i / DAYS_PER_WEEK).min(weekly.len());
        let week_end   = (week_start + geometry.week_length).min(weekly.len());
        let week_rows  = &weekly[week_start..week_end];
        if week_rows.len() + seq_len != steps {
            break;
        }

        let rows: Vec<EncoderRow> = week_rows
            .iter()
            .chain(&daily[i..i + seq_len])
            .zip(&time)
            .map(|(f, &t)| [t, f[0], f[1], f[2], f[3], f[4]])
            .collect();
        windows.push(rows);
    }
    windows
}

/// All 7-day forward close windows, first one starting the day after
/// the first encoder anchor.
pub fn build_targets(
    daily:     &[FeatureRow],
    geometry:  &WindowGeometry,
    partition: Partition,
) -> Vec<[f32; HORIZON]> {
    let closes = close_column(daily, partition);
    let start  = geometry.history_rows() + geometry.sequence_length + partition.offsets().target_lead;
    let closes = closes.get(start..).unwrap_or(&[]);

    closes
        .windows(HORIZON)
        .map(|w| {
            let mut target = [0.0; HORIZON];
            target.copy_from_slice(w);
            target
        })
        .collect()
}

/// Decoder inputs for one partition.
///
/// Train: 7 rows `[t, close]` starting one day before the target, i.e.
/// the shifted target used for teacher forcing.
/// Held-out: one row `[0, last known close]`; the remaining six inputs
/// are produced by the model itself at inference time.
pub fn build_decoder_inputs(
    daily:     &[FeatureRow],
    geometry:  &WindowGeometry,
    partition: Partition,
) -> Vec<Vec<DecoderRow>> {
    let closes = close_column(daily, partition);
    let start  = geometry.history_rows() + geometry.sequence_length + partition.offsets().target_lead - 1;
    let closes = closes.get(start..).unwrap_or(&[]);
    let count  = closes.len().saturating_sub(HORIZON);

    match partition {
        Partition::Train => {
            let time = decoder_time_column();
            closes
                .windows(HORIZON)
                .take(count)
                .map(|w| w.iter().zip(&time).map(|(&c, &t)| [t, c]).collect())
                .collect()
        }
        Partition::HeldOut => closes
            .iter()
            .take(count)
            .map(|&c| vec![[0.0, c]])
            .collect(),
    }
}

/// Scaled daily + weekly rows of one asset.
pub struct AssetRows<'a> {
    pub daily:  &'a [FeatureRow],
    pub weekly: &'a [FeatureRow],
}

/// Zip encoder windows of both assets with the ETH decoder inputs and
/// targets into samples. All sequences start at the same anchor; if one
/// runs out early the rest are truncated to match.
pub fn assemble_samples(
    eth:       AssetRows<'_>,
    btc:       AssetRows<'_>,
    geometry:  &WindowGeometry,
    partition: Partition,
) -> Vec<WindowSample> {
    let eth_windows = build_encoder_windows(eth.daily, eth.weekly, geometry, partition);
    let btc_windows = build_encoder_windows(btc.daily, btc.weekly, geometry, partition);
    let decoder     = build_decoder_inputs(eth.daily, geometry, partition);
    let targets     = build_targets(eth.daily, geometry, partition);

    let lengths = [eth_windows.len(), btc_windows.len(), decoder.len(), targets.len()];
    let count   = lengths.iter().copied().min().unwrap_or(0);
    if lengths.iter().any(|&n| n != count) {
        tracing::warn!(
            "{:?} windows disagree in length (eth, btc, decoder, target) = {:?}; truncating to {}",
            partition,
            lengths,
            count,
        );
    }

    eth_windows
        .into_iter()
        .zip(btc_windows)
        .zip(decoder)
        .zip(targets)
        .map(|(((encoder_input_eth, encoder_input_btc), decoder_input), target)| WindowSample {
            encoder_input_eth,
            encoder_input_btc,
            decoder_input,
            target,
        })
        .collect()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    /// Daily row r carries the value r in every column, so a value seen in
    /// a window tells exactly which calendar day it came from.
    fn indexed_daily(n: usize) -> Vec<FeatureRow> {
        (0..n).map(|r| [r as f32; 5]).collect()
    }

    /// Weekly row k closes on daily day 7k + 2 (weekly row 1 covers daily
    /// rows 3..=9, matching the train alignment offsets).
    fn indexed_weekly(n: usize) -> Vec<FeatureRow> {
        (0..n).map(|k| [(7 * k + 2) as f32; 5]).collect()
    }

    const ENC_CLOSE: usize = 1 + CLOSE_COLUMN;

    #[test]
    fn test_linspace_matches_endpoints() {
        assert_eq!(linspace01(1), vec![0.0]);
        assert_eq!(linspace01(3), vec![0.0, 0.5, 1.0]);
        let t = decoder_time_column();
        assert_eq!(t.len(), HORIZON);
        assert_eq!(t[0], 0.0);
        assert_eq!(t[6], 1.0);
    }

    #[test]
    fn test_every_block_has_full_length() {
        for &(seq, week) in &[(42, 8), (10, 4), (7, 1), (3, 2)] {
            let g = WindowGeometry::new(seq, week);
            for partition in [Partition::Train, Partition::HeldOut] {
                let windows = build_encoder_windows(&indexed_daily(300), &indexed_weekly(60), &g, partition);
                assert!(!windows.is_empty(), "no windows for {seq}/{week}");
                let time = encoder_time_column(&g);
                for w in &windows {
                    assert_eq!(w.len(), seq + week);
                    let t: Vec<f32> = w.iter().map(|r| r[0]).collect();
                    assert_eq!(t, time);
                }
            }
        }
    }

    #[test]
    fn test_constant_series_end_to_end_count() {
        use crate::data::scaler::ScaledSplit;
        use crate::domain::series::{Asset, Bar, Frequency, TimeSeries};

        let daily  = TimeSeries::new(Asset::Eth, Frequency::Daily,  vec![Bar::new(1.0, 1.0, 1.0, 1.0, 1.0); 200]);
        let weekly = TimeSeries::new(Asset::Eth, Frequency::Weekly, vec![Bar::new(1.0, 1.0, 1.0, 1.0, 1.0); 40]);
        let daily  = ScaledSplit::fit_on_train(&daily, 0.0).unwrap();
        let weekly = ScaledSplit::fit_on_train(&weekly, 0.0).unwrap();
        let g = WindowGeometry::new(10, 4);

        // 3 + 2 alignment, 4*6 + 3 history, 7 horizon
        let drop_offset = 3 + 2 + (4 * 6 + 3) + 7;
        let expected = (200usize - drop_offset - 10 + 1).max(0);
        assert_eq!(expected, 152);

        let rows = || AssetRows { daily: daily.train.rows(), weekly: weekly.train.rows() };
        let samples = assemble_samples(rows(), rows(), &g, Partition::Train);
        assert_eq!(samples.len(), expected);
        assert_eq!(build_encoder_windows(daily.train.rows(), weekly.train.rows(), &g, Partition::Train).len(), expected);
        assert_eq!(build_targets(daily.train.rows(), &g, Partition::Train).len(), expected);
        assert_eq!(build_decoder_inputs(daily.train.rows(), &g, Partition::Train).len(), expected);

        for s in &samples {
            for row in s.encoder_input_eth.iter().chain(&s.encoder_input_btc) {
                assert!(row[1..].iter().all(|&v| v == 0.0));
            }
        }
    }

    #[test]
    fn test_no_input_row_is_later_than_the_anchor() {
        for &(seq, week) in &[(10, 4), (42, 8)] {
            let g      = WindowGeometry::new(seq, week);
            let daily  = indexed_daily(400);
            let weekly = indexed_weekly(70);
            let rows   = || AssetRows { daily: &daily, weekly: &weekly };
            let samples = assemble_samples(rows(), rows(), &g, Partition::Train);
            assert!(!samples.is_empty());

            for s in &samples {
                let anchor = s.encoder_input_eth.last().unwrap()[ENC_CLOSE];
                for row in s.encoder_input_eth.iter().chain(&s.encoder_input_btc) {
                    assert!(row[1..].iter().all(|&v| v <= anchor), "row {row:?} after anchor {anchor}");
                }
                // the daily part is exactly the L days ending at the anchor
                let daily_part: Vec<f32> = s.encoder_input_eth[week..].iter().map(|r| r[ENC_CLOSE]).collect();
                let expected: Vec<f32> = (0..seq).map(|j| anchor - (seq - 1 - j) as f32).collect();
                assert_eq!(daily_part, expected);

                // labels are strictly the future
                for (j, &t) in s.target.iter().enumerate() {
                    assert_eq!(t, anchor + 1.0 + j as f32);
                }
                // teacher forcing: decoder row j is target j-1, row 0 the anchor
                assert_eq!(s.decoder_input.len(), HORIZON);
                assert_eq!(s.decoder_input[0][1], anchor);
                for j in 1..HORIZON {
                    assert_eq!(s.decoder_input[j][1], s.target[j - 1]);
                }
            }
        }
    }

    #[test]
    fn test_held_out_inputs_are_not_later_than_the_anchor() {
        for &(seq, week) in &[(10, 4), (42, 8)] {
            let g      = WindowGeometry::new(seq, week);
            let daily  = indexed_daily(400);
            let weekly = indexed_weekly(70);
            let rows   = || AssetRows { daily: &daily, weekly: &weekly };
            let samples = assemble_samples(rows(), rows(), &g, Partition::HeldOut);
            assert!(!samples.is_empty());

            for s in &samples {
                let anchor = s.encoder_input_eth.last().unwrap()[ENC_CLOSE];
                for encoder in [&s.encoder_input_eth, &s.encoder_input_btc] {
                    let (weekly_part, daily_part) = encoder.split_at(week);
                    for row in weekly_part {
                        assert!(row[1..].iter().all(|&v| v <= anchor), "weekly row {row:?} after anchor {anchor}");
                    }
                    let closes: Vec<f32> = daily_part.iter().map(|r| r[ENC_CLOSE]).collect();
                    let expected: Vec<f32> = (0..seq).map(|j| anchor - (seq - 1 - j) as f32).collect();
                    assert_eq!(closes, expected);
                }
                assert_eq!(s.last_known_close(), Some(anchor));
                assert!(s.target.iter().all(|&t| t > anchor));
            }
        }
    }

    #[test]
    fn test_held_out_decoder_sees_only_last_known_close() {
        let g      = WindowGeometry::new(10, 4);
        let daily  = indexed_daily(150);
        let weekly = indexed_weekly(30);
        let rows   = || AssetRows { daily: &daily, weekly: &weekly };
        let samples = assemble_samples(rows(), rows(), &g, Partition::HeldOut);

        // N - 6W - L - 12 anchors
        assert_eq!(samples.len(), 150 - 24 - 10 - 12);
        for s in &samples {
            let anchor = s.encoder_input_eth.last().unwrap()[ENC_CLOSE];
            assert_eq!(s.decoder_input, vec![[0.0, anchor]]);
            assert_eq!(s.last_known_close(), Some(anchor));
            assert_eq!(s.target[0], anchor + 1.0);
            assert!(s.target.iter().all(|&t| t > anchor));
        }
    }

    #[test]
    fn test_train_and_held_out_decoders_differ_by_design() {
        // Train feeds the full shifted target (teacher forcing), held-out
        // feeds a single seed row. Both start one day before the target.
        let g     = WindowGeometry::new(10, 4);
        let daily = indexed_daily(200);
        let train = build_decoder_inputs(&daily, &g, Partition::Train);
        let held  = build_decoder_inputs(&daily, &g, Partition::HeldOut);
        assert!(train.iter().all(|d| d.len() == HORIZON));
        assert!(held.iter().all(|d| d.len() == 1));

        let train_targets = build_targets(&daily, &g, Partition::Train);
        let held_targets  = build_targets(&daily, &g, Partition::HeldOut);
        assert_eq!(train[0][0][1] + 1.0, train_targets[0][0]);
        assert_eq!(held[0][0][1] + 1.0, held_targets[0][0]);
    }

    #[test]
    fn test_short_series_yields_nothing() {
        let g = WindowGeometry::default();
        let daily  = indexed_daily(30);
        let weekly = indexed_weekly(5);
        assert!(build_encoder_windows(&daily, &weekly, &g, Partition::Train).is_empty());
        assert!(build_targets(&daily, &g, Partition::Train).is_empty());
        assert!(build_decoder_inputs(&daily, &g, Partition::HeldOut).is_empty());
        let rows = || AssetRows { daily: &daily, weekly: &weekly };
        assert!(assemble_samples(rows(), rows(), &g, Partition::Train).is_empty());
    }

    #[test]
    fn test_exhausted_weekly_series_stops_iteration() {
        let g = WindowGeometry::new(10, 4);
        // plenty of daily rows but only enough weekly rows for a few anchors
        let windows = build_encoder_windows(&indexed_daily(400), &indexed_weekly(8), &g, Partition::Train);
        // weekly after [1..-2] has 5 rows → week_start may be 0 or 1 → i < 14
        assert_eq!(windows.len(), 14);
    }
}
