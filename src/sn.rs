// Taguchi Edge - Telemetry ingestion and S/N analysis engine
//
// Licensed under the AGPL-3.0 license.

//! Nominal-is-best signal-to-noise ratio
//!
//! The S/N ratio measures signal consistency relative to its target:
//! `-10 * log10(variance / mean^2)`, expressed in dB, higher is more
//! consistent. Computed over a channel's analysis buffer once it holds
//! enough samples and re-computed on every append after that.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Sentinel ratio for a perfectly consistent buffer (variance exactly zero
/// with a nonzero mean); the formula itself diverges there
pub const SN_PERFECT_DB: f64 = 99.99;

/// Minimum samples for the formula to be meaningful; fewer yields ratio 0
pub const SN_FORMULA_MIN_SAMPLES: usize = 2;

/// Quality classification of an S/N ratio
///
/// Informational only; published payloads carry the ratio, not the class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quality {
    /// Ratio above 10 dB
    Good,
    /// Ratio above 5 dB, at most 10 dB
    Acceptable,
    /// Ratio at or below 5 dB
    Poor,
}

impl Quality {
    /// Classify a ratio in dB
    pub fn from_ratio(ratio_db: f64) -> Self {
        if ratio_db > 10.0 {
            Self::Good
        } else if ratio_db > 5.0 {
            Self::Acceptable
        } else {
            Self::Poor
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Good => "good",
            Self::Acceptable => "acceptable",
            Self::Poor => "poor",
        };
        f.write_str(s)
    }
}

/// A computed S/N evaluation for one channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnResult {
    /// Channel the ratio was computed for
    pub channel: String,
    /// Ratio in dB, rounded to 2 decimal digits
    pub ratio_db: f64,
    /// Informational quality classification
    pub quality: Quality,
}

/// Computes nominal-is-best S/N ratios over buffer snapshots
#[derive(Debug, Clone, Copy)]
pub struct SnEngine {
    min_samples: usize,
}

impl SnEngine {
    /// Create an engine that evaluates once `min_samples` are buffered
    pub fn new(min_samples: usize) -> Self {
        Self {
            min_samples: min_samples.max(SN_FORMULA_MIN_SAMPLES),
        }
    }

    /// Evaluation threshold
    pub fn min_samples(&self) -> usize {
        self.min_samples
    }

    /// Evaluate a channel's buffer snapshot
    ///
    /// Returns `None` below the evaluation threshold; nothing is published
    /// in that case.
    pub fn evaluate(&self, channel: &str, values: &[f64]) -> Option<SnResult> {
        if values.len() < self.min_samples {
            return None;
        }
        let ratio_db = Self::ratio_db(values);
        Some(SnResult {
            channel: channel.to_string(),
            ratio_db,
            quality: Quality::from_ratio(ratio_db),
        })
    }

    /// Nominal-is-best ratio in dB over a value sequence
    ///
    /// Degenerate cases are defined, not errors: fewer than 2 samples or a
    /// zero mean yield 0; zero variance with a nonzero mean yields
    /// [`SN_PERFECT_DB`].
    pub fn ratio_db(values: &[f64]) -> f64 {
        if values.len() < SN_FORMULA_MIN_SAMPLES {
            return 0.0;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        if mean == 0.0 {
            return 0.0;
        }
        // Population variance, matching the reference deployment
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        if variance == 0.0 {
            return SN_PERFECT_DB;
        }
        let ratio = -10.0 * (variance / (mean * mean)).log10();
        (ratio * 100.0).round() / 100.0
    }
}

impl Default for SnEngine {
    fn default() -> Self {
        Self::new(10)
    }
}

/// One recorded S/N publication
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnRecord {
    /// Milliseconds since the UNIX epoch
    pub timestamp_ms: u64,
    /// Ratio in dB
    pub ratio_db: f64,
    /// Classification at publication time
    pub quality: Quality,
}

/// Bounded per-channel history of published ratios
///
/// Lets a dashboard read recent S/N values through a snapshot instead of a
/// second subscription. Oldest entries are evicted at capacity.
#[derive(Debug)]
pub struct SnHistory {
    capacity: usize,
    entries: Vec<(String, VecDeque<SnRecord>)>,
}

impl SnHistory {
    /// Create an empty history with the given per-channel capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Vec::new(),
        }
    }

    /// Record a published result
    pub fn record(&mut self, channel: &str, timestamp_ms: u64, result: &SnResult) {
        let idx = match self.entries.iter().position(|(c, _)| c == channel) {
            Some(idx) => idx,
            None => {
                self.entries.push((channel.to_string(), VecDeque::new()));
                self.entries.len() - 1
            }
        };
        let records = &mut self.entries[idx].1;
        if records.len() >= self.capacity {
            records.pop_front();
        }
        records.push_back(SnRecord {
            timestamp_ms,
            ratio_db: result.ratio_db,
            quality: result.quality,
        });
    }

    /// Owned copy of a channel's history, oldest first
    pub fn snapshot(&self, channel: &str) -> Vec<SnRecord> {
        self.entries
            .iter()
            .find(|(c, _)| c == channel)
            .map(|(_, records)| records.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Number of recorded entries for a channel
    pub fn len(&self, channel: &str) -> usize {
        self.entries
            .iter()
            .find(|(c, _)| c == channel)
            .map(|(_, records)| records.len())
            .unwrap_or(0)
    }

    /// Check if nothing has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(|(_, records)| records.is_empty())
    }
}
