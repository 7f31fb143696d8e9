// Taguchi Edge - Telemetry ingestion and S/N analysis engine
//
// Licensed under the AGPL-3.0 license.

//! Trailing moving-average smoothing
//!
//! Applied once after every append: the mean of the last `window` raw values
//! replaces the newest analysis sample's value via the store's
//! `replace_last` path. Earlier samples are never rewritten, and the window
//! is defined over the raw input sequence, so re-applying the filter without
//! a new append yields the same value.

use crate::buffer::ChannelStore;
use crate::error::Result;

/// Default trailing window width
pub const DEFAULT_WINDOW: usize = 3;

/// Fixed-window moving-average filter
#[derive(Debug, Clone, Copy)]
pub struct SmoothingFilter {
    window: usize,
}

impl SmoothingFilter {
    /// Create a filter with the given window width
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
        }
    }

    /// Window width
    pub fn window(&self) -> usize {
        self.window
    }

    /// Smooth the newest analysis sample of a channel
    ///
    /// Returns `Ok(true)` when a replacement happened, `Ok(false)` when the
    /// channel holds fewer than `window` samples (left untouched, not an
    /// error). Idempotent between appends: the window is taken from the raw
    /// tail, which only changes on append.
    pub fn apply(&self, store: &mut ChannelStore, channel: &str) -> Result<bool> {
        let tail = store.raw_tail(channel, self.window)?;
        if tail.len() < self.window {
            return Ok(false);
        }
        let mean = tail.iter().sum::<f64>() / self.window as f64;
        store.replace_last(channel, mean)?;
        Ok(true)
    }
}

impl Default for SmoothingFilter {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Sample;
    use crate::config::ChannelSpec;
    use approx::assert_relative_eq;

    fn store() -> ChannelStore {
        ChannelStore::new(&[ChannelSpec::new("pressure", "bar")], 100, 1000)
    }

    #[test]
    fn test_smoothing_below_window_is_noop() {
        let mut store = store();
        let filter = SmoothingFilter::default();
        store.append("pressure", Sample::new(1, 10.0)).unwrap();
        store.append("pressure", Sample::new(2, 20.0)).unwrap();
        assert!(!filter.apply(&mut store, "pressure").unwrap());
        assert_eq!(store.analysis_values("pressure").unwrap(), vec![10.0, 20.0]);
    }

    #[test]
    fn test_smoothing_replaces_newest_only() {
        let mut store = store();
        let filter = SmoothingFilter::default();
        for (t, v) in [(1, 10.0), (2, 20.0), (3, 30.0)] {
            store.append("pressure", Sample::new(t, v)).unwrap();
        }
        assert!(filter.apply(&mut store, "pressure").unwrap());
        let values = store.analysis_values("pressure").unwrap();
        assert_eq!(values[0], 10.0);
        assert_eq!(values[1], 20.0);
        assert_relative_eq!(values[2], 20.0); // (10+20+30)/3
    }

    #[test]
    fn test_smoothing_window_over_raw_values() {
        let mut store = store();
        let filter = SmoothingFilter::default();
        let raw = [10.0, 20.0, 30.0, 40.0];
        for (i, v) in raw.iter().enumerate() {
            store.append("pressure", Sample::new(i as u64, *v)).unwrap();
            filter.apply(&mut store, "pressure").unwrap();
        }
        let values = store.analysis_values("pressure").unwrap();
        // Each smoothed value is the mean of the last 3 raw appends, not of
        // previously smoothed values
        assert_relative_eq!(values[2], 20.0);
        assert_relative_eq!(values[3], 30.0); // (20+30+40)/3
    }

    #[test]
    fn test_smoothing_idempotent_between_appends() {
        let mut store = store();
        let filter = SmoothingFilter::default();
        for (t, v) in [(1, 10.0), (2, 20.0), (3, 30.0)] {
            store.append("pressure", Sample::new(t, v)).unwrap();
        }
        filter.apply(&mut store, "pressure").unwrap();
        let first = store.analysis_values("pressure").unwrap();
        filter.apply(&mut store, "pressure").unwrap();
        let second = store.analysis_values("pressure").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_smoothing_unknown_channel() {
        let mut store = store();
        let filter = SmoothingFilter::default();
        assert!(filter.apply(&mut store, "flow").is_err());
    }

    #[test]
    fn test_smoothing_window_floor() {
        let filter = SmoothingFilter::new(0);
        assert_eq!(filter.window(), 1);
    }
}
