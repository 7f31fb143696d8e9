// Taguchi Edge - Telemetry ingestion and S/N analysis engine
//
// Licensed under the AGPL-3.0 license.

//! Bounded per-channel sample storage
//!
//! Each declared channel owns two time-ordered buffers: a display buffer
//! holding raw samples for dashboard readers, and an analysis buffer that the
//! smoothing filter conditions and the S/N engine evaluates. Both evict FIFO
//! at capacity. Readers always go through owned snapshots, never references
//! into live buffers.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::config::ChannelSpec;
use crate::error::{EngineError, Result};

/// A single timestamped measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Milliseconds since the UNIX epoch
    pub timestamp_ms: u64,
    /// Measured value
    pub value: f64,
}

impl Sample {
    /// Create a sample with an explicit timestamp
    pub fn new(timestamp_ms: u64, value: f64) -> Self {
        Self {
            timestamp_ms,
            value,
        }
    }

    /// Create a sample stamped with the current wall-clock time
    pub fn now(value: f64) -> Self {
        let timestamp_ms = chrono::Utc::now().timestamp_millis().max(0) as u64;
        Self {
            timestamp_ms,
            value,
        }
    }
}

/// A bounded, time-ordered sequence of samples
///
/// Appends evict the oldest sample once the buffer is at capacity. The only
/// in-place mutation is [`SampleBuffer::replace_last`], reserved for the
/// smoothing filter.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl SampleBuffer {
    /// Create an empty buffer with the given capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest if at capacity
    pub fn push(&mut self, sample: Sample) {
        if self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Overwrite the value of the most recent sample
    ///
    /// No-op on an empty buffer. The timestamp is preserved; this is a value
    /// correction, not a new append.
    pub fn replace_last(&mut self, value: f64) {
        if let Some(last) = self.samples.back_mut() {
            last.value = value;
        }
    }

    /// Most recent sample, if any
    pub fn last(&self) -> Option<&Sample> {
        self.samples.back()
    }

    /// Number of stored samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Configured capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Owned copy of the buffer contents, oldest first
    pub fn snapshot(&self) -> Vec<Sample> {
        self.samples.iter().copied().collect()
    }

    /// Values only, oldest first
    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.value).collect()
    }

    /// Values of the trailing `n` samples, oldest first
    pub fn tail_values(&self, n: usize) -> Vec<f64> {
        let skip = self.samples.len().saturating_sub(n);
        self.samples.iter().skip(skip).map(|s| s.value).collect()
    }
}

/// The two buffer roles of a single channel
#[derive(Debug)]
struct ChannelEntry {
    spec: ChannelSpec,
    display: SampleBuffer,
    analysis: SampleBuffer,
}

/// Owns all per-channel sample data
///
/// Channels are declared up front from configuration; appends and
/// replacements against undeclared names are rejected with
/// [`EngineError::UnknownChannel`] so malformed topics cannot grow the store.
#[derive(Debug)]
pub struct ChannelStore {
    channels: Vec<ChannelEntry>,
}

impl ChannelStore {
    /// Create a store for the declared channels
    pub fn new(specs: &[ChannelSpec], display_capacity: usize, analysis_capacity: usize) -> Self {
        let channels = specs
            .iter()
            .map(|spec| ChannelEntry {
                spec: spec.clone(),
                display: SampleBuffer::new(display_capacity),
                analysis: SampleBuffer::new(analysis_capacity),
            })
            .collect();
        Self { channels }
    }

    fn entry(&self, channel: &str) -> Result<&ChannelEntry> {
        self.channels
            .iter()
            .find(|e| e.spec.name == channel)
            .ok_or_else(|| EngineError::UnknownChannel(channel.to_string()))
    }

    fn entry_mut(&mut self, channel: &str) -> Result<&mut ChannelEntry> {
        self.channels
            .iter_mut()
            .find(|e| e.spec.name == channel)
            .ok_or_else(|| EngineError::UnknownChannel(channel.to_string()))
    }

    /// Append a raw sample to both buffer roles of a channel
    pub fn append(&mut self, channel: &str, sample: Sample) -> Result<()> {
        let entry = self.entry_mut(channel)?;
        entry.display.push(sample);
        entry.analysis.push(sample);
        Ok(())
    }

    /// Overwrite the newest analysis sample's value
    ///
    /// Used by the smoothing filter. No-op (not an error) when the channel
    /// has no samples yet. The display buffer keeps the raw value.
    pub fn replace_last(&mut self, channel: &str, value: f64) -> Result<()> {
        self.entry_mut(channel)?.analysis.replace_last(value);
        Ok(())
    }

    /// Owned copy of a channel's display buffer, oldest first
    pub fn display_snapshot(&self, channel: &str) -> Result<Vec<Sample>> {
        Ok(self.entry(channel)?.display.snapshot())
    }

    /// Owned copy of a channel's analysis buffer, oldest first
    pub fn analysis_snapshot(&self, channel: &str) -> Result<Vec<Sample>> {
        Ok(self.entry(channel)?.analysis.snapshot())
    }

    /// Analysis values only, oldest first
    pub fn analysis_values(&self, channel: &str) -> Result<Vec<f64>> {
        Ok(self.entry(channel)?.analysis.values())
    }

    /// Trailing `n` analysis values, oldest first
    pub fn analysis_tail(&self, channel: &str, n: usize) -> Result<Vec<f64>> {
        Ok(self.entry(channel)?.analysis.tail_values(n))
    }

    /// Trailing `n` raw (pre-smoothing) values, oldest first
    ///
    /// The display buffer is never touched by the smoothing filter, so its
    /// tail is the raw input sequence the filter's window is defined over.
    pub fn raw_tail(&self, channel: &str, n: usize) -> Result<Vec<f64>> {
        Ok(self.entry(channel)?.display.tail_values(n))
    }

    /// Number of samples in a channel's analysis buffer
    pub fn analysis_len(&self, channel: &str) -> Result<usize> {
        Ok(self.entry(channel)?.analysis.len())
    }

    /// Check if a channel is declared
    pub fn contains(&self, channel: &str) -> bool {
        self.channels.iter().any(|e| e.spec.name == channel)
    }

    /// Declared channel names, in declaration order
    pub fn channel_names(&self) -> Vec<String> {
        self.channels.iter().map(|e| e.spec.name.clone()).collect()
    }

    /// Number of declared channels
    pub fn count(&self) -> usize {
        self.channels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specs() -> Vec<ChannelSpec> {
        vec![
            ChannelSpec::new("pressure", "bar"),
            ChannelSpec::new("rpm", "RPM"),
        ]
    }

    #[test]
    fn test_sample_buffer_push() {
        let mut buffer = SampleBuffer::new(10);
        buffer.push(Sample::new(1000, 22.5));
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.last().unwrap().value, 22.5);
    }

    #[test]
    fn test_sample_buffer_fifo_eviction() {
        let mut buffer = SampleBuffer::new(3);
        for i in 0..4u64 {
            buffer.push(Sample::new(1000 + i, i as f64));
        }
        assert_eq!(buffer.len(), 3);
        let snapshot = buffer.snapshot();
        // Oldest (t=1000) evicted, order preserved
        assert_eq!(snapshot[0].timestamp_ms, 1001);
        assert_eq!(snapshot[2].timestamp_ms, 1003);
    }

    #[test]
    fn test_sample_buffer_replace_last() {
        let mut buffer = SampleBuffer::new(10);
        buffer.push(Sample::new(1000, 1.0));
        buffer.push(Sample::new(2000, 2.0));
        buffer.replace_last(9.0);
        assert_eq!(buffer.last().unwrap().value, 9.0);
        assert_eq!(buffer.last().unwrap().timestamp_ms, 2000);
        // Earlier samples untouched
        assert_eq!(buffer.snapshot()[0].value, 1.0);
    }

    #[test]
    fn test_sample_buffer_replace_last_empty() {
        let mut buffer = SampleBuffer::new(10);
        buffer.replace_last(9.0);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_sample_buffer_tail_values() {
        let mut buffer = SampleBuffer::new(10);
        for i in 0..5u64 {
            buffer.push(Sample::new(i, i as f64));
        }
        assert_eq!(buffer.tail_values(3), vec![2.0, 3.0, 4.0]);
        assert_eq!(buffer.tail_values(10).len(), 5);
    }

    #[test]
    fn test_store_append_and_snapshot() {
        let mut store = ChannelStore::new(&specs(), 100, 1000);
        store.append("pressure", Sample::new(1000, 50.0)).unwrap();
        let display = store.display_snapshot("pressure").unwrap();
        let analysis = store.analysis_snapshot("pressure").unwrap();
        assert_eq!(display.len(), 1);
        assert_eq!(analysis.len(), 1);
        assert_eq!(display[0].value, 50.0);
    }

    #[test]
    fn test_store_unknown_channel() {
        let mut store = ChannelStore::new(&specs(), 100, 1000);
        let result = store.append("flow", Sample::new(1000, 1.0));
        assert!(matches!(result, Err(EngineError::UnknownChannel(_))));
        let result = store.replace_last("flow", 1.0);
        assert!(matches!(result, Err(EngineError::UnknownChannel(_))));
    }

    #[test]
    fn test_store_replace_last_analysis_only() {
        let mut store = ChannelStore::new(&specs(), 100, 1000);
        store.append("rpm", Sample::new(1000, 1500.0)).unwrap();
        store.replace_last("rpm", 1400.0).unwrap();
        assert_eq!(store.analysis_snapshot("rpm").unwrap()[0].value, 1400.0);
        // Display keeps the raw value
        assert_eq!(store.display_snapshot("rpm").unwrap()[0].value, 1500.0);
    }

    #[test]
    fn test_store_display_eviction_at_capacity() {
        let mut store = ChannelStore::new(&specs(), 100, 1000);
        for i in 0..101u64 {
            store.append("pressure", Sample::new(i, i as f64)).unwrap();
        }
        let display = store.display_snapshot("pressure").unwrap();
        assert_eq!(display.len(), 100);
        assert_eq!(display[0].timestamp_ms, 1);
        assert_eq!(display[99].timestamp_ms, 100);
        // Analysis buffer is larger and still holds everything
        assert_eq!(store.analysis_len("pressure").unwrap(), 101);
    }

    #[test]
    fn test_store_channel_names_order() {
        let store = ChannelStore::new(&specs(), 100, 1000);
        assert_eq!(store.channel_names(), vec!["pressure", "rpm"]);
        assert_eq!(store.count(), 2);
    }
}
