// Taguchi Edge - Telemetry ingestion and S/N analysis engine
//
// Licensed under the AGPL-3.0 license.

//! Ingestion engine
//!
//! The [`Engine`] owns all mutable state: the channel buffers, the
//! control-factor registry and the metadata store. The transport delivers
//! each inbound `(topic, payload)` pair to [`Engine::handle_message`], which
//! classifies, routes and evaluates it. Every per-message error is confined
//! to that message; nothing here aborts processing or panics across the
//! callback boundary.
//!
//! The engine takes `&mut self` and carries no interior locking. A host
//! whose transport delivers callbacks concurrently wraps the engine in its
//! own mutex; readers go through the owned snapshot accessors.

use std::collections::BTreeMap;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::buffer::{ChannelStore, Sample};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::factors::{FactorRegistry, Setpoint};
use crate::metadata::{MetadataCategory, MetadataStore, MetadataValue};
use crate::publisher::{Publisher, Transport};
use crate::smoothing::SmoothingFilter;
use crate::sn::{SnEngine, SnHistory, SnRecord};
use crate::topic::{ParsedMessage, TopicParser};

/// Counters surfacing per-message drop conditions to observers
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct EngineStats {
    /// Raw samples accepted into the buffers
    pub samples_accepted: u64,
    /// Control-factor set-points overwritten
    pub factor_updates: u64,
    /// Metadata entries stored
    pub metadata_updates: u64,
    /// Messages classified as engine output or foreign topics
    pub ignored: u64,
    /// Dropped: payload failed numeric parsing
    pub malformed_payloads: u64,
    /// Dropped: undeclared channel, factor or level
    pub unknown_identifiers: u64,
    /// S/N results published
    pub sn_published: u64,
    /// S/N publish attempts that failed or found the transport down
    pub publish_failures: u64,
}

impl EngineStats {
    /// Serialize the counters to JSON for export
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// The telemetry ingestion and analysis engine
///
/// Owns its state explicitly; create one per device and hand it (behind
/// whatever mutual exclusion the host needs) to the transport callback and
/// to readers.
pub struct Engine<T: Transport> {
    config: EngineConfig,
    parser: TopicParser,
    store: ChannelStore,
    filter: SmoothingFilter,
    sn: SnEngine,
    history: SnHistory,
    registry: FactorRegistry,
    metadata: MetadataStore,
    publisher: Publisher,
    transport: T,
    stats: EngineStats,
}

impl<T: Transport> Engine<T> {
    /// Create an engine with the reference control-factor schema
    pub fn new(config: EngineConfig, transport: T) -> Self {
        Self::with_registry(config, FactorRegistry::reference(), transport)
    }

    /// Create an engine with an explicit control-factor registry
    pub fn with_registry(config: EngineConfig, registry: FactorRegistry, transport: T) -> Self {
        let parser = TopicParser::new(&config);
        let store = ChannelStore::new(
            &config.channels,
            config.display_capacity,
            config.analysis_capacity,
        );
        let filter = SmoothingFilter::new(config.smoothing_window);
        let sn = SnEngine::new(config.sn_min_samples);
        let history = SnHistory::new(config.sn_history_capacity);
        let publisher = Publisher::new(&config.namespace, &config.device_id);
        Self {
            config,
            parser,
            store,
            filter,
            sn,
            history,
            registry,
            metadata: MetadataStore::new(),
            publisher,
            transport,
            stats: EngineStats::default(),
        }
    }

    /// Topic filters the host should subscribe to for this engine
    pub fn subscriptions(&self) -> Vec<String> {
        vec![
            format!("{}/#", self.parser.sensor_prefix()),
            format!("{}/#", self.parser.metadata_prefix()),
        ]
    }

    /// Handle one inbound message, stamped with the current wall clock
    pub fn handle_message(&mut self, topic: &str, payload: &str) {
        let timestamp_ms = chrono::Utc::now().timestamp_millis().max(0) as u64;
        self.handle_message_at(topic, payload, timestamp_ms);
    }

    /// Handle one inbound message with an explicit sample timestamp
    pub fn handle_message_at(&mut self, topic: &str, payload: &str, timestamp_ms: u64) {
        match self.parser.parse(topic, payload) {
            Ok(ParsedMessage::Sample { channel, value }) => {
                if let Err(e) = self.ingest_sample(&channel, value, timestamp_ms) {
                    // Parser already validated the channel; this only fires
                    // if store and parser schemas ever diverge
                    self.stats.unknown_identifiers += 1;
                    warn!("dropping sample for '{channel}': {e}");
                }
            }
            Ok(ParsedMessage::FactorUpdate {
                factor,
                level: Some(level),
                value,
            }) => match self.registry.set_level(&factor, &level, value) {
                Ok(previous) => {
                    self.stats.factor_updates += 1;
                    info!("factor {factor} level {level}: {previous} -> {value}");
                }
                Err(e) => {
                    self.stats.unknown_identifiers += 1;
                    warn!("dropping factor update on '{topic}': {e}");
                }
            },
            Ok(ParsedMessage::FactorUpdate { level: None, .. }) => {
                // A factor path without a level names no set-point slot
                self.stats.ignored += 1;
                debug!("ignoring level-less factor update on '{topic}'");
            }
            Ok(ParsedMessage::Metadata {
                category,
                key,
                sub_key,
                value,
            }) => {
                self.metadata.set(category, &key, sub_key.as_deref(), &value);
                self.stats.metadata_updates += 1;
                debug!("metadata {}/{key} updated", category.as_segment());
            }
            Ok(ParsedMessage::Ignored) => {
                self.stats.ignored += 1;
            }
            Err(e @ EngineError::MalformedPayload { .. }) => {
                self.stats.malformed_payloads += 1;
                warn!("dropping message: {e}");
            }
            Err(e) => {
                self.stats.unknown_identifiers += 1;
                warn!("dropping message on '{topic}': {e}");
            }
        }
    }

    fn ingest_sample(&mut self, channel: &str, value: f64, timestamp_ms: u64) -> Result<()> {
        self.store.append(channel, Sample::new(timestamp_ms, value))?;
        self.stats.samples_accepted += 1;
        self.filter.apply(&mut self.store, channel)?;

        let values = self.store.analysis_values(channel)?;
        if let Some(result) = self.sn.evaluate(channel, &values) {
            info!(
                "S/N for {channel}: {:.2} dB ({})",
                result.ratio_db, result.quality
            );
            match self.publisher.publish_sn(&mut self.transport, &result) {
                Ok(()) => {
                    self.stats.sn_published += 1;
                    self.history.record(channel, timestamp_ms, &result);
                }
                Err(e) => {
                    self.stats.publish_failures += 1;
                    warn!("S/N publish for {channel} failed: {e}");
                }
            }
        }
        Ok(())
    }

    /// Announce every declared factor's setting, levels and status
    pub fn publish_factor_announcements(&mut self) -> Result<()> {
        // Walk a snapshot so the registry borrow ends before publishing
        // borrows the transport
        let factors = self.registry.factors().to_vec();
        for factor in &factors {
            self.publisher
                .publish_factor_status(&mut self.transport, factor)?;
        }
        Ok(())
    }

    /// Overwrite a factor level's set-point, returning the previous value
    pub fn set_factor_level(&mut self, factor: &str, level: &str, value: f64) -> Result<f64> {
        self.registry.set_level(factor, level, value)
    }

    /// The active experimental condition, if any
    pub fn current_setpoint(&self) -> Option<Setpoint> {
        self.registry.current_setpoint()
    }

    /// Owned copy of a channel's display buffer
    pub fn display_snapshot(&self, channel: &str) -> Result<Vec<Sample>> {
        self.store.display_snapshot(channel)
    }

    /// Owned copy of a channel's analysis buffer
    pub fn analysis_snapshot(&self, channel: &str) -> Result<Vec<Sample>> {
        self.store.analysis_snapshot(channel)
    }

    /// Owned copy of a channel's published S/N history
    pub fn sn_history(&self, channel: &str) -> Vec<SnRecord> {
        self.history.snapshot(channel)
    }

    /// Owned copy of a metadata category
    pub fn metadata_snapshot(&self, category: MetadataCategory) -> BTreeMap<String, MetadataValue> {
        self.metadata.snapshot(category)
    }

    /// Ingestion counters
    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// Read access to the control-factor registry
    pub fn registry(&self) -> &FactorRegistry {
        &self.registry
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Whether the transport currently reports a connection
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Mutable access to the transport (connection-state updates)
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sn::SN_PERFECT_DB;
    use approx::assert_relative_eq;

    struct RecordingTransport {
        connected: bool,
        published: Vec<(String, String)>,
    }

    impl RecordingTransport {
        fn new() -> Self {
            Self {
                connected: true,
                published: Vec::new(),
            }
        }
    }

    impl Transport for RecordingTransport {
        fn publish(&mut self, topic: &str, payload: &str) -> Result<()> {
            self.published.push((topic.to_string(), payload.to_string()));
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.connected
        }
    }

    fn engine() -> Engine<RecordingTransport> {
        Engine::new(EngineConfig::default(), RecordingTransport::new())
    }

    fn feed_samples(engine: &mut Engine<RecordingTransport>, channel: &str, values: &[f64]) {
        let topic = format!("jetsion/taguchi/device001/{channel}");
        for (i, v) in values.iter().enumerate() {
            engine.handle_message_at(&topic, &format!("{v}"), 1000 + i as u64);
        }
    }

    #[test]
    fn test_sample_routed_into_buffers() {
        let mut engine = engine();
        feed_samples(&mut engine, "pressure", &[50.0, 51.0]);
        assert_eq!(engine.display_snapshot("pressure").unwrap().len(), 2);
        assert_eq!(engine.stats().samples_accepted, 2);
    }

    #[test]
    fn test_smoothing_applied_on_ingest() {
        let mut engine = engine();
        feed_samples(&mut engine, "pressure", &[10.0, 20.0, 30.0]);
        let analysis = engine.analysis_snapshot("pressure").unwrap();
        assert_relative_eq!(analysis[2].value, 20.0);
        // Display keeps the raw value
        let display = engine.display_snapshot("pressure").unwrap();
        assert_relative_eq!(display[2].value, 30.0);
    }

    #[test]
    fn test_sn_published_at_threshold() {
        let mut engine = engine();
        feed_samples(&mut engine, "pressure", &[10.0; 9]);
        assert!(engine.transport_mut().published.is_empty());

        feed_samples(&mut engine, "pressure", &[10.0]);
        let published = &engine.transport_mut().published;
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, "jetsion/taguchi/device001/sn_ratio/pressure");
        assert_eq!(published[0].1, format!("{SN_PERFECT_DB:.2}"));
        assert_eq!(engine.stats().sn_published, 1);
    }

    #[test]
    fn test_sn_republished_past_threshold() {
        let mut engine = engine();
        feed_samples(&mut engine, "pressure", &[10.0; 12]);
        // Once at sample 10, then again on 11 and 12
        assert_eq!(engine.stats().sn_published, 3);
        assert_eq!(engine.sn_history("pressure").len(), 3);
    }

    #[test]
    fn test_published_sn_not_reingested() {
        let mut engine = engine();
        feed_samples(&mut engine, "pressure", &[10.0; 10]);
        let (topic, payload) = engine.transport_mut().published[0].clone();

        // Round-trip: the broker re-delivers our own output
        engine.handle_message_at(&topic, &payload, 2000);
        assert_eq!(engine.stats().samples_accepted, 10);
        assert_eq!(engine.stats().ignored, 1);
    }

    #[test]
    fn test_malformed_payload_isolated() {
        let mut engine = engine();
        engine.handle_message_at("jetsion/taguchi/device001/pressure", "not-a-number", 1000);
        assert_eq!(engine.stats().malformed_payloads, 1);
        // Subsequent messages still processed
        feed_samples(&mut engine, "pressure", &[50.0]);
        assert_eq!(engine.stats().samples_accepted, 1);
    }

    #[test]
    fn test_unknown_channel_not_created() {
        let mut engine = engine();
        engine.handle_message_at("jetsion/taguchi/device001/flow", "1.0", 1000);
        assert_eq!(engine.stats().unknown_identifiers, 1);
        assert!(engine.display_snapshot("flow").is_err());
    }

    #[test]
    fn test_factor_update_routed_to_registry() {
        let mut engine = engine();
        engine.handle_message_at("jetsion/taguchi/device001/control_factors/A/2", "30", 1000);
        assert_eq!(engine.stats().factor_updates, 1);
        let setpoint = engine.current_setpoint().unwrap();
        assert_eq!((setpoint.factor.as_str(), setpoint.level.as_str()), ("A", "2"));
        // Factor messages bypass the buffers entirely
        assert_eq!(engine.stats().samples_accepted, 0);
    }

    #[test]
    fn test_factor_update_unknown_level_dropped() {
        let mut engine = engine();
        engine.handle_message_at("jetsion/taguchi/device001/control_factors/A/9", "30", 1000);
        assert_eq!(engine.stats().unknown_identifiers, 1);
        assert!(engine.current_setpoint().is_none());
    }

    #[test]
    fn test_metadata_stored_verbatim() {
        let mut engine = engine();
        engine.handle_message_at(
            "jetsion/device001/taguchi/experiment_status/run_1",
            "running",
            1000,
        );
        assert_eq!(engine.stats().metadata_updates, 1);
        let snapshot = engine.metadata_snapshot(MetadataCategory::ExperimentStatus);
        assert_eq!(
            snapshot.get("run_1"),
            Some(&MetadataValue::Scalar("running".to_string()))
        );
    }

    #[test]
    fn test_publish_skipped_while_disconnected() {
        let mut engine = engine();
        engine.transport_mut().connected = false;
        feed_samples(&mut engine, "pressure", &[10.0; 10]);
        assert_eq!(engine.stats().publish_failures, 1);
        assert_eq!(engine.stats().sn_published, 0);
        assert!(engine.transport_mut().published.is_empty());
        // Buffers still accepted everything
        assert_eq!(engine.stats().samples_accepted, 10);
    }

    #[test]
    fn test_factor_announcements() {
        let mut engine = engine();
        engine.publish_factor_announcements().unwrap();
        // 3 factors x (setting + 3 levels + status)
        assert_eq!(engine.transport_mut().published.len(), 15);
    }

    #[test]
    fn test_subscriptions_cover_both_namespaces() {
        let engine = engine();
        assert_eq!(
            engine.subscriptions(),
            vec![
                "jetsion/taguchi/device001/#".to_string(),
                "jetsion/device001/taguchi/#".to_string(),
            ]
        );
    }

    #[test]
    fn test_stats_serializable() {
        let engine = engine();
        let json = engine.stats().to_json().unwrap();
        assert!(json.contains("samples_accepted"));
    }
}
