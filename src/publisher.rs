// Taguchi Edge - Telemetry ingestion and S/N analysis engine
//
// Licensed under the AGPL-3.0 license.

//! Outbound publishing
//!
//! The engine is transport-agnostic: anything that can publish a
//! `(topic, payload)` pair and report its connection state works (MQTT in
//! the reference deployment). Publish calls are fire-and-forget handoffs;
//! failures are reported to the caller, never retried here.

use crate::error::{EngineError, Result};
use crate::factors::ControlFactor;
use crate::sn::SnResult;

/// The pub/sub collaborator the engine publishes through
///
/// `is_connected` gates whether publishing is attempted at all; a transport
/// implementation updates it from its connection-state callbacks.
pub trait Transport {
    /// Publish a payload to a topic
    fn publish(&mut self, topic: &str, payload: &str) -> Result<()>;

    /// Current connection state
    fn is_connected(&self) -> bool;
}

/// Formats and emits engine output onto the topic space
#[derive(Debug, Clone)]
pub struct Publisher {
    sensor_prefix: String,
}

impl Publisher {
    /// Create a publisher for one device's namespace
    pub fn new(namespace: &str, device_id: &str) -> Self {
        Self {
            sensor_prefix: format!("{namespace}/taguchi/{device_id}"),
        }
    }

    /// Topic for a channel's S/N output
    pub fn sn_topic(&self, channel: &str) -> String {
        format!("{}/sn_ratio/{}", self.sensor_prefix, channel)
    }

    /// Topic for a raw channel sample
    pub fn sample_topic(&self, channel: &str) -> String {
        format!("{}/{}", self.sensor_prefix, channel)
    }

    /// Publish a computed S/N ratio, payload rounded to 2 decimal places
    pub fn publish_sn(&self, transport: &mut dyn Transport, result: &SnResult) -> Result<()> {
        self.send(
            transport,
            &self.sn_topic(&result.channel),
            &format!("{:.2}", result.ratio_db),
        )
    }

    /// Publish a raw sample value (simulated-data path)
    pub fn publish_sample(
        &self,
        transport: &mut dyn Transport,
        channel: &str,
        value: f64,
    ) -> Result<()> {
        self.send(transport, &self.sample_topic(channel), &format!("{value}"))
    }

    /// Publish a factor's setting, level set-points and active status
    pub fn publish_factor_status(
        &self,
        transport: &mut dyn Transport,
        factor: &ControlFactor,
    ) -> Result<()> {
        let base = format!("{}/control_factors", self.sensor_prefix);
        self.send(
            transport,
            &format!("{base}/setting/{}", factor.id),
            &format!("{},{}", factor.name, factor.unit),
        )?;
        for level in factor.levels() {
            self.send(
                transport,
                &format!("{base}/levels/{}/{}", factor.id, level.id),
                &format!("{}", level.setpoint),
            )?;
        }
        self.send(
            transport,
            &format!("{base}/status/{}", factor.id),
            "active",
        )
    }

    fn send(&self, transport: &mut dyn Transport, topic: &str, payload: &str) -> Result<()> {
        if !transport.is_connected() {
            return Err(EngineError::TransportUnavailable);
        }
        transport.publish(topic, payload)
    }
}
