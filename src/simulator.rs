// Taguchi Edge - Telemetry ingestion and S/N analysis engine
//
// Licensed under the AGPL-3.0 license.

//! Simulated sensor data
//!
//! Generates per-channel values driven by the active control-factor
//! set-point: each factor has a per-channel gain and jitter, and with no
//! active set-point channels fall back to their default ranges. The
//! fixed-interval publication loop is host-driven; the simulator only offers
//! one-shot rounds and shares nothing with the ingestion path beyond a
//! read-only registry view.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::factors::{FactorRegistry, Setpoint};
use crate::publisher::{Publisher, Transport};

/// How one channel responds to a factor's set-point
#[derive(Debug, Clone)]
pub struct ChannelResponse {
    /// Target channel
    pub channel: String,
    /// Multiplier applied to the set-point
    pub gain: f64,
    /// Half-width of the uniform jitter added on top
    pub jitter: f64,
}

impl ChannelResponse {
    fn new(channel: &str, gain: f64, jitter: f64) -> Self {
        Self {
            channel: channel.to_string(),
            gain,
            jitter,
        }
    }
}

/// Per-factor channel responses plus no-set-point fallback ranges
#[derive(Debug, Clone)]
pub struct SimulatorProfile {
    responses: Vec<(String, Vec<ChannelResponse>)>,
    defaults: Vec<(String, f64, f64)>,
}

impl SimulatorProfile {
    /// The reference deployment profile
    pub fn reference() -> Self {
        Self {
            responses: vec![
                (
                    "A".to_string(),
                    vec![
                        ChannelResponse::new("pressure", 1.0, 2.0),
                        ChannelResponse::new("vibration", 0.5, 1.0),
                        ChannelResponse::new("rpm", 20.0, 10.0),
                        ChannelResponse::new("current", 0.8, 3.0),
                    ],
                ),
                (
                    "B".to_string(),
                    vec![
                        ChannelResponse::new("pressure", 1.0, 5.0),
                        ChannelResponse::new("vibration", 0.3, 2.0),
                        ChannelResponse::new("rpm", 15.0, 30.0),
                        ChannelResponse::new("current", 0.6, 4.0),
                    ],
                ),
                (
                    "C".to_string(),
                    vec![
                        ChannelResponse::new("pressure", 0.01, 1.0),
                        ChannelResponse::new("vibration", 0.02, 2.0),
                        ChannelResponse::new("rpm", 1.0, 50.0),
                        ChannelResponse::new("current", 0.4, 20.0),
                    ],
                ),
            ],
            defaults: vec![
                ("pressure".to_string(), 0.0, 100.0),
                ("vibration".to_string(), 0.0, 10.0),
                ("rpm".to_string(), 0.0, 3000.0),
                ("current".to_string(), 0.0, 20.0),
            ],
        }
    }

    fn responses_for(&self, factor: &str) -> Option<&[ChannelResponse]> {
        self.responses
            .iter()
            .find(|(f, _)| f == factor)
            .map(|(_, r)| r.as_slice())
    }
}

/// Generates and publishes simulated sensor rounds
pub struct SensorSimulator {
    profile: SimulatorProfile,
    publisher: Publisher,
    rng: StdRng,
}

impl SensorSimulator {
    /// Create a simulator for the configured device
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Create a simulator with a deterministic seed
    pub fn with_seed(config: &EngineConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: &EngineConfig, rng: StdRng) -> Self {
        Self {
            profile: SimulatorProfile::reference(),
            publisher: Publisher::new(&config.namespace, &config.device_id),
            rng,
        }
    }

    /// Generate one value per channel for the given experimental condition
    ///
    /// Values are rounded to 2 decimal places, matching published payload
    /// precision.
    pub fn generate(&mut self, setpoint: Option<&Setpoint>) -> Vec<(String, f64)> {
        let responses =
            setpoint.and_then(|sp| self.profile.responses_for(&sp.factor).map(|r| (sp.value, r)));
        match responses {
            Some((base, responses)) => responses
                .iter()
                .map(|r| {
                    let noise = self.rng.gen_range(-r.jitter..=r.jitter);
                    (r.channel.clone(), round2(base * r.gain + noise))
                })
                .collect(),
            None => self
                .profile
                .defaults
                .iter()
                .map(|(channel, lo, hi)| (channel.clone(), round2(self.rng.gen_range(*lo..=*hi))))
                .collect(),
        }
    }

    /// Generate one round from the registry's active set-point and publish
    /// every value, returning the number published
    ///
    /// Skipped entirely while the transport is disconnected.
    pub fn publish_round(
        &mut self,
        transport: &mut dyn Transport,
        registry: &FactorRegistry,
    ) -> Result<usize> {
        if !transport.is_connected() {
            return Err(EngineError::TransportUnavailable);
        }
        let setpoint = registry.current_setpoint();
        let round = self.generate(setpoint.as_ref());
        for (channel, value) in &round {
            self.publisher.publish_sample(transport, channel, *value)?;
        }
        Ok(round.len())
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
