// Taguchi Edge - Telemetry ingestion and S/N analysis engine
//
// Licensed under the AGPL-3.0 license.

//! Topic classification
//!
//! Every inbound `(topic, payload)` pair is classified into exactly one
//! message kind. Topics carrying an `sn_ratio` segment are the engine's own
//! output and are ignored before any other check so published ratios are
//! never re-ingested as raw samples.
//!
//! Topic shapes, `/`-delimited:
//!
//! - `{ns}/taguchi/{device}/{channel}` — raw sensor sample
//! - `{ns}/taguchi/{device}/control_factors/{factor}[/{level}]` — set-point update
//! - `{ns}/{device}/taguchi/{category}/{key}[/{subKey}]` — experiment metadata

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::metadata::MetadataCategory;

/// Topic segment reserved for engine output
const SN_RATIO_SEGMENT: &str = "sn_ratio";

/// Topic segment introducing control-factor paths
const CONTROL_FACTORS_SEGMENT: &str = "control_factors";

/// A classified inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedMessage {
    /// Raw sensor sample for a declared channel
    Sample {
        /// Channel name (final topic segment)
        channel: String,
        /// Parsed payload value
        value: f64,
    },
    /// Control-factor set-point update
    FactorUpdate {
        /// Factor identifier
        factor: String,
        /// Level identifier; updates without a level carry no set-point slot
        level: Option<String>,
        /// Parsed payload value
        value: f64,
    },
    /// Experiment metadata, stored verbatim
    Metadata {
        /// Declared category
        category: MetadataCategory,
        /// Primary key segment
        key: String,
        /// Optional sub-key segment
        sub_key: Option<String>,
        /// Raw payload
        value: String,
    },
    /// Engine output or a topic matching no declared shape
    Ignored,
}

/// Classifies inbound topics for one device's namespace
#[derive(Debug, Clone)]
pub struct TopicParser {
    sensor_prefix: String,
    metadata_prefix: String,
    channels: Vec<String>,
}

impl TopicParser {
    /// Create a parser bound to the configured namespace, device and channels
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            sensor_prefix: format!("{}/taguchi/{}", config.namespace, config.device_id),
            metadata_prefix: format!("{}/{}/taguchi", config.namespace, config.device_id),
            channels: config.channels.iter().map(|c| c.name.clone()).collect(),
        }
    }

    /// Sensor topic prefix (`{ns}/taguchi/{device}`)
    pub fn sensor_prefix(&self) -> &str {
        &self.sensor_prefix
    }

    /// Metadata topic prefix (`{ns}/{device}/taguchi`)
    pub fn metadata_prefix(&self) -> &str {
        &self.metadata_prefix
    }

    /// Classify one inbound message
    ///
    /// Errors cover the per-message drop conditions: a non-numeric payload
    /// where a number is required ([`EngineError::MalformedPayload`]) and a
    /// sensor-shaped topic naming an undeclared channel
    /// ([`EngineError::UnknownChannel`]). Anything matching no declared
    /// shape is `Ok(Ignored)`.
    pub fn parse(&self, topic: &str, payload: &str) -> Result<ParsedMessage> {
        // Engine output must never loop back in
        if topic.split('/').any(|s| s == SN_RATIO_SEGMENT) {
            return Ok(ParsedMessage::Ignored);
        }

        if let Some(rest) = strip_prefix_segment(topic, &self.sensor_prefix) {
            let segments: Vec<&str> = rest.split('/').collect();
            if segments.first().copied() == Some(CONTROL_FACTORS_SEGMENT) {
                return self.parse_factor_update(topic, &segments[1..], payload);
            }
            if segments.len() == 1 && !segments[0].is_empty() {
                return self.parse_sample(topic, segments[0], payload);
            }
            return Ok(ParsedMessage::Ignored);
        }

        if let Some(rest) = strip_prefix_segment(topic, &self.metadata_prefix) {
            return Ok(self.parse_metadata(rest, payload));
        }

        Ok(ParsedMessage::Ignored)
    }

    fn parse_sample(&self, topic: &str, channel: &str, payload: &str) -> Result<ParsedMessage> {
        if !self.channels.iter().any(|c| c == channel) {
            return Err(EngineError::UnknownChannel(channel.to_string()));
        }
        let value = parse_value(topic, payload)?;
        Ok(ParsedMessage::Sample {
            channel: channel.to_string(),
            value,
        })
    }

    fn parse_factor_update(
        &self,
        topic: &str,
        segments: &[&str],
        payload: &str,
    ) -> Result<ParsedMessage> {
        let factor = match segments.first() {
            Some(f) if !f.is_empty() => (*f).to_string(),
            _ => return Ok(ParsedMessage::Ignored),
        };
        let level = segments.get(1).map(|l| (*l).to_string());
        let value = parse_value(topic, payload)?;
        Ok(ParsedMessage::FactorUpdate {
            factor,
            level,
            value,
        })
    }

    fn parse_metadata(&self, rest: &str, payload: &str) -> ParsedMessage {
        let segments: Vec<&str> = rest.split('/').collect();
        let category = match segments.first().and_then(|s| MetadataCategory::from_segment(s)) {
            Some(category) => category,
            None => return ParsedMessage::Ignored,
        };
        let key = match segments.get(1) {
            Some(k) if !k.is_empty() => (*k).to_string(),
            _ => return ParsedMessage::Ignored,
        };
        let sub_key = segments.get(2).map(|s| (*s).to_string());
        ParsedMessage::Metadata {
            category,
            key,
            sub_key,
            value: payload.to_string(),
        }
    }
}

/// Strip `prefix` plus the following `/`, or `None` if it does not lead
fn strip_prefix_segment<'a>(topic: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = topic.strip_prefix(prefix)?;
    rest.strip_prefix('/')
}

fn parse_value(topic: &str, payload: &str) -> Result<f64> {
    payload
        .trim()
        .parse::<f64>()
        .map_err(|_| EngineError::MalformedPayload {
            topic: topic.to_string(),
            payload: payload.to_string(),
        })
}
