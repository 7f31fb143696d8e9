// Taguchi Edge - Telemetry ingestion and S/N analysis engine
//
// Licensed under the AGPL-3.0 license.

//! # Taguchi Edge - Telemetry ingestion and S/N analysis
//!
//! An ingestion engine for industrial sensor telemetry delivered over a
//! topic-based publish/subscribe transport. Inbound samples are buffered per
//! channel, conditioned with a trailing moving average, and evaluated with
//! the Taguchi nominal-is-best signal-to-noise ratio; computed ratios are
//! published back onto the topic space. Control-factor set-points and
//! experiment metadata flow through the same entry point into their own
//! typed stores.
//!
//! ## Key Features
//!
//! - **Topic routing**: One entry point classifies every `(topic, payload)`
//!   pair; the engine's own output is never re-ingested
//! - **Two buffer roles**: A display buffer for dashboard readers and an
//!   analysis buffer feeding S/N, both bounded with FIFO eviction
//! - **Nominal-is-best S/N**: `-10 * log10(variance / mean^2)` in dB with
//!   defined degenerate cases, classified good / acceptable / poor
//! - **Orthogonal-array model**: Declared control factors, an L9 design
//!   matrix, and a deterministic first-nonzero set-point scan
//! - **Transport-agnostic**: Publish through any pub/sub client (MQTT in
//!   the reference deployment) via the [`Transport`] trait
//!
//! ## Quick Start
//!
//! ```rust
//! use taguchi_edge::{Engine, EngineConfig, Result, Transport};
//!
//! struct NullTransport;
//!
//! impl Transport for NullTransport {
//!     fn publish(&mut self, _topic: &str, _payload: &str) -> Result<()> {
//!         Ok(())
//!     }
//!     fn is_connected(&self) -> bool {
//!         true
//!     }
//! }
//!
//! let mut engine = Engine::new(EngineConfig::default(), NullTransport);
//!
//! // Subscribe the real transport to these filters, then feed every
//! // delivered message to the engine
//! for filter in engine.subscriptions() {
//!     println!("subscribe: {filter}");
//! }
//!
//! engine.handle_message("jetsion/taguchi/device001/pressure", "42.5");
//! engine.handle_message("jetsion/taguchi/device001/control_factors/A/2", "30");
//!
//! let samples = engine.display_snapshot("pressure").unwrap();
//! assert_eq!(samples.len(), 1);
//! ```
//!
//! ## Modules
//!
//! - [`topic`]: Inbound topic classification
//! - [`buffer`]: Bounded per-channel sample storage
//! - [`smoothing`]: Trailing moving-average filter
//! - [`sn`]: Nominal-is-best S/N computation and history
//! - [`factors`]: Control factors and the experiment design matrix
//! - [`metadata`]: Verbatim experiment metadata storage
//! - [`publisher`]: Transport seam and outbound topic formatting
//! - [`engine`]: Message routing and state ownership
//! - [`simulator`]: Set-point-driven simulated data (feature `simulator`)

pub mod buffer;
pub mod config;
pub mod engine;
pub mod error;
pub mod factors;
pub mod metadata;
pub mod publisher;
pub mod smoothing;
pub mod sn;
pub mod topic;

#[cfg(feature = "simulator")]
pub mod simulator;

// Re-exports for convenient access
pub use buffer::{ChannelStore, Sample, SampleBuffer};
pub use config::{ChannelSpec, EngineConfig};
pub use engine::{Engine, EngineStats};
pub use error::{EngineError, Result};
pub use factors::{ControlFactor, ExperimentDesign, FactorLevel, FactorRegistry, Setpoint};
pub use metadata::{MetadataCategory, MetadataStore, MetadataValue};
pub use publisher::{Publisher, Transport};
pub use smoothing::SmoothingFilter;
pub use sn::{Quality, SnEngine, SnHistory, SnRecord, SnResult, SN_PERFECT_DB};
pub use topic::{ParsedMessage, TopicParser};

#[cfg(feature = "simulator")]
pub use simulator::{ChannelResponse, SensorSimulator, SimulatorProfile};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
