// Taguchi Edge - Telemetry ingestion and S/N analysis engine
//
// Licensed under the AGPL-3.0 license.

//! Experiment metadata storage
//!
//! Free-form experiment metadata arrives on its own topic namespace and is
//! stored verbatim under a tagged category rather than an untyped nested
//! map. Values are either a scalar string or one level of keyed sub-entries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The declared metadata categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetadataCategory {
    /// Factor definitions mirrored onto the metadata namespace
    ControlFactors,
    /// Orthogonal-array assignments
    ExperimentDesign,
    /// Per-run measured data
    ExperimentData,
    /// Published S/N values (engine output; never re-ingested)
    SnRatio,
    /// Aggregated run results
    ExperimentResults,
    /// Run status flags
    ExperimentStatus,
    /// Operator control commands
    Control,
}

impl MetadataCategory {
    /// All categories, in topic declaration order
    pub const ALL: [Self; 7] = [
        Self::ControlFactors,
        Self::ExperimentDesign,
        Self::ExperimentData,
        Self::SnRatio,
        Self::ExperimentResults,
        Self::ExperimentStatus,
        Self::Control,
    ];

    /// Parse a topic segment into a category
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "control_factors" => Some(Self::ControlFactors),
            "experiment_design" => Some(Self::ExperimentDesign),
            "experiment_data" => Some(Self::ExperimentData),
            "sn_ratio" => Some(Self::SnRatio),
            "experiment_results" => Some(Self::ExperimentResults),
            "experiment_status" => Some(Self::ExperimentStatus),
            "control" => Some(Self::Control),
            _ => None,
        }
    }

    /// The topic segment for this category
    pub fn as_segment(&self) -> &'static str {
        match self {
            Self::ControlFactors => "control_factors",
            Self::ExperimentDesign => "experiment_design",
            Self::ExperimentData => "experiment_data",
            Self::SnRatio => "sn_ratio",
            Self::ExperimentResults => "experiment_results",
            Self::ExperimentStatus => "experiment_status",
            Self::Control => "control",
        }
    }
}

/// A stored metadata value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetadataValue {
    /// Payload stored directly under the key
    Scalar(String),
    /// Sub-keyed payloads under the key
    Nested(BTreeMap<String, String>),
}

/// Verbatim metadata storage, one keyed map per category
#[derive(Debug, Default)]
pub struct MetadataStore {
    categories: BTreeMap<&'static str, BTreeMap<String, MetadataValue>>,
}

impl MetadataStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a payload under (category, key) or (category, key, sub-key)
    ///
    /// A sub-keyed write against an existing scalar replaces it with a
    /// nested map; the reverse replaces the whole nested map.
    pub fn set(
        &mut self,
        category: MetadataCategory,
        key: &str,
        sub_key: Option<&str>,
        value: &str,
    ) {
        let entries = self.categories.entry(category.as_segment()).or_default();
        match sub_key {
            None => {
                entries.insert(key.to_string(), MetadataValue::Scalar(value.to_string()));
            }
            Some(sub) => {
                let entry = entries
                    .entry(key.to_string())
                    .or_insert_with(|| MetadataValue::Nested(BTreeMap::new()));
                if !matches!(entry, MetadataValue::Nested(_)) {
                    *entry = MetadataValue::Nested(BTreeMap::new());
                }
                if let MetadataValue::Nested(map) = entry {
                    map.insert(sub.to_string(), value.to_string());
                }
            }
        }
    }

    /// Look up a stored value
    pub fn get(&self, category: MetadataCategory, key: &str) -> Option<&MetadataValue> {
        self.categories.get(category.as_segment())?.get(key)
    }

    /// Look up a sub-keyed payload
    pub fn get_nested(&self, category: MetadataCategory, key: &str, sub_key: &str) -> Option<&str> {
        match self.get(category, key)? {
            MetadataValue::Nested(map) => map.get(sub_key).map(String::as_str),
            MetadataValue::Scalar(_) => None,
        }
    }

    /// Owned copy of a category's entries
    pub fn snapshot(&self, category: MetadataCategory) -> BTreeMap<String, MetadataValue> {
        self.categories
            .get(category.as_segment())
            .cloned()
            .unwrap_or_default()
    }

    /// Number of keys stored under a category
    pub fn len(&self, category: MetadataCategory) -> usize {
        self.categories
            .get(category.as_segment())
            .map(BTreeMap::len)
            .unwrap_or(0)
    }

    /// Check if the store holds nothing
    pub fn is_empty(&self) -> bool {
        self.categories.values().all(BTreeMap::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_segments_roundtrip() {
        for category in MetadataCategory::ALL {
            assert_eq!(
                MetadataCategory::from_segment(category.as_segment()),
                Some(category)
            );
        }
        assert_eq!(MetadataCategory::from_segment("bogus"), None);
    }

    #[test]
    fn test_store_scalar() {
        let mut store = MetadataStore::new();
        store.set(MetadataCategory::ExperimentStatus, "run_3", None, "running");
        assert_eq!(
            store.get(MetadataCategory::ExperimentStatus, "run_3"),
            Some(&MetadataValue::Scalar("running".to_string()))
        );
    }

    #[test]
    fn test_store_nested() {
        let mut store = MetadataStore::new();
        store.set(MetadataCategory::ExperimentData, "run_1", Some("pressure"), "25.3");
        store.set(MetadataCategory::ExperimentData, "run_1", Some("rpm"), "1500");
        assert_eq!(
            store.get_nested(MetadataCategory::ExperimentData, "run_1", "rpm"),
            Some("1500")
        );
        assert_eq!(store.len(MetadataCategory::ExperimentData), 1);
    }

    #[test]
    fn test_store_scalar_replaced_by_nested() {
        let mut store = MetadataStore::new();
        store.set(MetadataCategory::Control, "mode", None, "auto");
        store.set(MetadataCategory::Control, "mode", Some("source"), "panel");
        assert_eq!(
            store.get_nested(MetadataCategory::Control, "mode", "source"),
            Some("panel")
        );
    }

    #[test]
    fn test_store_verbatim_payloads() {
        let mut store = MetadataStore::new();
        // Non-numeric payloads are legal here; stored untouched
        store.set(MetadataCategory::ExperimentResults, "best", None, "A2,B1,C3");
        assert_eq!(
            store.get(MetadataCategory::ExperimentResults, "best"),
            Some(&MetadataValue::Scalar("A2,B1,C3".to_string()))
        );
    }

    #[test]
    fn test_store_snapshot_is_copy() {
        let mut store = MetadataStore::new();
        store.set(MetadataCategory::Control, "mode", None, "auto");
        let mut snapshot = store.snapshot(MetadataCategory::Control);
        snapshot.insert("extra".to_string(), MetadataValue::Scalar("x".to_string()));
        assert_eq!(store.len(MetadataCategory::Control), 1);
    }
}
