// Taguchi Edge - Telemetry ingestion and S/N analysis engine
//
// Licensed under the AGPL-3.0 license.

//! Control factors and the experiment design matrix
//!
//! A control factor is a named experimental variable with a fixed, ordered
//! set of levels, each holding a numeric set-point. Factors and levels are
//! declared at construction; inbound updates may only overwrite set-points,
//! never grow the schema. The experiment design is a read-only orthogonal
//! array assigning one level per factor per run.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// One declared level of a control factor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactorLevel {
    /// Level identifier ("1", "2", ...)
    pub id: String,
    /// Current set-point; 0.0 means inactive
    pub setpoint: f64,
}

/// A named experimental variable with ordered levels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlFactor {
    /// Factor identifier ("A", "B", ...)
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Engineering unit of the set-points
    pub unit: String,
    levels: Vec<FactorLevel>,
}

impl ControlFactor {
    /// Declare a factor with the given level identifiers, set-points at 0.0
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        unit: impl Into<String>,
        level_ids: &[&str],
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            unit: unit.into(),
            levels: level_ids
                .iter()
                .map(|l| FactorLevel {
                    id: (*l).to_string(),
                    setpoint: 0.0,
                })
                .collect(),
        }
    }

    /// Declared levels in order
    pub fn levels(&self) -> &[FactorLevel] {
        &self.levels
    }

    /// Look up a level by identifier
    pub fn level(&self, id: &str) -> Option<&FactorLevel> {
        self.levels.iter().find(|l| l.id == id)
    }

    fn level_mut(&mut self, id: &str) -> Option<&mut FactorLevel> {
        self.levels.iter_mut().find(|l| l.id == id)
    }
}

/// The active experimental condition selected by the registry scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setpoint {
    /// Factor identifier
    pub factor: String,
    /// Level identifier
    pub level: String,
    /// Set-point value
    pub value: f64,
}

/// A fixed orthogonal array: rows are experiment runs, columns are factors
///
/// Read-only after construction. Entries are 1-based level indices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentDesign {
    factors: Vec<String>,
    runs: Vec<Vec<u8>>,
}

impl ExperimentDesign {
    /// Taguchi L9 array for 3 factors at 3 levels
    pub fn l9(factors: [&str; 3]) -> Self {
        Self {
            factors: factors.iter().map(|f| (*f).to_string()).collect(),
            runs: vec![
                vec![1, 1, 1],
                vec![1, 2, 2],
                vec![1, 3, 3],
                vec![2, 1, 2],
                vec![2, 2, 3],
                vec![2, 3, 1],
                vec![3, 1, 3],
                vec![3, 2, 1],
                vec![3, 3, 2],
            ],
        }
    }

    /// Factor identifiers, in column order
    pub fn factors(&self) -> &[String] {
        &self.factors
    }

    /// Number of runs
    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    /// Level assignments for a run, in column order
    pub fn run(&self, index: usize) -> Option<&[u8]> {
        self.runs.get(index).map(|r| r.as_slice())
    }

    /// Level assigned to a factor in a run
    pub fn level_for(&self, run: usize, factor: &str) -> Option<u8> {
        let col = self.factors.iter().position(|f| f == factor)?;
        self.runs.get(run).and_then(|r| r.get(col)).copied()
    }
}

/// Owns all control-factor state and the design matrix
///
/// Factor and level declarations are fixed at construction; only set-points
/// change at runtime, exclusively through [`FactorRegistry::set_level`].
#[derive(Debug, Clone)]
pub struct FactorRegistry {
    factors: Vec<ControlFactor>,
    design: ExperimentDesign,
}

impl FactorRegistry {
    /// Create a registry from declared factors and a design matrix
    pub fn new(factors: Vec<ControlFactor>, design: ExperimentDesign) -> Self {
        Self { factors, design }
    }

    /// The reference deployment: factors A (pressure), B (rpm), C (current),
    /// three levels each, L9 design, all set-points inactive
    pub fn reference() -> Self {
        let levels = ["1", "2", "3"];
        Self::new(
            vec![
                ControlFactor::new("A", "pressure", "bar", &levels),
                ControlFactor::new("B", "rpm", "RPM", &levels),
                ControlFactor::new("C", "current", "A", &levels),
            ],
            ExperimentDesign::l9(["A", "B", "C"]),
        )
    }

    /// Seed the reference factors with their nominal level values
    /// (A: 25/30/35 bar, B: 1000/2000/3000 RPM, C: 5/10/15 A)
    pub fn apply_reference_levels(&mut self) -> Result<()> {
        for (factor, values) in [
            ("A", [25.0, 30.0, 35.0]),
            ("B", [1000.0, 2000.0, 3000.0]),
            ("C", [5.0, 10.0, 15.0]),
        ] {
            for (level, value) in ["1", "2", "3"].iter().zip(values) {
                self.set_level(factor, level, value)?;
            }
        }
        Ok(())
    }

    /// Overwrite a level's set-point, returning the previous value
    ///
    /// Unknown factor or level identifiers leave the registry unchanged.
    pub fn set_level(&mut self, factor: &str, level: &str, value: f64) -> Result<f64> {
        let entry = self
            .factors
            .iter_mut()
            .find(|f| f.id == factor)
            .ok_or_else(|| EngineError::UnknownFactor(factor.to_string()))?;
        let slot = entry
            .level_mut(level)
            .ok_or_else(|| EngineError::UnknownLevel {
                factor: factor.to_string(),
                level: level.to_string(),
            })?;
        let previous = slot.setpoint;
        slot.setpoint = value;
        Ok(previous)
    }

    /// The active experimental condition: first nonzero set-point found in
    /// declaration order (factors outer, levels inner)
    ///
    /// A deterministic ordered scan, not a priority system. `None` when all
    /// set-points are inactive.
    pub fn current_setpoint(&self) -> Option<Setpoint> {
        for factor in &self.factors {
            for level in factor.levels() {
                if level.setpoint != 0.0 {
                    return Some(Setpoint {
                        factor: factor.id.clone(),
                        level: level.id.clone(),
                        value: level.setpoint,
                    });
                }
            }
        }
        None
    }

    /// Look up a declared factor
    pub fn factor(&self, id: &str) -> Option<&ControlFactor> {
        self.factors.iter().find(|f| f.id == id)
    }

    /// Declared factors, in declaration order
    pub fn factors(&self) -> &[ControlFactor] {
        &self.factors
    }

    /// The experiment design matrix
    pub fn design(&self) -> &ExperimentDesign {
        &self.design
    }
}
