//! The run event log.
//!
//! RULE: every stage reports what it did through events, and the engine
//! persists each one. Variants are appended, never removed or reordered.

use crate::types::{Isk, RunId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    // ── Engine events ──────────────────────────────
    RunInitialized {
        run_id: RunId,
        seed: u64,
    },

    // ── Synthesis events ───────────────────────────
    PopulationSynthesized {
        individuals: usize,
        cohorts: usize,
    },
    TailAdjusted {
        threshold: Isk,
        selected: usize,
        boosted: usize,
    },

    // ── Diagnostics events ─────────────────────────
    FitDiagnosed {
        groups: usize,
        mae_total: f64,
        mae_wages: f64,
        mae_capital_gains: f64,
        mae_other_income: f64,
    },

    // ── Tax events ─────────────────────────────────
    /// Warning: no municipal rate was available and the default was used.
    MunicipalRateFallback {
        rate: f64,
    },
    TaxesComputed {
        individuals: usize,
        municipal_rate: f64,
        income_tax: Isk,
        municipal_tax: Isk,
        capital_gains_tax: Isk,
        fixed_fees: Isk,
        total_tax: Isk,
    },
}

impl SimEvent {
    /// Stable name for the event_type column.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::RunInitialized { .. }        => "run_initialized",
            Self::PopulationSynthesized { .. } => "population_synthesized",
            Self::TailAdjusted { .. }          => "tail_adjusted",
            Self::FitDiagnosed { .. }          => "fit_diagnosed",
            Self::MunicipalRateFallback { .. } => "municipal_rate_fallback",
            Self::TaxesComputed { .. }         => "taxes_computed",
        }
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, Self::MunicipalRateFallback { .. })
    }
}

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Engine,
    Synthesis,
    TailAdjustment,
    Diagnostics,
    Tax,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Engine         => "engine",
            Self::Synthesis      => "synthesis",
            Self::TailAdjustment => "tail_adjustment",
            Self::Diagnostics    => "diagnostics",
            Self::Tax            => "tax",
        }
    }
}

/// Persisted form of an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id:         Option<i64>,
    pub run_id:     RunId,
    /// Position of the event within the run.
    pub seq:        u64,
    pub stage:      String,
    pub event_type: String,
    pub payload:    String,
}
