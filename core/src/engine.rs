//! The pipeline engine: one synthesis and tax run from a single seed.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Synthesis        (all cohorts: gender, income, status, occupation)
//!   2. Tail adjustment  (threshold fixed before any change)
//!   3. Diagnostics      (against the adjusted population)
//!   4. Tax engine       (municipal rate resolved first)
//!
//! RULES:
//!   - Each stage completes before the next starts.
//!   - All randomness flows through the RngBank.
//!   - Every stage outcome is recorded in the event log.

use crate::{
    config::{MunicipalRate, MunicipalRateSource, SimConfig},
    diagnostics::{evaluate_fit, FitReport},
    error::SimResult,
    event::{EventLogEntry, SimEvent, Stage},
    reference::ReferenceTables,
    rng::RngBank,
    store::SimStore,
    summary::PopulationSummary,
    synthesizer::{PopulationSynthesizer, SynthesisOutcome},
    tail_adjustment::TailSummary,
    tax_engine::{tax_population, TaxTotals, TaxedIndividual},
    types::RunId,
};

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub population:     Vec<TaxedIndividual>,
    pub tail:           TailSummary,
    pub fit:            FitReport,
    pub municipal_rate: MunicipalRate,
    pub totals:         TaxTotals,
    pub summary:        PopulationSummary,
    pub events:         Vec<SimEvent>,
}

pub struct SimEngine {
    pub run_id:   RunId,
    pub rng_bank: RngBank,
    pub store:    SimStore,
    config:       SimConfig,
    reference:    ReferenceTables,
    next_seq:     u64,
}

impl SimEngine {
    pub fn new(
        run_id: RunId,
        seed: u64,
        config: SimConfig,
        reference: ReferenceTables,
        store: SimStore,
    ) -> Self {
        Self {
            rng_bank: RngBank::new(seed),
            run_id,
            store,
            config,
            reference,
            next_seq: 0,
        }
    }

    /// Engine over an in-memory store with the test config and tables.
    pub fn build_test(run_id: RunId, seed: u64) -> SimResult<Self> {
        Self::build_test_with(run_id, seed, SimConfig::default_test(), ReferenceTables::default_test())
    }

    pub fn build_test_with(
        run_id: RunId,
        seed: u64,
        config: SimConfig,
        reference: ReferenceTables,
    ) -> SimResult<Self> {
        let store = SimStore::in_memory()?;
        store.migrate()?;
        store.insert_run(&run_id, seed, "0.1.0-test", 0)?;
        Ok(Self::new(run_id, seed, config, reference, store))
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn reference(&self) -> &ReferenceTables {
        &self.reference
    }

    /// Run every stage once and persist the results.
    pub fn run(&mut self) -> SimResult<RunOutcome> {
        self.config.validate()?;
        let mut events = Vec::new();

        let init = SimEvent::RunInitialized {
            run_id: self.run_id.clone(),
            seed:   self.rng_bank.master_seed(),
        };
        self.record(Stage::Engine, init, &mut events)?;

        // 1–2. Synthesis and tail adjustment.
        let SynthesisOutcome { population, tail } = {
            let synthesizer = PopulationSynthesizer::new(&self.config, &self.reference)?;
            synthesizer.run(&self.rng_bank)?
        };
        let synthesized = SimEvent::PopulationSynthesized {
            individuals: population.len(),
            cohorts:     self.reference.population_by_age.values().filter(|c| **c > 0).count(),
        };
        self.record(Stage::Synthesis, synthesized, &mut events)?;

        let adjusted = SimEvent::TailAdjusted {
            threshold: tail.threshold,
            selected:  tail.selected,
            boosted:   tail.boosted,
        };
        self.record(Stage::TailAdjustment, adjusted, &mut events)?;
        self.store.insert_population(&self.run_id, &population)?;

        // 3. Diagnostics, against the raw (unsmoothed) reference.
        let fit = evaluate_fit(&population, &self.reference);
        self.store.insert_fit_groups(&self.run_id, &fit)?;
        let diagnosed = SimEvent::FitDiagnosed {
            groups:            fit.groups.len(),
            mae_total:         fit.mean_absolute_error.total,
            mae_wages:         fit.mean_absolute_error.wages,
            mae_capital_gains: fit.mean_absolute_error.capital_gains,
            mae_other_income:  fit.mean_absolute_error.other_income,
        };
        self.record(Stage::Diagnostics, diagnosed, &mut events)?;

        // 4. Taxes.
        let municipal_rate = self.config.tax.resolve_municipal_rate();
        if municipal_rate.source == MunicipalRateSource::Fallback {
            log::warn!(
                "tax: municipal rate unavailable, using default {:.4}",
                municipal_rate.rate
            );
            let fallback = SimEvent::MunicipalRateFallback { rate: municipal_rate.rate };
            self.record(Stage::Tax, fallback, &mut events)?;
        }
        let (taxed, totals) = tax_population(population, municipal_rate.rate, &self.config.tax);
        self.store.insert_taxes(&self.run_id, &taxed)?;
        let computed = SimEvent::TaxesComputed {
            individuals:       totals.individuals,
            municipal_rate:    municipal_rate.rate,
            income_tax:        totals.income_tax,
            municipal_tax:     totals.municipal_tax,
            capital_gains_tax: totals.capital_gains_tax,
            fixed_fees:        totals.fixed_fees,
            total_tax:         totals.total_tax,
        };
        self.record(Stage::Tax, computed, &mut events)?;

        let summary = PopulationSummary::from_taxed(&taxed, &totals);
        Ok(RunOutcome {
            population: taxed,
            tail,
            fit,
            municipal_rate,
            totals,
            summary,
            events,
        })
    }

    /// Query the persisted event log for this run.
    pub fn store_events(&self) -> SimResult<Vec<EventLogEntry>> {
        self.store.events_for_run(&self.run_id)
    }

    fn record(&mut self, stage: Stage, event: SimEvent, out: &mut Vec<SimEvent>) -> SimResult<()> {
        let entry = EventLogEntry {
            id:         None,
            run_id:     self.run_id.clone(),
            seq:        self.next_seq,
            stage:      stage.name().to_string(),
            event_type: event.type_name().to_string(),
            payload:    serde_json::to_string(&event)?,
        };
        self.store.append_event(&entry)?;
        self.next_seq += 1;
        log::debug!("{} event: {}", stage.name(), entry.event_type);
        out.push(event);
        Ok(())
    }
}
