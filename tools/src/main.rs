//! pop-runner: headless population synthesis and tax run.
//!
//! Usage:
//!   pop-runner --seed 12345 --data-dir ./data --db run.db
//!   pop-runner --seed 12345 --reference-db silver.db --municipal-rate 0.1497
//!   pop-runner --seed 12345 --json

use anyhow::{Context, Result};
use taxsim_core::{
    config::{MunicipalRateSource, SimConfig},
    engine::{RunOutcome, SimEngine},
    reference::ReferenceTables,
    store::SimStore,
    types::{format_isk, Gender},
};
use std::env;

#[derive(serde::Serialize)]
struct JsonSummary<'a> {
    run_id: &'a str,
    seed: u64,
    municipal_rate: f64,
    municipal_rate_fallback: bool,
    tail: &'a taxsim_core::tail_adjustment::TailSummary,
    mean_absolute_error: &'a taxsim_core::diagnostics::Metrics,
    worst_by_gender: &'a std::collections::BTreeMap<Gender, Vec<taxsim_core::diagnostics::WorstGroup>>,
    totals: &'a taxsim_core::tax_engine::TaxTotals,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let json_output = args.iter().any(|a| a == "--json");
    let db = flag_value(&args, "--db").unwrap_or(":memory:");
    let data_dir = flag_value(&args, "--data-dir").unwrap_or("./data");
    let reference_db = flag_value(&args, "--reference-db");
    let municipal_override: Option<f64> = flag_value(&args, "--municipal-rate")
        .map(|v| v.parse().with_context(|| format!("--municipal-rate '{v}' is not a number")))
        .transpose()?;

    if !json_output {
        println!("Population microsimulation: pop-runner");
        println!("  seed:      {seed}");
        println!("  db:        {db}");
        println!("  data_dir:  {data_dir}");
        if let Some(path) = reference_db {
            println!("  reference: {path}");
        }
        println!();
    }

    let mut config = SimConfig::load(data_dir)?;
    if municipal_override.is_some() {
        config.tax.municipal_tax_rate = municipal_override;
        config.validate()?;
    }

    let reference = match reference_db {
        Some(path) => {
            let source = SimStore::open(path)?;
            source.migrate()?;
            let tables = source.load_reference_tables()?;
            tables.check_income_coverage()?;
            tables
        }
        None => ReferenceTables::load(data_dir).with_context(|| {
            format!("no reference tables under {data_dir}/reference; pass --reference-db to read them from SQLite")
        })?,
    };
    log::info!(
        "reference: {} ages, {} residents, {} income rows",
        reference.population_by_age.len(),
        reference.total_population(),
        reference.income.len()
    );

    let store = SimStore::open(db)?;
    store.migrate()?;

    let run_id = format!("run-{seed}-{}", uuid::Uuid::new_v4().simple());
    store.insert_run(
        &run_id,
        seed,
        env!("CARGO_PKG_VERSION"),
        chrono::Utc::now().timestamp(),
    )?;

    let mut engine = SimEngine::new(run_id.clone(), seed, config, reference, store);
    let outcome = engine.run()?;

    if json_output {
        print_json(&run_id, seed, &outcome)?;
    } else {
        print_summary(&run_id, &outcome);
    }
    Ok(())
}

fn print_json(run_id: &str, seed: u64, outcome: &RunOutcome) -> Result<()> {
    let summary = JsonSummary {
        run_id,
        seed,
        municipal_rate: outcome.municipal_rate.rate,
        municipal_rate_fallback: outcome.municipal_rate.source == MunicipalRateSource::Fallback,
        tail: &outcome.tail,
        mean_absolute_error: &outcome.fit.mean_absolute_error,
        worst_by_gender: &outcome.fit.worst_by_gender,
        totals: &outcome.summary.rounded_totals,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn print_summary(run_id: &str, outcome: &RunOutcome) {
    let summary = &outcome.summary;
    let mae = &outcome.fit.mean_absolute_error;
    let totals = &summary.rounded_totals;

    println!("=== RUN SUMMARY ===");
    println!("  run_id:         {run_id}");
    println!("  individuals:    {}", format_isk(summary.individuals as f64));
    for status in taxsim_core::types::Status::ALL {
        println!("  {:<15} {}", format!("{}:", status.as_str().to_lowercase()), summary.status_count(status));
    }
    println!(
        "  tail:           threshold {} / selected {} / boosted {}",
        format_isk(outcome.tail.threshold),
        outcome.tail.selected,
        outcome.tail.boosted
    );

    println!();
    println!("=== FIT CHECK (generated - official means by age/gender) ===");
    println!(
        "  MAE total: {}  wages: {}  cap gains: {}  other: {}",
        format_isk(mae.total),
        format_isk(mae.wages),
        format_isk(mae.capital_gains),
        format_isk(mae.other_income)
    );
    for (gender, worst) in &outcome.fit.worst_by_gender {
        let list: Vec<String> = worst
            .iter()
            .map(|w| format!("({}, {})", w.age, format_isk(w.total_error)))
            .collect();
        println!("  Worst total-income ages ({gender}): {}", list.join(", "));
    }

    println!();
    println!("=== TAX SUMMARY ===");
    let rate_note = match outcome.municipal_rate.source {
        MunicipalRateSource::Configured => "",
        MunicipalRateSource::Fallback => " (default, no rate loaded)",
    };
    println!("  municipal rate:     {:.4}{rate_note}", outcome.municipal_rate.rate);
    println!("  income tax:         {}", format_isk(totals.income_tax));
    println!("    of which munic.:  {}", format_isk(totals.municipal_tax));
    println!("  capital gains tax:  {}", format_isk(totals.capital_gains_tax));
    println!("  fixed fees:         {}", format_isk(totals.fixed_fees));
    println!("  total tax:          {}", format_isk(totals.total_tax));

    println!();
    println!("=== TOP OCCUPATIONS ===");
    for (label, count) in summary.occupation_counts.iter().take(10) {
        println!("  {label:<18} {}", format_isk(*count as f64));
    }
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    flag_value(args, flag)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
