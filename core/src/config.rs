use crate::{
    error::{SimError, SimResult},
    occupation::{OccupationWeight, OccupationWeights},
    types::{Age, Gender, Isk},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Municipal income tax rate used when no rate can be loaded.
/// Weighted national average of the municipal levy (útsvar).
pub const DEFAULT_MUNICIPAL_TAX_RATE: f64 = 0.1494;

// ── Tax schedule ───────────────────────────────────────────────────

/// One band of the progressive state schedule. `upper_bound` is the
/// cumulative income ceiling of the band; `None` marks the terminal band.
/// Reading the bounds as band widths instead would move the top band's
/// start from 15 030 012 to 20 383 644, so amounts above 15.03M differ.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TaxBracket {
    pub upper_bound: Option<Isk>,
    pub rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxConfig {
    pub brackets: Vec<TaxBracket>,
    /// Annual personal credit, deducted from state + municipal tax.
    pub personal_tax_credit: Isk,
    /// Below this age the flat child rate applies instead of the brackets.
    pub child_age_limit: Age,
    pub child_tax_rate: f64,
    /// Income a child may earn before the child rate applies.
    pub child_exempt_amount: Isk,
    pub capital_gains_rate: f64,
    pub capital_gains_exempt_threshold: Isk,
    /// Broadcasting (RÚV) fee.
    pub radio_fee: Isk,
    /// Framkvæmdasjóður aldraðra.
    pub elderly_fund_fee: Isk,
    /// Fixed fees are levied from this age.
    pub fee_age: Age,
    /// Loaded from an external source; `None` means unavailable.
    #[serde(default)]
    pub municipal_tax_rate: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MunicipalRateSource {
    Configured,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MunicipalRate {
    pub rate: f64,
    pub source: MunicipalRateSource,
}

impl TaxConfig {
    /// 2024 Icelandic schedule (monthly bounds × 12).
    pub fn iceland_2024() -> Self {
        Self {
            brackets: vec![
                TaxBracket { upper_bound: Some(446_136.0 * 12.0),   rate: 0.3148 },
                TaxBracket { upper_bound: Some(1_252_501.0 * 12.0), rate: 0.3798 },
                TaxBracket { upper_bound: None,                     rate: 0.4628 },
            ],
            personal_tax_credit:            779_112.0,
            child_age_limit:                16,
            child_tax_rate:                 0.06,
            child_exempt_amount:            180_000.0,
            capital_gains_rate:             0.22,
            capital_gains_exempt_threshold: 300_000.0,
            radio_fee:                      20_900.0,
            elderly_fund_fee:               13_749.0,
            fee_age:                        18,
            municipal_tax_rate:             None,
        }
    }

    /// The municipal rate to apply. Falls back to
    /// DEFAULT_MUNICIPAL_TAX_RATE when none was loaded; callers must
    /// surface a Fallback source to the user.
    pub fn resolve_municipal_rate(&self) -> MunicipalRate {
        match self.municipal_tax_rate {
            Some(rate) => MunicipalRate { rate, source: MunicipalRateSource::Configured },
            None => MunicipalRate {
                rate:   DEFAULT_MUNICIPAL_TAX_RATE,
                source: MunicipalRateSource::Fallback,
            },
        }
    }

    pub fn validate(&self) -> SimResult<()> {
        let Some((last, rest)) = self.brackets.split_last() else {
            return Err(SimError::InvalidConfig("tax schedule has no brackets".into()));
        };
        if last.upper_bound.is_some() {
            return Err(SimError::InvalidConfig(
                "terminal tax bracket must be unbounded".into(),
            ));
        }
        let mut previous = 0.0;
        for bracket in rest {
            let bound = bracket.upper_bound.ok_or_else(|| {
                SimError::InvalidConfig("only the terminal tax bracket may be unbounded".into())
            })?;
            if bound <= previous {
                return Err(SimError::InvalidConfig(format!(
                    "tax bracket bounds must be strictly ascending ({bound} after {previous})"
                )));
            }
            previous = bound;
        }
        let rates = self
            .brackets
            .iter()
            .map(|b| b.rate)
            .chain([self.child_tax_rate, self.capital_gains_rate]);
        for rate in rates {
            if !(0.0..=1.0).contains(&rate) {
                return Err(SimError::InvalidConfig(format!("tax rate {rate} outside [0, 1]")));
            }
        }
        if let Some(rate) = self.municipal_tax_rate {
            if !(0.0..=1.0).contains(&rate) {
                return Err(SimError::InvalidConfig(format!(
                    "municipal tax rate {rate} outside [0, 1]"
                )));
            }
        }
        Ok(())
    }
}

// ── Synthesis parameters ───────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    // Income noise
    pub noise_std_dev: f64,
    /// Tighter spread where the reference data is sparse.
    pub high_age_noise_std_dev: f64,
    pub high_age_threshold: Age,
    pub noise_clip_low: f64,
    pub noise_clip_high: f64,
    // Taper at the top of the observed range
    pub taper_start_age: Age,
    pub taper_per_year: f64,
    pub taper_floor: f64,
    // Status classification
    pub retirement_start_age: Age,
    /// Years from retirement_start_age until retirement is certain.
    pub retirement_ramp_years: f64,
    pub default_employment_rate: f64,
    /// Total income at which the employment dampening stops.
    pub employment_income_scale: Isk,
    pub student_probability_floor: f64,
    /// Age at which the student probability reaches its floor.
    pub student_decay_end_age: Age,
    // Tail adjustment
    pub tail_quantile: f64,
    pub tail_boost_start_age: Age,
    pub tail_boost_full_age: Age,
    pub tail_boost_base: f64,
    pub tail_capital_gains_cap: Isk,
    pub tail_capital_gains_scale: Isk,
    /// Centred moving-average window over ages; `None` disables smoothing.
    #[serde(default)]
    pub smoothing_window: Option<usize>,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            noise_std_dev:             0.08,
            high_age_noise_std_dev:    0.03,
            high_age_threshold:        90,
            noise_clip_low:            0.85,
            noise_clip_high:           1.15,
            taper_start_age:           85,
            taper_per_year:            0.001,
            taper_floor:               0.98,
            retirement_start_age:      60,
            retirement_ramp_years:     8.0,
            default_employment_rate:   0.5,
            employment_income_scale:   100_000.0,
            student_probability_floor: 0.05,
            student_decay_end_age:     60,
            tail_quantile:             0.999,
            tail_boost_start_age:      65,
            tail_boost_full_age:       90,
            tail_boost_base:           3.0,
            tail_capital_gains_cap:    2_000_000.0,
            tail_capital_gains_scale:  1_000_000.0,
            smoothing_window:          Some(5),
        }
    }
}

impl SynthesisConfig {
    pub fn validate(&self) -> SimResult<()> {
        if !(self.noise_clip_low <= 1.0 && 1.0 <= self.noise_clip_high) {
            return Err(SimError::InvalidConfig(format!(
                "noise clip band [{}, {}] must contain 1.0",
                self.noise_clip_low, self.noise_clip_high
            )));
        }
        if self.noise_clip_low < 0.0 {
            return Err(SimError::InvalidConfig("noise clip band must be non-negative".into()));
        }
        if self.noise_std_dev < 0.0 || self.high_age_noise_std_dev < 0.0 {
            return Err(SimError::InvalidConfig("noise spread must be non-negative".into()));
        }
        if !(0.0..1.0).contains(&self.tail_quantile) {
            return Err(SimError::InvalidConfig(format!(
                "tail quantile {} outside [0, 1)",
                self.tail_quantile
            )));
        }
        if self.tail_boost_full_age <= self.tail_boost_start_age {
            return Err(SimError::InvalidConfig(
                "tail boost ramp must end after it starts".into(),
            ));
        }
        if self.retirement_ramp_years <= 0.0 || self.employment_income_scale <= 0.0 {
            return Err(SimError::InvalidConfig(
                "retirement ramp and employment income scale must be positive".into(),
            ));
        }
        if self.student_decay_end_age <= crate::types::INCOME_START_AGE {
            return Err(SimError::InvalidConfig(
                "student decay must end after income starts".into(),
            ));
        }
        if let Some(window) = self.smoothing_window {
            let max_window = usize::from(crate::types::MAX_AGE) + 1;
            if window == 0 || window > max_window {
                return Err(SimError::InvalidConfig(format!(
                    "smoothing window {window} outside 1..={max_window}"
                )));
            }
        }
        Ok(())
    }
}

// ── Files ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
struct MunicipalRateFile {
    municipal_tax_rate: f64,
}

#[derive(Debug, Clone)]
pub struct SimConfig {
    pub synthesis: SynthesisConfig,
    pub tax: TaxConfig,
    pub occupations: OccupationWeights,
}

impl SimConfig {
    /// Load from the data/ directory.
    /// In tests, use SimConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let synthesis: SynthesisConfig = read_json(data_dir, "synthesis/synthesis.json")?;
        let mut tax: TaxConfig = read_json(data_dir, "tax/tax_schedule.json")?;
        let occupations: OccupationWeights =
            read_json(data_dir, "occupations/occupation_weights.json")?;

        // The municipal rate is published separately and may be missing.
        let rate_path = format!("{data_dir}/tax/municipal_rate.json");
        if Path::new(&rate_path).exists() {
            let file: MunicipalRateFile = read_json(data_dir, "tax/municipal_rate.json")?;
            tax.municipal_tax_rate = Some(file.municipal_tax_rate);
        } else if tax.municipal_tax_rate.is_none() {
            log::warn!("{rate_path} not found; municipal rate will fall back to the default");
        }

        let config = Self { synthesis, tax, occupations };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SimResult<()> {
        self.synthesis.validate()?;
        self.tax.validate()?;
        self.occupations.validate()
    }

    /// Config with hardcoded defaults for use in unit tests.
    pub fn default_test() -> Self {
        Self {
            synthesis:   SynthesisConfig::default(),
            tax:         TaxConfig::iceland_2024(),
            occupations: default_occupation_weights(),
        }
    }
}

/// Labour-force survey headcounts by major occupational group.
pub fn default_occupation_weights() -> OccupationWeights {
    let table = |rows: &[(&str, f64)]| -> Vec<OccupationWeight> {
        rows.iter()
            .map(|(occupation, headcount)| OccupationWeight {
                occupation: (*occupation).to_string(),
                headcount:  *headcount,
            })
            .collect()
    };
    let mut by_gender = BTreeMap::new();
    by_gender.insert(
        Gender::Male,
        table(&[
            ("Managers",          17_600.0),
            ("Professionals",     19_800.0),
            ("Technicians",       17_200.0),
            ("OfficeStaff",        2_800.0),
            ("ServiceCare",       20_000.0),
            ("IndustrialWorkers", 29_400.0),
            ("Laborers",          12_300.0),
        ]),
    );
    by_gender.insert(
        Gender::Female,
        table(&[
            ("Managers",          10_100.0),
            ("Professionals",     31_900.0),
            ("Technicians",       17_300.0),
            ("OfficeStaff",        6_400.0),
            ("ServiceCare",       25_300.0),
            ("IndustrialWorkers",  2_700.0),
            ("Laborers",           6_300.0),
        ]),
    );
    OccupationWeights { by_gender }
}

fn read_json<T: serde::de::DeserializeOwned>(data_dir: &str, rel: &str) -> anyhow::Result<T> {
    let path = format!("{data_dir}/{rel}");
    let content = std::fs::read_to_string(&path)
        .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
    serde_json::from_str(&content).map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))
}
