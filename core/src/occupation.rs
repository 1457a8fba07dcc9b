//! Occupation assignment for employed individuals.
//!
//! Weights are absolute headcounts per gender. They are normalised to
//! probabilities once, when the assigner is built, and every draw after
//! that is an independent weighted categorical sample.

use crate::{
    error::{SimError, SimResult},
    rng::StreamRng,
    types::Gender,
};
use rand::distributions::WeightedIndex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OccupationWeight {
    pub occupation: String,
    pub headcount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct OccupationWeights {
    pub by_gender: BTreeMap<Gender, Vec<OccupationWeight>>,
}

impl OccupationWeights {
    pub fn validate(&self) -> SimResult<()> {
        for gender in Gender::ALL {
            let rows = self.by_gender.get(&gender).ok_or_else(|| {
                SimError::InvalidConfig(format!("no occupation weights for {gender}"))
            })?;
            if rows.iter().any(|r| r.headcount.is_nan() || r.headcount < 0.0) {
                return Err(SimError::InvalidConfig(format!(
                    "negative occupation headcount for {gender}"
                )));
            }
            if rows.iter().map(|r| r.headcount).sum::<f64>() <= 0.0 {
                return Err(SimError::InvalidConfig(format!(
                    "occupation headcounts for {gender} sum to zero"
                )));
            }
        }
        Ok(())
    }

    /// Headcounts scaled so each gender's probabilities sum to 1.
    pub fn probabilities(&self, gender: Gender) -> Vec<(String, f64)> {
        let rows = self.by_gender.get(&gender).map(Vec::as_slice).unwrap_or(&[]);
        let total: f64 = rows.iter().map(|r| r.headcount).sum();
        if total <= 0.0 {
            return Vec::new();
        }
        rows.iter()
            .map(|r| (r.occupation.clone(), r.headcount / total))
            .collect()
    }
}

struct GenderTable {
    labels: Vec<String>,
    index:  WeightedIndex<f64>,
}

pub struct OccupationAssigner {
    tables: BTreeMap<Gender, GenderTable>,
}

impl OccupationAssigner {
    pub fn new(weights: &OccupationWeights) -> SimResult<Self> {
        weights.validate()?;
        let mut tables = BTreeMap::new();
        for gender in Gender::ALL {
            let (labels, probs): (Vec<String>, Vec<f64>) =
                weights.probabilities(gender).into_iter().unzip();
            let index = WeightedIndex::new(&probs).map_err(|e| {
                SimError::InvalidConfig(format!("occupation weights for {gender}: {e}"))
            })?;
            tables.insert(gender, GenderTable { labels, index });
        }
        Ok(Self { tables })
    }

    /// Draw one occupation label. Only called for employed individuals.
    pub fn assign(&self, gender: Gender, rng: &mut StreamRng) -> SimResult<String> {
        let table = self.tables.get(&gender).ok_or_else(|| {
            SimError::InvalidConfig(format!("no occupation weights for {gender}"))
        })?;
        Ok(table.labels[rng.weighted(&table.index)].clone())
    }
}
