//! Shared primitive types used across the entire simulation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Age in whole years. Supported range is 0..=MAX_AGE.
pub type Age = u8;

/// Currency amount in ISK. Synthesised amounts are whole krónur
/// stored as f64 so tax arithmetic stays in one numeric domain.
pub type Isk = f64;

/// The canonical run identifier.
pub type RunId = String;

pub const MAX_AGE: Age = 109;

/// Below this age nobody has income and everyone is a student.
pub const INCOME_START_AGE: Age = 13;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub const ALL: [Gender; 2] = [Gender::Male, Gender::Female];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male   => "Male",
            Self::Female => "Female",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Male" | "Karlar"   => Some(Self::Male),
            "Female" | "Konur"  => Some(Self::Female),
            _ => None,
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Status {
    Student,
    Employed,
    Retired,
    Disabled,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::Student,
        Status::Employed,
        Status::Retired,
        Status::Disabled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student  => "Student",
            Self::Employed => "Employed",
            Self::Retired  => "Retired",
            Self::Disabled => "Disabled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|st| st.as_str() == s)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Round half to even, matching how the published tables were rounded.
pub fn round_isk(amount: f64) -> Isk {
    amount.round_ties_even()
}

/// Format an amount as a whole number with `.` thousand separators,
/// e.g. 1234567.4 -> "1.234.567".
pub fn format_isk(amount: f64) -> String {
    let rounded = amount.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}
