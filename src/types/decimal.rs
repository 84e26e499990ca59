//! The `decimal` extension type: fixed point with four fractional digits.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::PolicyError;

static DECIMAL_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(-?)([0-9]+)\.([0-9]{1,4})$")
        .unwrap_or_else(|e| unreachable!("static decimal regex is valid: {e}"))
});

/// A decimal value stored as an integer scaled by 10^4.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Decimal(i64);

impl Decimal {
    pub const DIGITS: u32 = 4;
    const SCALE: i64 = 10_i64.pow(Self::DIGITS);

    pub fn from_scaled(raw: i64) -> Self {
        Decimal(raw)
    }

    pub fn scaled(&self) -> i64 {
        self.0
    }
}

impl FromStr for Decimal {
    type Err = PolicyError;

    /// Accepts `[-]digits.digits` with one to four fractional digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PolicyError::InvalidDecimal(s.to_string());
        let caps = DECIMAL_LITERAL.captures(s).ok_or_else(invalid)?;
        let negative = !caps[1].is_empty();
        let whole: i64 = caps[2].parse().map_err(|_| invalid())?;

        let frac_digits = &caps[3];
        let mut frac: i64 = frac_digits.parse().map_err(|_| invalid())?;
        for _ in frac_digits.len()..Self::DIGITS as usize {
            frac *= 10;
        }

        let magnitude = whole.checked_mul(Self::SCALE).ok_or_else(invalid)?;
        let raw = if negative {
            magnitude.checked_neg().and_then(|m| m.checked_sub(frac))
        } else {
            magnitude.checked_add(frac)
        };
        raw.map(Decimal).ok_or_else(invalid)
    }
}

impl Display for Decimal {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let scale = Self::SCALE.unsigned_abs();
        write!(f, "{sign}{}.{:04}", abs / scale, abs % scale)
    }
}
