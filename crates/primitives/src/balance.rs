//! Token amounts.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::{PrimitivesError, Result};

/// Number of PLUR in one BZZ.
pub const PLUR_PER_BZZ: u128 = 10_u128.pow(BZZ_DECIMALS);

/// Number of decimal places of the BZZ token.
pub const BZZ_DECIMALS: u32 = 16;

/// An exact amount of BZZ, stored as an integer number of PLUR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BzzBalance(u128);

impl BzzBalance {
    pub const ZERO: Self = Self(0);

    pub const fn from_plur(plur: u128) -> Self {
        Self(plur)
    }

    pub const fn plur(self) -> u128 {
        self.0
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    pub fn checked_mul(self, rhs: u128) -> Option<Self> {
        self.0.checked_mul(rhs).map(Self)
    }
}

impl fmt::Display for BzzBalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / PLUR_PER_BZZ;
        let frac = self.0 % PLUR_PER_BZZ;
        write!(f, "{whole}.{frac:016}")
    }
}

impl FromStr for BzzBalance {
    type Err = PrimitivesError;

    /// Parses a decimal BZZ amount such as `1.5` or `0.0000000000000001`.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || PrimitivesError::InvalidAmount(s.to_string());

        let (whole, frac) = s.trim().split_once('.').unwrap_or((s.trim(), ""));
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid());
        }
        if frac.len() > BZZ_DECIMALS as usize {
            return Err(invalid());
        }

        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        let frac_plur: u128 = if frac.is_empty() {
            0
        } else {
            let digits: u128 = frac.parse().map_err(|_| invalid())?;
            digits * 10_u128.pow(BZZ_DECIMALS - frac.len() as u32)
        };

        whole
            .checked_mul(PLUR_PER_BZZ)
            .and_then(|p| p.checked_add(frac_plur))
            .map(Self)
            .ok_or(PrimitivesError::Overflow("BZZ amount"))
    }
}
