//! # Tips
//!
//! A tip is either a fixed amount in minor units or a percentage of the cart
//! subtotal. The mobile app sends them as JSON `300` or `"10%"`.
//!
//! ## Parsing Rules
//! ```text
//! ┌──────────────┬──────────────────────────────┐
//! │ input        │ result                       │
//! ├──────────────┼──────────────────────────────┤
//! │ "10%"        │ Percent(10)                  │
//! │ " 15% "      │ Percent(15)  (trimmed)       │
//! │ "300"        │ Fixed(300)                   │
//! │ "%10"        │ InvalidTip                   │
//! │ "10.5%"      │ InvalidTip                   │
//! │ "-5%"        │ InvalidTip                   │
//! │ "" / "abc"   │ InvalidTip                   │
//! │ "150%"       │ InvalidTip (over 100%)       │
//! └──────────────┴──────────────────────────────┘
//! ```
//! [`TipSpec::parse_or_zero`] maps every invalid input to a zero tip so a
//! malformed value can never leak into a displayed total.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::money::Money;
use crate::MAX_TIP_PERCENT;

/// Fixed or percentage tip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TipInput", into = "TipInput")]
pub enum TipSpec {
    /// Absolute amount in minor units.
    Fixed(Money),
    /// Whole-number percentage of the cart subtotal.
    Percent(u32),
}

impl TipSpec {
    /// Resolves the tip against a subtotal.
    ///
    /// ## Example
    /// ```rust
    /// use storefront_core::money::Money;
    /// use storefront_core::tip::TipSpec;
    ///
    /// let subtotal = Money::from_minor(2000);
    /// assert_eq!(TipSpec::Percent(10).resolve(subtotal).minor(), 200);
    /// assert_eq!(TipSpec::Fixed(Money::from_minor(300)).resolve(subtotal).minor(), 300);
    /// ```
    pub fn resolve(&self, subtotal: Money) -> Money {
        match self {
            TipSpec::Fixed(amount) => *amount,
            TipSpec::Percent(pct) => subtotal.percent_of(*pct),
        }
    }

    /// Parses untrusted input, falling back to a zero tip.
    pub fn parse_or_zero(input: &str) -> TipSpec {
        input
            .parse()
            .unwrap_or(TipSpec::Fixed(Money::zero()))
    }

    /// Returns true when the tip contributes nothing regardless of subtotal.
    pub fn is_zero(&self) -> bool {
        match self {
            TipSpec::Fixed(amount) => amount.is_zero(),
            TipSpec::Percent(pct) => *pct == 0,
        }
    }
}

impl Default for TipSpec {
    fn default() -> Self {
        TipSpec::Fixed(Money::zero())
    }
}

impl FromStr for TipSpec {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| CoreError::InvalidTip {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(invalid("tip is empty"));
        }

        let (digits, is_percent) = match trimmed.strip_suffix('%') {
            Some(rest) => (rest, true),
            None => (trimmed, false),
        };

        if digits.is_empty() {
            return Err(invalid("percent sign must follow the digits"));
        }
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("only whole, non-negative numbers are allowed"));
        }

        if is_percent {
            let pct: u32 = digits
                .parse()
                .map_err(|_| invalid("percentage is too large"))?;
            if pct > MAX_TIP_PERCENT {
                return Err(invalid("percentage cannot exceed 100"));
            }
            Ok(TipSpec::Percent(pct))
        } else {
            let amount: i64 = digits
                .parse()
                .map_err(|_| invalid("amount is too large"))?;
            Ok(TipSpec::Fixed(Money::from_minor(amount)))
        }
    }
}

impl fmt::Display for TipSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TipSpec::Fixed(amount) => write!(f, "{}", amount.minor()),
            TipSpec::Percent(pct) => write!(f, "{}%", pct),
        }
    }
}

// =============================================================================
// Wire Representation
// =============================================================================

/// JSON shape used by the storefront backend: `300` or `"10%"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum TipInput {
    Amount(i64),
    Text(String),
}

impl TryFrom<TipInput> for TipSpec {
    type Error = CoreError;

    fn try_from(input: TipInput) -> Result<Self, Self::Error> {
        match input {
            TipInput::Amount(amount) if amount < 0 => Err(CoreError::InvalidTip {
                input: amount.to_string(),
                reason: "only whole, non-negative numbers are allowed".to_string(),
            }),
            TipInput::Amount(amount) => Ok(TipSpec::Fixed(Money::from_minor(amount))),
            TipInput::Text(text) => text.parse(),
        }
    }
}

impl From<TipSpec> for TipInput {
    fn from(tip: TipSpec) -> Self {
        match tip {
            TipSpec::Fixed(amount) => TipInput::Amount(amount.minor()),
            TipSpec::Percent(pct) => TipInput::Text(format!("{}%", pct)),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
