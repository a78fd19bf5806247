//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  The storefront backend already speaks minor units:                     │
//! │    cart subtotal 2000, service quote 500, tip 300                       │
//! │                                                                         │
//! │  OUR SOLUTION: keep every amount in minor units (i64) end to end,       │
//! │  and only convert to "20.00" when formatting for display.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use storefront_core::money::{Currency, Money};
//!
//! let price = Money::from_minor(1099);
//! let total = price * 2 + Money::from_minor(500);
//! assert_eq!(total.minor(), 2698);
//!
//! assert_eq!(total.format(&Currency::new("USD")), "$26.98");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative values for refunds, discounts
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Currency-agnostic**: the currency lives on the cart, not on each amount
/// - **Saturating arithmetic**: tips and quantities come from user input, so
///   sums clamp at the i64 bounds instead of panicking
///
/// ## Where Money Flows
/// ```text
/// CartLine.unit_subtotal ──► CartLine.subtotal ──► Cart.subtotal
///                                                       │
///            TipSpec::resolve(subtotal) ◄───────────────┤
///                                                       ▼
///     DeliveryQuote.amount ──────────────────────► calculate_total
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units (cents, öre, möngö...).
    #[inline]
    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use storefront_core::money::Money;
    ///
    /// let unit = Money::from_minor(299);
    /// assert_eq!(unit.multiply_quantity(3).minor(), 897);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    /// Computes `round(self × percent / 100)`.
    ///
    /// Halves round toward positive infinity, the same way the mobile app's
    /// `Math.round` does, so totals shown before and after checkout agree.
    ///
    /// ## Example
    /// ```rust
    /// use storefront_core::money::Money;
    ///
    /// assert_eq!(Money::from_minor(2000).percent_of(10).minor(), 200);
    /// assert_eq!(Money::from_minor(1005).percent_of(10).minor(), 101); // 100.5 → 101
    /// assert_eq!(Money::from_minor(333).percent_of(15).minor(), 50);   // 49.95 → 50
    /// ```
    pub fn percent_of(&self, percent: u32) -> Money {
        // floor((amount * percent + 50) / 100), in i128 so large carts can't overflow
        let scaled = self.0 as i128 * percent as i128 + 50;
        let rounded = scaled.div_euclid(100);
        Money(rounded.clamp(i64::MIN as i128, i64::MAX as i128) as i64)
    }

    /// Formats the amount for display in the given currency.
    ///
    /// ## Note
    /// Display helper only. Localized formatting stays in the frontend.
    pub fn format(&self, currency: &Currency) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let exponent = currency.exponent();
        let divisor = 10u64.pow(exponent);
        let major = group_thousands(abs / divisor);

        let amount = if exponent == 0 {
            major
        } else {
            format!(
                "{}.{:0width$}",
                major,
                abs % divisor,
                width = exponent as usize
            )
        };

        match currency.symbol() {
            Some(symbol) => format!("{}{}{}", sign, symbol, amount),
            None => format!("{}{} {}", sign, currency.code(), amount),
        }
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

// =============================================================================
// Currency
// =============================================================================

/// An ISO 4217 currency code with its minor-unit exponent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(transparent)]
pub struct Currency(String);

impl Currency {
    /// Creates a currency from its ISO code (case-insensitive).
    pub fn new(code: impl AsRef<str>) -> Self {
        Currency(code.as_ref().trim().to_ascii_uppercase())
    }

    /// Returns the ISO code.
    pub fn code(&self) -> &str {
        &self.0
    }

    /// Number of minor-unit digits (2 for USD, 0 for JPY, 3 for KWD).
    pub fn exponent(&self) -> u32 {
        match self.0.as_str() {
            "JPY" | "KRW" | "VND" | "CLP" | "ISK" | "UGX" | "XAF" | "XOF" => 0,
            "BHD" | "KWD" | "OMR" | "JOD" | "TND" | "IQD" | "LYD" => 3,
            _ => 2,
        }
    }

    /// Display symbol for common currencies.
    pub fn symbol(&self) -> Option<&'static str> {
        match self.0.as_str() {
            "USD" => Some("$"),
            "EUR" => Some("€"),
            "GBP" => Some("£"),
            "MNT" => Some("₮"),
            "SGD" => Some("S$"),
            "JPY" => Some("¥"),
            _ => None,
        }
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::new("USD")
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Raw minor units, for logs. Use [`Money::format`] for display.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_sub(other.0);
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        self.multiply_quantity(qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic() {
        let a = Money::from_minor(1000);
        let b = Money::from_minor(500);

        assert_eq!((a + b).minor(), 1500);
        assert_eq!((a - b).minor(), 500);
        assert_eq!((a * 3).minor(), 3000);

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total.minor(), 2000);
    }

    #[test]
    fn test_percent_of_rounds_half_up() {
        assert_eq!(Money::from_minor(2000).percent_of(10).minor(), 200);
        assert_eq!(Money::from_minor(1005).percent_of(10).minor(), 101);
        assert_eq!(Money::from_minor(1004).percent_of(10).minor(), 100);
        assert_eq!(Money::from_minor(0).percent_of(50).minor(), 0);
        // Math.round(-0.5) is -0, Math.round(-1.5) is -1
        assert_eq!(Money::from_minor(-5).percent_of(10).minor(), 0);
        assert_eq!(Money::from_minor(-15).percent_of(10).minor(), -1);
    }

    #[test]
    fn test_percent_of_large_amount_does_not_overflow() {
        let big = Money::from_minor(i64::MAX / 2);
        assert!(big.percent_of(100).is_positive());
    }

    #[test]
    fn test_arithmetic_saturates_at_bounds() {
        let max = Money::from_minor(i64::MAX);
        let min = Money::from_minor(i64::MIN);

        assert_eq!((max + Money::from_minor(1)).minor(), i64::MAX);
        assert_eq!((min - Money::from_minor(1)).minor(), i64::MIN);
        assert_eq!((max * 2).minor(), i64::MAX);
        assert_eq!(max.percent_of(500).minor(), i64::MAX);

        let mut acc = Money::from_minor(2000);
        acc += max;
        assert_eq!(acc.minor(), i64::MAX);

        let total: Money = vec![max, max, Money::from_minor(-1)].into_iter().sum();
        assert_eq!(total.minor(), i64::MAX - 1);
    }

    #[test]
    fn test_format() {
        let usd = Currency::new("usd");
        assert_eq!(Money::from_minor(1099).format(&usd), "$10.99");
        assert_eq!(Money::from_minor(123_456_789).format(&usd), "$1,234,567.89");
        assert_eq!(Money::from_minor(-550).format(&usd), "-$5.50");
        assert_eq!(Money::from_minor(5).format(&usd), "$0.05");

        assert_eq!(Money::from_minor(1500).format(&Currency::new("JPY")), "¥1,500");
        assert_eq!(Money::from_minor(12345).format(&Currency::new("KWD")), "KWD 12.345");
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());
        assert!(Money::from_minor(-1).is_negative());
    }

    #[test]
    fn test_serializes_as_plain_integer() {
        let json = serde_json::to_string(&Money::from_minor(250)).unwrap();
        assert_eq!(json, "250");
        let back: Money = serde_json::from_str("250").unwrap();
        assert_eq!(back, Money::from_minor(250));
    }
}
