//! # Money Module
//!
//! Fixed-point numbers for the ledger.
//!
//! Every figure MoneyMap handles has exactly two decimal places of meaning:
//! money is a count of cents, percentages and ratios are hundredths. Values
//! are held as `i64` and never pass through floating-point arithmetic.
//!
//! Parsing is exact. `"12.5"` is 1250 hundredths; `"12.345"` is rejected
//! rather than rounded. Trailing zeros past the second place are accepted.
//!
//! Human-readable serializers (JSON) see a plain decimal number. Binary
//! serializers (postcard) see the raw `i64`.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors from parsing a fixed-point value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    #[error("empty value")]
    Empty,

    #[error("invalid number: {0}")]
    Invalid(String),

    #[error("more than two decimal places: {0}")]
    Precision(String),

    #[error("value out of range: {0}")]
    Overflow(String),
}

// =============================================================================
// PARSING AND FORMATTING
// =============================================================================

/// Parse a decimal string into hundredths.
pub(crate) fn parse_hundredths(input: &str) -> Result<i64, MoneyError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(MoneyError::Empty);
    }

    let (negative, unsigned) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let (whole, frac) = unsigned.split_once('.').unwrap_or((unsigned, ""));

    let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if (whole.is_empty() && frac.is_empty()) || !all_digits(whole) || !all_digits(frac) {
        return Err(MoneyError::Invalid(s.to_string()));
    }

    let frac = match frac.get(2..) {
        Some(extra) if extra.bytes().any(|b| b != b'0') => {
            return Err(MoneyError::Precision(s.to_string()));
        }
        Some(_) => &frac[..2],
        None => frac,
    };

    let whole_value: i64 = if whole.is_empty() {
        0
    } else {
        whole
            .parse()
            .map_err(|_| MoneyError::Overflow(s.to_string()))?
    };
    let frac_value: i64 = match frac.len() {
        0 => 0,
        1 => frac.parse::<i64>().unwrap_or(0) * 10,
        _ => frac.parse::<i64>().unwrap_or(0),
    };

    let magnitude = whole_value
        .checked_mul(100)
        .and_then(|v| v.checked_add(frac_value))
        .ok_or_else(|| MoneyError::Overflow(s.to_string()))?;

    Ok(if negative { -magnitude } else { magnitude })
}

/// Format hundredths as `[-]W.FF`.
fn fmt_hundredths(value: i64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let sign = if value < 0 { "-" } else { "" };
    let abs = value.unsigned_abs();
    write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// Visitor accepting JSON numbers or numeric strings as hundredths.
struct HundredthsVisitor;

impl Visitor<'_> for HundredthsVisitor {
    type Value = i64;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a decimal number with at most two fractional digits")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<i64, E> {
        v.checked_mul(100)
            .ok_or_else(|| E::custom(MoneyError::Overflow(v.to_string())))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<i64, E> {
        i64::try_from(v)
            .ok()
            .and_then(|v| v.checked_mul(100))
            .ok_or_else(|| E::custom(MoneyError::Overflow(v.to_string())))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<i64, E> {
        if !v.is_finite() {
            return Err(E::custom(MoneyError::Invalid(v.to_string())));
        }
        // f64 Display is the shortest round-trip form, never exponential.
        parse_hundredths(&v.to_string()).map_err(E::custom)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<i64, E> {
        parse_hundredths(v).map_err(E::custom)
    }
}

// =============================================================================
// FIXED-POINT TYPES
// =============================================================================

macro_rules! hundredths_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(i64);

        impl $name {
            /// Zero.
            pub const ZERO: Self = Self(0);

            /// Build from a raw count of hundredths.
            #[must_use]
            pub const fn from_hundredths(value: i64) -> Self {
                Self(value)
            }

            /// The raw count of hundredths.
            #[must_use]
            pub const fn hundredths(self) -> i64 {
                self.0
            }

            /// Parse a decimal string exactly.
            pub fn parse(input: &str) -> Result<Self, MoneyError> {
                parse_hundredths(input).map(Self)
            }

            /// Checked addition.
            #[must_use]
            pub fn checked_add(self, other: Self) -> Option<Self> {
                self.0.checked_add(other.0).map(Self)
            }

            /// Saturating addition.
            #[must_use]
            pub fn saturating_add(self, other: Self) -> Self {
                Self(self.0.saturating_add(other.0))
            }

            /// Saturating subtraction.
            #[must_use]
            pub fn saturating_sub(self, other: Self) -> Self {
                Self(self.0.saturating_sub(other.0))
            }

            /// True for values below zero.
            #[must_use]
            pub fn is_negative(self) -> bool {
                self.0 < 0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt_hundredths(self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = MoneyError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                if serializer.is_human_readable() {
                    let text = self.to_string();
                    match text.parse::<f64>() {
                        Ok(number) => serializer.serialize_f64(number),
                        Err(_) => serializer.serialize_str(&text),
                    }
                } else {
                    serializer.serialize_i64(self.0)
                }
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                if deserializer.is_human_readable() {
                    deserializer.deserialize_any(HundredthsVisitor).map(Self)
                } else {
                    i64::deserialize(deserializer).map(Self)
                }
            }
        }
    };
}

hundredths_type!(
    /// An amount of money in cents.
    Money
);

hundredths_type!(
    /// A percentage in hundredths of a percent (`25.50%` is 2550).
    Percent
);

hundredths_type!(
    /// A dimensionless ratio in hundredths (beta `1.15` is 115).
    Factor
);

impl Money {
    /// Build from a count of cents.
    #[must_use]
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// The amount in cents.
    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Sum an iterator of amounts, saturating at the `i64` bounds.
    pub fn sum<I: IntoIterator<Item = Money>>(amounts: I) -> Money {
        amounts
            .into_iter()
            .fold(Money::ZERO, |acc, m| acc.saturating_add(m))
    }
}

impl Percent {
    /// One hundred percent.
    pub const HUNDRED: Self = Self(10_000);

    /// True for `0 <= self <= 100%`.
    #[must_use]
    pub fn is_valid_share(self) -> bool {
        (0..=Self::HUNDRED.0).contains(&self.0)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parse_exact_decimals() {
        assert_eq!(Money::parse("12.34"), Ok(Money::from_cents(1234)));
        assert_eq!(Money::parse("12.5"), Ok(Money::from_cents(1250)));
        assert_eq!(Money::parse("12"), Ok(Money::from_cents(1200)));
        assert_eq!(Money::parse(".75"), Ok(Money::from_cents(75)));
        assert_eq!(Money::parse("-3.10"), Ok(Money::from_cents(-310)));
        assert_eq!(Money::parse("+3"), Ok(Money::from_cents(300)));
        assert_eq!(Money::parse(" 7.00 "), Ok(Money::from_cents(700)));
        assert_eq!(Money::parse("1.500"), Ok(Money::from_cents(150)));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(Money::parse(""), Err(MoneyError::Empty));
        assert!(matches!(Money::parse("abc"), Err(MoneyError::Invalid(_))));
        assert!(matches!(Money::parse("1.2.3"), Err(MoneyError::Invalid(_))));
        assert!(matches!(Money::parse("."), Err(MoneyError::Invalid(_))));
        assert!(matches!(Money::parse("1e5"), Err(MoneyError::Invalid(_))));
        assert!(matches!(
            Money::parse("12.345"),
            Err(MoneyError::Precision(_))
        ));
        assert!(matches!(
            Money::parse("999999999999999999999"),
            Err(MoneyError::Overflow(_))
        ));
    }

    #[test]
    fn display_pads_cents() {
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
        assert_eq!(Money::from_cents(-5).to_string(), "-0.05");
        assert_eq!(Money::from_cents(123_456).to_string(), "1234.56");
        assert_eq!(Percent::from_hundredths(2550).to_string(), "25.50");
    }

    #[test]
    fn json_accepts_numbers_and_strings() {
        let from_float: Money = serde_json::from_str("178.5").unwrap();
        let from_int: Money = serde_json::from_str("42").unwrap();
        let from_str: Money = serde_json::from_str("\"19.99\"").unwrap();
        assert_eq!(from_float.cents(), 17_850);
        assert_eq!(from_int.cents(), 4_200);
        assert_eq!(from_str.cents(), 1_999);

        assert!(serde_json::from_str::<Money>("\"1.999\"").is_err());
        assert!(serde_json::from_str::<Money>("true").is_err());
    }

    #[test]
    fn json_renders_number() {
        let json = serde_json::to_string(&Money::from_cents(1250)).unwrap();
        assert_eq!(json, "12.5");
        let json = serde_json::to_string(&Money::from_cents(-7)).unwrap();
        assert_eq!(json, "-0.07");
    }

    #[test]
    fn postcard_keeps_raw_hundredths() {
        let bytes = postcard::to_allocvec(&Percent::from_hundredths(3333)).unwrap();
        let back: Percent = postcard::from_bytes(&bytes).unwrap();
        assert_eq!(back.hundredths(), 3333);
    }

    #[test]
    fn sum_saturates() {
        let total = Money::sum([Money::from_cents(i64::MAX), Money::from_cents(1)]);
        assert_eq!(total.cents(), i64::MAX);
        assert_eq!(
            Money::sum([Money::from_cents(150), Money::from_cents(-50)]).cents(),
            100
        );
    }

    #[test]
    fn share_bounds() {
        assert!(Percent::ZERO.is_valid_share());
        assert!(Percent::HUNDRED.is_valid_share());
        assert!(!Percent::from_hundredths(10_001).is_valid_share());
        assert!(!Percent::from_hundredths(-1).is_valid_share());
    }

    proptest! {
        #[test]
        fn display_parse_roundtrip(cents in -1_000_000_000_000_000i64..1_000_000_000_000_000i64) {
            let money = Money::from_cents(cents);
            prop_assert_eq!(Money::parse(&money.to_string()), Ok(money));
        }

        #[test]
        fn json_roundtrip_small_amounts(cents in -100_000_000_000i64..100_000_000_000i64) {
            let money = Money::from_cents(cents);
            let json = serde_json::to_string(&money).unwrap();
            let back: Money = serde_json::from_str(&json).unwrap();
            prop_assert_eq!(back, money);
        }
    }
}
