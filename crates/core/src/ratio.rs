//! Exact rational thresholds
//!
//! Thresholds are compared against vote counts and stake sums that must give
//! the same answer on every node, so no floating point is involved anywhere:
//! comparisons are done by cross-multiplication on big integers.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use bincode::de::{BorrowDecoder, Decoder};
use bincode::error::DecodeError;
use bincode::{BorrowDecode, Decode, Encode};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use snafu::{OptionExt as _, Snafu, ensure};

/// Maximum number of fractional digits accepted when parsing decimals
const MAX_DECIMAL_DIGITS: u32 = 18;

#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum RatioError {
    #[snafu(display("Denominator can't be zero"))]
    ZeroDenominator,
    #[snafu(display("Ratio must not be greater than one"))]
    GreaterThanOne,
    #[snafu(display("Malformed ratio: {input}"))]
    Malformed { input: String },
    #[snafu(display("Too many fractional digits: {input}"))]
    TooPrecise { input: String },
}

pub type RatioResult<T> = Result<T, RatioError>;

/// A fraction in `[0, 1]`, always stored in lowest terms
///
/// Decoding rejects anything [`Ratio::new`] would not produce, so equality
/// is value equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Encode)]
pub struct Ratio {
    numerator: u64,
    denominator: u64,
}

impl Ratio {
    pub const ZERO: Self = Self {
        numerator: 0,
        denominator: 1,
    };
    pub const ONE: Self = Self {
        numerator: 1,
        denominator: 1,
    };

    pub fn new(numerator: u64, denominator: u64) -> RatioResult<Self> {
        ensure!(denominator != 0, ZeroDenominatorSnafu);
        ensure!(numerator <= denominator, GreaterThanOneSnafu);

        let gcd = gcd(numerator, denominator);
        Ok(Self {
            numerator: numerator / gcd,
            denominator: denominator / gcd,
        })
    }

    pub fn numerator(self) -> u64 {
        self.numerator
    }

    pub fn denominator(self) -> u64 {
        self.denominator
    }

    pub fn is_zero(self) -> bool {
        self.numerator == 0
    }

    /// `part / whole` compared to `self`
    ///
    /// `None` if `whole` is zero, as the fraction is undefined.
    pub fn cmp_fraction(self, part: u128, whole: u128) -> Option<Ordering> {
        if whole == 0 {
            return None;
        }
        // part / whole <=> n / d  <=>  part * d <=> n * whole
        let lhs = BigUint::from(part) * BigUint::from(self.denominator);
        let rhs = BigUint::from(self.numerator) * BigUint::from(whole);
        Some(lhs.cmp(&rhs))
    }

    /// `part / whole >= self`
    pub fn is_reached_by(self, part: u128, whole: u128) -> bool {
        matches!(
            self.cmp_fraction(part, whole),
            Some(Ordering::Greater | Ordering::Equal)
        )
    }

    /// `part / whole > self`
    pub fn is_exceeded_by(self, part: u128, whole: u128) -> bool {
        matches!(self.cmp_fraction(part, whole), Some(Ordering::Greater))
    }
}

impl Ratio {
    fn decode_checked<C, D: Decoder<Context = C>>(decoder: &mut D) -> Result<Self, DecodeError> {
        let numerator: u64 = Decode::decode(decoder)?;
        let denominator: u64 = Decode::decode(decoder)?;
        let ratio = Ratio::new(numerator, denominator)
            .map_err(|err| DecodeError::OtherString(err.to_string()))?;
        if ratio.numerator != numerator || ratio.denominator != denominator {
            return Err(DecodeError::Other("Ratio not in lowest terms"));
        }
        Ok(ratio)
    }
}

impl<C> Decode<C> for Ratio {
    fn decode<D: Decoder<Context = C>>(decoder: &mut D) -> Result<Self, DecodeError> {
        Self::decode_checked(decoder)
    }
}

impl<'de, C> BorrowDecode<'de, C> for Ratio {
    fn borrow_decode<D: BorrowDecoder<'de, Context = C>>(
        decoder: &mut D,
    ) -> Result<Self, DecodeError> {
        Self::decode_checked(decoder)
    }
}

impl Ord for Ratio {
    fn cmp(&self, other: &Self) -> Ordering {
        (u128::from(self.numerator) * u128::from(other.denominator))
            .cmp(&(u128::from(other.numerator) * u128::from(self.denominator)))
    }
}

impl PartialOrd for Ratio {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a.max(1)
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("{}/{}", self.numerator, self.denominator))
    }
}

/// Accepts `n/d`, as well as decimals like `0.667` or `1`
impl FromStr for Ratio {
    type Err = RatioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let malformed = || RatioError::Malformed {
            input: s.to_owned(),
        };

        if let Some((n, d)) = s.split_once('/') {
            let n = n.trim().parse::<u64>().map_err(|_| malformed())?;
            let d = d.trim().parse::<u64>().map_err(|_| malformed())?;
            return Ratio::new(n, d);
        }

        let (int, frac) = s.split_once('.').unwrap_or((s, ""));
        if int.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        let digits = u32::try_from(frac.len()).map_err(|_| malformed())?;
        ensure!(
            digits <= MAX_DECIMAL_DIGITS,
            TooPreciseSnafu {
                input: s.to_owned()
            }
        );

        let denominator = 10u64.pow(digits);
        let int = int.parse::<u64>().map_err(|_| malformed())?;
        let frac = if frac.is_empty() {
            0
        } else {
            frac.parse::<u64>().map_err(|_| malformed())?
        };
        let numerator = int
            .checked_mul(denominator)
            .and_then(|n| n.checked_add(frac))
            .context(GreaterThanOneSnafu)?;

        Ratio::new(numerator, denominator)
    }
}

impl Serialize for Ratio {
    fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        s.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Ratio {
    fn deserialize<D>(d: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_forms() {
        assert_eq!("1/2".parse(), Ratio::new(1, 2));
        assert_eq!("2/4".parse(), Ratio::new(1, 2));
        assert_eq!("0.5".parse(), Ratio::new(1, 2));
        assert_eq!("0.667".parse(), Ratio::new(667, 1000));
        assert_eq!("1".parse(), Ok(Ratio::ONE));
        assert_eq!("0".parse(), Ok(Ratio::ZERO));
        assert_eq!("1.5".parse::<Ratio>(), Err(RatioError::GreaterThanOne));
        assert_eq!("3/0".parse::<Ratio>(), Err(RatioError::ZeroDenominator));
        assert!(matches!(
            "abc".parse::<Ratio>(),
            Err(RatioError::Malformed { .. })
        ));
        assert!(matches!(
            ".5".parse::<Ratio>(),
            Err(RatioError::Malformed { .. })
        ));
        assert!(matches!(
            "0.1234567890123456789".parse::<Ratio>(),
            Err(RatioError::TooPrecise { .. })
        ));
    }

    #[test]
    fn fraction_comparisons() {
        let half = Ratio::new(1, 2).expect("valid");

        assert!(half.is_reached_by(1, 2));
        assert!(!half.is_exceeded_by(1, 2));
        assert!(half.is_exceeded_by(2, 3));
        assert!(!half.is_reached_by(1, 3));
        assert!(!half.is_reached_by(0, 0));
        assert!(Ratio::ZERO.is_reached_by(0, 10));
        assert!(!Ratio::ZERO.is_exceeded_by(0, 10));

        // Sums larger than anything fitting a u64 product
        let big = u128::from(u64::MAX) * 4;
        assert!(half.is_exceeded_by(big / 2 + 1, big));
        assert!(!half.is_exceeded_by(big / 2, big));
    }

    #[test]
    fn ordering_is_by_value() {
        let third = Ratio::new(1, 3).expect("valid");
        let half = Ratio::new(1, 2).expect("valid");

        assert!(third < half);
        assert!(half < Ratio::ONE);
        assert_eq!(Ratio::new(2, 6), Ok(third));
    }

    #[derive(Encode)]
    struct RawRatio {
        numerator: u64,
        denominator: u64,
    }

    fn decode_raw(numerator: u64, denominator: u64) -> Result<Ratio, DecodeError> {
        crate::bincode::decode_whole(&crate::bincode::encode_to_vec(&RawRatio {
            numerator,
            denominator,
        }))
    }

    #[test]
    fn decoding_enforces_invariants() {
        let two_thirds = Ratio::new(2, 3).expect("valid");
        let encoded = crate::bincode::encode_to_vec(&two_thirds);
        assert_eq!(
            crate::bincode::decode_whole::<Ratio>(&encoded).ok(),
            Some(two_thirds)
        );
        assert_eq!(decode_raw(0, 1).ok(), Some(Ratio::ZERO));

        assert!(decode_raw(3, 2).is_err());
        assert!(decode_raw(5, 0).is_err());
        assert!(decode_raw(2, 4).is_err());
        assert!(decode_raw(0, 5).is_err());
    }

    #[test]
    fn serde_as_string() {
        let json = serde_json::to_string(&Ratio::new(2, 3).expect("valid")).expect("can't fail");
        assert_eq!(json, "\"2/3\"");
        let back: Ratio = serde_json::from_str("\"0.25\"").expect("valid");
        assert_eq!(back, Ratio::new(1, 4).expect("valid"));
    }
}
