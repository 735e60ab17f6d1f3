use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Fixed-point currency amount with four decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(pub i64);

impl Money {
    pub const SCALE: i64 = 10_000; // 4 decimal places
    pub const TARGET_DECIMALS: u32 = 4;
    pub const ZERO: Money = Money(0);

    /// Whole currency units, e.g. `Money::from_units(5_000)` is 5000.0000.
    pub fn from_units(units: i64) -> Option<Self> {
        units.checked_mul(Self::SCALE).map(Self)
    }

    pub fn as_minor(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    pub fn checked_sub(self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).map(Money)
    }

    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, Self::TARGET_DECIMALS)
    }

    pub fn from_decimal(value: Decimal) -> Option<Self> {
        Self::from_scaled_i128(value.mantissa(), value.scale())
    }

    pub fn from_scaled_i128(value: i128, scale: u32) -> Option<Self> {
        if scale == Self::TARGET_DECIMALS {
            return i64::try_from(value).ok().map(Self);
        }
        if scale < Self::TARGET_DECIMALS {
            let factor = 10i128.checked_pow(Self::TARGET_DECIMALS - scale)?;
            let widened = value.checked_mul(factor)?;
            return i64::try_from(widened).ok().map(Self);
        }
        // scale > TARGET_DECIMALS: need rounding
        let factor = 10i128.checked_pow(scale - Self::TARGET_DECIMALS)?;
        let div = value / factor; // truncated toward zero
        let rem = value % factor;
        if rem == 0 {
            return i64::try_from(div).ok().map(Self);
        }
        let half = factor / 2;
        let abs_rem = rem.abs();
        let step = if value.is_negative() { -1 } else { 1 };
        let mut adjusted = div;
        if abs_rem > half || (abs_rem == half && div & 1 != 0) {
            // ties go to the even neighbour
            adjusted += step;
        }
        i64::try_from(adjusted).ok().map(Self)
    }

    pub fn from_decimal_str(s: &str) -> Option<Self> {
        let s = s.trim().trim_start_matches('$');

        if s.is_empty() {
            return None;
        }
        let neg = s.starts_with('-');
        let body = s.trim_start_matches('-');
        let mut parts = body.split('.');
        let int_part = parts.next()?;
        if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let int_val: i128 = int_part.parse().ok()?;
        let frac_opt = parts.next();
        if parts.next().is_some() {
            return None;
        }
        let (raw, scale) = match frac_opt {
            Some(frac) if !frac.is_empty() => {
                if !frac.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                let scale = u32::try_from(frac.len()).ok()?;
                let shifted = int_val.checked_mul(10i128.checked_pow(scale)?)?;
                (shifted.checked_add(frac.parse::<i128>().ok()?)?, scale)
            }
            _ => (int_val, 0),
        };
        let signed = if neg { -raw } else { raw };
        Money::from_scaled_i128(signed, scale)
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let minor = self.0;
        let neg = minor < 0;
        let abs = minor.unsigned_abs();
        let scale = Self::SCALE.unsigned_abs();
        let int_part = abs / scale;
        let frac_part = abs % scale;
        if neg {
            write!(f, "-{}.{:04}", int_part, frac_part)
        } else {
            write!(f, "{}.{:04}", int_part, frac_part)
        }
    }
}

impl Serialize for Money {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Money::from_decimal_str(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("Invalid Money format: {}", s)))
    }
}
