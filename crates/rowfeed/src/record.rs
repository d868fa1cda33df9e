//! # Record Data Model
//!
//! A [`Record`] is one synthetic data element. Records are immutable once
//! created; the only derived form is a copy with a different `id` (see
//! [`Record::with_id`]).
//!
//! Two fields carry fixed textual formats and are modeled as newtypes so the
//! format cannot drift:
//!
//! - [`Fraction`] - a value in `[0, 1)` held as an integer count of `1e-18`
//!   units and always rendered with exactly 18 fractional digits. No binary
//!   floating point is involved, so nothing is lost between generation and
//!   display.
//! - [`Color`] - a 24-bit RGB value rendered as `#rrggbb` in lowercase hex.
//!
//! Both serialize as their string form.

use core::{fmt, str::FromStr};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Number of fractional digits in a rendered [`Fraction`].
pub const FRACTION_DIGITS: usize = 18;

/// Number of `1e-18` units in one whole. Valid fractions are strictly below.
pub const FRACTION_SCALE: u64 = 1_000_000_000_000_000_000;

/// Exclusive upper bound of a 24-bit RGB [`Color`].
pub const COLOR_BOUND: u32 = 1 << 24;

/// A decimal value in `[0, 1)` with exactly 18 fractional digits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fraction(u64);

impl Fraction {
    pub const ZERO: Self = Self(0);
    pub const MAX: Self = Self(FRACTION_SCALE - 1);

    /// Builds a fraction from its count of `1e-18` units.
    ///
    /// Returns `None` if `atoms` would make the value reach `1`.
    pub const fn from_atoms(atoms: u64) -> Option<Self> {
        if atoms < FRACTION_SCALE {
            Some(Self(atoms))
        } else {
            None
        }
    }

    /// Returns the count of `1e-18` units.
    pub const fn atoms(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0.{:0width$}", self.0, width = FRACTION_DIGITS)
    }
}

/// Error returned when a string is not a canonical `Fraction` or `Color`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseFieldError {
    kind: &'static str,
    input: String,
}

impl fmt::Display for ParseFieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: {:?}", self.kind, self.input)
    }
}

impl core::error::Error for ParseFieldError {}

impl FromStr for Fraction {
    type Err = ParseFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseFieldError {
            kind: "fraction",
            input: s.to_owned(),
        };
        let digits = s.strip_prefix("0.").ok_or_else(err)?;
        if digits.len() != FRACTION_DIGITS || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(err());
        }
        // 18 decimal digits always fit below FRACTION_SCALE.
        digits.parse().map(Self).map_err(|_| err())
    }
}

/// A 24-bit RGB color rendered as `#rrggbb`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Color(u32);

impl Color {
    pub const BLACK: Self = Self(0);
    pub const WHITE: Self = Self(COLOR_BOUND - 1);

    /// Builds a color from its packed `0xRRGGBB` value.
    ///
    /// Returns `None` if `rgb` does not fit in 24 bits.
    pub const fn from_rgb(rgb: u32) -> Option<Self> {
        if rgb < COLOR_BOUND {
            Some(Self(rgb))
        } else {
            None
        }
    }

    pub const fn rgb(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06x}", self.0)
    }
}

impl FromStr for Color {
    type Err = ParseFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseFieldError {
            kind: "color",
            input: s.to_owned(),
        };
        let hex = s.strip_prefix('#').ok_or_else(err)?;
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(err());
        }
        u32::from_str_radix(hex, 16).map(Self).map_err(|_| err())
    }
}

macro_rules! serde_via_string {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

serde_via_string!(Fraction);
serde_via_string!(Color);

/// The nested reference carried by every [`Record`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildRef {
    pub id: String,
    pub color: Color,
}

/// One generated data element.
///
/// `id` is conventionally the decimal position of the record within its
/// batch (1-based) but may be replaced for display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    /// Uniform integer in `[0, 100)`.
    pub quantity: u8,
    pub fraction: Fraction,
    pub color: Color,
    pub child: ChildRef,
}

impl Record {
    /// Returns a copy of this record carrying `id`, all other fields intact.
    pub fn with_id(&self, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..self.clone()
        }
    }
}
