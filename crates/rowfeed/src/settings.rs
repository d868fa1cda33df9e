//! Generator settings and the user-editable display configuration.
//!
//! [`DisplayConfig`] is the full state behind the three editable fields
//! (interval, batch size, identifier overrides). Only its [`Settings`]
//! projection ever reaches the generator; `additional_ids` is display-local.

use crate::{Error, MAX_ARRAY_SIZE, Result};
use core::{str::FromStr, time::Duration};
use serde::{Deserialize, Serialize};

/// Default tick interval, in milliseconds.
pub const DEFAULT_INTERVAL_MS: u64 = 300;

/// Default number of records per batch.
pub const DEFAULT_ARRAY_SIZE: usize = 1000;

/// The Controller -> Generator message.
///
/// Serialized as `{"interval": <ms>, "arraySize": <count>}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Tick period in milliseconds. Always greater than zero.
    pub interval: u64,
    /// Records per batch.
    pub array_size: usize,
}

impl Settings {
    /// Validates and builds a new `Settings`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSettings`] if `interval` is zero or
    /// `array_size` exceeds [`MAX_ARRAY_SIZE`].
    pub fn new(interval: u64, array_size: usize) -> Result<Self> {
        if interval == 0 {
            return Err(Error::InvalidSettings {
                reason: "interval must be greater than 0".to_string(),
            });
        }
        check_array_size(array_size)?;
        Ok(Self {
            interval,
            array_size,
        })
    }

    /// The tick period as a [`Duration`].
    pub const fn period(&self) -> Duration {
        Duration::from_millis(self.interval)
    }
}

fn check_array_size(array_size: usize) -> Result<()> {
    if array_size > MAX_ARRAY_SIZE {
        return Err(Error::InvalidSettings {
            reason: format!("array size {array_size} exceeds {MAX_ARRAY_SIZE}"),
        });
    }
    Ok(())
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL_MS,
            array_size: DEFAULT_ARRAY_SIZE,
        }
    }
}

/// User-editable configuration owned by the display controller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayConfig {
    pub interval: u64,
    pub array_size: usize,
    /// Raw comma-separated override tokens, exactly as typed.
    pub additional_ids: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL_MS,
            array_size: DEFAULT_ARRAY_SIZE,
            additional_ids: String::new(),
        }
    }
}

impl DisplayConfig {
    /// The part of this config that is forwarded to the generator.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSettings`] if the interval is zero or the
    /// batch size is too large.
    pub fn settings(&self) -> Result<Settings> {
        Settings::new(self.interval, self.array_size)
    }

    /// Applies a single-field edit in place.
    pub fn apply(&mut self, edit: ConfigEdit) {
        match edit {
            ConfigEdit::Interval(ms) => self.interval = ms,
            ConfigEdit::ArraySize(n) => self.array_size = n,
            ConfigEdit::AdditionalIds(ids) => self.additional_ids = ids,
        }
    }
}

/// A change to one configuration field.
///
/// Parses from `key=value` text, e.g. `interval=500`, `size=20` or
/// `ids=1,2,3`. Keys are case-insensitive; `arraySize` and `additionalIds`
/// are accepted as aliases.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigEdit {
    Interval(u64),
    ArraySize(usize),
    AdditionalIds(String),
}

impl FromStr for ConfigEdit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidSettings { reason };

        let (key, value) = s
            .split_once('=')
            .ok_or_else(|| invalid(format!("expected `key=value`, got {s:?}")))?;
        let value = value.trim();

        match key.trim().to_ascii_lowercase().as_str() {
            "interval" => {
                let ms: u64 = value
                    .parse()
                    .map_err(|e| invalid(format!("interval {value:?}: {e}")))?;
                if ms == 0 {
                    return Err(invalid("interval must be greater than 0".to_string()));
                }
                Ok(Self::Interval(ms))
            }
            "size" | "arraysize" => {
                let size: usize = value
                    .parse()
                    .map_err(|e| invalid(format!("array size {value:?}: {e}")))?;
                check_array_size(size)?;
                Ok(Self::ArraySize(size))
            }
            "ids" | "additionalids" => Ok(Self::AdditionalIds(value.to_string())),
            other => Err(invalid(format!("unknown field {other:?}"))),
        }
    }
}
