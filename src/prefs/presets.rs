//! Enumerated preference presets.
//!
//! The settings screen stores the selected preset index as a string
//! (`"0"`, `"1"`, ...). These enums map those indices to durations.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How often the device location is sampled while polling.
///
/// | Preset | Interval |
/// |--------|----------|
/// | `0`    | 5 s      |
/// | `1`    | 15 s     |
/// | `2`    | 30 s     |
/// | `3`    | 60 s     |
/// | `4`    | 300 s    |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PollInterval {
    /// Preset `0`: 5 seconds.
    FiveSeconds,
    /// Preset `1`: 15 seconds.
    FifteenSeconds,
    /// Preset `2`: 30 seconds.
    #[default]
    ThirtySeconds,
    /// Preset `3`: 1 minute.
    OneMinute,
    /// Preset `4`: 5 minutes.
    FiveMinutes,
}

impl PollInterval {
    /// All presets in index order.
    pub const ALL: [Self; 5] = [
        Self::FiveSeconds,
        Self::FifteenSeconds,
        Self::ThirtySeconds,
        Self::OneMinute,
        Self::FiveMinutes,
    ];

    /// Parses a preset index.
    #[must_use]
    pub fn parse(preset: &str) -> Option<Self> {
        match preset.trim() {
            "0" => Some(Self::FiveSeconds),
            "1" => Some(Self::FifteenSeconds),
            "2" => Some(Self::ThirtySeconds),
            "3" => Some(Self::OneMinute),
            "4" => Some(Self::FiveMinutes),
            _ => None,
        }
    }

    /// Resolves a stored preference value, falling back to the default preset
    /// when the value is absent or unrecognized.
    #[must_use]
    pub fn from_pref(value: Option<&str>) -> Self {
        value.and_then(Self::parse).unwrap_or_default()
    }

    /// Returns the preset index as stored in preferences.
    #[must_use]
    pub const fn preset(self) -> &'static str {
        match self {
            Self::FiveSeconds => "0",
            Self::FifteenSeconds => "1",
            Self::ThirtySeconds => "2",
            Self::OneMinute => "3",
            Self::FiveMinutes => "4",
        }
    }

    /// Returns the polling interval.
    #[must_use]
    pub const fn duration(self) -> Duration {
        match self {
            Self::FiveSeconds => Duration::from_millis(5_000),
            Self::FifteenSeconds => Duration::from_millis(15_000),
            Self::ThirtySeconds => Duration::from_millis(30_000),
            Self::OneMinute => Duration::from_millis(60_000),
            Self::FiveMinutes => Duration::from_millis(300_000),
        }
    }
}

/// How long stored locations are kept before the retention scheduler
/// forgets them.
///
/// | Preset | Time to live |
/// |--------|--------------|
/// | `0`    | 30 min       |
/// | `1`    | 60 min       |
/// | `2`    | 120 min      |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Ttl {
    /// Preset `0`: 30 minutes.
    HalfHour,
    /// Preset `1`: 1 hour.
    #[default]
    OneHour,
    /// Preset `2`: 2 hours.
    TwoHours,
}

impl Ttl {
    /// All presets in index order.
    pub const ALL: [Self; 3] = [Self::HalfHour, Self::OneHour, Self::TwoHours];

    /// Parses a preset index.
    #[must_use]
    pub fn parse(preset: &str) -> Option<Self> {
        match preset.trim() {
            "0" => Some(Self::HalfHour),
            "1" => Some(Self::OneHour),
            "2" => Some(Self::TwoHours),
            _ => None,
        }
    }

    /// Resolves a stored preference value, falling back to the default preset.
    #[must_use]
    pub fn from_pref(value: Option<&str>) -> Self {
        value.and_then(Self::parse).unwrap_or_default()
    }

    /// Returns the preset index as stored in preferences.
    #[must_use]
    pub const fn preset(self) -> &'static str {
        match self {
            Self::HalfHour => "0",
            Self::OneHour => "1",
            Self::TwoHours => "2",
        }
    }

    /// Returns the time to live.
    #[must_use]
    pub const fn duration(self) -> Duration {
        match self {
            Self::HalfHour => Duration::from_millis(1_800_000),
            Self::OneHour => Duration::from_millis(3_600_000),
            Self::TwoHours => Duration::from_millis(7_200_000),
        }
    }
}
