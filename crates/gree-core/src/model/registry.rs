// ── Status-code registry ──
//
// Static table of the columns this client knows about: the wire code the
// appliance uses, a human name, and the named values each column accepts.
// Status polls request every code listed here.

use gree_api::StatusValue;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

/// A known status column.
///
/// Parses from either the wire code (`"Pow"`) or the registry name
/// (`"power"`), case-insensitively. `Display` yields the wire code.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::IntoStaticStr,
)]
#[strum(ascii_case_insensitive)]
pub enum StatusCode {
    #[strum(to_string = "Pow", serialize = "power")]
    #[serde(rename = "Pow")]
    Power,
    #[strum(to_string = "Mod", serialize = "mode")]
    #[serde(rename = "Mod")]
    Mode,
    #[strum(to_string = "SetTem", serialize = "targetTemperature")]
    #[serde(rename = "SetTem")]
    TargetTemperature,
    #[strum(to_string = "TemSen", serialize = "currentTemperature")]
    #[serde(rename = "TemSen")]
    CurrentTemperature,
    #[strum(to_string = "TemRec", serialize = "temperatureOffset")]
    #[serde(rename = "TemRec")]
    TemperatureOffset,
    #[strum(to_string = "WdSpd", serialize = "speed")]
    #[serde(rename = "WdSpd")]
    FanSpeed,
    #[strum(to_string = "TemUn", serialize = "units")]
    #[serde(rename = "TemUn")]
    TemperatureUnit,
    #[strum(to_string = "SwingLfRt", serialize = "swingHorizontal")]
    #[serde(rename = "SwingLfRt")]
    SwingHorizontal,
    #[strum(to_string = "SwUpDn", serialize = "swingVertical")]
    #[serde(rename = "SwUpDn")]
    SwingVertical,
    #[strum(to_string = "Blo", serialize = "xFan")]
    #[serde(rename = "Blo")]
    XFan,
    #[strum(to_string = "Lig", serialize = "light")]
    #[serde(rename = "Lig")]
    Light,
}

impl StatusCode {
    /// Wire code sent in `cols` / `opt`.
    pub fn code(self) -> &'static str {
        self.into()
    }

    /// Registry name, as accepted on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Self::Power => "power",
            Self::Mode => "mode",
            Self::TargetTemperature => "targetTemperature",
            Self::CurrentTemperature => "currentTemperature",
            Self::TemperatureOffset => "temperatureOffset",
            Self::FanSpeed => "speed",
            Self::TemperatureUnit => "units",
            Self::SwingHorizontal => "swingHorizontal",
            Self::SwingVertical => "swingVertical",
            Self::XFan => "xFan",
            Self::Light => "light",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Power => "Power state",
            Self::Mode => "Operating mode",
            Self::TargetTemperature => "Target temperature (°C)",
            Self::CurrentTemperature => "Room temperature sensor reading",
            Self::TemperatureOffset => "Fahrenheit rounding offset",
            Self::FanSpeed => "Fan speed",
            Self::TemperatureUnit => "Display temperature unit",
            Self::SwingHorizontal => "Horizontal louver position",
            Self::SwingVertical => "Vertical louver position",
            Self::XFan => "X-Fan (blow dry after cooling)",
            Self::Light => "Front panel light",
        }
    }

    /// Named values this column accepts. Empty for free-form numeric columns.
    pub fn values(self) -> &'static [(&'static str, i64)] {
        match self {
            Self::Power | Self::XFan | Self::Light => ON_OFF,
            Self::Mode => MODE,
            Self::FanSpeed => FAN_SPEED,
            Self::TemperatureUnit => TEMPERATURE_UNIT,
            Self::SwingHorizontal => SWING_HORIZONTAL,
            Self::SwingVertical => SWING_VERTICAL,
            Self::TargetTemperature | Self::CurrentTemperature | Self::TemperatureOffset => &[],
        }
    }

    /// Look up a named value (`"cool"`), case-insensitively.
    pub fn value_of(self, name: &str) -> Option<i64> {
        self.values()
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|&(_, v)| v)
    }

    /// Reverse lookup: the name for a raw value, if the column has one.
    pub fn name_of(self, value: &StatusValue) -> Option<&'static str> {
        let raw = value.as_int()?;
        self.values()
            .iter()
            .find(|&&(_, v)| v == raw)
            .map(|&(n, _)| n)
    }

    /// Interpret user input for this column: a named value, an integer,
    /// or (failing both) a raw string.
    pub fn parse_value(self, input: &str) -> StatusValue {
        let input = input.trim();
        if let Some(v) = self.value_of(input) {
            return StatusValue::Int(v);
        }
        input
            .parse::<i64>()
            .map_or_else(|_| StatusValue::from(input), StatusValue::Int)
    }

    /// Resolve a wire code to a known column.
    pub fn from_code(code: &str) -> Option<Self> {
        Self::iter().find(|c| c.code() == code)
    }

    /// Every known column, in registry order.
    pub fn all() -> impl Iterator<Item = Self> {
        Self::iter()
    }

    /// Every registered wire code, in registry order.
    pub fn all_codes() -> Vec<String> {
        Self::iter().map(|c| c.code().to_owned()).collect()
    }
}

// ── Value constants ──────────────────────────────────────────────────

pub mod power {
    pub const OFF: i64 = 0;
    pub const ON: i64 = 1;
}

pub mod mode {
    pub const AUTO: i64 = 0;
    pub const COOL: i64 = 1;
    pub const DRY: i64 = 2;
    pub const FAN: i64 = 3;
    pub const HEAT: i64 = 4;
}

pub mod fan_speed {
    pub const AUTO: i64 = 0;
    pub const LOW: i64 = 1;
    pub const MEDIUM_LOW: i64 = 2;
    pub const MEDIUM: i64 = 3;
    pub const MEDIUM_HIGH: i64 = 4;
    pub const HIGH: i64 = 5;
}

pub mod temperature_unit {
    pub const CELSIUS: i64 = 0;
    pub const FAHRENHEIT: i64 = 1;
}

pub mod swing_horizontal {
    pub const DEFAULT: i64 = 0;
    pub const FULL: i64 = 1;
    pub const FIXED_LEFT: i64 = 2;
    pub const FIXED_MID_LEFT: i64 = 3;
    pub const FIXED_MID: i64 = 4;
    pub const FIXED_MID_RIGHT: i64 = 5;
    pub const FIXED_RIGHT: i64 = 6;
    pub const FULL_ALT: i64 = 7;
}

pub mod swing_vertical {
    pub const DEFAULT: i64 = 0;
    pub const FULL: i64 = 1;
    pub const FIXED_HIGHEST: i64 = 2;
    pub const FIXED_HIGHER: i64 = 3;
    pub const FIXED_MIDDLE: i64 = 4;
    pub const FIXED_LOWER: i64 = 5;
    pub const FIXED_LOWEST: i64 = 6;
    pub const SWING_LOWEST: i64 = 7;
    pub const SWING_LOWER: i64 = 8;
    pub const SWING_MIDDLE: i64 = 9;
    pub const SWING_HIGHER: i64 = 10;
    pub const SWING_HIGHEST: i64 = 11;
}

const ON_OFF: &[(&str, i64)] = &[("off", power::OFF), ("on", power::ON)];

const MODE: &[(&str, i64)] = &[
    ("auto", mode::AUTO),
    ("cool", mode::COOL),
    ("dry", mode::DRY),
    ("fan", mode::FAN),
    ("heat", mode::HEAT),
];

const FAN_SPEED: &[(&str, i64)] = &[
    ("auto", fan_speed::AUTO),
    ("low", fan_speed::LOW),
    ("mediumLow", fan_speed::MEDIUM_LOW),
    ("medium", fan_speed::MEDIUM),
    ("mediumHigh", fan_speed::MEDIUM_HIGH),
    ("high", fan_speed::HIGH),
];

const TEMPERATURE_UNIT: &[(&str, i64)] = &[
    ("celsius", temperature_unit::CELSIUS),
    ("fahrenheit", temperature_unit::FAHRENHEIT),
];

const SWING_HORIZONTAL: &[(&str, i64)] = &[
    ("default", swing_horizontal::DEFAULT),
    ("full", swing_horizontal::FULL),
    ("fixedLeft", swing_horizontal::FIXED_LEFT),
    ("fixedMidLeft", swing_horizontal::FIXED_MID_LEFT),
    ("fixedMid", swing_horizontal::FIXED_MID),
    ("fixedMidRight", swing_horizontal::FIXED_MID_RIGHT),
    ("fixedRight", swing_horizontal::FIXED_RIGHT),
    ("fullAlt", swing_horizontal::FULL_ALT),
];

const SWING_VERTICAL: &[(&str, i64)] = &[
    ("default", swing_vertical::DEFAULT),
    ("full", swing_vertical::FULL),
    ("fixedHighest", swing_vertical::FIXED_HIGHEST),
    ("fixedHigher", swing_vertical::FIXED_HIGHER),
    ("fixedMiddle", swing_vertical::FIXED_MIDDLE),
    ("fixedLower", swing_vertical::FIXED_LOWER),
    ("fixedLowest", swing_vertical::FIXED_LOWEST),
    ("swingLowest", swing_vertical::SWING_LOWEST),
    ("swingLower", swing_vertical::SWING_LOWER),
    ("swingMiddle", swing_vertical::SWING_MIDDLE),
    ("swingHigher", swing_vertical::SWING_HIGHER),
    ("swingHighest", swing_vertical::SWING_HIGHEST),
];
