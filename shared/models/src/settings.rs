use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field} value {value:?}")]
pub struct ParseValueError {
    pub field: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Rub,
    Gel,
    Amd,
    Usd,
    Eur,
    Rsd,
}

impl Currency {
    pub const ALL: [Currency; 6] = [
        Currency::Rub,
        Currency::Gel,
        Currency::Amd,
        Currency::Usd,
        Currency::Eur,
        Currency::Rsd,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Rub => "RUB",
            Currency::Gel => "GEL",
            Currency::Amd => "AMD",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Rsd => "RSD",
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Currency {
    type Err = ParseValueError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Currency::ALL
            .into_iter()
            .find(|c| c.as_str() == value)
            .ok_or_else(|| ParseValueError { field: "currency", value: value.to_string() })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Weekday {
    #[default]
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

/// How an unrecognised weekday string is treated.
///
/// Writes coming from a client are strict; rows already in the store are
/// hydrated leniently so that a bad stored value never locks a user out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeekdayPolicy {
    Strict,
    FallbackToDefault,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Weekday::Mon => "MON",
            Weekday::Tue => "TUE",
            Weekday::Wed => "WED",
            Weekday::Thu => "THU",
            Weekday::Fri => "FRI",
            Weekday::Sat => "SAT",
            Weekday::Sun => "SUN",
        }
    }

    pub fn parse_with(value: &str, policy: WeekdayPolicy) -> Result<Weekday, ParseValueError> {
        match (value.parse::<Weekday>(), policy) {
            (Ok(day), _) => Ok(day),
            (Err(_), WeekdayPolicy::FallbackToDefault) => Ok(Weekday::default()),
            (Err(e), WeekdayPolicy::Strict) => Err(e),
        }
    }
}

impl std::fmt::Display for Weekday {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Weekday {
    type Err = ParseValueError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Weekday::ALL
            .into_iter()
            .find(|d| d.as_str() == value)
            .ok_or_else(|| ParseValueError { field: "first day of week", value: value.to_string() })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UserSettings {
    pub currency: Currency,
    pub first_day_of_week: Weekday,
    pub profile_picture_url: String,
}

impl UserSettings {
    pub fn new(currency: Currency, first_day_of_week: Weekday, profile_picture_url: impl Into<String>) -> Self {
        Self {
            currency,
            first_day_of_week,
            profile_picture_url: profile_picture_url.into(),
        }
    }

    /// Copy of these settings with only the profile picture replaced.
    pub fn with_profile_picture(&self, profile_picture_url: impl Into<String>) -> Self {
        Self {
            profile_picture_url: profile_picture_url.into(),
            ..self.clone()
        }
    }
}

/// String-keyed form of the settings as kept in the `settings` JSONB column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StoredSettings {
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub first_day_of_week: String,
    #[serde(default)]
    pub profile_picture_url: String,
}

impl From<&UserSettings> for StoredSettings {
    fn from(settings: &UserSettings) -> Self {
        Self {
            currency: settings.currency.to_string(),
            first_day_of_week: settings.first_day_of_week.to_string(),
            profile_picture_url: settings.profile_picture_url.clone(),
        }
    }
}

impl TryFrom<StoredSettings> for UserSettings {
    type Error = ParseValueError;

    /// Currency is strict even on read; the weekday falls back to Monday.
    fn try_from(stored: StoredSettings) -> Result<Self, Self::Error> {
        let currency = stored.currency.parse::<Currency>()?;
        let first_day_of_week = Weekday::parse_with(&stored.first_day_of_week, WeekdayPolicy::FallbackToDefault)?;
        Ok(UserSettings::new(currency, first_day_of_week, stored.profile_picture_url))
    }
}
