//! Seasonal decorative theme selection.
//!
//! The front end renders the effect; the server only decides which one is
//! active for a date so every client agrees.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    None,
    Snow,
    Petals,
    Sun,
    Leaves,
    Pumpkins,
    Garlands,
    Fireworks,
}

/// Theme for a given day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct Theme {
    #[schema(value_type = String, format = Date)]
    pub date: NaiveDate,
    pub season: Season,
    /// Holiday name when a holiday window is active.
    pub holiday: Option<String>,
    pub effect: Effect,
}

impl Season {
    pub fn for_date(date: NaiveDate) -> Self {
        match date.month() {
            12 | 1 | 2 => Self::Winter,
            3..=5 => Self::Spring,
            6..=8 => Self::Summer,
            _ => Self::Autumn,
        }
    }

    fn effect(self) -> Effect {
        match self {
            Self::Winter => Effect::Snow,
            Self::Spring => Effect::Petals,
            Self::Summer => Effect::Sun,
            Self::Autumn => Effect::Leaves,
        }
    }
}

fn holiday(date: NaiveDate) -> Option<(&'static str, Effect)> {
    match (date.month(), date.day()) {
        (12, 31) | (1, 1) => Some(("new_year", Effect::Fireworks)),
        (12, 20..=26) => Some(("christmas", Effect::Garlands)),
        (10, 25..=31) => Some(("halloween", Effect::Pumpkins)),
        _ => None,
    }
}

impl Theme {
    /// Pick the theme for `date`. With effects disabled the season is still
    /// reported but the effect is [`Effect::None`].
    pub fn for_date(date: NaiveDate, effects_enabled: bool) -> Self {
        let season = Season::for_date(date);
        let holiday = holiday(date);
        let effect = match (effects_enabled, holiday) {
            (false, _) => Effect::None,
            (true, Some((_, effect))) => effect,
            (true, None) => season.effect(),
        };
        Self {
            date,
            season,
            holiday: holiday.map(|(name, _)| name.to_string()),
            effect,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn seasons() {
        assert_eq!(Theme::for_date(d("2024-02-10"), true).effect, Effect::Snow);
        assert_eq!(Theme::for_date(d("2024-04-10"), true).effect, Effect::Petals);
        assert_eq!(Theme::for_date(d("2024-07-10"), true).effect, Effect::Sun);
        assert_eq!(Theme::for_date(d("2024-10-10"), true).effect, Effect::Leaves);
    }

    #[test]
    fn holidays_override_season() {
        let t = Theme::for_date(d("2024-12-24"), true);
        assert_eq!(t.season, Season::Winter);
        assert_eq!(t.holiday.as_deref(), Some("christmas"));
        assert_eq!(t.effect, Effect::Garlands);

        assert_eq!(Theme::for_date(d("2024-10-31"), true).effect, Effect::Pumpkins);
        assert_eq!(Theme::for_date(d("2024-12-31"), true).effect, Effect::Fireworks);
        assert_eq!(Theme::for_date(d("2025-01-01"), true).effect, Effect::Fireworks);
        assert_eq!(Theme::for_date(d("2024-12-27"), true).effect, Effect::Snow);
    }

    #[test]
    fn holiday_windows_are_inclusive() {
        assert_eq!(Theme::for_date(d("2024-12-19"), true).holiday, None);
        assert_eq!(
            Theme::for_date(d("2024-12-20"), true).holiday.as_deref(),
            Some("christmas")
        );
        assert_eq!(
            Theme::for_date(d("2024-12-26"), true).holiday.as_deref(),
            Some("christmas")
        );
        assert_eq!(Theme::for_date(d("2024-10-24"), true).holiday, None);
        assert_eq!(
            Theme::for_date(d("2024-10-25"), true).holiday.as_deref(),
            Some("halloween")
        );
        assert_eq!(Theme::for_date(d("2024-11-01"), true).holiday, None);
    }

    #[test]
    fn disabled_effects() {
        let t = Theme::for_date(d("2024-12-24"), false);
        assert_eq!(t.effect, Effect::None);
        assert_eq!(t.holiday.as_deref(), Some("christmas"));
    }
}
