use std::str::FromStr;

use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;

use crate::{db_core::prelude::*, server_config::ScheduleConfig};

/// Outcome of the per-account due-check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Run,
    Skip(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum SkipReason {
    Disabled,
    InstantMode,
    NotInWindow,
    NotDue,
}

/// The schedule fields the gate needs, with config defaults filled in
/// for accounts that have no settings row yet.
#[derive(Debug, Clone)]
pub struct ScheduleView {
    pub enabled: bool,
    pub run_mode: RunMode,
    pub interval_minutes: i32,
    pub timezone: String,
    pub window_start: String,
    pub window_end: String,
    pub last_run_at: Option<DateTime<Utc>>,
}

impl ScheduleView {
    pub fn from_settings(
        settings: Option<&agent_setting::Model>,
        defaults: &ScheduleConfig,
    ) -> Self {
        match settings {
            Some(s) => ScheduleView {
                enabled: s.enabled,
                run_mode: s.run_mode.clone(),
                interval_minutes: s.interval_minutes,
                timezone: s.timezone.clone(),
                window_start: s.window_start.clone(),
                window_end: s.window_end.clone(),
                last_run_at: s.last_run_at.map(|t| t.to_utc()),
            },
            None => ScheduleView {
                enabled: true,
                run_mode: RunMode::Periodic,
                interval_minutes: defaults.default_interval_minutes,
                timezone: defaults.default_timezone.clone(),
                window_start: defaults.default_window_start.clone(),
                window_end: defaults.default_window_end.clone(),
                last_run_at: None,
            },
        }
    }
}

/// Pure due-check over (now, settings). No I/O.
pub fn evaluate(view: &ScheduleView, now: DateTime<Utc>) -> GateDecision {
    if !view.enabled {
        return GateDecision::Skip(SkipReason::Disabled);
    }

    // Instant mode is deferred to event delivery, never swept
    if view.run_mode == RunMode::Instant {
        return GateDecision::Skip(SkipReason::InstantMode);
    }

    if !window_allows(view, now) {
        return GateDecision::Skip(SkipReason::NotInWindow);
    }

    if let Some(last_run) = view.last_run_at {
        let elapsed_minutes = (now - last_run).num_minutes();
        if elapsed_minutes < view.interval_minutes as i64 {
            return GateDecision::Skip(SkipReason::NotDue);
        }
    }

    GateDecision::Run
}

/// Same-day window check in the account's timezone. Unparseable
/// timezone or window strings fail open.
fn window_allows(view: &ScheduleView, now: DateTime<Utc>) -> bool {
    let Ok(tz) = Tz::from_str(&view.timezone) else {
        return true;
    };
    let (Some(start), Some(end)) = (
        parse_hhmm_to_minutes(&view.window_start),
        parse_hhmm_to_minutes(&view.window_end),
    ) else {
        return true;
    };

    let local = now.with_timezone(&tz);
    let now_min = local.hour() * 60 + local.minute();

    start <= now_min && now_min <= end
}

fn parse_hhmm_to_minutes(value: &str) -> Option<u32> {
    let (hours, minutes) = value.trim().split_once(':')?;
    let hours: u32 = hours.parse().ok()?;
    let minutes: u32 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }

    Some(hours * 60 + minutes)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn view() -> ScheduleView {
        ScheduleView {
            enabled: true,
            run_mode: RunMode::Periodic,
            interval_minutes: 60,
            timezone: "America/New_York".to_string(),
            window_start: "07:00".to_string(),
            window_end: "21:00".to_string(),
            last_run_at: None,
        }
    }

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::from_str(s).unwrap()
    }

    // 2026-01-15 is winter, so New York is UTC-5
    const NOON_NY: &str = "2026-01-15T17:00:00Z";
    const TWO_AM_NY: &str = "2026-01-15T07:00:00Z";

    #[test]
    fn disabled_always_skips() {
        let mut v = view();
        v.enabled = false;
        v.last_run_at = None;
        v.timezone = "garbage".to_string();

        assert_eq!(
            evaluate(&v, utc(NOON_NY)),
            GateDecision::Skip(SkipReason::Disabled)
        );
    }

    #[test]
    fn instant_mode_skips() {
        let mut v = view();
        v.run_mode = RunMode::Instant;

        assert_eq!(
            evaluate(&v, utc(NOON_NY)),
            GateDecision::Skip(SkipReason::InstantMode)
        );
    }

    #[test]
    fn never_run_account_is_due() {
        let v = view();

        assert_eq!(evaluate(&v, utc(NOON_NY)), GateDecision::Run);
    }

    #[test]
    fn outside_window_skips() {
        let v = view();

        assert_eq!(
            evaluate(&v, utc(TWO_AM_NY)),
            GateDecision::Skip(SkipReason::NotInWindow)
        );
    }

    #[test]
    fn inside_window_passes() {
        let v = view();

        assert_eq!(evaluate(&v, utc(NOON_NY)), GateDecision::Run);
    }

    #[test]
    fn bad_timezone_fails_open() {
        let mut v = view();
        v.timezone = "Not/AZone".to_string();

        // 2am New York would be out of window, but the window check
        // cannot run without a timezone
        assert_eq!(evaluate(&v, utc(TWO_AM_NY)), GateDecision::Run);
    }

    #[test]
    fn bad_window_string_fails_open() {
        let mut v = view();
        v.window_start = "late morning".to_string();

        assert_eq!(evaluate(&v, utc(TWO_AM_NY)), GateDecision::Run);
    }

    #[test]
    fn recent_run_is_not_due() {
        let mut v = view();
        v.last_run_at = Some(utc(NOON_NY) - chrono::Duration::minutes(30));

        assert_eq!(
            evaluate(&v, utc(NOON_NY)),
            GateDecision::Skip(SkipReason::NotDue)
        );
    }

    #[test]
    fn stale_run_is_due() {
        let mut v = view();
        v.last_run_at = Some(utc(NOON_NY) - chrono::Duration::minutes(90));

        assert_eq!(evaluate(&v, utc(NOON_NY)), GateDecision::Run);
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let v = view();

        // Exactly 07:00 New York
        assert_eq!(evaluate(&v, utc("2026-01-15T12:00:00Z")), GateDecision::Run);
        // Exactly 21:00 New York
        assert_eq!(evaluate(&v, utc("2026-01-16T02:00:00Z")), GateDecision::Run);
        // 06:59 New York
        assert_eq!(
            evaluate(&v, utc("2026-01-15T11:59:00Z")),
            GateDecision::Skip(SkipReason::NotInWindow)
        );
    }

    #[test]
    fn parse_hhmm() {
        assert_eq!(parse_hhmm_to_minutes("07:00"), Some(420));
        assert_eq!(parse_hhmm_to_minutes("21:30"), Some(1290));
        assert_eq!(parse_hhmm_to_minutes("24:00"), None);
        assert_eq!(parse_hhmm_to_minutes("0900"), None);
        assert_eq!(parse_hhmm_to_minutes(""), None);
    }

    #[test]
    fn missing_settings_row_uses_defaults() {
        let defaults = crate::server_config::ScheduleConfig::default();
        let v = ScheduleView::from_settings(None, &defaults);

        assert!(v.enabled);
        assert_eq!(v.interval_minutes, 60);
        assert_eq!(v.timezone, "America/New_York");
        assert_eq!(evaluate(&v, utc(NOON_NY)), GateDecision::Run);
    }
}
