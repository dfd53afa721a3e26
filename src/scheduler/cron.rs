use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveTime, TimeDelta, TimeZone, Timelike};
use cron::Schedule as CronSchedule;
use std::str::FromStr;

use crate::config::{parse_hhmm, ScheduleConfig};
use crate::job::DesiredState;

/// Longest dry-run window accepted, a little over four years.
pub const MAX_PREVIEW_HOURS: u64 = 24 * 366 * 4;

/// A daily trigger for one desired state.
#[derive(Debug, Clone)]
pub struct Trigger {
    pub name: String,
    pub state: DesiredState,
    pub at: NaiveTime,
    schedule: CronSchedule,
}

impl Trigger {
    /// Fire every day at `at` (`HH:MM`, local to whatever clock drives it).
    pub fn daily(state: DesiredState, at: &str) -> Result<Self> {
        let time = parse_hhmm(at)?;
        let expr = format!("0 {} {} * * *", time.minute(), time.hour());
        let schedule = CronSchedule::from_str(&expr)
            .map_err(|e| anyhow::anyhow!("Invalid cron expression '{}': {}", expr, e))?;
        Ok(Self {
            name: format!("wifi-{}", state.to_string().to_lowercase()),
            state,
            at: time,
            schedule,
        })
    }

    /// First firing strictly after `after`.
    pub fn next_after<Tz: TimeZone>(&self, after: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        self.schedule.after(after).next()
    }
}

struct Entry<Tz: TimeZone> {
    trigger: Trigger,
    next_run: Option<DateTime<Tz>>,
}

/// Holds the triggers and when each is next due.
///
/// Polling is driven from outside (see `engine`), so the scheduler itself
/// never reads the clock; tests can hand it any instant.
pub struct Scheduler<Tz: TimeZone> {
    entries: Vec<Entry<Tz>>,
}

impl<Tz: TimeZone> Scheduler<Tz> {
    pub fn new(triggers: Vec<Trigger>, now: &DateTime<Tz>) -> Self {
        let entries = triggers
            .into_iter()
            .map(|trigger| {
                let next_run = trigger.next_after(now);
                Entry { trigger, next_run }
            })
            .collect();
        Self { entries }
    }

    /// The OFF and ON triggers from `[schedule]`.
    pub fn from_config(cfg: &ScheduleConfig, now: &DateTime<Tz>) -> Result<Self> {
        let off = Trigger::daily(DesiredState::Off, &cfg.off_at).context("schedule.off_at")?;
        let on = Trigger::daily(DesiredState::On, &cfg.on_at).context("schedule.on_at")?;
        Ok(Self::new(vec![off, on], now))
    }

    pub fn triggers(&self) -> impl Iterator<Item = &Trigger> {
        self.entries.iter().map(|e| &e.trigger)
    }

    /// Earliest pending run across all triggers.
    pub fn next_run(&self) -> Option<(DateTime<Tz>, &Trigger)> {
        self.entries
            .iter()
            .filter_map(|e| e.next_run.clone().map(|t| (t, &e.trigger)))
            .min_by(|a, b| a.0.cmp(&b.0))
    }

    /// Pop the most overdue trigger at `now` and reschedule it to its next
    /// occurrence after `now`. Call repeatedly until it returns `None`.
    pub fn take_due(&mut self, now: &DateTime<Tz>) -> Option<Trigger> {
        let idx = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.next_run.as_ref().is_some_and(|t| t <= now))
            .min_by(|a, b| a.1.next_run.cmp(&b.1.next_run))
            .map(|(i, _)| i)?;

        let entry = &mut self.entries[idx];
        entry.next_run = entry.trigger.next_after(now);
        Some(entry.trigger.clone())
    }

    /// Calculate upcoming runs within `hours` of `from`, sorted by time.
    /// This is strictly a dry-run preview and does not touch pending state.
    pub fn preview(
        &self,
        from: &DateTime<Tz>,
        hours: u64,
    ) -> Result<Vec<(DateTime<Tz>, Trigger)>> {
        if hours > MAX_PREVIEW_HOURS {
            bail!("preview window of {} hours exceeds {}", hours, MAX_PREVIEW_HOURS);
        }
        let end = i64::try_from(hours)
            .ok()
            .and_then(TimeDelta::try_hours)
            .and_then(|window| from.clone().checked_add_signed(window))
            .with_context(|| format!("preview window of {} hours is out of range", hours))?;
        let mut preview = Vec::new();

        for entry in &self.entries {
            for next_time in entry.trigger.schedule.after(from) {
                if next_time > end {
                    break;
                }
                preview.push((next_time, entry.trigger.clone()));
            }
        }

        preview.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(preview)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, h, m, s).unwrap()
    }

    fn stock(now: &DateTime<Utc>) -> Scheduler<Utc> {
        Scheduler::from_config(&ScheduleConfig::default(), now).unwrap()
    }

    #[test]
    fn test_daily_trigger_next_after() {
        let t = Trigger::daily(DesiredState::Off, "23:00").unwrap();
        assert_eq!(t.name, "wifi-off");
        assert_eq!(t.next_after(&at(12, 0, 0)), Some(at(23, 0, 0)));
        // Strictly after: exactly on the minute rolls to tomorrow.
        assert_eq!(
            t.next_after(&at(23, 0, 0)),
            Some(Utc.with_ymd_and_hms(2026, 3, 11, 23, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_invalid_time_rejected() {
        assert!(Trigger::daily(DesiredState::On, "24:00").is_err());
        assert!(Trigger::daily(DesiredState::On, "noon").is_err());
    }

    #[test]
    fn test_nothing_due_before_trigger_time() {
        let mut s = stock(&at(12, 0, 0));
        assert!(s.take_due(&at(22, 59, 59)).is_none());
    }

    #[test]
    fn test_trigger_fires_once_then_reschedules() {
        let mut s = stock(&at(12, 0, 0));

        let fired = s.take_due(&at(23, 0, 0)).unwrap();
        assert_eq!(fired.state, DesiredState::Off);
        assert!(s.take_due(&at(23, 0, 1)).is_none());

        let (next, trigger) = s.next_run().unwrap();
        assert_eq!(trigger.state, DesiredState::On);
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 3, 11, 3, 30, 0).unwrap());
    }

    #[test]
    fn test_trigger_missed_during_long_job_fires_late() {
        let mut s = stock(&at(22, 0, 0));
        assert_eq!(s.take_due(&at(23, 0, 0)).unwrap().state, DesiredState::Off);

        // OFF job retried all night; the 03:30 ON trigger is still pending.
        let late = Utc.with_ymd_and_hms(2026, 3, 11, 4, 10, 0).unwrap();
        assert_eq!(s.take_due(&late).unwrap().state, DesiredState::On);
        assert!(s.take_due(&late).is_none());
    }

    #[test]
    fn test_most_overdue_trigger_goes_first() {
        let mut s = stock(&at(1, 0, 0));
        // Both overdue: ON (03:30) before OFF (23:00).
        let much_later = at(23, 30, 0);
        assert_eq!(s.take_due(&much_later).unwrap().state, DesiredState::On);
        assert_eq!(s.take_due(&much_later).unwrap().state, DesiredState::Off);
        assert!(s.take_due(&much_later).is_none());
    }

    #[test]
    fn test_preview_lists_both_states_in_order() {
        let s = stock(&at(12, 0, 0));
        let preview = s.preview(&at(12, 0, 0), 24).unwrap();

        let states: Vec<DesiredState> = preview.iter().map(|(_, t)| t.state).collect();
        assert_eq!(states, vec![DesiredState::Off, DesiredState::On]);
        assert_eq!(preview[0].0, at(23, 0, 0));

        assert_eq!(s.preview(&at(12, 0, 0), 72).unwrap().len(), 6);
    }

    #[test]
    fn test_preview_rejects_oversized_window() {
        let s = stock(&at(12, 0, 0));

        assert_eq!(s.preview(&at(12, 0, 0), MAX_PREVIEW_HOURS).unwrap().len(), 2 * 1464);
        assert!(s.preview(&at(12, 0, 0), MAX_PREVIEW_HOURS + 1).is_err());
        assert!(s.preview(&at(12, 0, 0), 5_000_000_000).is_err());
        assert!(s.preview(&at(12, 0, 0), u64::MAX).is_err());
    }
}
