use std::time::Duration;

use chrono::Timelike;
use tempfile::tempdir;

use crate::config::WatcherRestartSchedule;

use super::{build_watcher, next_restart_delay};

#[test]
fn interval_schedule_returns_configured_seconds() {
    let delay = next_restart_delay(&WatcherRestartSchedule::IntervalSeconds(120));
    assert_eq!(delay, Duration::from_secs(120));
}

#[test]
fn daily_schedule_picks_the_soonest_upcoming_time() {
    let soon = chrono::Local::now().time() + chrono::Duration::minutes(1);
    let schedule = WatcherRestartSchedule::DailyTimes(vec![format!("{:02}:{:02}", soon.hour(), soon.minute())]);

    let delay = next_restart_delay(&schedule);
    assert!(delay <= Duration::from_secs(70), "expected the ~1 minute target, got {delay:?}");
}

#[test]
fn daily_schedule_falls_back_to_an_hour_when_unparseable() {
    let schedule = WatcherRestartSchedule::DailyTimes(vec!["not-a-time".into()]);
    assert_eq!(next_restart_delay(&schedule), Duration::from_secs(3600));
}

#[tokio::test]
async fn build_watcher_succeeds_on_an_existing_directory() {
    let dir = tempdir().unwrap();
    assert!(build_watcher(dir.path()).is_ok());
}
