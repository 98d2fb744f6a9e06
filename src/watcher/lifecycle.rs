//! Watcher lifecycle: build, run, and periodically restart the
//! filesystem observer.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{Local, NaiveTime, Timelike};
use log::{error, info, warn};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{mpsc, watch};

use crate::config::WatcherRestartSchedule;

use super::buffer::InvalidationBuffer;

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);
const DAY_SECONDS: i64 = 86_400;

/// Handle to a running watcher task. Dropping the handle stops the
/// watcher: the stop channel closing is treated the same as an
/// explicit `stop()` call, so there is no way to leak the background
/// task by forgetting to call `stop()`.
pub struct WatcherHandle {
    task: tokio::task::JoinHandle<()>,
    stop_tx: watch::Sender<bool>,
}

impl WatcherHandle {
    pub fn stop(self) {
        let _ = self.stop_tx.send(true);
        self.task.abort();
    }
}

/// Starts the watcher subsystem over `root`: builds the `notify`
/// observer (retrying with exponential backoff on failure), forwards
/// every event into `buffer`, and tears down and rebuilds the observer
/// on `restart_schedule`'s cadence.
pub fn start(root: PathBuf, buffer: InvalidationBuffer, restart_schedule: WatcherRestartSchedule) -> WatcherHandle {
    let (stop_tx, mut stop_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        loop {
            if *stop_rx.borrow() {
                return;
            }

            let Some((watcher, mut events)) = create_watcher_with_retry(&root, &mut stop_rx).await else {
                return;
            };

            let restart_after = next_restart_delay(&restart_schedule);
            let sleep = tokio::time::sleep(restart_after);
            tokio::pin!(sleep);

            loop {
                tokio::select! {
                    _ = &mut sleep => {
                        info!("watcher restart schedule elapsed for {root:?}; recreating observer");
                        break;
                    }
                    _ = stop_rx.changed() => {
                        // Either an explicit stop or the sender was dropped;
                        // both mean the same thing here: shut down.
                        drop(watcher);
                        return;
                    }
                    maybe_event = events.recv() => {
                        match maybe_event {
                            Some(event) => handle_event(&buffer, event),
                            None => {
                                warn!("watcher event channel closed for {root:?}; recreating observer");
                                break;
                            }
                        }
                    }
                }
            }

            drop(watcher);
        }
    });

    WatcherHandle { task, stop_tx }
}

async fn create_watcher_with_retry(
    root: &Path,
    stop_rx: &mut watch::Receiver<bool>,
) -> Option<(RecommendedWatcher, mpsc::UnboundedReceiver<Event>)> {
    let mut backoff = INITIAL_BACKOFF;

    loop {
        match build_watcher(root) {
            Ok(pair) => return Some(pair),
            Err(e) => {
                error!("watcher startup failed for {root:?}: {e}; retrying in {backoff:?}");
                tokio::select! {
                    _ = tokio::time::sleep(backoff) => {}
                    _ = stop_rx.changed() => return None,
                }
                backoff = (backoff * 2).min(MAX_BACKOFF);
            }
        }
    }
}

fn build_watcher(root: &Path) -> notify::Result<(RecommendedWatcher, mpsc::UnboundedReceiver<Event>)> {
    let (tx, rx) = mpsc::unbounded_channel();

    let mut watcher = RecommendedWatcher::new(
        move |result: notify::Result<Event>| match result {
            Ok(event) => {
                let _ = tx.send(event);
            }
            Err(e) => warn!("watcher reported an error: {e}"),
        },
        notify::Config::default(),
    )?;

    watcher.watch(root, RecursiveMode::Recursive)?;
    Ok((watcher, rx))
}

/// Keys the event by the *containing* directory on both ends, covering
/// both source and destination directories for renames, and sidestepping
/// the fact that a deleted path can no longer be canonicalized — its
/// parent normally still exists.
fn handle_event(buffer: &InvalidationBuffer, event: Event) {
    match event.kind {
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => {
            for path in &event.paths {
                if let Some(parent) = path.parent() {
                    buffer.record(parent);
                }
            }
        }
        EventKind::Any | EventKind::Access(_) | EventKind::Other => {}
    }
}

/// Delay until the next scheduled restart: either a fixed interval, or
/// the soonest of a list of daily wall-clock times.
fn next_restart_delay(schedule: &WatcherRestartSchedule) -> Duration {
    match schedule {
        WatcherRestartSchedule::IntervalSeconds(secs) => Duration::from_secs((*secs).max(1)),
        WatcherRestartSchedule::DailyTimes(times) => {
            let parsed: Vec<NaiveTime> = times
                .iter()
                .filter_map(|t| NaiveTime::parse_from_str(t, "%H:%M").ok())
                .collect();

            let Some(delay) = soonest_delay(&parsed) else {
                warn!("watcher_restart_schedule has no parseable HH:MM entries; defaulting to 1 hour");
                return Duration::from_secs(3600);
            };

            delay
        }
    }
}

fn soonest_delay(times: &[NaiveTime]) -> Option<Duration> {
    if times.is_empty() {
        return None;
    }

    let today_seconds = Local::now().time().num_seconds_from_midnight() as i64;

    let min_delta = times
        .iter()
        .map(|t| {
            let target = t.num_seconds_from_midnight() as i64;
            if target > today_seconds {
                target - today_seconds
            } else {
                target + DAY_SECONDS - today_seconds
            }
        })
        .min()?;

    Some(Duration::from_secs(min_delta as u64))
}

#[cfg(test)]
#[path = "tests/lifecycle_tests.rs"]
mod tests;
