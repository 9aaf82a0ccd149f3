//! Reminder alerts for today's window.
//!
//! The engine only produces [`AlertRequest`]s. Schedulers own whatever handles they need and
//! replace the previous schedule on every call.

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::models::DayEntry;

/// Window bounds plus how many minutes ahead to warn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AlertRequest {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub offset_minutes: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AlertKind {
    /// Fires `offset_minutes` before the window starts
    Warning,
    /// Fires when the window starts
    Started,
}

impl AlertKind {
    /// Identifier of the logical alert; a new schedule replaces the one with the same tag
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            AlertKind::Warning => "rahu-warning",
            AlertKind::Started => "rahu-start",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub fire_at: DateTime<Utc>,
    pub request: AlertRequest,
}

impl Alert {
    #[must_use]
    pub fn title(&self) -> &'static str {
        match self.kind {
            AlertKind::Warning => "Rahu Kaal Warning",
            AlertKind::Started => "Rahu Kaal Started",
        }
    }

    /// Message body with times rendered in `tz`
    #[must_use]
    pub fn body<Tz>(&self, tz: &Tz) -> String
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let fmt = |instant: DateTime<Utc>| instant.with_timezone(tz).format("%H:%M").to_string();
        match self.kind {
            AlertKind::Warning => format!(
                "Rahu Kaal starts in {} minutes at {}. Avoid beginning important tasks.",
                self.request.offset_minutes,
                fmt(self.request.start)
            ),
            AlertKind::Started => format!(
                "Rahu Kaal has started. It ends at {}.",
                fmt(self.request.end)
            ),
        }
    }
}

impl AlertRequest {
    #[must_use]
    pub fn for_day(entry: &DayEntry, offset_minutes: u32) -> Self {
        Self {
            start: entry.window.start,
            end: entry.window.end,
            offset_minutes,
        }
    }

    #[must_use]
    pub fn warning_at(&self) -> DateTime<Utc> {
        self.start - TimeDelta::minutes(i64::from(self.offset_minutes))
    }

    /// Alerts still ahead of `now`. A zero offset yields only the start alert.
    #[must_use]
    pub fn pending_alerts(&self, now: DateTime<Utc>) -> Vec<Alert> {
        let mut alerts = Vec::with_capacity(2);
        if self.offset_minutes > 0 && self.warning_at() > now {
            alerts.push(Alert {
                kind: AlertKind::Warning,
                fire_at: self.warning_at(),
                request: *self,
            });
        }
        if self.start > now {
            alerts.push(Alert {
                kind: AlertKind::Started,
                fire_at: self.start,
                request: *self,
            });
        }
        alerts
    }
}

/// Delivers alerts. Each call to `schedule` supersedes the previous one.
pub trait AlertScheduler {
    fn schedule(&mut self, request: &AlertRequest);
    fn cancel_all(&mut self);
}

pub type AlertSink = Arc<dyn Fn(Alert) + Send + Sync>;

/// Fires alerts from tokio timers, one task per alert tag
pub struct TokioAlertScheduler {
    sink: AlertSink,
    handles: HashMap<&'static str, JoinHandle<()>>,
}

impl TokioAlertScheduler {
    #[must_use]
    pub fn new(sink: AlertSink) -> Self {
        Self {
            sink,
            handles: HashMap::new(),
        }
    }

    /// Number of alerts that have not fired yet
    #[must_use]
    pub fn pending(&self) -> usize {
        self.handles.values().filter(|h| !h.is_finished()).count()
    }

    /// Wait until every scheduled alert has fired or been cancelled.
    ///
    /// Finished handles leave the map, so waiting again returns at once. Handles not yet awaited
    /// stay behind for `cancel_all` if this future is dropped.
    pub async fn wait(&mut self) {
        let tags: Vec<_> = self.handles.keys().copied().collect();
        for tag in tags {
            if let Some(handle) = self.handles.get_mut(tag) {
                let _ = handle.await;
            }
            self.handles.remove(tag);
        }
    }
}

impl AlertScheduler for TokioAlertScheduler {
    fn schedule(&mut self, request: &AlertRequest) {
        self.cancel_all();
        let now = Utc::now();
        for alert in request.pending_alerts(now) {
            let delay = (alert.fire_at - now).to_std().unwrap_or_default();
            let sink = Arc::clone(&self.sink);
            let tag = alert.kind.tag();
            debug!("Scheduling {tag} in {}s", delay.as_secs());
            let handle = tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                sink(alert);
            });
            self.handles.insert(tag, handle);
        }
        info!("Scheduled {} alert(s)", self.handles.len());
    }

    fn cancel_all(&mut self) {
        for (tag, handle) in self.handles.drain() {
            if !handle.is_finished() {
                debug!("Cancelling pending {tag}");
            }
            handle.abort();
        }
    }
}

impl Drop for TokioAlertScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
