//! The dwell tracker. At most one [Session] is open at a time; every transition that ends a
//! session turns its elapsed time into at most one [Increment].

use std::{mem, sync::Arc};

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    classifier::Classifier,
    daemon::storage::entities::{Category, Increment},
    utils::time::rounded_seconds_between,
};

/// Everything that can move the tracker. All but [FocusEvent::Flush] arrive from the browser.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FocusEvent {
    /// A tab with `url` became the focused browsing context.
    FocusGain {
        #[serde(rename = "tabId")]
        tab_id: i64,
        url: String,
    },
    FocusLoss,
    /// No browser window has focus anymore.
    WindowBlur,
    Suspend,
    /// Periodic checkpoint. Closes the session and immediately reopens it.
    #[serde(skip_deserializing)]
    Flush,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub tab_id: i64,
    pub domain: Arc<str>,
    pub classification: Category,
    pub started_at: DateTime<Utc>,
}

impl Session {
    /// Converts the time elapsed since the session started into an increment. Nothing is
    /// emitted when it rounds to zero seconds.
    fn close(&self, now: DateTime<Utc>) -> Option<Increment> {
        let seconds = rounded_seconds_between(self.started_at, now);
        (seconds > 0).then(|| Increment {
            domain: self.domain.clone(),
            category: self.classification,
            seconds,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TrackerState {
    #[default]
    Idle,
    Tracking(Session),
}

#[derive(Debug, PartialEq, Eq)]
pub struct Transition {
    pub state: TrackerState,
    pub increment: Option<Increment>,
}

impl TrackerState {
    /// Computes the next state for `event` observed at `now`.
    pub fn apply(
        self,
        event: FocusEvent,
        now: DateTime<Utc>,
        classifier: &Classifier,
    ) -> Transition {
        match event {
            FocusEvent::FocusGain { tab_id, url } => {
                let increment = self.close(now);
                let state = match extract_domain(&url) {
                    Ok(domain) => {
                        let classification = classifier.classify(&domain);
                        info!("Tracking {domain} ({classification})");
                        TrackerState::Tracking(Session {
                            tab_id,
                            domain: domain.into(),
                            classification,
                            started_at: now,
                        })
                    }
                    Err(e) => {
                        warn!("Not tracking tab {tab_id}: {e}");
                        TrackerState::Idle
                    }
                };
                Transition { state, increment }
            }
            FocusEvent::FocusLoss | FocusEvent::WindowBlur | FocusEvent::Suspend => {
                debug!("Stopping tracking on {event:?}");
                Transition {
                    increment: self.close(now),
                    state: TrackerState::Idle,
                }
            }
            FocusEvent::Flush => match self {
                TrackerState::Tracking(session) => Transition {
                    increment: session.close(now),
                    state: TrackerState::Tracking(Session {
                        started_at: now,
                        ..session
                    }),
                },
                TrackerState::Idle => Transition {
                    state: TrackerState::Idle,
                    increment: None,
                },
            },
        }
    }

    fn close(&self, now: DateTime<Utc>) -> Option<Increment> {
        match self {
            TrackerState::Tracking(session) => session.close(now),
            TrackerState::Idle => None,
        }
    }
}

/// Owns the tracker state so callers only feed events in and collect increments.
pub struct DwellTracker {
    state: TrackerState,
    classifier: Classifier,
}

impl DwellTracker {
    pub fn new(classifier: Classifier) -> Self {
        Self {
            state: TrackerState::Idle,
            classifier,
        }
    }

    pub fn handle(&mut self, event: FocusEvent, now: DateTime<Utc>) -> Option<Increment> {
        let Transition { state, increment } =
            mem::take(&mut self.state).apply(event, now, &self.classifier);
        self.state = state;
        increment
    }

    pub fn state(&self) -> &TrackerState {
        &self.state
    }
}

/// Hostname of `url` without a leading `www.`.
pub fn extract_domain(url: &str) -> Result<String> {
    let parsed = Url::parse(url).map_err(|e| anyhow!("Malformed url {url:?}: {e}"))?;
    let host = parsed
        .host_str()
        .filter(|host| !host.is_empty())
        .ok_or_else(|| anyhow!("Url {url:?} has no host"))?;
    let host = host.strip_prefix("www.").unwrap_or(host);
    if host.is_empty() {
        return Err(anyhow!("Url {url:?} has no host"));
    }
    Ok(host.to_owned())
}
