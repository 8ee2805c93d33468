//! Activity contract
//!
//! Exercise mini-games run inside an embedded frame that the pointer engine
//! clicks into. The host launches them with the prescribed repetitions and
//! sets in the query string, and the game reports progress back with an
//! `updateStats` message:
//!
//! ```json
//! {"type":"updateStats","score":120,"reps":4,"sets":2}
//! ```
//!
//! The host forwards those messages verbatim on the control channel, so
//! `updateStats` is also a [`ControlCommand`](crate::transport::ControlCommand).
//! Launches, progress and closes are echoed back as [`ActivityReport`]s.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, info};

/// Default repetitions per set
pub const DEFAULT_REPS: u32 = 5;

/// Default number of sets
pub const DEFAULT_SETS: u32 = 3;

/// One activity launch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityLaunch {
    /// Game page URL
    pub url: String,
    /// Display title
    pub title: String,
    /// Repetitions per set
    #[serde(default = "default_reps")]
    pub reps: u32,
    /// Number of sets
    #[serde(default = "default_sets")]
    pub sets: u32,
}

fn default_reps() -> u32 {
    DEFAULT_REPS
}
fn default_sets() -> u32 {
    DEFAULT_SETS
}

impl ActivityLaunch {
    /// Launch with the default prescription
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            reps: DEFAULT_REPS,
            sets: DEFAULT_SETS,
        }
    }

    /// URL the frame is pointed at, carrying the prescription
    pub fn launch_url(&self) -> String {
        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!(
            "{}{}reps={}&sets={}",
            self.url, separator, self.reps, self.sets
        )
    }
}

/// Progress reported by a running activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Score so far
    #[serde(default, deserialize_with = "lenient_counter")]
    pub score: u32,
    /// Repetitions completed in the current set
    #[serde(default, deserialize_with = "lenient_counter")]
    pub reps: u32,
    /// Current set
    #[serde(default, deserialize_with = "lenient_counter")]
    pub sets: u32,
}

impl ProgressEvent {
    /// Parse a message from the activity frame
    ///
    /// Messages of any other type, or that are not JSON objects, yield `None`.
    /// Counters may arrive as numbers or numeric strings; anything else reads
    /// as zero.
    pub fn parse(text: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(text).ok()?;
        if value.get("type").and_then(Value::as_str) != Some("updateStats") {
            return None;
        }
        Some(Self {
            score: value.get("score").map_or(0, counter),
            reps: value.get("reps").map_or(0, counter),
            sets: value.get("sets").map_or(0, counter),
        })
    }
}

fn lenient_counter<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    Ok(counter(&Value::deserialize(deserializer)?))
}

fn counter(value: &Value) -> u32 {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .map_or(0, |n| u32::try_from(n).unwrap_or(u32::MAX)),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

/// Activity change echoed to the host UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum ActivityReport {
    /// Frame should load `url`
    Launched {
        /// Display title
        title: String,
        /// Frame URL with the prescription
        url: String,
    },
    /// Latest counters
    Progress(ProgressEvent),
    /// Activity closed
    Closed,
}

/// Stats shown beside the running activity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityStats {
    active: Option<ActivityLaunch>,
    latest: ProgressEvent,
}

impl ActivityStats {
    /// No activity running
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an activity; stats reset to zero. Returns the frame URL.
    pub fn launch(&mut self, launch: ActivityLaunch) -> String {
        let url = launch.launch_url();
        info!(
            "Launching {} ({} reps x {} sets)",
            launch.title, launch.reps, launch.sets
        );
        self.active = Some(launch);
        self.latest = ProgressEvent::default();
        url
    }

    /// Stop the running activity; false when nothing was running
    pub fn close(&mut self) -> bool {
        match self.active.take() {
            Some(launch) => {
                debug!("Closed {}", launch.title);
                true
            }
            None => false,
        }
    }

    /// Record progress; ignored when nothing is running
    pub fn apply(&mut self, event: ProgressEvent) -> bool {
        if self.active.is_none() {
            return false;
        }
        self.latest = event;
        true
    }

    /// Running activity
    pub fn active(&self) -> Option<&ActivityLaunch> {
        self.active.as_ref()
    }

    /// Latest progress
    pub fn latest(&self) -> ProgressEvent {
        self.latest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_url() {
        let launch = ActivityLaunch::new("games/honey-bee.html", "Honey Bee");
        assert_eq!(launch.launch_url(), "games/honey-bee.html?reps=5&sets=3");

        let launch = ActivityLaunch {
            reps: 10,
            sets: 1,
            ..ActivityLaunch::new("cookout.html?lang=en", "Cookout")
        };
        assert_eq!(launch.launch_url(), "cookout.html?lang=en&reps=10&sets=1");
    }

    #[test]
    fn test_parse_progress() {
        let event =
            ProgressEvent::parse(r#"{"type":"updateStats","score":120,"reps":"4","sets":2}"#)
                .unwrap();
        assert_eq!(
            event,
            ProgressEvent {
                score: 120,
                reps: 4,
                sets: 2
            }
        );
        assert!(ProgressEvent::parse(r#"{"type":"gameOver"}"#).is_none());
        assert!(ProgressEvent::parse("[1,2]").is_none());
    }

    #[test]
    fn test_launch_resets_stats() {
        let mut stats = ActivityStats::new();
        assert!(!stats.apply(ProgressEvent {
            score: 1,
            reps: 1,
            sets: 1
        }));

        stats.launch(ActivityLaunch::new("a.html", "A"));
        assert!(stats.apply(ProgressEvent {
            score: 50,
            reps: 3,
            sets: 1
        }));
        assert_eq!(stats.latest().score, 50);

        let url = stats.launch(ActivityLaunch::new("b.html", "B"));
        assert_eq!(url, "b.html?reps=5&sets=3");
        assert_eq!(stats.latest(), ProgressEvent::default());

        assert!(stats.close());
        assert!(stats.active().is_none());
        assert!(!stats.close());
    }

    #[test]
    fn test_progress_deserializes_leniently() {
        let event: ProgressEvent =
            serde_json::from_str(r#"{"score":"80","reps":2.0,"sets":null}"#).unwrap();
        assert_eq!(
            event,
            ProgressEvent {
                score: 80,
                reps: 2,
                sets: 0
            }
        );

        let json = serde_json::to_value(ActivityReport::Progress(event)).unwrap();
        assert_eq!(json["event"], "progress");
        assert_eq!(json["score"], 80);
    }
}
