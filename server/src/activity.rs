//! Activity tracking collaborator.
//!
//! Recording is fire-and-forget: `record` returns immediately, and a failing
//! sink is logged without ever reaching the room operation that produced the
//! activity.

use serde::Serialize;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};
use system::serde_json::{self, Value};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ActivityKind {
    #[serde(rename = "whiteboard_create")]
    Create,
    #[serde(rename = "whiteboard_join")]
    Join,
    #[serde(rename = "whiteboard_draw")]
    Draw,
    #[serde(rename = "whiteboard_clear")]
    Clear,
    #[serde(rename = "whiteboard_undo")]
    Undo,
    #[serde(rename = "whiteboard_redo")]
    Redo,
    #[serde(rename = "whiteboard_leave")]
    Leave,
    #[serde(rename = "whiteboard_save")]
    Save,
    #[serde(rename = "whiteboard_load")]
    Load,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    /// Display name; the engine has no stronger identity.
    pub user_id: String,
    pub activity_type: ActivityKind,
    pub details: Value,
    /// Milliseconds since the unix epoch.
    pub timestamp: u64,
}

impl Activity {
    pub fn new(user_id: impl Into<String>, activity_type: ActivityKind, details: Value) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            user_id: user_id.into(),
            activity_type,
            details,
            timestamp,
        }
    }
}

pub trait ActivityRecorder: Send + Sync {
    fn record(&self, activity: Activity);
}

/// Writes activities to the `activity` log target.
pub struct LogActivityRecorder;

impl ActivityRecorder for LogActivityRecorder {
    fn record(&self, activity: Activity) {
        log::info!(
            target: "activity",
            "{} {:?} {}",
            activity.user_id,
            activity.activity_type,
            activity.details
        );
    }
}

/// Appends one JSON document per line to a file from a detached task.
pub struct JsonLinesActivityRecorder {
    tx: UnboundedSender<Activity>,
}

impl JsonLinesActivityRecorder {
    /// Must be called from within the runtime.
    pub fn spawn(path: PathBuf) -> Self {
        let (tx, mut rx) = unbounded_channel::<Activity>();
        tokio::spawn(async move {
            log::info!("activity writer - started ({})", path.display());
            let mut file = match tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .await
            {
                Ok(file) => Some(file),
                Err(e) => {
                    log::error!("Cannot open activity log {}: {}", path.display(), e);
                    None
                }
            };
            while let Some(activity) = rx.recv().await {
                let file = match file.as_mut() {
                    Some(file) => file,
                    None => continue,
                };
                let mut line = match serde_json::to_vec(&activity) {
                    Ok(line) => line,
                    Err(e) => {
                        log::error!("Cannot encode activity: {}", e);
                        continue;
                    }
                };
                line.push(b'\n');
                if let Err(e) = file.write_all(&line).await {
                    log::error!("Failed to track activity: {}", e);
                }
            }
            log::info!("activity writer - terminated");
        });
        Self { tx }
    }
}

impl ActivityRecorder for JsonLinesActivityRecorder {
    fn record(&self, activity: Activity) {
        if self.tx.send(activity).is_err() {
            log::error!("Activity writer is gone, activity dropped");
        }
    }
}

/// Keeps everything in memory; handy for tests and diagnostics.
#[derive(Default)]
pub struct MemoryActivityRecorder {
    activities: Mutex<Vec<Activity>>,
}

impl MemoryActivityRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn activities(&self) -> Vec<Activity> {
        self.activities
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn kinds(&self) -> Vec<ActivityKind> {
        self.activities()
            .into_iter()
            .map(|a| a.activity_type)
            .collect()
    }
}

impl ActivityRecorder for MemoryActivityRecorder {
    fn record(&self, activity: Activity) {
        self.activities
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(activity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use system::serde_json::json;

    #[test]
    fn it_serializes_whiteboard_activity_names() {
        let activity = Activity::new("Alice", ActivityKind::Draw, json!({ "roomId": "R1" }));
        let value = serde_json::to_value(&activity).expect("must serialize");
        assert_eq!(value["userId"], "Alice");
        assert_eq!(value["activityType"], "whiteboard_draw");
        assert_eq!(value["details"]["roomId"], "R1");
    }

    #[tokio::test]
    async fn json_lines_recorder_appends_to_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("activity.jsonl");
        let recorder = JsonLinesActivityRecorder::spawn(path.clone());

        recorder.record(Activity::new("Alice", ActivityKind::Create, json!({})));
        recorder.record(Activity::new("Bob", ActivityKind::Join, json!({})));

        let mut content = String::new();
        for _ in 0..50 {
            tokio::time::delay_for(std::time::Duration::from_millis(10)).await;
            content = tokio::fs::read_to_string(&path).await.unwrap_or_default();
            if content.lines().count() == 2 {
                break;
            }
        }
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("whiteboard_create"));
        assert!(lines[1].contains("\"Bob\""));
    }
}
