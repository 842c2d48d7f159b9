//! Session state machine and in-memory capture buffers

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::LimitsConfig;
use crate::host::TargetInfo;
use crate::protocol::{RequestId, TargetId};
use crate::record::{LogEntry, NetworkRecord};

/// Recording lifecycle states
///
/// `Idle -> Recording -> Paused -> Recording -> Stopped (-> Idle)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// No session active
    Idle,
    /// Actively ingesting events
    Recording,
    /// Session exists, event ingestion suspended
    Paused,
    /// Session ended, cleanup pending
    Stopped,
}

impl SessionState {
    /// Lowercase name of the state
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Recording => "recording",
            SessionState::Paused => "paused",
            SessionState::Stopped => "stopped",
        }
    }
}

/// Client-observed metadata merged into the report at session end
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientMetadata {
    /// Page URL at snapshot time
    pub url: String,
    /// ISO-8601 snapshot timestamp
    pub timestamp: String,
    /// Operating system description
    pub os: String,
    /// Browser name and version
    pub browser: String,
    /// Inner window size, `WxH`
    pub window_size: String,
    /// Country resolved from the client IP
    pub country: String,
}

impl Default for ClientMetadata {
    fn default() -> Self {
        Self {
            url: String::new(),
            timestamp: String::new(),
            os: "Unknown".to_string(),
            browser: "Unknown".to_string(),
            window_size: "Unknown".to_string(),
            country: "Unknown".to_string(),
        }
    }
}

/// The one active diagnostic session and everything it has captured
///
/// Owned exclusively by the [`crate::session::Recorder`] behind a mutex;
/// there is no module-level state.
#[derive(Debug)]
pub struct Session {
    /// Lifecycle state
    pub state: SessionState,
    /// The observed tab; `Some` iff recording or paused
    pub target: Option<TargetInfo>,
    /// Epoch seconds when the session started, 0.0 while idle
    pub started_at: f64,
    /// Generation counter; in-flight console tasks from an older generation
    /// discard their results
    pub epoch: u64,
    /// Finalized console log entries, in arrival order
    pub console_log: Vec<LogEntry>,
    /// User action descriptions, in arrival order
    pub user_actions: Vec<String>,
    /// In-flight network records keyed by request id
    pub network_index: HashMap<RequestId, NetworkRecord>,
    /// Finalized network records, in completion order
    pub network_log: Vec<NetworkRecord>,
    /// One-time advisory set when the observer failed to attach
    pub attach_warning: Option<String>,
    /// Metadata snapshotted at pause/stop
    pub metadata: Option<ClientMetadata>,
    limits: LimitsConfig,
}

impl Session {
    /// Create an idle session with the given buffer caps
    #[must_use]
    pub fn new(limits: LimitsConfig) -> Self {
        Self {
            state: SessionState::Idle,
            target: None,
            started_at: 0.0,
            epoch: 0,
            console_log: Vec::new(),
            user_actions: Vec::new(),
            network_index: HashMap::new(),
            network_log: Vec::new(),
            attach_warning: None,
            metadata: None,
            limits,
        }
    }

    /// Whether events are currently being ingested
    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.state == SessionState::Recording
    }

    /// Whether the session exists but ingestion is suspended
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.state == SessionState::Paused
    }

    /// Reset all buffers and begin recording the given target
    ///
    /// All buffers are cleared atomically; the generation counter is bumped
    /// so that results of older in-flight tasks get discarded.
    pub fn begin(&mut self, target: TargetInfo, started_at: f64) {
        self.state = SessionState::Recording;
        self.target = Some(target);
        self.started_at = started_at;
        self.epoch += 1;
        self.console_log.clear();
        self.user_actions.clear();
        self.network_index.clear();
        self.network_log.clear();
        self.attach_warning = None;
        self.metadata = None;
    }

    /// End the session and return to idle
    pub fn end(&mut self) {
        self.state = SessionState::Idle;
        self.target = None;
        self.started_at = 0.0;
        self.epoch += 1;
        self.network_index.clear();
    }

    /// Append a console log entry, honoring the buffer cap
    pub fn push_log(&mut self, entry: LogEntry) {
        if self.console_log.len() >= self.limits.max_console_entries {
            warn!(
                cap = self.limits.max_console_entries,
                "console log cap reached, dropping entry"
            );
            return;
        }
        self.console_log.push(entry);
    }

    /// Append a user action, honoring the buffer cap
    pub fn push_user_action(&mut self, action: String) {
        if self.user_actions.len() >= self.limits.max_user_actions {
            warn!(
                cap = self.limits.max_user_actions,
                "user action cap reached, dropping action"
            );
            return;
        }
        self.user_actions.push(action);
    }

    /// Move a finalized record into the network log, honoring the buffer cap
    pub fn push_network(&mut self, record: NetworkRecord) {
        if self.network_log.len() >= self.limits.max_network_entries {
            warn!(
                cap = self.limits.max_network_entries,
                "network log cap reached, dropping record"
            );
            return;
        }
        self.network_log.push(record);
    }

    /// Serializable snapshot for persistence (in-flight index excluded)
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            is_recording: self.is_recording(),
            is_paused: self.is_paused(),
            target_id: self.target.as_ref().map(|target| target.id),
            target_url: self.target.as_ref().map(|target| target.url.clone()),
            started_at: self.started_at,
            console_log: self.console_log.clone(),
            user_actions: self.user_actions.clone(),
            network_log: self.network_log.clone(),
            metadata: self.metadata.clone(),
        }
    }

    /// Restore buffers and state from a persisted snapshot
    pub fn restore(&mut self, snapshot: SessionSnapshot) {
        self.state = if snapshot.is_paused {
            SessionState::Paused
        } else if snapshot.is_recording {
            SessionState::Recording
        } else {
            SessionState::Idle
        };
        self.target = match (snapshot.target_id, snapshot.target_url) {
            (Some(id), Some(url)) => Some(TargetInfo { id, url }),
            _ => None,
        };
        self.started_at = snapshot.started_at;
        self.epoch += 1;
        self.console_log = snapshot.console_log;
        self.user_actions = snapshot.user_actions;
        self.network_index.clear();
        self.network_log = snapshot.network_log;
        self.metadata = snapshot.metadata;
    }
}

/// Persistable view of a session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Whether the session was recording
    pub is_recording: bool,
    /// Whether the session was paused
    pub is_paused: bool,
    /// Observed target, when one was selected
    pub target_id: Option<TargetId>,
    /// URL of the observed target
    pub target_url: Option<String>,
    /// Epoch seconds when the session started
    pub started_at: f64,
    /// Captured console entries
    pub console_log: Vec<LogEntry>,
    /// Captured user actions
    pub user_actions: Vec<String>,
    /// Finalized network records
    pub network_log: Vec<NetworkRecord>,
    /// Metadata snapshotted at pause/stop
    pub metadata: Option<ClientMetadata>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{LogKind, LogOrigin};

    fn target() -> TargetInfo {
        TargetInfo {
            id: TargetId(7),
            url: "https://example.com/app".to_string(),
        }
    }

    #[test]
    fn test_begin_resets_buffers() {
        let mut session = Session::new(LimitsConfig::default());
        session.begin(target(), 100.0);
        session.push_log(LogEntry::synthetic(
            LogOrigin::Synthetic,
            "old".to_string(),
            1.0,
        ));
        session.push_user_action("clicked".to_string());

        let old_epoch = session.epoch;
        session.begin(target(), 200.0);

        assert!(session.console_log.is_empty());
        assert!(session.user_actions.is_empty());
        assert!(session.network_index.is_empty());
        assert!(session.network_log.is_empty());
        assert_eq!(session.epoch, old_epoch + 1);
        assert!(session.is_recording());
    }

    #[test]
    fn test_end_clears_target() {
        let mut session = Session::new(LimitsConfig::default());
        session.begin(target(), 100.0);
        session.end();

        assert_eq!(session.state, SessionState::Idle);
        assert!(session.target.is_none());
        assert!(!session.is_recording());
    }

    #[test]
    fn test_console_cap() {
        let limits = LimitsConfig {
            max_console_entries: 2,
            ..LimitsConfig::default()
        };
        let mut session = Session::new(limits);
        session.begin(target(), 100.0);

        for i in 0..5 {
            session.push_log(LogEntry::synthetic(
                LogOrigin::Synthetic,
                format!("entry {i}"),
                1.0,
            ));
        }

        assert_eq!(session.console_log.len(), 2);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut session = Session::new(LimitsConfig::default());
        session.begin(target(), 100.0);
        session.push_log(LogEntry::synthetic(
            LogOrigin::Synthetic,
            "kept".to_string(),
            1.0,
        ));
        session.push_user_action("typed: hello".to_string());

        let snapshot = session.snapshot();
        assert!(snapshot.is_recording);
        assert_eq!(snapshot.target_id, Some(TargetId(7)));

        let mut restored = Session::new(LimitsConfig::default());
        restored.restore(snapshot);

        assert!(restored.is_recording());
        assert_eq!(restored.console_log.len(), 1);
        assert_eq!(restored.console_log[0].kind, LogKind::Error);
        assert_eq!(restored.user_actions, vec!["typed: hello".to_string()]);
        assert_eq!(
            restored.target.as_ref().map(|t| t.url.clone()),
            Some("https://example.com/app".to_string())
        );
    }
}
