//! Event correlation
//!
//! Turns the typed protocol event stream into session records: console calls
//! and log entries become [`crate::record::LogEntry`] values, network
//! lifecycle events are matched by request id into
//! [`crate::record::NetworkRecord`] values, and security/dialog events feed
//! the CORS backstop.

mod console;
mod network;

pub use console::{build_console_entry, build_log_domain_entry, scan_dialog, scan_security_state};
pub use network::{
    cors_message, on_data_received, on_loading_failed, on_loading_finished, on_request_sent,
    on_response_received,
};

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::host::AutomationSurface;
use crate::protocol::{ConsoleApiCalled, ProtocolEvent, TargetId};
use crate::record::LogEntry;
use crate::sanitize::HeaderSanitizer;
use crate::session::Session;

/// Stateless event-to-record translation, configured once at startup
///
/// Synchronous events are applied directly to a locked [`Session`] via
/// [`Correlator::apply`]; console calls need remote introspection and go
/// through the async [`Correlator::build_console_entry`] instead.
pub struct Correlator {
    sanitizer: HeaderSanitizer,
    property_timeout: Duration,
}

impl Correlator {
    /// Build a correlator from the loaded configuration
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            sanitizer: HeaderSanitizer::new(config.redaction.headers.clone()),
            property_timeout: Duration::from_millis(config.property_fetch_timeout_ms),
        }
    }

    /// Apply one synchronous event to the session
    ///
    /// `page_origin` labels synthetic CORS console entries. Console calls are
    /// not handled here; route them to [`Self::build_console_entry`].
    pub fn apply(&self, session: &mut Session, event: &ProtocolEvent, page_origin: &str) {
        match event {
            ProtocolEvent::ConsoleApiCalled(_) => {}
            ProtocolEvent::LogEntryAdded(entry) => {
                session.push_log(build_log_domain_entry(entry.clone()));
            }
            ProtocolEvent::SecurityStateChanged(change) => {
                for entry in scan_security_state(change) {
                    session.push_log(entry);
                }
            }
            ProtocolEvent::JavascriptDialogOpening(dialog) => {
                if let Some(entry) = scan_dialog(dialog) {
                    session.push_log(entry);
                }
            }
            ProtocolEvent::RequestWillBeSent(sent) => {
                on_request_sent(session, sent, &self.sanitizer);
            }
            ProtocolEvent::ResponseReceived(received) => {
                on_response_received(session, received, &self.sanitizer);
            }
            ProtocolEvent::DataReceived(chunk) => {
                on_data_received(session, chunk);
            }
            ProtocolEvent::LoadingFinished(finished) => {
                on_loading_finished(session, finished);
            }
            ProtocolEvent::LoadingFailed(failed) => {
                on_loading_failed(session, failed, page_origin);
            }
        }
    }

    /// Resolve a console call into a log entry, fetching object properties
    ///
    /// Runs outside the session lock; the caller re-acquires it to append
    /// the result.
    pub async fn build_console_entry(
        &self,
        surface: &Arc<dyn AutomationSurface>,
        target: TargetId,
        event: ConsoleApiCalled,
    ) -> Option<LogEntry> {
        build_console_entry(surface, target, event, self.property_timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LimitsConfig;
    use crate::host::TargetInfo;
    use crate::protocol::{LogDomainEntry, RequestInfo, RequestWillBeSent};
    use crate::record::LogOrigin;

    fn session() -> Session {
        let mut session = Session::new(LimitsConfig::default());
        session.begin(
            TargetInfo {
                id: TargetId(1),
                url: "https://app.example.com/".to_string(),
            },
            0.0,
        );
        session
    }

    #[test]
    fn test_apply_routes_log_entry() {
        let correlator = Correlator::new(&Config::default());
        let mut session = session();

        let event = ProtocolEvent::LogEntryAdded(LogDomainEntry {
            level: "error".to_string(),
            text: "boom".to_string(),
            timestamp: 1_700_000_000_000.0,
            stack_trace: None,
        });
        correlator.apply(&mut session, &event, "https://app.example.com");

        assert_eq!(session.console_log.len(), 1);
        assert_eq!(session.console_log[0].origin, LogOrigin::LogDomain);
    }

    #[test]
    fn test_apply_routes_network_open() {
        let correlator = Correlator::new(&Config::default());
        let mut session = session();

        let event = ProtocolEvent::RequestWillBeSent(RequestWillBeSent {
            request_id: "r1".to_string(),
            request: RequestInfo {
                url: "https://x.test/a".to_string(),
                method: "GET".to_string(),
                headers: std::collections::BTreeMap::new(),
            },
            timestamp: 1.0,
            resource_type: None,
            initiator: None,
        });
        correlator.apply(&mut session, &event, "https://app.example.com");

        assert!(session.network_index.contains_key("r1"));
    }

    #[test]
    fn test_apply_ignores_console_calls() {
        let correlator = Correlator::new(&Config::default());
        let mut session = session();

        let event = ProtocolEvent::ConsoleApiCalled(ConsoleApiCalled::default());
        correlator.apply(&mut session, &event, "https://app.example.com");

        assert!(session.console_log.is_empty());
    }
}
