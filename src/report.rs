//! Final report assembly and rendering
//!
//! A report is the immutable outcome of a stopped session: metadata, user
//! actions, network records, console entries, and the optional attach
//! advisory, renderable as plain text or pretty JSON.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::expand::render_object;
use crate::record::{Argument, LogEntry, NetworkRecord};
use crate::session::{ClientMetadata, Session};
use crate::urlinfo;
use crate::Result;

const SEPARATOR: &str = "--------------------------------------";

/// Everything a stopped session produced
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Screenshot captured at stop time, as a data URL
    pub screenshot_data_url: Option<String>,
    /// Session metadata block
    pub info: ClientMetadata,
    /// Captured console entries, in arrival order
    pub console_logs: Vec<LogEntry>,
    /// Finalized network records, in completion order
    pub network_calls: Vec<NetworkRecord>,
    /// User action descriptions, in arrival order
    pub user_actions: Vec<String>,
    /// Advisory carried over from a failed observer attach
    pub debugger_warning: Option<String>,
}

impl Report {
    /// Snapshot a session into a report; the session is left untouched
    #[must_use]
    pub fn assemble(session: &Session, screenshot_data_url: Option<String>) -> Self {
        Self {
            screenshot_data_url,
            info: session.metadata.clone().unwrap_or_default(),
            console_logs: session.console_log.clone(),
            network_calls: session.network_log.clone(),
            user_actions: session.user_actions.clone(),
            debugger_warning: session.attach_warning.clone(),
        }
    }

    /// Render the report as pretty-printed JSON
    ///
    /// # Errors
    ///
    /// Returns error when serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Render the report as a plain-text diagnostic dump
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "=== Session Metadata ===");
        let _ = writeln!(out, "URL: {}", self.info.url);
        let _ = writeln!(out, "Timestamp: {}", self.info.timestamp);
        let _ = writeln!(out, "OS: {}", self.info.os);
        let _ = writeln!(out, "Browser: {}", self.info.browser);
        let _ = writeln!(out, "Window Size: {}", self.info.window_size);
        let _ = writeln!(out, "Country: {}", self.info.country);

        if let Some(warning) = &self.debugger_warning {
            let _ = writeln!(out, "\nWarning: {warning}");
        }

        let _ = writeln!(out, "\n=== User Actions ===");
        if self.user_actions.is_empty() {
            let _ = writeln!(out, "No user actions recorded.");
        } else {
            for action in &self.user_actions {
                let _ = writeln!(out, "{action}");
            }
        }

        let _ = writeln!(out, "\n=== Network Logs ===");
        if self.network_calls.is_empty() {
            let _ = writeln!(out, "No network activity recorded.");
        } else {
            for record in &self.network_calls {
                write_network_record(&mut out, record);
            }
        }

        let _ = writeln!(out, "\n=== Console Logs ===");
        if self.console_logs.is_empty() {
            let _ = writeln!(out, "No console logs recorded.");
        } else {
            for entry in &self.console_logs {
                let _ = writeln!(
                    out,
                    "[{}] {}: {}",
                    entry.formatted_time,
                    entry.kind.as_str().to_uppercase(),
                    render_arguments(&entry.args)
                );
            }
        }

        out
    }
}

fn write_network_record(out: &mut String, record: &NetworkRecord) {
    let frame = if record.frame.is_empty() {
        "N/A".to_string()
    } else {
        urlinfo::file_name(&record.frame)
    };

    let _ = writeln!(out, "{SEPARATOR}");
    let _ = writeln!(out, "Name: {}", record.name);
    let _ = writeln!(out, "Method: {}", record.method);
    let _ = writeln!(out, "Status: {}", record.status);
    let _ = writeln!(out, "Domain: {}", record.domain);
    let _ = writeln!(out, "Type: {}", record.resource_type);
    let _ = writeln!(out, "Frame: {frame}");
    let _ = writeln!(out, "Size: {}", record.display_size);
    let _ = writeln!(out, "Time: {}", record.display_time);

    if record.is_preflight {
        let _ = writeln!(out, "Preflight Request: Yes");
    }
    if record.cors_error {
        let _ = writeln!(out, "CORS Error: Yes");
    }

    if !record.request_headers.is_empty() {
        let _ = writeln!(out, "Request Headers:");
        for (name, value) in &record.request_headers {
            let _ = writeln!(out, "  {name}: {value}");
        }
    }
    if !record.response_headers.is_empty() {
        let _ = writeln!(out, "Response Headers:");
        for (name, value) in &record.response_headers {
            let _ = writeln!(out, "  {name}: {value}");
        }
    }
}

fn render_arguments(args: &[Argument]) -> String {
    args.iter()
        .map(render_argument)
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_argument(argument: &Argument) -> String {
    match argument {
        Argument::String { value } => value.clone(),
        Argument::Number { value } => value.to_string(),
        Argument::Boolean { value } => value.to_string(),
        Argument::Undefined => "undefined".to_string(),
        Argument::Symbol { description } | Argument::Function { description } => {
            description.clone()
        }
        Argument::Object(object) => match &object.properties {
            Some(properties) => render_object(properties),
            None => object
                .preview
                .as_ref()
                .and_then(|preview| preview.description.clone())
                .unwrap_or_else(|| {
                    if object.description.is_empty() {
                        object.class_name.clone()
                    } else {
                        object.description.clone()
                    }
                }),
        },
        Argument::Unknown { value, .. } => value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LimitsConfig;
    use crate::host::TargetInfo;
    use crate::protocol::{PropertyDescriptor, TargetId};
    use crate::record::{LogOrigin, ObjectArgument, STATUS_CORS_ERROR};
    use std::collections::BTreeMap;

    fn session_with_data() -> Session {
        let mut session = Session::new(LimitsConfig::default());
        session.begin(
            TargetInfo {
                id: TargetId(1),
                url: "https://app.example.com/".to_string(),
            },
            0.0,
        );

        session.metadata = Some(ClientMetadata {
            url: "https://app.example.com/".to_string(),
            timestamp: "2026-08-29T10:00:00Z".to_string(),
            os: "Linux".to_string(),
            browser: "Chrome 128".to_string(),
            window_size: "1920x1080".to_string(),
            country: "Germany".to_string(),
        });
        session.push_user_action("clicked: Save".to_string());
        session.push_log(LogEntry::synthetic(
            LogOrigin::Synthetic,
            "blocked by CORS policy".to_string(),
            1_700_000_000.0,
        ));
        session.push_network(NetworkRecord {
            id: "r1".to_string(),
            name: "users".to_string(),
            url: "https://api.example.com/users".to_string(),
            method: "GET".to_string(),
            status: STATUS_CORS_ERROR.to_string(),
            domain: "api.example.com".to_string(),
            resource_type: "XHR".to_string(),
            frame: "https://app.example.com/main.js".to_string(),
            size_bytes: 0,
            duration_secs: 0.12,
            started_at_ms: 0.0,
            first_byte_at_ms: 0.0,
            finished_at_ms: 120.0,
            request_headers: BTreeMap::from([("accept".to_string(), "*/*".to_string())]),
            response_headers: BTreeMap::new(),
            cors_error: true,
            is_preflight: false,
            display_size: "0 B".to_string(),
            display_time: "120 ms".to_string(),
        });
        session
    }

    #[test]
    fn test_section_order() {
        let report = Report::assemble(&session_with_data(), None);
        let text = report.to_text();

        let metadata = text.find("=== Session Metadata ===").unwrap();
        let actions = text.find("=== User Actions ===").unwrap();
        let network = text.find("=== Network Logs ===").unwrap();
        let console = text.find("=== Console Logs ===").unwrap();

        assert!(metadata < actions && actions < network && network < console);
    }

    #[test]
    fn test_text_content() {
        let report = Report::assemble(&session_with_data(), None);
        let text = report.to_text();

        assert!(text.contains("Country: Germany"));
        assert!(text.contains("clicked: Save"));
        assert!(text.contains("Name: users"));
        assert!(text.contains("Frame: main.js"));
        assert!(text.contains("CORS Error: Yes"));
        assert!(text.contains("  accept: */*"));
        assert!(text.contains("ERROR: blocked by CORS policy"));
    }

    #[test]
    fn test_empty_placeholders() {
        let session = Session::new(LimitsConfig::default());
        let report = Report::assemble(&session, None);
        let text = report.to_text();

        assert!(text.contains("No user actions recorded."));
        assert!(text.contains("No network activity recorded."));
        assert!(text.contains("No console logs recorded."));
    }

    #[test]
    fn test_json_keys() {
        let report = Report::assemble(&session_with_data(), Some("data:,".to_string()));
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        let object = json.as_object().unwrap();

        assert_eq!(object.len(), 6);
        for key in [
            "screenshotDataUrl",
            "info",
            "consoleLogs",
            "networkCalls",
            "userActions",
            "debuggerWarning",
        ] {
            assert!(object.contains_key(key), "missing key {key}");
        }
        assert_eq!(json["info"]["windowSize"], "1920x1080");
    }

    #[test]
    fn test_object_argument_rendering() {
        let entry = LogEntry {
            kind: crate::record::LogKind::Log,
            timestamp: 0.0,
            formatted_time: "10:00:00".to_string(),
            args: vec![Argument::Object(ObjectArgument {
                class_name: "Object".to_string(),
                description: "Object".to_string(),
                preview: None,
                object_id: Some("obj-1".to_string()),
                properties: Some(vec![PropertyDescriptor {
                    name: "id".to_string(),
                    value: None,
                }]),
                expandable: true,
            })],
            stack_trace: None,
            origin: LogOrigin::Console,
        };

        let mut session = Session::new(LimitsConfig::default());
        session.push_log(entry);
        let text = Report::assemble(&session, None).to_text();

        assert!(text.contains("LOG: {id: undefined}"));
    }
}
