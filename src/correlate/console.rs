//! Console, log-domain, and security/dialog capture paths

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tracing::{debug, warn};

use crate::display::{format_clock_time, now_secs};
use crate::host::AutomationSurface;
use crate::protocol::{
    ConsoleApiCalled, DialogOpening, LogDomainEntry, RemoteObject, SecurityStateChanged, TargetId,
};
use crate::record::{Argument, LogEntry, LogKind, LogOrigin, ObjectArgument};

/// Substring that marks a security/dialog message as CORS-related
const CORS_MARKER: &str = "CORS";

/// Build a [`LogEntry`] from a console API call
///
/// Arguments are processed concurrently; each remote-object argument gets
/// one bounded property fetch, and a timeout or failure degrades that single
/// argument to its preview representation. Returns `None` for console calls
/// without arguments.
pub async fn build_console_entry(
    surface: &Arc<dyn AutomationSurface>,
    target: TargetId,
    event: ConsoleApiCalled,
    fetch_timeout: Duration,
) -> Option<LogEntry> {
    if event.args.is_empty() {
        debug!(call_type = %event.call_type, "console call without arguments, skipped");
        return None;
    }

    let args = join_all(
        event
            .args
            .into_iter()
            .map(|arg| process_argument(surface, target, arg, fetch_timeout)),
    )
    .await;

    Some(LogEntry {
        kind: LogKind::from_protocol(&event.call_type),
        timestamp: event.timestamp,
        formatted_time: format_clock_time(event.timestamp),
        args,
        stack_trace: event.stack_trace,
        origin: LogOrigin::Console,
    })
}

/// Convert one raw remote object into a typed argument
///
/// Never fails: every degradation path yields a renderable variant.
async fn process_argument(
    surface: &Arc<dyn AutomationSurface>,
    target: TargetId,
    arg: RemoteObject,
    fetch_timeout: Duration,
) -> Argument {
    match arg.object_type.as_str() {
        "object" if arg.object_id.is_some() => {
            let object_id = arg.object_id.clone().unwrap_or_default();

            let properties =
                match tokio::time::timeout(fetch_timeout, surface.get_properties(target, &object_id))
                    .await
                {
                    Ok(Ok(properties)) => Some(properties),
                    Ok(Err(error)) => {
                        warn!(%object_id, %error, "property fetch failed, using preview");
                        None
                    }
                    Err(_) => {
                        warn!(
                            %object_id,
                            timeout_ms = fetch_timeout.as_millis() as u64,
                            "property fetch timed out, using preview"
                        );
                        None
                    }
                };

            Argument::Object(ObjectArgument {
                class_name: arg.class_name.unwrap_or_else(|| "Object".to_string()),
                description: arg.description.unwrap_or_default(),
                preview: arg.preview,
                object_id: Some(object_id),
                properties,
                expandable: true,
            })
        }
        "function" => Argument::Function {
            description: arg
                .description
                .unwrap_or_else(|| "function()".to_string()),
        },
        "string" => Argument::String {
            value: arg
                .value
                .as_ref()
                .and_then(|value| value.as_str().map(str::to_string))
                .unwrap_or_default(),
        },
        "number" => Argument::Number {
            value: arg.value.unwrap_or(serde_json::Value::Null),
        },
        "boolean" => Argument::Boolean {
            value: arg
                .value
                .as_ref()
                .and_then(serde_json::Value::as_bool)
                .unwrap_or_default(),
        },
        "undefined" => Argument::Undefined,
        "symbol" => Argument::Symbol {
            description: arg
                .description
                .unwrap_or_else(|| "Symbol()".to_string()),
        },
        _ => Argument::Unknown {
            value: unknown_value(&arg),
            expandable: arg.object_id.is_some(),
        },
    }
}

fn unknown_value(arg: &RemoteObject) -> String {
    if let Some(value) = &arg.value {
        match value.as_str() {
            Some(text) => return text.to_string(),
            None if !value.is_null() => return value.to_string(),
            None => {}
        }
    }
    arg.description
        .clone()
        .unwrap_or_else(|| "[Unknown]".to_string())
}

/// Build a [`LogEntry`] from a structured log-domain record
///
/// The cheap path: no remote references, a single string argument.
#[must_use]
pub fn build_log_domain_entry(entry: LogDomainEntry) -> LogEntry {
    let timestamp_secs = entry.timestamp / 1000.0;

    LogEntry {
        kind: LogKind::from_protocol(&entry.level),
        timestamp: timestamp_secs,
        formatted_time: format_clock_time(timestamp_secs),
        args: vec![Argument::String { value: entry.text }],
        stack_trace: entry.stack_trace,
        origin: LogOrigin::LogDomain,
    }
}

/// Scan a security state change for CORS explanations
///
/// Synthesizes one error entry per CORS-marked explanation; this backstops
/// cases the network layer alone cannot prove.
#[must_use]
pub fn scan_security_state(event: &SecurityStateChanged) -> Vec<LogEntry> {
    event
        .explanations
        .iter()
        .filter_map(|explanation| explanation.description.as_deref())
        .filter(|description| description.contains(CORS_MARKER))
        .map(|description| {
            LogEntry::synthetic(
                LogOrigin::SecurityState,
                format!("Security Error: {description}"),
                now_secs(),
            )
        })
        .collect()
}

/// Scan an opening dialog for a CORS-related message
#[must_use]
pub fn scan_dialog(event: &DialogOpening) -> Option<LogEntry> {
    let message = event.message.as_deref()?;
    if !message.contains(CORS_MARKER) {
        return None;
    }

    Some(LogEntry::synthetic(
        LogOrigin::PageDialog,
        format!("Page Dialog Error: {message}"),
        now_secs(),
    ))
}
