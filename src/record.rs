//! Captured record types: console log entries and network records

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::protocol::{ObjectPreview, PropertyDescriptor, RequestId, StackTrace};

/// Placeholder status for a request without a response yet
pub const STATUS_PENDING: &str = "Pending...";
/// Placeholder status for an in-flight OPTIONS request
pub const STATUS_PREFLIGHT: &str = "Preflight...";
/// Terminal status for a request blocked by CORS
pub const STATUS_CORS_ERROR: &str = "CORS ERROR";
/// Terminal status for a request completed from cache without a response event
pub const STATUS_CACHED_OK: &str = "200 OK (Cached)";
/// Terminal status for a zero-status completion that is not a CORS failure
pub const STATUS_LOCAL_OTHER: &str = "Completed (Local/Other)";
/// Terminal status for an explicitly aborted request
pub const STATUS_ABORTED: &str = "Aborted";

/// Severity of a console log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    /// Plain log
    Log,
    /// Warning
    Warn,
    /// Error
    Error,
    /// Informational
    Info,
    /// Debug/verbose
    Debug,
}

impl LogKind {
    /// Map a protocol level string onto a kind; unknown levels become `Log`
    #[must_use]
    pub fn from_protocol(level: &str) -> Self {
        match level {
            "warn" | "warning" => LogKind::Warn,
            "error" | "assert" => LogKind::Error,
            "info" => LogKind::Info,
            "debug" | "verbose" => LogKind::Debug,
            _ => LogKind::Log,
        }
    }

    /// Lowercase name of the kind
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LogKind::Log => "log",
            LogKind::Warn => "warn",
            LogKind::Error => "error",
            LogKind::Info => "info",
            LogKind::Debug => "debug",
        }
    }
}

/// Which capture path produced a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogOrigin {
    /// Native console API call
    Console,
    /// Structured log-domain entry
    LogDomain,
    /// Synthesized from a security state change
    SecurityState,
    /// Synthesized from a page dialog message
    PageDialog,
    /// Synthesized by the CORS escalation path
    Synthetic,
}

/// A console argument carrying a remote object reference
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ObjectArgument {
    /// Constructor name, `"Object"` when the protocol omitted it
    pub class_name: String,
    /// Protocol description string
    pub description: String,
    /// Shallow preview, kept for degraded rendering
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<ObjectPreview>,
    /// Remote reference for lazy expansion; dies with its execution context
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    /// Eagerly fetched top-level properties; `None` when the fetch degraded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<Vec<PropertyDescriptor>>,
    /// Whether the UI may expand this argument further
    pub expandable: bool,
}

/// One console-call parameter, closed over the representable variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Argument {
    /// String value
    String {
        /// The string
        value: String,
    },
    /// Numeric value, kept as the protocol delivered it
    Number {
        /// Raw protocol value
        value: serde_json::Value,
    },
    /// Boolean value
    Boolean {
        /// The boolean
        value: bool,
    },
    /// The undefined value
    Undefined,
    /// A symbol, represented by its description
    Symbol {
        /// Symbol description
        description: String,
    },
    /// A function, represented by its description
    Function {
        /// Function source preview
        description: String,
    },
    /// A remote object reference
    Object(ObjectArgument),
    /// Anything the closed set does not cover
    Unknown {
        /// Best-effort rendering of the value
        value: String,
        /// Whether a remote reference was attached
        expandable: bool,
    },
}

impl Argument {
    /// Whether the UI may expand this argument
    #[must_use]
    pub fn is_expandable(&self) -> bool {
        match self {
            Argument::Object(object) => object.expandable,
            Argument::Unknown { expandable, .. } => *expandable,
            _ => false,
        }
    }
}

/// One captured console/log emission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Severity
    pub kind: LogKind,
    /// Epoch seconds
    pub timestamp: f64,
    /// Local clock time, `HH:MM:SS`
    pub formatted_time: String,
    /// Processed arguments; synthetic entries carry exactly one string
    pub args: Vec<Argument>,
    /// Captured call stack, when the protocol provided one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<StackTrace>,
    /// Capture path that produced the entry
    pub origin: LogOrigin,
}

impl LogEntry {
    /// Build a synthetic single-string entry (CORS/security backstops)
    #[must_use]
    pub fn synthetic(origin: LogOrigin, message: String, timestamp_secs: f64) -> Self {
        Self {
            kind: LogKind::Error,
            timestamp: timestamp_secs,
            formatted_time: crate::display::format_clock_time(timestamp_secs),
            args: vec![Argument::String { value: message }],
            stack_trace: None,
            origin,
        }
    }
}

/// One logical request/response/redirect chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkRecord {
    /// Request identifier (stable across redirects)
    pub id: RequestId,
    /// Display file name derived from the URL
    pub name: String,
    /// Final URL (updated in place on redirects)
    pub url: String,
    /// HTTP method
    pub method: String,
    /// Status display string; placeholder until finalized
    pub status: String,
    /// Host name
    pub domain: String,
    /// Resource type (Document, Script, XHR, preflight, ...)
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Initiating frame/script URL, empty when unknown
    pub frame: String,
    /// Accumulated encoded size in bytes
    pub size_bytes: u64,
    /// Total duration in seconds, three decimals
    pub duration_secs: f64,
    /// When the request went out, epoch milliseconds
    pub started_at_ms: f64,
    /// When response headers arrived, epoch milliseconds (0 until then)
    pub first_byte_at_ms: f64,
    /// When loading finished or failed, epoch milliseconds (0 until then)
    pub finished_at_ms: f64,
    /// Sanitized request headers
    pub request_headers: BTreeMap<String, String>,
    /// Sanitized response headers
    pub response_headers: BTreeMap<String, String>,
    /// Whether the request was classified as a CORS failure
    pub cors_error: bool,
    /// Whether the request is a CORS preflight
    pub is_preflight: bool,
    /// Human-readable size, filled at finalization
    pub display_size: String,
    /// Human-readable duration, filled at finalization
    pub display_time: String,
}

impl NetworkRecord {
    /// Whether the status is still one of the in-flight placeholders
    #[must_use]
    pub fn has_placeholder_status(&self) -> bool {
        self.status == STATUS_PENDING || self.status == STATUS_PREFLIGHT
    }
}
