//! Typed protocol event stream
//!
//! The automation surface delivers dynamically-shaped `{method, params}`
//! envelopes. They are decoded here, once, into a closed tagged union so the
//! rest of the crate matches exhaustively and never touches untyped fields.
//! Unknown methods and absent fields are tolerated: this is an external,
//! versioned protocol.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Identifier of one logical request, reused across its redirect chain
pub type RequestId = String;

/// Opaque handle for the tab/context being observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetId(pub u64);

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Protocol domains enabled on an attached observer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolDomain {
    /// Console API and remote object introspection
    Runtime,
    /// Structured browser log entries
    Log,
    /// Request/response lifecycle
    Network,
    /// Security state changes (CORS backstop)
    Security,
    /// Page-level events (dialogs)
    Page,
}

impl ProtocolDomain {
    /// All domains the recorder enables on attach
    pub const ALL: &'static [ProtocolDomain] = &[
        ProtocolDomain::Runtime,
        ProtocolDomain::Log,
        ProtocolDomain::Network,
        ProtocolDomain::Security,
        ProtocolDomain::Page,
    ];

    /// Protocol name of the domain
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ProtocolDomain::Runtime => "Runtime",
            ProtocolDomain::Log => "Log",
            ProtocolDomain::Network => "Network",
            ProtocolDomain::Security => "Security",
            ProtocolDomain::Page => "Page",
        }
    }
}

/// One stack frame of a captured call stack
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CallFrame {
    /// Function name, empty for anonymous frames
    pub function_name: String,
    /// Script URL
    pub url: String,
    /// Zero-based line number
    pub line_number: i64,
    /// Zero-based column number
    pub column_number: i64,
}

/// Captured call stack attached to a console call or log entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StackTrace {
    /// Optional label
    pub description: Option<String>,
    /// Frames, innermost first
    pub call_frames: Vec<CallFrame>,
}

/// Shallow preview of a remote object, usable without a live context
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ObjectPreview {
    /// Preview description
    pub description: Option<String>,
    /// Whether the preview was truncated
    pub overflow: bool,
    /// Previewed properties (values already stringified by the protocol)
    pub properties: Vec<PreviewProperty>,
}

/// One property inside an [`ObjectPreview`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PreviewProperty {
    /// Property name
    pub name: String,
    /// Value type tag
    #[serde(rename = "type")]
    pub value_type: String,
    /// Stringified value
    pub value: Option<String>,
    /// Subtype refinement (array, null, ...)
    pub subtype: Option<String>,
}

/// A value reference returned by the remote runtime
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RemoteObject {
    /// Type tag: string, number, boolean, object, function, undefined, symbol
    #[serde(rename = "type")]
    pub object_type: String,
    /// Subtype refinement for objects (array, null, ...)
    pub subtype: Option<String>,
    /// Constructor name for objects
    pub class_name: Option<String>,
    /// Primitive value, when representable
    pub value: Option<serde_json::Value>,
    /// Human-readable description
    pub description: Option<String>,
    /// Opaque remote reference; only valid while the originating context lives
    pub object_id: Option<String>,
    /// Shallow preview, when the protocol generated one
    pub preview: Option<ObjectPreview>,
}

/// One property from a remote property introspection call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PropertyDescriptor {
    /// Property name
    pub name: String,
    /// Property value, absent for accessor-only properties
    pub value: Option<RemoteObject>,
}

/// `Runtime.consoleAPICalled` parameters
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConsoleApiCalled {
    /// Console call kind: log, warn, error, info, debug, ...
    #[serde(rename = "type")]
    pub call_type: String,
    /// Call arguments
    pub args: Vec<RemoteObject>,
    /// Epoch seconds
    pub timestamp: f64,
    /// Captured call stack
    pub stack_trace: Option<StackTrace>,
    /// Originating execution context
    pub execution_context_id: Option<i64>,
}

/// The `entry` payload of `Log.entryAdded`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LogDomainEntry {
    /// Severity level: verbose, info, warning, error
    pub level: String,
    /// Entry text
    pub text: String,
    /// Epoch milliseconds
    pub timestamp: f64,
    /// Captured call stack
    pub stack_trace: Option<StackTrace>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct LogEntryAddedParams {
    entry: Option<LogDomainEntry>,
}

/// One explanation inside `Security.securityStateChanged`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SecurityExplanation {
    /// Explanation text, scanned for the CORS marker
    pub description: Option<String>,
}

/// `Security.securityStateChanged` parameters
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SecurityStateChanged {
    /// Overall security state
    pub security_state: Option<String>,
    /// Individual explanations
    pub explanations: Vec<SecurityExplanation>,
}

/// `Page.javascriptDialogOpening` parameters
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DialogOpening {
    /// Dialog kind (alert, confirm, ...)
    #[serde(rename = "type")]
    pub dialog_type: Option<String>,
    /// Dialog message, scanned for the CORS marker
    pub message: Option<String>,
}

/// The `request` payload of `Network.requestWillBeSent`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RequestInfo {
    /// Request URL
    pub url: String,
    /// HTTP method
    pub method: String,
    /// Request headers
    pub headers: BTreeMap<String, String>,
}

/// Request initiator info
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Initiator {
    /// URL of the initiating frame/script
    pub url: Option<String>,
}

/// `Network.requestWillBeSent` parameters
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RequestWillBeSent {
    /// Request identifier
    pub request_id: RequestId,
    /// The outgoing request
    pub request: RequestInfo,
    /// Epoch seconds
    pub timestamp: f64,
    /// Resource type (Document, Script, XHR, ...)
    #[serde(rename = "type")]
    pub resource_type: Option<String>,
    /// Initiator of the request
    pub initiator: Option<Initiator>,
}

/// The `response` payload of `Network.responseReceived`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResponseInfo {
    /// Numeric status; may be absent for preflight/opaque responses
    pub status: Option<u32>,
    /// Status text; may be absent
    pub status_text: Option<String>,
    /// Response headers
    pub headers: BTreeMap<String, String>,
    /// MIME type
    pub mime_type: Option<String>,
}

/// `Network.responseReceived` parameters
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResponseReceived {
    /// Request identifier
    pub request_id: RequestId,
    /// The received response
    pub response: ResponseInfo,
    /// Epoch seconds
    pub timestamp: f64,
    /// Resource type refinement
    #[serde(rename = "type")]
    pub resource_type: Option<String>,
}

/// `Network.dataReceived` parameters
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DataReceived {
    /// Request identifier
    pub request_id: RequestId,
    /// Encoded (wire) bytes in this chunk
    pub encoded_data_length: u64,
}

/// `Network.loadingFinished` parameters
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoadingFinished {
    /// Request identifier
    pub request_id: RequestId,
    /// Epoch seconds
    pub timestamp: f64,
    /// Total encoded length; zero/absent means "use the accumulated size"
    pub encoded_data_length: Option<u64>,
}

/// `Network.loadingFailed` parameters
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoadingFailed {
    /// Request identifier
    pub request_id: RequestId,
    /// Epoch seconds
    pub timestamp: f64,
    /// Failure reason text, e.g. `net::ERR_FAILED`
    pub error_text: Option<String>,
    /// Explicit block reason, e.g. `cors`
    pub blocked_reason: Option<String>,
}

/// Closed union of all protocol events the correlator understands
#[derive(Debug, Clone)]
pub enum ProtocolEvent {
    /// A console API invocation
    ConsoleApiCalled(ConsoleApiCalled),
    /// A structured browser log entry
    LogEntryAdded(LogDomainEntry),
    /// A security state change
    SecurityStateChanged(SecurityStateChanged),
    /// A JavaScript dialog opening
    JavascriptDialogOpening(DialogOpening),
    /// A request going out (also fired per redirect hop)
    RequestWillBeSent(RequestWillBeSent),
    /// Response headers received
    ResponseReceived(ResponseReceived),
    /// A response body chunk received
    DataReceived(DataReceived),
    /// Request completed successfully
    LoadingFinished(LoadingFinished),
    /// Request failed or was blocked
    LoadingFailed(LoadingFailed),
}

/// Raw `{method, params}` envelope as delivered by the automation surface
#[derive(Debug, Clone, Deserialize)]
pub struct EventEnvelope {
    /// Protocol method name, e.g. `Network.requestWillBeSent`
    pub method: String,
    /// Untyped parameters, decoded by [`ProtocolEvent::decode`]
    #[serde(default)]
    pub params: serde_json::Value,
}

impl ProtocolEvent {
    /// Decode a raw envelope into a typed event
    ///
    /// Returns `Ok(None)` for methods the recorder does not consume.
    ///
    /// # Errors
    ///
    /// Returns error when the params of a known method fail to deserialize.
    pub fn decode(method: &str, params: serde_json::Value) -> Result<Option<Self>> {
        let event = match method {
            "Runtime.consoleAPICalled" => {
                Some(Self::ConsoleApiCalled(serde_json::from_value(params)?))
            }
            "Log.entryAdded" => {
                let wrapper: LogEntryAddedParams = serde_json::from_value(params)?;
                wrapper.entry.map(Self::LogEntryAdded)
            }
            "Security.securityStateChanged" => {
                Some(Self::SecurityStateChanged(serde_json::from_value(params)?))
            }
            "Page.javascriptDialogOpening" => {
                Some(Self::JavascriptDialogOpening(serde_json::from_value(params)?))
            }
            "Network.requestWillBeSent" => {
                Some(Self::RequestWillBeSent(serde_json::from_value(params)?))
            }
            "Network.responseReceived" => {
                Some(Self::ResponseReceived(serde_json::from_value(params)?))
            }
            "Network.dataReceived" => Some(Self::DataReceived(serde_json::from_value(params)?)),
            "Network.loadingFinished" => {
                Some(Self::LoadingFinished(serde_json::from_value(params)?))
            }
            "Network.loadingFailed" => Some(Self::LoadingFailed(serde_json::from_value(params)?)),
            _ => None,
        };

        Ok(event)
    }

    /// Decode a raw envelope
    ///
    /// # Errors
    ///
    /// Returns error when the params of a known method fail to deserialize.
    pub fn from_envelope(envelope: EventEnvelope) -> Result<Option<Self>> {
        Self::decode(&envelope.method, envelope.params)
    }
}
