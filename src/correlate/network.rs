//! Network request lifecycle correlation
//!
//! Matches `requestWillBeSent` / `responseReceived` / `dataReceived` /
//! `loadingFinished` / `loadingFailed` events sharing a request id into one
//! [`NetworkRecord`]. Records live in the session's in-flight index until a
//! terminal event moves them into the finalized log; lifecycle events for
//! unknown request ids are ignored silently (already finalized, or the
//! request predates the session).

use tracing::{debug, warn};

use crate::display::{format_bytes, format_duration_label};
use crate::protocol::{
    DataReceived, LoadingFailed, LoadingFinished, RequestWillBeSent, ResponseReceived,
};
use crate::record::{
    LogEntry, LogOrigin, NetworkRecord, STATUS_ABORTED, STATUS_CACHED_OK, STATUS_CORS_ERROR,
    STATUS_LOCAL_OTHER, STATUS_PENDING, STATUS_PREFLIGHT,
};
use crate::sanitize::HeaderSanitizer;
use crate::session::Session;
use crate::urlinfo;

const PREFLIGHT_REQUEST_HEADER: &str = "access-control-request-method";
const CORS_ALLOW_HEADER: &str = "access-control-allow-origin";
const PREFLIGHT_OK_TEXT: &str = "OK (Preflight)";

/// Exact message of the synthetic CORS console entry
#[must_use]
pub fn cors_message(url: &str, origin: &str) -> String {
    format!(
        "Access to resource at '{url}' from origin '{origin}' has been blocked by CORS policy: \
         Response to preflight request doesn't pass access control check: \
         No 'Access-Control-Allow-Origin' header is present on the requested resource."
    )
}

fn has_header(headers: &std::collections::BTreeMap<String, String>, name: &str) -> bool {
    headers.keys().any(|key| key.eq_ignore_ascii_case(name))
}

/// Handle `requestWillBeSent`: open a new in-flight record, or fold a
/// redirect hop into the existing one
pub fn on_request_sent(session: &mut Session, event: &RequestWillBeSent, sanitizer: &HeaderSanitizer) {
    let request = &event.request;

    if let Some(record) = session.network_index.get_mut(&event.request_id) {
        // Redirect hop: new location, same record; size and timing carry over
        record.url = request.url.clone();
        record.name = urlinfo::file_name(&request.url);
        record.method = request.method.clone();
        record.domain = urlinfo::domain(&request.url);
        debug!(request_id = %event.request_id, url = %request.url, "redirect hop");
        return;
    }

    let is_options = request.method == "OPTIONS";
    let status = if is_options {
        STATUS_PREFLIGHT
    } else {
        STATUS_PENDING
    };

    let record = NetworkRecord {
        id: event.request_id.clone(),
        name: urlinfo::file_name(&request.url),
        url: request.url.clone(),
        method: request.method.clone(),
        status: status.to_string(),
        domain: urlinfo::domain(&request.url),
        resource_type: event
            .resource_type
            .clone()
            .unwrap_or_else(|| "Other".to_string()),
        frame: event
            .initiator
            .as_ref()
            .and_then(|initiator| initiator.url.clone())
            .unwrap_or_default(),
        size_bytes: 0,
        duration_secs: 0.0,
        started_at_ms: event.timestamp * 1000.0,
        first_byte_at_ms: 0.0,
        finished_at_ms: 0.0,
        request_headers: sanitizer.sanitize(&request.headers),
        response_headers: std::collections::BTreeMap::new(),
        cors_error: false,
        is_preflight: is_options && has_header(&request.headers, PREFLIGHT_REQUEST_HEADER),
        display_size: String::new(),
        display_time: String::new(),
    };

    session.network_index.insert(event.request_id.clone(), record);
}

/// Handle `responseReceived`: resolve the status string and response headers
pub fn on_response_received(
    session: &mut Session,
    event: &ResponseReceived,
    sanitizer: &HeaderSanitizer,
) {
    let Some(record) = session.network_index.get_mut(&event.request_id) else {
        debug!(request_id = %event.request_id, "responseReceived for unknown request");
        return;
    };

    let response = &event.response;

    // Missing status on a preflight that carries CORS-allow headers counts as
    // a success; any other missing status becomes 0/Unknown
    let (status, status_text) = match response.status {
        Some(status) => (
            status,
            response.status_text.clone().unwrap_or_default(),
        ),
        None => {
            if record.method == "OPTIONS" && has_header(&response.headers, CORS_ALLOW_HEADER) {
                (200, PREFLIGHT_OK_TEXT.to_string())
            } else {
                (0, "Unknown".to_string())
            }
        }
    };

    record.status = if status_text.is_empty() {
        status.to_string()
    } else {
        format!("{status} {status_text}")
    };

    record.response_headers = sanitizer.sanitize(&response.headers);
    if let Some(resource_type) = &event.resource_type {
        record.resource_type.clone_from(resource_type);
    }
    record.first_byte_at_ms = event.timestamp * 1000.0;

    // A zero status without the preflight-success marker is a CORS failure
    // the network layer could not label any better
    if status == 0 && status_text != PREFLIGHT_OK_TEXT {
        record.cors_error = true;
        record.status = STATUS_CORS_ERROR.to_string();
    }
}

/// Handle `dataReceived`: accumulate chunk sizes, never overwrite
pub fn on_data_received(session: &mut Session, event: &DataReceived) {
    let Some(record) = session.network_index.get_mut(&event.request_id) else {
        debug!(request_id = %event.request_id, "dataReceived for unknown request");
        return;
    };

    record.size_bytes += event.encoded_data_length;
}

/// Handle `loadingFinished`: finalize the record as a completion
pub fn on_loading_finished(session: &mut Session, event: &LoadingFinished) {
    let Some(mut record) = session.network_index.remove(&event.request_id) else {
        debug!(request_id = %event.request_id, "loadingFinished for unknown request");
        return;
    };

    close_timing(&mut record, event.timestamp);

    if record.has_placeholder_status() {
        // No responseReceived ever arrived: served from cache
        record.status = STATUS_CACHED_OK.to_string();
    } else if !record.status.contains(STATUS_CORS_ERROR) && record.status.starts_with('0') {
        record.status = STATUS_LOCAL_OTHER.to_string();
    }

    // An explicit non-zero total wins over the accumulated chunk sizes
    if let Some(length) = event.encoded_data_length {
        if length > 0 {
            record.size_bytes = length;
        }
    }

    finalize(session, record);
}

/// Handle `loadingFailed`: finalize the record as a failure, escalating to a
/// CORS classification (and a synthetic console entry) when warranted
pub fn on_loading_failed(session: &mut Session, event: &LoadingFailed, page_origin: &str) {
    let Some(mut record) = session.network_index.remove(&event.request_id) else {
        debug!(request_id = %event.request_id, "loadingFailed for unknown request");
        return;
    };

    close_timing(&mut record, event.timestamp);

    let reason = event.error_text.clone().unwrap_or_default();
    record.status = format!("Failed ({reason})");

    let blocked_by_cors = event.blocked_reason.as_deref() == Some("cors")
        || reason.contains("CORS")
        || (reason.contains("net::ERR_FAILED") && record.method == "OPTIONS");

    if blocked_by_cors {
        record.cors_error = true;
        record.status = format!("{STATUS_CORS_ERROR} ({reason})");

        // Keep the console view consistent with the network view
        let message = cors_message(&record.url, page_origin);
        warn!(url = %record.url, reason = %reason, "request blocked by CORS");
        session.push_log(LogEntry::synthetic(
            LogOrigin::Synthetic,
            message,
            event.timestamp,
        ));
    } else if reason.contains("net::ERR_ABORTED") {
        record.status = STATUS_ABORTED.to_string();
    }

    finalize(session, record);
}

fn close_timing(record: &mut NetworkRecord, timestamp_secs: f64) {
    record.finished_at_ms = timestamp_secs * 1000.0;
    let duration = (record.finished_at_ms - record.started_at_ms) / 1000.0;
    record.duration_secs = (duration * 1000.0).round() / 1000.0;
}

fn finalize(session: &mut Session, mut record: NetworkRecord) {
    record.display_size = format_bytes(record.size_bytes);
    record.display_time = format_duration_label(record.duration_secs, &record.status);

    if record.resource_type == "Other" && record.method == "OPTIONS" && record.is_preflight {
        record.resource_type = "preflight".to_string();
    }

    debug!(
        request_id = %record.id,
        status = %record.status,
        size = %record.display_size,
        "request finalized"
    );

    session.push_network(record);
}
