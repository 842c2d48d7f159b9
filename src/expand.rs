//! On-demand object graph expansion
//!
//! Console arguments carry opaque remote references; expanding one means a
//! protocol round trip. Results are cached per object id so repeated
//! expansions of the same object cost one fetch. Failures are not cached,
//! a later retry may succeed once the page settles.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;

use crate::host::AutomationSurface;
use crate::protocol::{PropertyDescriptor, RemoteObject, TargetId};
use crate::{Result, TabrecError};

/// Properties shown before an object rendering is truncated
const RENDER_PROPERTY_CAP: usize = 5;

/// Cache-backed property fetcher for remote object references
pub struct ObjectGraphExpander {
    surface: Arc<dyn AutomationSurface>,
    cache: DashMap<String, Vec<PropertyDescriptor>>,
    timeout: Duration,
}

impl ObjectGraphExpander {
    /// Create an expander over the given surface
    #[must_use]
    pub fn new(surface: Arc<dyn AutomationSurface>, timeout: Duration) -> Self {
        Self {
            surface,
            cache: DashMap::new(),
            timeout,
        }
    }

    /// Fetch (or serve from cache) the own properties of a remote object
    ///
    /// # Errors
    ///
    /// Returns [`TabrecError::PropertyFetchTimeout`] when the fetch exceeds
    /// the configured budget, or the surface error when the fetch fails. The
    /// failed id stays uncached.
    pub async fn expand(
        &self,
        target: TargetId,
        object_id: &str,
    ) -> Result<Vec<PropertyDescriptor>> {
        if let Some(cached) = self.cache.get(object_id) {
            return Ok(cached.clone());
        }

        let properties =
            tokio::time::timeout(self.timeout, self.surface.get_properties(target, object_id))
                .await
                .map_err(|_| TabrecError::PropertyFetchTimeout {
                    timeout_ms: self.timeout.as_millis() as u64,
                })??;

        self.cache
            .insert(object_id.to_string(), properties.clone());
        Ok(properties)
    }

    /// Drop all cached expansions (the originating contexts are gone)
    pub fn clear(&self) {
        self.cache.clear();
    }
}

/// Render one property value as a short display string
#[must_use]
pub fn render_property(value: Option<&RemoteObject>) -> String {
    let Some(object) = value else {
        return "undefined".to_string();
    };

    match object.object_type.as_str() {
        "string" => {
            let text = object
                .value
                .as_ref()
                .and_then(|value| value.as_str())
                .unwrap_or_default();
            format!("\"{text}\"")
        }
        "number" | "boolean" => object
            .value
            .as_ref()
            .map(std::string::ToString::to_string)
            .unwrap_or_else(|| "undefined".to_string()),
        "function" => object
            .description
            .clone()
            .unwrap_or_else(|| "function()".to_string()),
        "undefined" => "undefined".to_string(),
        "object" => {
            if object.subtype.as_deref() == Some("null") {
                return "null".to_string();
            }
            if object.subtype.as_deref() == Some("array") {
                // "Array(3)" style descriptions pass through as-is
                if let Some(description) = &object.description {
                    return description.clone();
                }
            }
            object
                .class_name
                .clone()
                .or_else(|| object.description.clone())
                .unwrap_or_else(|| "Object".to_string())
        }
        _ => object
            .description
            .clone()
            .unwrap_or_else(|| "[Unknown]".to_string()),
    }
}

/// Render an expanded object as `{a: 1, b: "x", ... (2 more)}`
#[must_use]
pub fn render_object(properties: &[PropertyDescriptor]) -> String {
    let mut parts: Vec<String> = properties
        .iter()
        .take(RENDER_PROPERTY_CAP)
        .map(|property| format!("{}: {}", property.name, render_property(property.value.as_ref())))
        .collect();

    if properties.len() > RENDER_PROPERTY_CAP {
        parts.push(format!("... ({} more)", properties.len() - RENDER_PROPERTY_CAP));
    }

    format!("{{{}}}", parts.join(", "))
}
