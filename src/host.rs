//! Contracts for the external collaborators of the recorder
//!
//! The browser automation surface, the in-page presentation layer, snapshot
//! persistence, and the metadata provider are all consumed through these
//! narrow traits; the recorder itself holds no browser-specific code.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::protocol::{PropertyDescriptor, ProtocolDomain, TargetId};
use crate::Result;

/// Handle to an attached observer, returned by the automation surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverHandle(pub u64);

/// The tab/context a session records, with the URL it was started on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetInfo {
    /// Opaque target handle
    pub id: TargetId,
    /// URL of the page at command time (updated on navigation)
    pub url: String,
}

/// Browser automation surface: attach/detach and remote introspection
///
/// Implementations emit the tagged event stream consumed by
/// [`crate::session::Recorder::ingest`].
#[async_trait]
pub trait AutomationSurface: Send + Sync {
    /// Attach an observer to the target
    ///
    /// # Errors
    ///
    /// Returns [`crate::TabrecError::Attach`] when the target cannot be
    /// observed; the recorder degrades instead of aborting.
    async fn attach_observer(&self, target: TargetId) -> Result<ObserverHandle>;

    /// Detach a previously attached observer
    ///
    /// # Errors
    ///
    /// Returns error when the observer is already gone; callers treat this
    /// as non-fatal.
    async fn detach_observer(&self, handle: ObserverHandle) -> Result<()>;

    /// Enable protocol domains on an attached observer
    ///
    /// # Errors
    ///
    /// Returns error when a domain cannot be enabled.
    async fn enable_domains(&self, handle: ObserverHandle, domains: &[ProtocolDomain])
        -> Result<()>;

    /// Fetch the own properties of a remote object, one level deep
    ///
    /// # Errors
    ///
    /// Returns error when the object's execution context is gone or the
    /// protocol call fails.
    async fn get_properties(
        &self,
        target: TargetId,
        object_id: &str,
    ) -> Result<Vec<PropertyDescriptor>>;
}

/// Directives pushed to the in-page presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// Open the recording preview
    ShowPreview,
    /// Show the floating stop button
    ShowStopButton,
    /// Show the pause/resume controller
    ShowRecordingController,
    /// Remove the floating stop button
    RemoveStopButton,
}

/// User-visible notice for rejected commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Short title
    pub title: String,
    /// Full message
    pub message: String,
    /// URL the command was attempted on
    pub url: String,
    /// Classification of that URL
    pub url_kind: String,
    /// The command that was rejected
    pub action_attempted: String,
}

/// In-page presentation layer
///
/// Delivery is best-effort: the recorder logs failures and carries on.
#[async_trait]
pub trait Presentation: Send + Sync {
    /// Push a directive to the page
    ///
    /// # Errors
    ///
    /// Returns error when the page cannot be reached.
    async fn send_directive(&self, target: TargetId, directive: Directive) -> Result<()>;

    /// Surface a user-visible notice
    ///
    /// # Errors
    ///
    /// Returns error when no UI is available to show the notice.
    async fn notify(&self, notice: Notice) -> Result<()>;
}

/// Snapshot persistence, used to survive process suspension between commands
#[async_trait]
pub trait Persistence: Send + Sync {
    /// Persist the current session snapshot
    ///
    /// # Errors
    ///
    /// Returns error when the snapshot cannot be written.
    async fn save(&self, snapshot: &crate::session::SessionSnapshot) -> Result<()>;

    /// Load the last persisted snapshot, if any
    ///
    /// # Errors
    ///
    /// Returns error when a stored snapshot exists but cannot be read.
    async fn load(&self) -> Result<Option<crate::session::SessionSnapshot>>;
}

/// Geolocation info resolved from the client IP
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeoInfo {
    /// Country name, e.g. `"Germany"`
    pub country_name: String,
}

/// Best-effort client metadata provider
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Resolve geolocation info; failures degrade to `"Unknown"`
    ///
    /// # Errors
    ///
    /// Returns [`crate::TabrecError::Network`] when the lookup fails.
    async fn fetch_geo_info(&self) -> Result<GeoInfo>;
}
