//! The recorder: command surface and event pump of the crate
//!
//! Owns the single [`Session`] behind a mutex and mediates between the
//! command side (start/pause/resume/stop), the event stream delivered by the
//! automation surface, and the presentation/persistence collaborators.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::correlate::Correlator;
use crate::display::now_secs;
use crate::expand::ObjectGraphExpander;
use crate::host::{
    AutomationSurface, Directive, MetadataProvider, Notice, ObserverHandle, Persistence,
    Presentation, TargetInfo,
};
use crate::protocol::{PropertyDescriptor, ProtocolDomain, ProtocolEvent, TargetId};
use crate::report::Report;
use crate::session::{ClientMetadata, Session, SessionSnapshot, SessionState};
use crate::urlinfo;
use crate::{Result, TabrecError};

/// Orchestrates one diagnostic session end to end
///
/// All mutation funnels through the session mutex; spawned console tasks
/// re-acquire it and check the session generation before appending, so a
/// stop/start between spawn and completion silently discards the result.
pub struct Recorder {
    config: Config,
    correlator: Correlator,
    surface: Arc<dyn AutomationSurface>,
    presentation: Arc<dyn Presentation>,
    persistence: Arc<dyn Persistence>,
    metadata_provider: Arc<dyn MetadataProvider>,
    expander: ObjectGraphExpander,
    session: Mutex<Session>,
    handle: Mutex<Option<ObserverHandle>>,
}

impl Recorder {
    /// Wire up a recorder from configuration and collaborators
    #[must_use]
    pub fn new(
        config: Config,
        surface: Arc<dyn AutomationSurface>,
        presentation: Arc<dyn Presentation>,
        persistence: Arc<dyn Persistence>,
        metadata_provider: Arc<dyn MetadataProvider>,
    ) -> Self {
        let correlator = Correlator::new(&config);
        let expander = ObjectGraphExpander::new(
            surface.clone(),
            Duration::from_millis(config.property_fetch_timeout_ms),
        );
        let session = Session::new(config.limits.clone());

        Self {
            config,
            correlator,
            surface,
            presentation,
            persistence,
            metadata_provider,
            expander,
            session: Mutex::new(session),
            handle: Mutex::new(None),
        }
    }

    /// Start recording the given target
    ///
    /// Accepted from any state: a live session is torn down first (old
    /// observer detached, all buffers reset) before the new one begins.
    /// A failed observer attach degrades the session (console/network capture
    /// unavailable, advisory carried into the report) instead of failing it.
    ///
    /// # Errors
    ///
    /// Returns [`TabrecError::InvalidTarget`] for non-recordable URLs (after
    /// surfacing a notice).
    pub async fn start(&self, target: TargetInfo) -> Result<()> {
        if !urlinfo::is_recordable(&target.url) {
            let kind = urlinfo::url_kind(&target.url);
            self.notify_rejected("start", &target.url, kind).await;
            return Err(TabrecError::InvalidTarget {
                action: "start".to_string(),
                url_kind: kind.to_string(),
                url: target.url,
            });
        }

        {
            let mut session = self.session.lock().await;
            if session.is_recording() || session.is_paused() {
                info!("restarting over a live session, previous capture discarded");
                self.detach_current().await;
            }

            session.begin(target.clone(), now_secs());
            info!(target = %target.id, url = %target.url, "recording started");

            match self.surface.attach_observer(target.id).await {
                Ok(handle) => {
                    if let Err(error) = self
                        .surface
                        .enable_domains(handle, ProtocolDomain::ALL)
                        .await
                    {
                        warn!(%error, "could not enable protocol domains");
                        session.attach_warning = Some(format!(
                            "Observer attached but protocol domains failed to enable: {error}. \
                             Console and network capture may be incomplete."
                        ));
                    }
                    *self.handle.lock().await = Some(handle);
                }
                Err(error) => {
                    warn!(%error, "observer attach failed, recording degraded");
                    session.attach_warning = Some(format!(
                        "Observer could not be attached: {error}. \
                         Console and network capture are unavailable for this session."
                    ));
                }
            }

            self.persist(&session).await;
        }

        self.send_directive(target.id, Directive::ShowStopButton)
            .await;
        self.send_directive(target.id, Directive::ShowRecordingController)
            .await;
        Ok(())
    }

    /// Pause the running session, keeping all captured data
    ///
    /// # Errors
    ///
    /// Returns [`TabrecError::InvalidState`] unless the session is recording.
    pub async fn pause(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        if session.state != SessionState::Recording {
            return Err(TabrecError::InvalidState {
                command: "pause",
                state: session.state.as_str(),
            });
        }

        let geo = self.metadata_provider.fetch_geo_info().await;
        session.state = SessionState::Paused;
        Self::refresh_metadata(&mut session, geo.ok().map(|info| info.country_name));
        info!("recording paused");

        self.persist(&session).await;
        drop(session);

        // Detaching while paused saves resources; resume re-attaches
        self.detach_current().await;
        Ok(())
    }

    /// Resume a paused session
    ///
    /// # Errors
    ///
    /// Returns [`TabrecError::InvalidState`] unless the session is paused.
    pub async fn resume(&self) -> Result<()> {
        let target = {
            let mut session = self.session.lock().await;
            if session.state != SessionState::Paused {
                return Err(TabrecError::InvalidState {
                    command: "resume",
                    state: session.state.as_str(),
                });
            }

            session.state = SessionState::Recording;
            info!("recording resumed");
            self.persist(&session).await;
            session.target.clone()
        };

        let Some(target) = target else {
            return Ok(());
        };

        match self.surface.attach_observer(target.id).await {
            Ok(handle) => {
                if let Err(error) = self
                    .surface
                    .enable_domains(handle, ProtocolDomain::ALL)
                    .await
                {
                    warn!(%error, "could not re-enable protocol domains");
                }
                *self.handle.lock().await = Some(handle);
            }
            Err(error) => warn!(%error, "observer re-attach failed after resume"),
        }

        self.send_directive(target.id, Directive::ShowStopButton)
            .await;
        Ok(())
    }

    /// Stop the session and assemble the final report
    ///
    /// # Errors
    ///
    /// Returns [`TabrecError::InvalidState`] unless the session is recording
    /// or paused.
    pub async fn stop(&self, screenshot_data_url: Option<String>) -> Result<Report> {
        let (report, target) = {
            let mut session = self.session.lock().await;
            if !session.is_recording() && !session.is_paused() {
                return Err(TabrecError::InvalidState {
                    command: "stop",
                    state: session.state.as_str(),
                });
            }

            self.detach_current().await;
            let geo = self.metadata_provider.fetch_geo_info().await;
            Self::refresh_metadata(&mut session, geo.ok().map(|info| info.country_name));
            let target = session.target.clone();
            let report = Report::assemble(&session, screenshot_data_url);

            session.end();
            self.expander.clear();
            self.persist(&session).await;
            info!(
                console_entries = report.console_logs.len(),
                network_records = report.network_calls.len(),
                "recording stopped"
            );
            (report, target)
        };

        if let Some(target) = target {
            self.send_directive(target.id, Directive::RemoveStopButton)
                .await;
            self.send_directive(target.id, Directive::ShowPreview).await;
        }

        Ok(report)
    }

    /// Feed one protocol event from the given source target
    ///
    /// Events from other targets and events arriving while paused are
    /// dropped. Console calls are resolved on a spawned task so a slow
    /// property fetch never stalls the event pump.
    pub async fn ingest(self: &Arc<Self>, source: TargetId, event: ProtocolEvent) {
        let mut session = self.session.lock().await;

        if !session.is_recording() {
            return;
        }
        let Some(target) = session.target.clone() else {
            return;
        };
        if target.id != source {
            debug!(source = %source, "event from unobserved target dropped");
            return;
        }

        match event {
            ProtocolEvent::ConsoleApiCalled(call) => {
                let epoch = session.epoch;
                drop(session);

                let recorder = self.clone();
                tokio::spawn(async move {
                    let entry = recorder
                        .correlator
                        .build_console_entry(&recorder.surface, target.id, call)
                        .await;
                    let Some(entry) = entry else { return };

                    let mut session = recorder.session.lock().await;
                    // A newer generation means stop/start raced this fetch
                    if session.epoch == epoch {
                        session.push_log(entry);
                    }
                });
            }
            event => {
                let page_origin = urlinfo::origin(&target.url);
                self.correlator.apply(&mut session, &event, &page_origin);
            }
        }
    }

    /// Record a user interaction description (click, input, navigation)
    pub async fn record_user_action(&self, action: String) {
        let mut session = self.session.lock().await;
        if session.is_recording() {
            session.push_user_action(action);
        }
    }

    /// Track a committed navigation on the observed target
    ///
    /// The session and its buffers survive navigations; the page controls are
    /// re-sent because the new document lost them. Navigating into a
    /// restricted page surfaces a notice but keeps the session alive.
    pub async fn on_navigation_committed(&self, source: TargetId, url: String) {
        let state = {
            let mut session = self.session.lock().await;
            let observed = session
                .target
                .as_ref()
                .is_some_and(|target| target.id == source);
            if !observed || (!session.is_recording() && !session.is_paused()) {
                return;
            }

            if let Some(target) = session.target.as_mut() {
                target.url.clone_from(&url);
            }
            self.persist(&session).await;
            session.state
        };

        if !urlinfo::is_recordable(&url) {
            self.notify_rejected("continue recording", &url, urlinfo::url_kind(&url))
                .await;
            return;
        }

        if state == SessionState::Recording {
            self.send_directive(source, Directive::ShowStopButton).await;
            self.send_directive(source, Directive::ShowRecordingController)
                .await;
        }
    }

    /// Merge client-observed metadata (OS, browser, window size) into the
    /// session
    pub async fn set_client_metadata(&self, metadata: ClientMetadata) {
        let mut session = self.session.lock().await;
        session.metadata = Some(metadata);
    }

    /// Restore a persisted session after process restart
    ///
    /// # Errors
    ///
    /// Returns error when a stored snapshot exists but cannot be read.
    pub async fn restore(&self) -> Result<bool> {
        let Some(snapshot) = self.persistence.load().await? else {
            return Ok(false);
        };

        let mut session = self.session.lock().await;
        session.restore(snapshot);
        info!(state = session.state.as_str(), "session restored");
        Ok(session.state != SessionState::Idle)
    }

    /// Current lifecycle state
    pub async fn state(&self) -> SessionState {
        self.session.lock().await.state
    }

    /// Read-only snapshot of the current session
    pub async fn snapshot(&self) -> SessionSnapshot {
        self.session.lock().await.snapshot()
    }

    /// Loaded configuration
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Expand a remote object reference captured in a console entry
    ///
    /// # Errors
    ///
    /// Returns error when the fetch fails or exceeds the configured budget.
    pub async fn get_object_properties(
        &self,
        target: TargetId,
        object_id: &str,
    ) -> Result<Vec<PropertyDescriptor>> {
        self.expander.expand(target, object_id).await
    }

    fn refresh_metadata(session: &mut Session, country: Option<String>) {
        let mut metadata = session.metadata.take().unwrap_or_default();
        if let Some(target) = &session.target {
            metadata.url.clone_from(&target.url);
        }
        metadata.timestamp = chrono::Utc::now().to_rfc3339();
        match country {
            Some(country) if !country.is_empty() => metadata.country = country,
            _ => {}
        }
        session.metadata = Some(metadata);
    }

    async fn persist(&self, session: &Session) {
        if let Err(error) = self.persistence.save(&session.snapshot()).await {
            warn!(%error, "could not persist session snapshot");
        }
    }

    async fn detach_current(&self) {
        let handle = self.handle.lock().await.take();
        if let Some(handle) = handle {
            if let Err(error) = self.surface.detach_observer(handle).await {
                debug!(%error, "observer detach failed (already gone)");
            }
        }
    }

    async fn send_directive(&self, target: TargetId, directive: Directive) {
        if let Err(error) = self.presentation.send_directive(target, directive).await {
            warn!(?directive, %error, "directive delivery failed");
        }
    }

    async fn notify_rejected(&self, action: &str, url: &str, kind: &str) {
        let notice = Notice {
            title: "Recording Error".to_string(),
            message: format!("Cannot record {kind} pages."),
            url: url.to_string(),
            url_kind: kind.to_string(),
            action_attempted: action.to_string(),
        };
        if let Err(error) = self.presentation.notify(notice).await {
            warn!(%error, "notice delivery failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::GeoInfo;
    use crate::protocol::{ConsoleApiCalled, RemoteObject, RequestInfo, RequestWillBeSent};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    struct FakeSurface {
        attach_fails: AtomicBool,
        attaches: AtomicUsize,
        detaches: AtomicUsize,
        property_delay_ms: AtomicU64,
    }

    impl FakeSurface {
        fn new() -> Self {
            Self {
                attach_fails: AtomicBool::new(false),
                attaches: AtomicUsize::new(0),
                detaches: AtomicUsize::new(0),
                property_delay_ms: AtomicU64::new(0),
            }
        }
    }

    #[async_trait]
    impl AutomationSurface for FakeSurface {
        async fn attach_observer(&self, _target: TargetId) -> Result<ObserverHandle> {
            if self.attach_fails.load(Ordering::SeqCst) {
                return Err(TabrecError::Attach("target is busy".to_string()));
            }
            let n = self.attaches.fetch_add(1, Ordering::SeqCst);
            Ok(ObserverHandle(n as u64 + 1))
        }

        async fn detach_observer(&self, _handle: ObserverHandle) -> Result<()> {
            self.detaches.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn enable_domains(
            &self,
            _handle: ObserverHandle,
            _domains: &[ProtocolDomain],
        ) -> Result<()> {
            Ok(())
        }

        async fn get_properties(
            &self,
            _target: TargetId,
            _object_id: &str,
        ) -> Result<Vec<PropertyDescriptor>> {
            let delay = self.property_delay_ms.load(Ordering::SeqCst);
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            Ok(vec![PropertyDescriptor {
                name: "answer".to_string(),
                value: None,
            }])
        }
    }

    #[derive(Default)]
    struct FakePresentation {
        directives: StdMutex<Vec<Directive>>,
        notices: StdMutex<Vec<Notice>>,
    }

    #[async_trait]
    impl Presentation for FakePresentation {
        async fn send_directive(&self, _target: TargetId, directive: Directive) -> Result<()> {
            self.directives.lock().unwrap().push(directive);
            Ok(())
        }

        async fn notify(&self, notice: Notice) -> Result<()> {
            self.notices.lock().unwrap().push(notice);
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakePersistence {
        saves: AtomicUsize,
        stored: StdMutex<Option<SessionSnapshot>>,
    }

    #[async_trait]
    impl Persistence for FakePersistence {
        async fn save(&self, snapshot: &SessionSnapshot) -> Result<()> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            *self.stored.lock().unwrap() = Some(snapshot.clone());
            Ok(())
        }

        async fn load(&self) -> Result<Option<SessionSnapshot>> {
            Ok(self.stored.lock().unwrap().clone())
        }
    }

    #[derive(Default)]
    struct FakeMetadata {
        geo_calls: AtomicUsize,
    }

    #[async_trait]
    impl MetadataProvider for FakeMetadata {
        async fn fetch_geo_info(&self) -> Result<GeoInfo> {
            self.geo_calls.fetch_add(1, Ordering::SeqCst);
            Ok(GeoInfo {
                country_name: "Germany".to_string(),
            })
        }
    }

    struct Fixture {
        recorder: Arc<Recorder>,
        surface: Arc<FakeSurface>,
        presentation: Arc<FakePresentation>,
        persistence: Arc<FakePersistence>,
        metadata: Arc<FakeMetadata>,
    }

    fn fixture() -> Fixture {
        let surface = Arc::new(FakeSurface::new());
        let presentation = Arc::new(FakePresentation::default());
        let persistence = Arc::new(FakePersistence::default());
        let metadata = Arc::new(FakeMetadata::default());

        let recorder = Arc::new(Recorder::new(
            Config::default(),
            surface.clone(),
            presentation.clone(),
            persistence.clone(),
            metadata.clone(),
        ));

        Fixture {
            recorder,
            surface,
            presentation,
            persistence,
            metadata,
        }
    }

    fn target() -> TargetInfo {
        TargetInfo {
            id: TargetId(7),
            url: "https://app.example.com/dashboard".to_string(),
        }
    }

    async fn settle() {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_start_on_restricted_url_rejected() {
        let fixture = fixture();

        let result = fixture
            .recorder
            .start(TargetInfo {
                id: TargetId(1),
                url: "chrome://settings".to_string(),
            })
            .await;

        assert!(matches!(result, Err(TabrecError::InvalidTarget { .. })));
        assert_eq!(fixture.recorder.state().await, SessionState::Idle);
        let notices = fixture.presentation.notices.lock().unwrap();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].url_kind, "Chrome internal");
    }

    #[tokio::test]
    async fn test_start_attaches_and_shows_controls() {
        let fixture = fixture();

        fixture.recorder.start(target()).await.unwrap();

        assert_eq!(fixture.recorder.state().await, SessionState::Recording);
        assert_eq!(fixture.surface.attaches.load(Ordering::SeqCst), 1);
        assert!(fixture.persistence.saves.load(Ordering::SeqCst) >= 1);

        let directives = fixture.presentation.directives.lock().unwrap();
        assert_eq!(
            *directives,
            vec![Directive::ShowStopButton, Directive::ShowRecordingController]
        );
    }

    #[tokio::test]
    async fn test_restart_resets_buffers_and_reattaches() {
        let fixture = fixture();

        fixture.recorder.start(target()).await.unwrap();
        fixture
            .recorder
            .record_user_action("clicked: Save".to_string())
            .await;

        fixture.recorder.start(target()).await.unwrap();

        // The old observer is released, a fresh one attached, and nothing
        // from the previous capture survives
        assert_eq!(fixture.recorder.state().await, SessionState::Recording);
        assert_eq!(fixture.surface.detaches.load(Ordering::SeqCst), 1);
        assert_eq!(fixture.surface.attaches.load(Ordering::SeqCst), 2);
        assert!(fixture.recorder.snapshot().await.user_actions.is_empty());
    }

    #[tokio::test]
    async fn test_restart_while_paused_resets_buffers() {
        let fixture = fixture();

        fixture.recorder.start(target()).await.unwrap();
        fixture
            .recorder
            .record_user_action("clicked: Save".to_string())
            .await;
        fixture.recorder.pause().await.unwrap();

        fixture.recorder.start(target()).await.unwrap();

        assert_eq!(fixture.recorder.state().await, SessionState::Recording);
        assert!(fixture.recorder.snapshot().await.user_actions.is_empty());
    }

    #[tokio::test]
    async fn test_attach_failure_degrades_with_warning() {
        let fixture = fixture();
        fixture.surface.attach_fails.store(true, Ordering::SeqCst);

        fixture.recorder.start(target()).await.unwrap();
        assert_eq!(fixture.recorder.state().await, SessionState::Recording);

        let report = fixture.recorder.stop(None).await.unwrap();
        let warning = report.debugger_warning.unwrap();
        assert!(warning.contains("could not be attached"));
    }

    #[tokio::test]
    async fn test_pause_resume_cycle() {
        let fixture = fixture();

        fixture.recorder.start(target()).await.unwrap();
        fixture.recorder.pause().await.unwrap();
        assert_eq!(fixture.recorder.state().await, SessionState::Paused);
        assert_eq!(fixture.surface.detaches.load(Ordering::SeqCst), 1);

        // Pausing twice is a state error
        assert!(matches!(
            fixture.recorder.pause().await,
            Err(TabrecError::InvalidState { .. })
        ));

        fixture.recorder.resume().await.unwrap();
        assert_eq!(fixture.recorder.state().await, SessionState::Recording);
        assert_eq!(fixture.surface.attaches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_ingest_drops_other_targets_and_paused() {
        let fixture = fixture();
        fixture.recorder.start(target()).await.unwrap();

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

        // Wrong target
        fixture.recorder.ingest(TargetId(99), event.clone()).await;
        // Paused
        fixture.recorder.pause().await.unwrap();
        fixture.recorder.ingest(TargetId(7), event.clone()).await;

        fixture.recorder.resume().await.unwrap();
        fixture.recorder.ingest(TargetId(7), event).await;

        let report = fixture.recorder.stop(None).await.unwrap();
        // Only the post-resume event opened a record, and it never finished
        assert!(report.network_calls.is_empty());
    }

    #[tokio::test]
    async fn test_console_event_lands_in_log() {
        let fixture = fixture();
        fixture.recorder.start(target()).await.unwrap();

        let event = ProtocolEvent::ConsoleApiCalled(ConsoleApiCalled {
            call_type: "error".to_string(),
            args: vec![RemoteObject {
                object_type: "string".to_string(),
                value: Some(json!("kaboom")),
                ..RemoteObject::default()
            }],
            timestamp: 1_700_000_000.0,
            stack_trace: None,
            execution_context_id: None,
        });
        fixture.recorder.ingest(TargetId(7), event).await;
        settle().await;

        let snapshot = fixture.recorder.snapshot().await;
        assert_eq!(snapshot.console_log.len(), 1);
    }

    #[tokio::test]
    async fn test_stop_assembles_report_and_resets() {
        let fixture = fixture();
        fixture.recorder.start(target()).await.unwrap();
        fixture
            .recorder
            .record_user_action("typed: hello".to_string())
            .await;

        let report = fixture
            .recorder
            .stop(Some("data:image/png;base64,AAAA".to_string()))
            .await
            .unwrap();

        assert_eq!(report.user_actions, vec!["typed: hello".to_string()]);
        assert_eq!(report.info.country, "Germany");
        assert_eq!(report.info.url, "https://app.example.com/dashboard");
        assert_eq!(
            report.screenshot_data_url.as_deref(),
            Some("data:image/png;base64,AAAA")
        );
        assert_eq!(fixture.recorder.state().await, SessionState::Idle);

        let directives = fixture.presentation.directives.lock().unwrap();
        assert!(directives.contains(&Directive::RemoveStopButton));
        assert!(directives.contains(&Directive::ShowPreview));

        drop(directives);
        // Stopping again is a state error
        assert!(matches!(
            fixture.recorder.stop(None).await,
            Err(TabrecError::InvalidState { .. })
        ));
    }

    #[tokio::test]
    async fn test_navigation_keeps_buffers_and_resends_controls() {
        let fixture = fixture();
        fixture.recorder.start(target()).await.unwrap();
        fixture
            .recorder
            .record_user_action("clicked: link".to_string())
            .await;

        fixture
            .recorder
            .on_navigation_committed(TargetId(7), "https://app.example.com/next".to_string())
            .await;

        let snapshot = fixture.recorder.snapshot().await;
        assert_eq!(snapshot.user_actions.len(), 1);
        assert_eq!(
            snapshot.target_url.as_deref(),
            Some("https://app.example.com/next")
        );

        let directives = fixture.presentation.directives.lock().unwrap();
        // Start sent two, navigation re-sent both
        assert_eq!(directives.len(), 4);
    }

    #[tokio::test]
    async fn test_navigation_to_restricted_url_notices() {
        let fixture = fixture();
        fixture.recorder.start(target()).await.unwrap();

        fixture
            .recorder
            .on_navigation_committed(TargetId(7), "about:newtab".to_string())
            .await;

        assert_eq!(fixture.recorder.state().await, SessionState::Recording);
        assert_eq!(fixture.presentation.notices.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_restore_round_trip() {
        let fixture = fixture();
        fixture.recorder.start(target()).await.unwrap();
        fixture
            .recorder
            .record_user_action("clicked: Save".to_string())
            .await;
        fixture.recorder.pause().await.unwrap();

        // Second recorder sharing the persistence backend, as after a restart
        let revived = Arc::new(Recorder::new(
            Config::default(),
            fixture.surface.clone(),
            fixture.presentation.clone(),
            fixture.persistence.clone(),
            Arc::new(FakeMetadata::default()),
        ));

        assert!(revived.restore().await.unwrap());
        assert_eq!(revived.state().await, SessionState::Paused);
        assert_eq!(revived.snapshot().await.user_actions.len(), 1);
    }

    fn slow_object_console_event() -> ProtocolEvent {
        ProtocolEvent::ConsoleApiCalled(ConsoleApiCalled {
            call_type: "log".to_string(),
            args: vec![RemoteObject {
                object_type: "object".to_string(),
                class_name: Some("Object".to_string()),
                object_id: Some("obj-slow".to_string()),
                ..RemoteObject::default()
            }],
            timestamp: 1_700_000_000.0,
            stack_trace: None,
            execution_context_id: None,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_console_fetch_before_pause_lands_after_pause() {
        let fixture = fixture();
        fixture
            .surface
            .property_delay_ms
            .store(500, Ordering::SeqCst);

        fixture.recorder.start(target()).await.unwrap();
        fixture
            .recorder
            .ingest(TargetId(7), slow_object_console_event())
            .await;
        fixture.recorder.pause().await.unwrap();

        // The fetch outlives the pause; its result must still be appended
        tokio::time::sleep(Duration::from_secs(1)).await;
        settle().await;

        let snapshot = fixture.recorder.snapshot().await;
        assert!(snapshot.is_paused);
        assert_eq!(snapshot.console_log.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_console_fetch_discarded_after_stop() {
        let fixture = fixture();
        fixture
            .surface
            .property_delay_ms
            .store(500, Ordering::SeqCst);

        fixture.recorder.start(target()).await.unwrap();
        fixture
            .recorder
            .ingest(TargetId(7), slow_object_console_event())
            .await;
        fixture.recorder.stop(None).await.unwrap();

        tokio::time::sleep(Duration::from_secs(1)).await;
        settle().await;

        // The stop raced the fetch; the stale result is dropped
        assert!(fixture.recorder.snapshot().await.console_log.is_empty());
    }

    #[tokio::test]
    async fn test_stop_while_idle_does_no_external_work() {
        let fixture = fixture();

        let result = fixture.recorder.stop(None).await;

        assert!(matches!(
            result,
            Err(TabrecError::InvalidState {
                command: "stop",
                state: "idle"
            })
        ));
        assert_eq!(fixture.metadata.geo_calls.load(Ordering::SeqCst), 0);
        assert_eq!(fixture.surface.detaches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_pause_while_idle_does_no_external_work() {
        let fixture = fixture();

        assert!(matches!(
            fixture.recorder.pause().await,
            Err(TabrecError::InvalidState { .. })
        ));
        assert_eq!(fixture.metadata.geo_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_object_properties_via_expander() {
        let fixture = fixture();

        let properties = fixture
            .recorder
            .get_object_properties(TargetId(7), "obj-1")
            .await
            .unwrap();

        assert_eq!(properties[0].name, "answer");
    }
}
