//! Tracking Engine
//!
//! Single owner of every store. One task receives user commands, feed
//! completions and timer ticks, applies them one at a time, and publishes
//! a fresh [`ViewSnapshot`] after each change. Fetches run as spawned tasks
//! and report back through the completion channel, so no I/O ever blocks
//! the loop.

use crate::catalog::{decode_objects, find_object, CatalogStore, TrackedObject};
use crate::config::TrackingConfig;
use crate::feeds::TrackingFeeds;
use crate::filter::{compute_display_set, render_points, DisplayInputs, DisplayPoint, FilterState};
use crate::grouping::{group_counts, GroupCount, GroupId};
use crate::scheduler::RefreshScheduler;
use crate::selection::{
    decode_path, CameraView, PathOutcome, PathTicket, RawPathPoint, SelectionController,
    SelectionOrigin, SelectionView,
};
use crate::status::{FeedStatus, StatusBoard};
use crate::warnings::{WarningFeed, WarningIndex, WarningPanel};
use crate::{FeedKind, Result, TrackingError};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// User and cross-component requests
#[derive(Debug, Clone)]
pub enum EngineCommand {
    Select {
        object: TrackedObject,
        origin: SelectionOrigin,
    },
    ClearSelection,
    SetIsolation(bool),
    SetSearch(String),
    SetShowDebris(bool),
    SetShowAll(bool),
    SetVisibleGroups(BTreeSet<GroupId>),
    ToggleGroup(GroupId),
    RefreshCatalog,
    RefreshWarnings,
    Sync,
    Shutdown,
}

/// Results coming back from spawned work
enum Completion {
    Objects {
        seq: u64,
        result: Result<Vec<serde_json::Value>>,
    },
    Warnings {
        seq: u64,
        result: Result<WarningFeed>,
    },
    Path {
        ticket: PathTicket,
        result: Result<Vec<RawPathPoint>>,
    },
    Sync(Result<()>),
    SearchSettled(u64),
}

/// Everything the rendering consumer needs for one frame
#[derive(Debug, Clone, Serialize)]
pub struct ViewSnapshot {
    pub revision: u64,
    pub points: Vec<DisplayPoint>,
    /// Objects currently displayed
    pub tracked: usize,
    #[serde(skip)]
    pub catalog: Arc<[TrackedObject]>,
    pub catalog_size: usize,
    pub catalog_loaded: bool,
    pub catalog_generation: u64,
    pub groups: Vec<GroupCount>,
    pub warnings: WarningPanel,
    pub selection: SelectionView,
    pub camera: CameraView,
    /// Bumped on every recentre request
    pub camera_revision: u64,
    pub filters: FilterState,
    pub status: StatusBoard,
    /// Inline status messages, most important first
    pub notices: Vec<String>,
}

impl ViewSnapshot {
    /// Find a catalog object by id or name
    pub fn find(&self, query: &str) -> Option<&TrackedObject> {
        find_object(&self.catalog, query)
    }
}

pub struct TrackingEngine<F: TrackingFeeds> {
    config: TrackingConfig,
    feeds: Arc<F>,
    catalog: CatalogStore,
    warnings: WarningIndex,
    filters: FilterState,
    selection: SelectionController,
    scheduler: RefreshScheduler,
    status: StatusBoard,
    camera: CameraView,
    camera_revision: u64,
    search_seq: u64,
    revision: u64,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
    view_tx: watch::Sender<Arc<ViewSnapshot>>,
}

impl<F: TrackingFeeds> TrackingEngine<F> {
    pub fn new(config: TrackingConfig, feeds: Arc<F>) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        let status = if feeds.authorized() {
            StatusBoard::default()
        } else {
            StatusBoard::awaiting_credential()
        };

        let mut engine = Self {
            scheduler: RefreshScheduler::new(&config),
            config,
            feeds,
            catalog: CatalogStore::new(),
            warnings: WarningIndex::new(),
            filters: FilterState::default(),
            selection: SelectionController::new(),
            status,
            camera: CameraView::GLOBAL,
            camera_revision: 0,
            search_seq: 0,
            revision: 0,
            completions_tx,
            completions_rx,
            view_tx: watch::Sender::new(Arc::new(ViewSnapshot::empty())),
        };
        let initial = Arc::new(engine.build_snapshot());
        engine.view_tx.send_replace(initial);
        engine
    }

    /// Start the engine on the current tokio runtime
    pub fn spawn(config: TrackingConfig, feeds: F) -> (EngineHandle, JoinHandle<()>) {
        let (commands, command_rx) = mpsc::channel(config.command_buffer.max(1));
        let engine = Self::new(config, Arc::new(feeds));
        let handle = EngineHandle {
            commands,
            view: engine.view_tx.subscribe(),
        };
        let task = tokio::spawn(engine.run(command_rx));
        (handle, task)
    }

    pub async fn run(mut self, mut commands: mpsc::Receiver<EngineCommand>) {
        let (mut catalog_timer, mut warning_timer) = self.scheduler.timers();
        info!(
            "Tracking engine started (objects every {}s, warnings every {}s)",
            self.config.catalog_interval_sec, self.config.warning_interval_sec
        );

        loop {
            let changed = tokio::select! {
                command = commands.recv() => match command {
                    Some(EngineCommand::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
                Some(done) = self.completions_rx.recv() => self.handle_completion(done),
                _ = catalog_timer.tick() => self.refresh(FeedKind::Objects),
                _ = warning_timer.tick() => self.refresh(FeedKind::Warnings),
            };

            if changed {
                self.publish();
            }
        }

        info!("Tracking engine stopped");
    }

    fn handle_command(&mut self, command: EngineCommand) -> bool {
        match command {
            EngineCommand::Select { object, origin } => {
                self.select(object, origin);
                true
            }
            EngineCommand::ClearSelection => {
                self.camera = self.selection.clear();
                self.camera_revision += 1;
                true
            }
            EngineCommand::SetIsolation(enabled) => self.selection.set_isolation(enabled),
            EngineCommand::SetSearch(query) => {
                self.set_search(query);
                true
            }
            EngineCommand::SetShowDebris(show) => replace(&mut self.filters.show_debris, show),
            EngineCommand::SetShowAll(show) => replace(&mut self.filters.show_all, show),
            EngineCommand::SetVisibleGroups(groups) => {
                replace(&mut self.filters.visible_groups, groups)
            }
            EngineCommand::ToggleGroup(group) => {
                self.filters.toggle_group(group);
                true
            }
            EngineCommand::RefreshCatalog => self.refresh(FeedKind::Objects),
            EngineCommand::RefreshWarnings => self.refresh(FeedKind::Warnings),
            EngineCommand::Sync => {
                self.sync();
                true
            }
            // handled by the run loop
            EngineCommand::Shutdown => false,
        }
    }

    fn handle_completion(&mut self, completion: Completion) -> bool {
        match completion {
            Completion::Objects { seq, result } => {
                if !self.scheduler.accept(FeedKind::Objects, seq) {
                    return false;
                }
                match result {
                    Ok(records) => {
                        let decoded = decode_objects(records);
                        let count = decoded.objects.len();
                        self.catalog.replace(decoded.objects);
                        self.status.objects_loaded(count);
                        if count == 0 {
                            warn!("Object feed returned no objects, sync required");
                        } else {
                            info!("Loaded {} tracked objects", count);
                        }
                    }
                    Err(e) => {
                        warn!("Object refresh failed: {}", e);
                        self.status.objects_failed(&e, self.catalog.len());
                    }
                }
                true
            }
            Completion::Warnings { seq, result } => {
                if !self.scheduler.accept(FeedKind::Warnings, seq) {
                    return false;
                }
                match result.and_then(WarningFeed::into_warnings) {
                    Ok(warnings) => {
                        self.warnings = WarningIndex::rebuild(warnings);
                        self.status.warnings_loaded(self.warnings.len());
                        if self.warnings.has_critical() {
                            warn!(
                                "{} critical conjunctions within 10 km",
                                self.warnings.critical_count()
                            );
                        } else {
                            info!("Loaded {} conjunction warnings", self.warnings.len());
                        }
                    }
                    Err(e) => {
                        warn!("Warning refresh failed: {}", e);
                        self.status.warnings_failed(&e, self.warnings.len());
                    }
                }
                true
            }
            Completion::Path { ticket, result } => {
                let result = result.map(decode_path);
                self.selection.complete_path(&ticket, result) != PathOutcome::Stale
            }
            Completion::Sync(result) => {
                match &result {
                    Ok(()) => info!("Sync requested, data changes on next refresh"),
                    Err(e) => warn!("Sync failed: {}", e),
                }
                self.status.sync_finished(&result);
                true
            }
            Completion::SearchSettled(seq) => {
                if seq != self.search_seq || !self.filters.search_pending() {
                    return false;
                }
                replace(
                    &mut self.filters.debounced_query,
                    self.filters.search_query.clone(),
                )
            }
        }
    }

    fn select(&mut self, object: TrackedObject, origin: SelectionOrigin) {
        let outcome = self.selection.select(object, origin, &self.warnings);
        self.camera = outcome.camera;
        self.camera_revision += 1;

        let Some(ticket) = outcome.ticket else {
            return;
        };

        if !self.feeds.authorized() {
            self.selection
                .complete_path(&ticket, Err(TrackingError::MissingCredential));
            return;
        }

        let feeds = Arc::clone(&self.feeds);
        let tx = self.completions_tx.clone();
        let hours = self.config.path_horizon_hours;
        tokio::spawn(async move {
            let result = feeds.fetch_path(&ticket.object_id, hours).await;
            let _ = tx.send(Completion::Path { ticket, result });
        });
    }

    fn set_search(&mut self, query: String) {
        self.filters.search_query = query;
        self.search_seq += 1;
        let seq = self.search_seq;

        let delay = self.config.search_debounce();
        if delay.is_zero() {
            self.filters.debounced_query = self.filters.search_query.clone();
            return;
        }

        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Completion::SearchSettled(seq));
        });
    }

    /// Issue a feed refresh. Returns whether the visible status changed.
    fn refresh(&mut self, feed: FeedKind) -> bool {
        if !self.feeds.authorized() {
            debug!("No credential, skipping {} refresh", feed);
            let status = match feed {
                FeedKind::Warnings => &mut self.status.warnings,
                _ => &mut self.status.objects,
            };
            return replace(status, FeedStatus::AwaitingCredential);
        }

        let seq = self.scheduler.issue(feed);
        let feeds = Arc::clone(&self.feeds);
        let tx = self.completions_tx.clone();

        match feed {
            FeedKind::Warnings => {
                tokio::spawn(async move {
                    let result = feeds.fetch_warnings().await;
                    let _ = tx.send(Completion::Warnings { seq, result });
                });
            }
            _ => {
                tokio::spawn(async move {
                    let result = feeds.fetch_objects().await;
                    let _ = tx.send(Completion::Objects { seq, result });
                });
            }
        }
        false
    }

    fn sync(&mut self) {
        if !self.feeds.authorized() {
            self.status.sync_finished(&Err(TrackingError::MissingCredential));
            return;
        }

        info!("Manual sync requested");
        self.status.sync_pending();
        let feeds = Arc::clone(&self.feeds);
        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            let result = feeds.trigger_sync().await;
            let _ = tx.send(Completion::Sync(result));
        });
    }

    fn build_snapshot(&self) -> ViewSnapshot {
        let display = compute_display_set(DisplayInputs {
            catalog: self.catalog.objects(),
            warnings: &self.warnings,
            selection: self.selection.state(),
            filters: &self.filters,
        });

        ViewSnapshot {
            revision: self.revision,
            tracked: display.len(),
            points: render_points(&display, &self.warnings),
            catalog: self.catalog.snapshot(),
            catalog_size: self.catalog.len(),
            catalog_loaded: self.catalog.state().is_loaded(),
            catalog_generation: self.catalog.generation(),
            groups: group_counts(self.catalog.objects()),
            warnings: self.warnings.panel(self.config.warning_panel_limit),
            selection: self.selection.view(),
            camera: self.camera,
            camera_revision: self.camera_revision,
            filters: self.filters.clone(),
            notices: self.status.notices(),
            status: self.status.clone(),
        }
    }

    fn publish(&mut self) {
        self.revision += 1;
        let snapshot = Arc::new(self.build_snapshot());
        debug!(
            "Publishing view r{} ({} points)",
            snapshot.revision, snapshot.tracked
        );
        self.view_tx.send_replace(snapshot);
    }
}

impl ViewSnapshot {
    fn empty() -> Self {
        Self {
            revision: 0,
            points: Vec::new(),
            tracked: 0,
            catalog: Arc::from(Vec::new()),
            catalog_size: 0,
            catalog_loaded: false,
            catalog_generation: 0,
            groups: Vec::new(),
            warnings: WarningPanel::default(),
            selection: SelectionController::new().view(),
            camera: CameraView::GLOBAL,
            camera_revision: 0,
            filters: FilterState::default(),
            notices: StatusBoard::default().notices(),
            status: StatusBoard::default(),
        }
    }
}

/// Set `slot` to `value`, reporting whether it changed
fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

/// Cloneable front door to a running engine
#[derive(Clone)]
pub struct EngineHandle {
    commands: mpsc::Sender<EngineCommand>,
    view: watch::Receiver<Arc<ViewSnapshot>>,
}

impl EngineHandle {
    pub async fn send(&self, command: EngineCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| TrackingError::EngineClosed)
    }

    pub async fn select(&self, object: TrackedObject, origin: SelectionOrigin) -> Result<()> {
        self.send(EngineCommand::Select { object, origin }).await
    }

    /// Resolve `query` (id or name) against the current catalog and select it
    pub async fn select_by_name(&self, query: &str, origin: SelectionOrigin) -> Result<TrackedObject> {
        let object = self
            .snapshot()
            .find(query)
            .cloned()
            .ok_or_else(|| TrackingError::ObjectNotFound(query.to_string()))?;
        self.select(object.clone(), origin).await?;
        Ok(object)
    }

    pub async fn clear_selection(&self) -> Result<()> {
        self.send(EngineCommand::ClearSelection).await
    }

    pub async fn set_isolation(&self, enabled: bool) -> Result<()> {
        self.send(EngineCommand::SetIsolation(enabled)).await
    }

    pub async fn set_search(&self, query: impl Into<String>) -> Result<()> {
        self.send(EngineCommand::SetSearch(query.into())).await
    }

    pub async fn set_show_debris(&self, show: bool) -> Result<()> {
        self.send(EngineCommand::SetShowDebris(show)).await
    }

    pub async fn set_show_all(&self, show: bool) -> Result<()> {
        self.send(EngineCommand::SetShowAll(show)).await
    }

    pub async fn set_visible_groups(&self, groups: BTreeSet<GroupId>) -> Result<()> {
        self.send(EngineCommand::SetVisibleGroups(groups)).await
    }

    pub async fn toggle_group(&self, group: GroupId) -> Result<()> {
        self.send(EngineCommand::ToggleGroup(group)).await
    }

    pub async fn refresh_catalog(&self) -> Result<()> {
        self.send(EngineCommand::RefreshCatalog).await
    }

    pub async fn refresh_warnings(&self) -> Result<()> {
        self.send(EngineCommand::RefreshWarnings).await
    }

    pub async fn sync(&self) -> Result<()> {
        self.send(EngineCommand::Sync).await
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.send(EngineCommand::Shutdown).await
    }

    /// Latest published view
    pub fn snapshot(&self) -> Arc<ViewSnapshot> {
        Arc::clone(&*self.view.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<ViewSnapshot>> {
        self.view.clone()
    }

    /// Wait until a published view satisfies `predicate`
    pub async fn wait_for(
        &self,
        mut predicate: impl FnMut(&ViewSnapshot) -> bool,
    ) -> Result<Arc<ViewSnapshot>> {
        let mut view = self.view.clone();
        let snapshot = view
            .wait_for(|snapshot| predicate(snapshot.as_ref()))
            .await
            .map_err(|_| TrackingError::EngineClosed)?;
        Ok(Arc::clone(&*snapshot))
    }

    pub fn clear_signal(&self) -> ClearSignal {
        ClearSignal {
            commands: self.commands.clone(),
        }
    }
}

/// Cross-component "clear selection" notification.
///
/// Handed explicitly to any surface that may need to end an inspection
/// (inspection panel close button, keyboard shortcut, API route).
#[derive(Clone)]
pub struct ClearSignal {
    commands: mpsc::Sender<EngineCommand>,
}

impl ClearSignal {
    pub async fn raise(&self) -> Result<()> {
        self.commands
            .send(EngineCommand::ClearSelection)
            .await
            .map_err(|_| TrackingError::EngineClosed)
    }
}
