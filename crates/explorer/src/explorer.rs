//! The Explorer: single entry point to the map page.
//!
//! The explorer owns the data cache, the UI and view stores and the map
//! surface, and routes every [`Command`] to them.
//!
//! Opening a dataset is a small fetch pipeline driven by cache events:
//! 1. reset the UI, request the dataset's records and the relationship list
//! 2. show the records as soon as they arrive
//! 3. once both have arrived, orient every relationship of the dataset
//!    and request each related dataset's records
//! 4. once those have arrived, hand them to the view as related records;
//!    the map surface joins them into its link map
//!
//! Only the most recent open is followed. Opening something else (or
//! resetting) discards every outstanding fetch, so a slow response can
//! never resurrect a view the user has left.

use std::path::Path;
use std::sync::Arc;

use mircs_client::{
    ApiError, CacheEvent, DataCache, FetchMode, HttpApi, InMemoryApi, LogNotifier, Notifier,
    Outcome, PersistenceApi, Slot, Ticket,
};
use mircs_core::{DataSetId, RelationshipId};
use mircs_engine::{related_sets, RelatedDataSet};
use mircs_map::{FilterBar, MapCanvas, MapSurface, SidePanel, TileRegistry};
use mircs_search::popup_text;
use mircs_state::{RelatedRecords, UiStore, ViewSource, ViewStore};
use tracing::{debug, info};

use crate::command::Command;
use crate::config::ExplorerConfig;
use crate::error::{Error, Result};
use crate::output::{ExplorerView, MarkerView, OpenSummary, Output};

/// The fetch pipeline currently being followed
#[derive(Debug)]
enum Pending {
    Idle,
    DataSet {
        id: DataSetId,
        awaiting: Vec<(Slot, Ticket)>,
        related: Option<Vec<RelatedDataSet>>,
    },
    Relationship {
        id: RelationshipId,
        awaiting: Vec<(Slot, Ticket)>,
    },
}

/// Remove `event` from `awaiting`; false if it was not awaited.
fn take_awaited(awaiting: &mut Vec<(Slot, Ticket)>, event: &CacheEvent) -> bool {
    match awaiting
        .iter()
        .position(|(slot, ticket)| *slot == event.slot && *ticket == event.ticket)
    {
        Some(i) => {
            awaiting.swap_remove(i);
            true
        }
        None => false,
    }
}

/// Command-driven explorer.
///
/// # Example
///
/// ```ignore
/// use mircs_explorer::{Command, Explorer, ExplorerConfig};
///
/// let mut explorer = Explorer::connect(ExplorerConfig::default());
/// explorer.mount(Box::new(RecordingCanvas::new()))?;
/// explorer.execute(Command::OpenDataSet { id: "d1".into() })?;
/// explorer.execute(Command::AddSearchTerm { term: "Surname: Smith".into() })?;
/// ```
pub struct Explorer {
    config: ExplorerConfig,
    cache: DataCache,
    ui: UiStore,
    view: ViewStore,
    surface: MapSurface,
    pending: Pending,
    failure: Option<Error>,
}

impl Explorer {
    /// Explorer over `api`, reporting failures to `notifier`
    pub fn new(
        config: ExplorerConfig,
        api: Arc<dyn PersistenceApi>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let ui = UiStore::with_tile_layer(&config.tile_layer);
        let view = ViewStore::new();
        let surface = MapSurface::new(
            ui.clone(),
            view.clone(),
            TileRegistry::new(config.tiles.mapbox_token.clone()),
            config.map.options(),
        );
        Explorer {
            cache: DataCache::new(api, notifier),
            config,
            ui,
            view,
            surface,
            pending: Pending::Idle,
            failure: None,
        }
    }

    /// Explorer talking HTTP to `config.api_url`, logging notices
    pub fn connect(config: ExplorerConfig) -> Self {
        let api = HttpApi::new(config.api_url.clone(), config.timeout())
            .with_token(config.api_token.clone());
        Self::new(config, Arc::new(api), Arc::new(LogNotifier))
    }

    /// Explorer serving a fixture file, logging notices
    pub fn offline(config: ExplorerConfig, fixture: &Path) -> Result<Self> {
        let api = InMemoryApi::from_file(fixture)?;
        Ok(Self::new(config, Arc::new(api), Arc::new(LogNotifier)))
    }

    /// Choose how fetches run
    pub fn with_fetch_mode(mut self, mode: FetchMode) -> Self {
        self.cache = self.cache.with_mode(mode);
        self
    }

    /// Attach the map canvas
    pub fn mount(&self, canvas: Box<dyn MapCanvas>) -> Result<()> {
        Ok(self.surface.mount(canvas)?)
    }

    /// Detach the map canvas for good
    pub fn unmount(&self) {
        self.surface.unmount();
    }

    /// Active configuration
    pub fn config(&self) -> &ExplorerConfig {
        &self.config
    }

    /// Shared UI state
    pub fn ui(&self) -> &UiStore {
        &self.ui
    }

    /// What is open
    pub fn view(&self) -> &ViewStore {
        &self.view
    }

    /// The map surface
    pub fn surface(&self) -> &MapSurface {
        &self.surface
    }

    /// The data cache
    pub fn cache(&self) -> &DataCache {
        &self.cache
    }

    // ========================================================================
    // Command dispatch
    // ========================================================================

    /// Execute a command, waiting for any fetches it starts.
    pub fn execute(&mut self, cmd: Command) -> Result<Output> {
        debug!(target: "mircs::explorer", ?cmd, "Executing command");
        match cmd {
            Command::ListDataSets => {
                self.fetch_now(Slot::DataSets)?;
                Ok(Output::DataSets(self.cache.data_sets().to_vec()))
            }
            Command::ListRelationships => {
                self.fetch_now(Slot::Relationships)?;
                Ok(Output::Relationships(self.cache.relationships().to_vec()))
            }
            Command::OpenDataSet { id } => {
                self.begin_open_data_set(id.clone());
                self.settle();
                self.finish_open(ViewSource::DataSet(id))
            }
            Command::OpenRelationship { id } => {
                self.begin_open_relationship(id.clone());
                self.settle();
                self.finish_open(ViewSource::Relationship(id))
            }

            Command::AddSearchTerm { term } => Ok(Output::Bool(self.ui.add_search_term(&term))),
            Command::RemoveSearchTerm { term } => {
                Ok(Output::Bool(self.ui.remove_search_term(&term)))
            }
            Command::SetSearchTerms { terms } => {
                self.ui.set_search_terms(terms);
                Ok(Output::Unit)
            }
            Command::SetHighlightField { field } => {
                let field = field.map(|f| f.trim().to_string()).filter(|f| !f.is_empty());
                let records = self.view.read(|v| v.records.clone());
                self.ui.set_highlight_field(field.as_deref(), &records);
                Ok(Output::Unit)
            }

            Command::SetTileLayer { name } => {
                self.ui.set_tile_layer(&name);
                Ok(Output::Unit)
            }
            Command::ClickMarker { layer } => {
                let hit = self.surface.click_layer(layer)?;
                if hit {
                    // the same click then reaches the map and is swallowed
                    self.surface.click_map()?;
                }
                Ok(Output::Bool(hit))
            }
            Command::ClickBackground => Ok(Output::Bool(self.surface.click_map()?)),
            Command::Reset => {
                self.reset();
                Ok(Output::Unit)
            }
            Command::Refresh => Ok(Output::Refreshed(self.surface.refresh()?)),
            Command::View => Ok(Output::View(Box::new(self.snapshot()))),

            Command::CreateDataSet { draft } => {
                Ok(Output::DataSet(self.cache.create_data_set(&draft)?))
            }
            Command::UpdateDataSet { id, draft } => {
                Ok(Output::DataSet(self.cache.update_data_set(&id, &draft)?))
            }
            Command::DeleteDataSet { id } => {
                self.cache.delete_data_set(&id)?;
                if self.view.source() == Some(ViewSource::DataSet(id)) {
                    self.reset();
                }
                Ok(Output::Unit)
            }
            Command::CreateRelationship { draft } => {
                Ok(Output::Relationship(self.cache.create_relationship(&draft)?))
            }
            Command::UpdateRelationship { id, draft } => {
                Ok(Output::Relationship(self.cache.update_relationship(&id, &draft)?))
            }
            Command::DeleteRelationship { id } => {
                self.cache.delete_relationship(&id)?;
                if self.view.source() == Some(ViewSource::Relationship(id)) {
                    self.reset();
                }
                Ok(Output::Unit)
            }

            Command::SignIn { email, password } => {
                let session = self.cache.sign_in(&email, &password)?;
                info!(target: "mircs::explorer", email = %session.email, "Signed in");
                Ok(Output::SignedIn {
                    email: session.email,
                    id_token: session.id_token,
                    expires_in_ms: session.expires_in_ms,
                })
            }
        }
    }

    /// Execute several commands, stopping at the first error
    pub fn execute_many(&mut self, cmds: Vec<Command>) -> Result<Vec<Output>> {
        cmds.into_iter().map(|cmd| self.execute(cmd)).collect()
    }

    // ========================================================================
    // Opening views
    // ========================================================================

    /// Start opening a dataset without waiting; progress with
    /// [`pump`](Self::pump) or [`settle`](Self::settle).
    pub fn begin_open_data_set(&mut self, id: DataSetId) {
        self.start_over();
        let records = self.cache.request_records(&id);
        let relationships = self.cache.request_relationships();
        info!(target: "mircs::explorer", dataset = %id, "Opening dataset");
        self.pending = Pending::DataSet {
            awaiting: vec![
                (Slot::Records(id.clone()), records),
                (Slot::Relationships, relationships),
            ],
            id,
            related: None,
        };
    }

    /// Start opening a relationship's join without waiting.
    pub fn begin_open_relationship(&mut self, id: RelationshipId) {
        self.start_over();
        let ticket = self.cache.request_join(&id);
        info!(target: "mircs::explorer", relationship = %id, "Opening relationship");
        self.pending = Pending::Relationship {
            awaiting: vec![(Slot::Join(id.clone()), ticket)],
            id,
        };
    }

    /// Whether an open is still in progress
    pub fn is_loading(&self) -> bool {
        !matches!(self.pending, Pending::Idle)
    }

    /// Restore the initial UI, show nothing and drop outstanding fetches.
    pub fn reset(&mut self) {
        self.start_over();
        self.pending = Pending::Idle;
    }

    fn start_over(&mut self) {
        self.cache.discard_pending();
        self.failure = None;
        self.ui.reset();
        self.view.clear();
    }

    fn finish_open(&mut self, source: ViewSource) -> Result<Output> {
        if let Some(e) = self.failure.take() {
            return Err(e);
        }
        if self.view.source().as_ref() != Some(&source) {
            return Err(match source {
                ViewSource::DataSet(id) => Error::DataSetNotFound { id: id.to_string() },
                ViewSource::Relationship(id) => Error::RelationshipNotFound { id: id.to_string() },
            });
        }
        Ok(Output::Opened(self.open_summary()))
    }

    fn open_summary(&self) -> OpenSummary {
        let (records, related) = self.view.read(|v| {
            (
                v.records.len(),
                v.related
                    .iter()
                    .map(|r| (r.data_set_id.clone(), r.records.len()))
                    .collect(),
            )
        });
        OpenSummary {
            records,
            related,
            mapped: self.surface.placed().len(),
            fitted: self.surface.last_fit(),
        }
    }

    // ========================================================================
    // Event loop
    // ========================================================================

    /// Apply responses that have already arrived. Returns how many there
    /// were.
    pub fn pump(&mut self) -> usize {
        let events = self.cache.pump();
        let n = events.len();
        for event in events {
            self.on_event(event);
        }
        self.advance();
        n
    }

    /// Wait until the current open has finished or no more responses
    /// arrive within the configured timeout.
    pub fn settle(&mut self) {
        let timeout = self.config.timeout();
        loop {
            let events = self.cache.settle(timeout);
            let progressed = !events.is_empty();
            for event in events {
                self.on_event(event);
            }
            self.advance();
            if self.cache.in_flight() == 0 || !progressed {
                break;
            }
        }
    }

    /// Fetch one slot and wait for it, failing if that fetch failed.
    fn fetch_now(&mut self, slot: Slot) -> Result<()> {
        let ticket = self.cache.request(slot.clone());
        let mut result = Ok(());
        for event in self.cache.settle(self.config.timeout()) {
            if event.slot == slot && event.ticket == ticket {
                if let Outcome::Failed(e) = &event.outcome {
                    result = Err(e.clone().into());
                }
            }
            self.on_event(event);
        }
        self.advance();
        result
    }

    fn on_event(&mut self, event: CacheEvent) {
        match std::mem::replace(&mut self.pending, Pending::Idle) {
            Pending::Idle => {}
            Pending::DataSet {
                id,
                mut awaiting,
                related,
            } => {
                if !take_awaited(&mut awaiting, &event) {
                    self.pending = Pending::DataSet {
                        id,
                        awaiting,
                        related,
                    };
                    return;
                }
                let primary = event.slot == Slot::Records(id.clone());
                match event.outcome {
                    Outcome::Updated { .. } if primary => {
                        let records = self.cache.records(&id).unwrap_or_default().to_vec();
                        self.view.set_records(ViewSource::DataSet(id.clone()), records);
                    }
                    Outcome::Failed(e) if primary => {
                        self.fail(e);
                        return;
                    }
                    // related or relationship-list failures just link less
                    _ => {}
                }
                self.pending = Pending::DataSet {
                    id,
                    awaiting,
                    related,
                };
            }
            Pending::Relationship { id, mut awaiting } => {
                if !take_awaited(&mut awaiting, &event) {
                    self.pending = Pending::Relationship { id, awaiting };
                    return;
                }
                match event.outcome {
                    Outcome::Updated { .. } => {
                        let records = self.cache.join(&id).unwrap_or_default().to_vec();
                        self.view
                            .set_records(ViewSource::Relationship(id.clone()), records);
                    }
                    Outcome::Failed(e) => self.fail(e),
                    Outcome::Stale => {}
                }
            }
        }
    }

    fn fail(&mut self, e: ApiError) {
        debug!(target: "mircs::explorer", error = %e, "Open abandoned");
        self.failure = Some(e.into());
        self.pending = Pending::Idle;
    }

    fn advance(&mut self) {
        let Pending::DataSet {
            id,
            awaiting,
            related,
        } = &mut self.pending
        else {
            return;
        };
        if !awaiting.is_empty() {
            return;
        }

        match related {
            None => {
                let found = related_sets(self.cache.relationships(), id);
                if found.is_empty() {
                    debug!(target: "mircs::explorer", dataset = %id, "No related datasets");
                    self.pending = Pending::Idle;
                    return;
                }
                for r in &found {
                    let ticket = self.cache.request_records(&r.data_set_id);
                    awaiting.push((Slot::Records(r.data_set_id.clone()), ticket));
                }
                *related = Some(found);
            }
            Some(found) => {
                let linked: Vec<RelatedRecords> = found
                    .iter()
                    .filter_map(|r| {
                        let records = self.cache.records(&r.data_set_id)?;
                        Some(RelatedRecords {
                            data_set_id: r.data_set_id.clone(),
                            join_elements: r.join_elements.clone(),
                            records: records.to_vec(),
                        })
                    })
                    .collect();
                info!(
                    target: "mircs::explorer",
                    dataset = %id,
                    related = linked.len(),
                    "Related records loaded"
                );
                self.view.set_related(&ViewSource::DataSet(id.clone()), linked);
                self.pending = Pending::Idle;
            }
        }
    }

    // ========================================================================
    // Views
    // ========================================================================

    /// Describe what the map and panels currently show
    pub fn snapshot(&self) -> ExplorerView {
        let state = self.ui.snapshot();
        let markers = self
            .surface
            .placed()
            .into_iter()
            .map(|p| MarkerView {
                layer: p.id,
                bucket: p.bucket,
                point: p.point,
                popup: popup_text(&p.record),
            })
            .collect();
        ExplorerView {
            source: self.view.source(),
            tile_layer: state.tile_layer_name.clone(),
            filter_bar: FilterBar::from_state(&state),
            side_panel: SidePanel::from_state(&state),
            markers,
            bounds: self.surface.last_fit(),
        }
    }
}

impl std::fmt::Debug for Explorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Explorer")
            .field("api_url", &self.config.api_url)
            .field("cache", &self.cache)
            .field("pending", &self.pending)
            .field("surface", &self.surface.state())
            .finish()
    }
}
