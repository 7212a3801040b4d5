use std::sync::Arc;

use serde_json::Value;

use crate::config::{Configuration, DataSource, RawConfiguration};
use crate::error::{AutocompleteError, Result};
use crate::item::Item;
use crate::keys::is_search_trigger;
use crate::notify::ChangeNotifier;
use crate::search::{LocalSearch, RemoteEvent, RemotePurpose, RemoteSearch, RemoteSource, exclude_selected};
use crate::selection::{SelectedEntry, SelectedId, SelectedItems, SelectionState};

enum Engine {
    Local(LocalSearch),
    Remote(RemoteSearch),
}

/// The autocomplete control: configuration, selection, suggestions and the
/// active search strategy behind one event-driven facade.
///
/// The presentation layer forwards keystrokes and clicks and reads back
/// [`Autocomplete::display_suggestions`], [`Autocomplete::loading_data`] and
/// [`Autocomplete::suggestions`]. In remote mode, completed requests must be
/// fed back with [`Autocomplete::process_remote`] or
/// [`Autocomplete::apply_remote_event`], from within a tokio runtime.
pub struct Autocomplete {
    config: Configuration,
    selection: SelectionState,
    suggestions: Vec<Item>,
    display_suggestions: bool,
    loading_data: bool,
    query: String,
    input_text: String,
    pending_id: Option<SelectedId>,
    engine: Engine,
    notifier: ChangeNotifier,
}

impl Autocomplete {
    /// Local-mode control. Remote configurations need [`Autocomplete::with_source`].
    pub fn new(raw: RawConfiguration) -> Result<Self> {
        let config = raw.normalize()?;
        match config.source {
            DataSource::Local(_) => Self::build(config, None),
            DataSource::Remote(_) => Err(AutocompleteError::configuration(
                "a remote configuration needs a search capability",
            )),
        }
    }

    /// Control for either mode; `source` is used only in remote mode.
    pub fn with_source(raw: RawConfiguration, source: Arc<dyn RemoteSource>) -> Result<Self> {
        Self::build(raw.normalize()?, Some(source))
    }

    fn build(config: Configuration, source: Option<Arc<dyn RemoteSource>>) -> Result<Self> {
        let engine = match (&config.source, source) {
            (DataSource::Local(data), _) => Engine::Local(LocalSearch::new(data.clone())),
            (DataSource::Remote(url), Some(source)) => {
                Engine::Remote(RemoteSearch::new(source, url.clone(), config.debounce))
            }
            (DataSource::Remote(_), None) => {
                return Err(AutocompleteError::configuration(
                    "a remote configuration needs a search capability",
                ));
            }
        };

        Ok(Self {
            selection: SelectionState::new(config.key.clone(), config.multiple),
            config,
            suggestions: Vec::new(),
            display_suggestions: false,
            loading_data: false,
            query: String::new(),
            input_text: String::new(),
            pending_id: None,
            engine,
            notifier: ChangeNotifier::new(),
        })
    }

    // ─── Presentation reads ─────────────────────────────────

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn display_suggestions(&self) -> bool {
        self.display_suggestions
    }

    pub fn loading_data(&self) -> bool {
        self.loading_data
    }

    pub fn suggestions(&self) -> &[Item] {
        &self.suggestions
    }

    /// The text last searched for; cleared once a pick is made.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// What the input shows: the typed text, or the picked item's `value`
    /// field after a single-mode pick.
    pub fn input_text(&self) -> &str {
        &self.input_text
    }

    pub fn empty_list_view(&self) -> &str {
        &self.config.empty_list_view
    }

    pub fn loading_view(&self) -> &str {
        &self.config.loading_view
    }

    /// Rendered suggestion text for `item`.
    pub fn render(&self, item: &Item) -> Result<String> {
        self.config.template.render(item)
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    /// The bound id value. While a remote id lookup is outstanding this is
    /// the value that was assigned.
    pub fn selected_id(&self) -> SelectedId {
        match &self.pending_id {
            Some(pending) => pending.clone(),
            None => self.selection.selected_id(),
        }
    }

    pub fn selected_item(&self) -> SelectedItems {
        self.selection.project()
    }

    pub fn selected_entries(&self) -> &[SelectedEntry] {
        self.selection.entries()
    }

    // ─── Observers ──────────────────────────────────────────

    pub fn on_item_selected(&mut self, listener: impl FnMut(&SelectedItems) + Send + 'static) {
        self.notifier.subscribe(listener);
    }

    pub fn register_on_change(&mut self, callback: impl FnMut(&SelectedId) + Send + 'static) {
        self.notifier.register_on_change(callback);
    }

    pub fn unregister_on_change(&mut self) {
        self.notifier.unregister_on_change();
    }

    pub fn register_on_touched(&mut self, callback: impl FnMut() + Send + 'static) {
        self.notifier.register_on_touched(callback);
    }

    // ─── Keyboard ───────────────────────────────────────────

    /// Key-up with a key code; only search-trigger keys reach [`Autocomplete::on_key_up`].
    pub fn on_key_event(&mut self, code: u32, text: &str) {
        if is_search_trigger(code) {
            self.on_key_up(text);
        }
    }

    /// The input text changed to `text`.
    pub fn on_key_up(&mut self, text: &str) {
        self.query = text.to_string();
        self.input_text = text.to_string();

        if text.is_empty() {
            self.display_suggestions = false;
            if let Engine::Remote(remote) = &mut self.engine {
                remote.abandon();
                self.loading_data = false;
            }
            if !self.config.multiple {
                self.clear();
                self.dispatch();
            }
            return;
        }

        self.display_suggestions = true;
        match &mut self.engine {
            Engine::Local(local) => {
                self.suggestions = local.search(text, &self.selection);
            }
            Engine::Remote(remote) => {
                self.loading_data = true;
                self.suggestions.clear();
                remote.schedule(text);
            }
        }
    }

    /// A key went down: the user is still typing.
    pub fn on_key_down(&mut self) {
        let disarmed = match &mut self.engine {
            Engine::Local(_) => false,
            Engine::Remote(remote) => remote.cancel_pending(),
        };
        if disarmed {
            self.refresh_loading();
        }
    }

    // ─── Panel ──────────────────────────────────────────────

    /// Open the panel showing everything, or close it.
    pub fn toggle_suggestions(&mut self) {
        if self.display_suggestions {
            self.display_suggestions = false;
            return;
        }

        self.display_suggestions = true;
        match &mut self.engine {
            Engine::Local(local) => {
                self.suggestions = local.search("", &self.selection);
            }
            Engine::Remote(remote) => {
                self.loading_data = true;
                self.suggestions.clear();
                remote.search_now("");
            }
        }
    }

    /// The user clicked outside the control.
    pub fn close_suggestions(&mut self) {
        self.display_suggestions = false;
    }

    // ─── Selection ──────────────────────────────────────────

    /// Pick `item`, which sits at `index` in the current suggestions.
    pub fn perform_selection(&mut self, item: Item, index: usize) -> Result<()> {
        let display = item.display_value(&self.config.value);
        let key = item.require_key(&self.config.key)?;
        let changed = self.selection.select(item, index)?;
        self.abandon_lookup();
        self.query.clear();

        if self.config.multiple {
            let at_index = self
                .suggestions
                .get(index)
                .is_some_and(|s| s.key(&self.config.key).as_ref() == Some(&key));
            if at_index {
                self.suggestions.remove(index);
            } else {
                self.suggestions
                    .retain(|s| s.key(&self.config.key).as_ref() != Some(&key));
            }
            if self.suggestions.is_empty() {
                self.display_suggestions = false;
            }
            self.input_text.clear();
        } else {
            self.input_text = display;
            self.display_suggestions = false;
        }

        if changed {
            self.dispatch();
        }
        Ok(())
    }

    /// Pick the suggestion at `index`.
    pub fn select_suggestion(&mut self, index: usize) -> Result<()> {
        let item = self
            .suggestions
            .get(index)
            .cloned()
            .ok_or(AutocompleteError::SuggestionOutOfRange {
                index,
                len: self.suggestions.len(),
            })?;
        self.perform_selection(item, index)
    }

    /// Remove the selection entry at `position` (multiple mode) and put its
    /// item back among the suggestions where it came from.
    pub fn delete_from_selection(&mut self, position: usize) -> Result<()> {
        let entry = self.selection.deselect(position)?;
        let at = entry.origin_index.min(self.suggestions.len());
        self.suggestions.insert(at, entry.item);
        self.abandon_lookup();
        self.dispatch();
        Ok(())
    }

    /// Reset selection and suggestions, dropping any outstanding remote
    /// work. Listeners are not notified.
    pub fn clear(&mut self) {
        self.selection.clear();
        self.suggestions.clear();
        if let Engine::Remote(remote) = &mut self.engine {
            remote.abandon();
        }
        self.abandon_lookup();
    }

    /// Assign the bound id value from outside and rebuild the selected
    /// item(s) from the data source.
    ///
    /// An invalid value fails without touching the current state. In remote
    /// mode the rebuild completes once the lookup response is processed.
    pub fn set_selected_id(&mut self, value: &Value) -> Result<()> {
        let ids = SelectedId::parse(value, self.config.multiple)?;
        self.search_and_select_by_id(ids);
        Ok(())
    }

    /// Form write: empty values are form-reset noise and are ignored.
    pub fn write_value(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Null => Ok(()),
            Value::String(s) if s.is_empty() => Ok(()),
            other => self.set_selected_id(other),
        }
    }

    fn search_and_select_by_id(&mut self, ids: SelectedId) {
        match &mut self.engine {
            Engine::Local(local) => {
                self.pending_id = None;
                self.selection.reconstruct(&ids, local.data());
            }
            Engine::Remote(remote) => {
                if ids.is_unset() {
                    self.abandon_lookup();
                    self.selection.clear();
                    return;
                }
                self.loading_data = true;
                self.suggestions.clear();
                self.pending_id = Some(ids.clone());
                remote.lookup(ids);
            }
        }
    }

    // ─── Remote completion ──────────────────────────────────

    /// Whether remote work is scheduled or in flight.
    pub fn has_pending_remote(&self) -> bool {
        match &self.engine {
            Engine::Local(_) => false,
            Engine::Remote(remote) => remote.is_awaiting_suggestions() || remote.is_awaiting_lookup(),
        }
    }

    /// Wait for the next remote completion. `None` in local mode.
    pub async fn next_remote_event(&mut self) -> Option<RemoteEvent> {
        match &mut self.engine {
            Engine::Local(_) => None,
            Engine::Remote(remote) => remote.recv().await,
        }
    }

    /// Apply a remote completion. Returns `Ok(false)` for a superseded
    /// response, which is discarded unseen. A failed request clears the
    /// loading flag and is returned as the error.
    pub fn apply_remote_event(&mut self, event: RemoteEvent) -> Result<bool> {
        let Engine::Remote(remote) = &mut self.engine else {
            return Ok(false);
        };
        if !remote.accept(&event) {
            return Ok(false);
        }
        let still_loading = remote.is_awaiting_suggestions() || remote.is_awaiting_lookup();
        self.loading_data = still_loading;

        let items = match event.outcome {
            Ok(items) => items,
            Err(e) => {
                if matches!(event.purpose, RemotePurpose::Lookup { .. }) {
                    self.pending_id = None;
                }
                return Err(match e {
                    AutocompleteError::SearchTransport(_) => e,
                    other => AutocompleteError::transport(other.to_string()),
                });
            }
        };

        match event.purpose {
            RemotePurpose::Suggest { .. } => {
                // selection may have changed since the request went out
                self.suggestions = exclude_selected(items, &self.selection);
            }
            RemotePurpose::Lookup { ids } => {
                self.pending_id = None;
                self.selection.reconstruct(&ids, &items);
                self.suggestions = exclude_selected(items, &self.selection);
            }
        }
        Ok(true)
    }

    /// Wait for and apply the next remote completion.
    pub async fn process_remote(&mut self) -> Result<bool> {
        match self.next_remote_event().await {
            Some(event) => self.apply_remote_event(event),
            None => Ok(false),
        }
    }

    /// Drop a remote id lookup still in flight; the selection was decided
    /// since it was issued.
    fn abandon_lookup(&mut self) {
        self.pending_id = None;
        if let Engine::Remote(remote) = &mut self.engine {
            remote.abandon_lookup();
        }
        self.refresh_loading();
    }

    fn refresh_loading(&mut self) {
        self.loading_data = match &self.engine {
            Engine::Local(_) => false,
            Engine::Remote(remote) => remote.is_awaiting_suggestions() || remote.is_awaiting_lookup(),
        };
    }

    fn dispatch(&mut self) {
        let items = self.selection.project();
        let id = self.selection.selected_id();
        self.notifier.notify(&items, &id);
    }
}

impl std::fmt::Debug for Autocomplete {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Autocomplete")
            .field("config", &self.config)
            .field("selection", &self.selection)
            .field("suggestions", &self.suggestions.len())
            .field("display_suggestions", &self.display_suggestions)
            .field("loading_data", &self.loading_data)
            .field("notifier", &self.notifier)
            .finish()
    }
}
