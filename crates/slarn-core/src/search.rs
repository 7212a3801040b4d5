use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use crate::debounce::Debouncer;
use crate::error::Result;
use crate::item::Item;
use crate::selection::{SelectedId, SelectionState};

/// Remote data capability: fetch candidates for `query` from `source`.
///
/// An empty query asks for the default (full) list.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    async fn search(&self, query: &str, source: &str) -> Result<Vec<Item>>;
}

/// Drop every item whose identity is already selected.
pub fn exclude_selected(items: Vec<Item>, selection: &SelectionState) -> Vec<Item> {
    items
        .into_iter()
        .filter(|item| !selection.contains(item))
        .collect()
}

/// Case-insensitive substring filter over whole serialized items.
///
/// Any field can match, not only the display field. An empty query matches
/// everything.
#[derive(Debug, Clone)]
pub struct LocalSearch {
    data: Vec<Item>,
}

impl LocalSearch {
    pub fn new(data: Vec<Item>) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &[Item] {
        &self.data
    }

    pub fn search(&self, query: &str, selection: &SelectionState) -> Vec<Item> {
        let needle = query.to_lowercase();
        self.data
            .iter()
            .filter(|item| needle.is_empty() || item.search_text().to_lowercase().contains(&needle))
            .filter(|item| !selection.contains(item))
            .cloned()
            .collect()
    }
}

/// What a remote round-trip was issued for.
#[derive(Debug, Clone, PartialEq)]
pub enum RemotePurpose {
    /// Populate suggestions for a query.
    Suggest { query: String },
    /// Rebuild the selection for externally assigned ids.
    Lookup { ids: SelectedId },
}

/// Completion of a remote round-trip, delivered back to the control.
#[derive(Debug)]
pub struct RemoteEvent {
    pub ticket: u64,
    pub purpose: RemotePurpose,
    pub outcome: Result<Vec<Item>>,
}

/// Debounced, cancellable remote search.
///
/// Requests run on tokio tasks and report back through a channel drained by
/// the owner, so all state changes stay with the owner. Suggestion requests
/// and id lookups are separate streams, each tagged with a ticket; only the
/// newest ticket of a stream is current.
pub struct RemoteSearch {
    source: Arc<dyn RemoteSource>,
    url: String,
    delay: Duration,
    debouncer: Debouncer,
    tx: UnboundedSender<RemoteEvent>,
    rx: UnboundedReceiver<RemoteEvent>,
    next_ticket: u64,
    suggest_ticket: Option<u64>,
    lookup_ticket: Option<u64>,
}

impl RemoteSearch {
    pub fn new(source: Arc<dyn RemoteSource>, url: impl Into<String>, delay: Duration) -> Self {
        let (tx, rx) = unbounded_channel();
        Self {
            source,
            url: url.into(),
            delay,
            debouncer: Debouncer::new(),
            tx,
            rx,
            next_ticket: 0,
            suggest_ticket: None,
            lookup_ticket: None,
        }
    }

    /// Schedule a suggestion search after the quiet period, superseding any
    /// earlier one.
    pub fn schedule(&mut self, query: &str) {
        let ticket = self.issue_suggest_ticket();
        let task = self.request(ticket, RemotePurpose::Suggest {
            query: query.to_string(),
        });
        tracing::debug!(ticket, query, delay = ?self.delay, "remote search scheduled");
        self.debouncer.schedule(self.delay, task);
    }

    /// Issue a suggestion search now, superseding any scheduled one.
    pub fn search_now(&mut self, query: &str) {
        self.debouncer.cancel_pending();
        let ticket = self.issue_suggest_ticket();
        let task = self.request(ticket, RemotePurpose::Suggest {
            query: query.to_string(),
        });
        tokio::spawn(task);
    }

    /// Fetch the full list to rebuild the selection for `ids`.
    pub fn lookup(&mut self, ids: SelectedId) {
        let ticket = self.issue_ticket();
        self.lookup_ticket = Some(ticket);
        let task = self.request(ticket, RemotePurpose::Lookup { ids });
        tokio::spawn(task);
    }

    /// Disarm a scheduled search that has not fired. Returns whether one was
    /// disarmed; a disarmed search is no longer awaited.
    pub fn cancel_pending(&mut self) -> bool {
        let disarmed = self.debouncer.cancel_pending();
        if disarmed {
            self.suggest_ticket = None;
        }
        disarmed
    }

    /// Forget any outstanding suggestion request, fired or not.
    pub fn abandon(&mut self) {
        self.debouncer.cancel_pending();
        self.suggest_ticket = None;
    }

    /// Forget an outstanding id lookup; its response will be dropped.
    pub fn abandon_lookup(&mut self) {
        self.lookup_ticket = None;
    }

    /// Whether a suggestion request is scheduled or in flight.
    pub fn is_awaiting_suggestions(&self) -> bool {
        self.suggest_ticket.is_some()
    }

    pub fn is_awaiting_lookup(&self) -> bool {
        self.lookup_ticket.is_some()
    }

    /// Wait for the next completed round-trip.
    pub async fn recv(&mut self) -> Option<RemoteEvent> {
        self.rx.recv().await
    }

    /// A completed round-trip, if one is already waiting.
    pub fn try_recv(&mut self) -> Option<RemoteEvent> {
        self.rx.try_recv().ok()
    }

    /// Accept `event` if it is the newest of its stream, consuming the ticket.
    pub fn accept(&mut self, event: &RemoteEvent) -> bool {
        let current = match event.purpose {
            RemotePurpose::Suggest { .. } => &mut self.suggest_ticket,
            RemotePurpose::Lookup { .. } => &mut self.lookup_ticket,
        };
        if *current == Some(event.ticket) {
            *current = None;
            true
        } else {
            tracing::debug!(ticket = event.ticket, "dropping stale remote response");
            false
        }
    }

    fn issue_ticket(&mut self) -> u64 {
        self.next_ticket += 1;
        self.next_ticket
    }

    fn issue_suggest_ticket(&mut self) -> u64 {
        let ticket = self.issue_ticket();
        self.suggest_ticket = Some(ticket);
        ticket
    }

    fn request(
        &self,
        ticket: u64,
        purpose: RemotePurpose,
    ) -> impl std::future::Future<Output = ()> + Send + 'static {
        let source = Arc::clone(&self.source);
        let url = self.url.clone();
        let tx = self.tx.clone();
        async move {
            let query = match &purpose {
                RemotePurpose::Suggest { query } => query.as_str(),
                RemotePurpose::Lookup { .. } => "",
            };
            tracing::debug!(ticket, query, %url, "issuing remote search");
            let outcome = source.search(query, &url).await;
            if let Err(e) = &outcome {
                tracing::warn!(ticket, error = %e, "remote search failed");
            }
            let _ = tx.send(RemoteEvent {
                ticket,
                purpose,
                outcome,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AutocompleteError;
    use serde_json::json;
    use std::sync::Mutex;

    fn person(id: i64, name: &str) -> Item {
        Item::from_value(json!({"id": id, "name": name})).unwrap()
    }

    #[derive(Default)]
    struct RecordingSource {
        queries: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl RemoteSource for RecordingSource {
        async fn search(&self, query: &str, _source: &str) -> Result<Vec<Item>> {
            self.queries.lock().unwrap().push(query.to_string());
            if self.fail {
                return Err(AutocompleteError::transport("boom"));
            }
            Ok(vec![person(1, "Ann"), person(2, "Bob")])
        }
    }

    #[test]
    fn test_local_scenario_substring_case_insensitive() {
        let local = LocalSearch::new(vec![person(1, "Ann"), person(2, "Bob")]);
        let selection = SelectionState::new("id", false);
        assert_eq!(local.search("an", &selection), vec![person(1, "Ann")]);
        assert_eq!(local.search("BOB", &selection), vec![person(2, "Bob")]);
    }

    #[test]
    fn test_local_empty_query_matches_all() {
        let local = LocalSearch::new(vec![person(1, "Ann"), person(2, "Bob")]);
        let selection = SelectionState::new("id", false);
        assert_eq!(local.search("", &selection).len(), 2);
    }

    #[test]
    fn test_local_matches_any_field() {
        let local = LocalSearch::new(vec![
            Item::from_value(json!({"id": 1, "name": "Ann", "city": "Paris"})).unwrap(),
        ]);
        let selection = SelectionState::new("id", false);
        assert_eq!(local.search("pari", &selection).len(), 1);
        // field names are part of the serialized text too
        assert_eq!(local.search("city", &selection).len(), 1);
    }

    #[test]
    fn test_local_excludes_selected() {
        let local = LocalSearch::new(vec![person(1, "Ann"), person(2, "Bob"), person(3, "Cid")]);
        let mut selection = SelectionState::new("id", true);
        selection.select(person(2, "Bob"), 1).unwrap();
        for query in ["", "b", "o", "id"] {
            let found = local.search(query, &selection);
            assert!(found.iter().all(|i| !selection.contains(i)), "query {query:?}");
        }
    }

    #[test]
    fn test_local_search_is_idempotent() {
        let local = LocalSearch::new(vec![person(1, "Ann"), person(2, "Bob")]);
        let selection = SelectionState::new("id", false);
        assert_eq!(local.search("b", &selection), local.search("b", &selection));
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_burst_issues_one_call_with_last_query() {
        let source = Arc::new(RecordingSource::default());
        let mut remote = RemoteSearch::new(source.clone(), "http://api", Duration::from_millis(250));

        for query in ["a", "an", "ann"] {
            remote.schedule(query);
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        let event = remote.recv().await.unwrap();
        assert!(remote.accept(&event));
        assert_eq!(event.purpose, RemotePurpose::Suggest { query: "ann".to_string() });
        assert_eq!(*source.queries.lock().unwrap(), vec!["ann"]);
        assert!(remote.try_recv().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_stale_response_rejected() {
        let source = Arc::new(RecordingSource::default());
        let mut remote = RemoteSearch::new(source, "http://api", Duration::from_millis(10));

        remote.schedule("first");
        tokio::time::sleep(Duration::from_millis(50)).await;
        let stale = remote.recv().await.unwrap();

        remote.schedule("second");
        assert!(!remote.accept(&stale));
        assert!(remote.is_awaiting_suggestions());
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_failure_is_delivered() {
        let source = Arc::new(RecordingSource {
            fail: true,
            ..RecordingSource::default()
        });
        let mut remote = RemoteSearch::new(source, "http://api", Duration::from_millis(10));
        remote.search_now("x");

        let event = remote.recv().await.unwrap();
        assert!(remote.accept(&event));
        assert!(matches!(event.outcome, Err(AutocompleteError::SearchTransport(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_stream_independent_of_keystrokes() {
        let source = Arc::new(RecordingSource::default());
        let mut remote = RemoteSearch::new(source.clone(), "http://api", Duration::from_millis(100));

        remote.lookup(SelectedId::Single(2i64.into()));
        remote.schedule("bo");

        let lookup = remote.recv().await.unwrap();
        assert!(matches!(lookup.purpose, RemotePurpose::Lookup { .. }));
        assert!(remote.accept(&lookup));
        assert!(remote.is_awaiting_suggestions());
        assert_eq!(source.queries.lock().unwrap()[0], "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_firing_stops_awaiting() {
        let source = Arc::new(RecordingSource::default());
        let mut remote = RemoteSearch::new(source.clone(), "http://api", Duration::from_millis(100));

        remote.schedule("a");
        assert!(remote.cancel_pending());
        assert!(!remote.is_awaiting_suggestions());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(source.queries.lock().unwrap().is_empty());
        assert!(remote.try_recv().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_after_firing_keeps_request() {
        let source = Arc::new(RecordingSource::default());
        let mut remote = RemoteSearch::new(source, "http://api", Duration::from_millis(10));

        remote.schedule("a");
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!remote.cancel_pending());
        assert!(remote.is_awaiting_suggestions());

        let event = remote.recv().await.unwrap();
        assert!(remote.accept(&event));
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_lookup_response_rejected() {
        let source = Arc::new(RecordingSource::default());
        let mut remote = RemoteSearch::new(source, "http://api", Duration::from_millis(10));

        remote.lookup(SelectedId::Single(1i64.into()));
        remote.abandon_lookup();
        assert!(!remote.is_awaiting_lookup());

        let event = remote.recv().await.unwrap();
        assert!(!remote.accept(&event));
    }
}
