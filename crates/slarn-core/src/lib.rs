pub mod autocomplete;
pub mod config;
pub mod debounce;
pub mod error;
pub mod item;
pub mod keys;
pub mod notify;
pub mod search;
pub mod selection;
pub mod template;

pub use autocomplete::Autocomplete;
pub use config::{Configuration, DataSource, RawConfiguration};
pub use debounce::Debouncer;
pub use error::{AutocompleteError, Result};
pub use item::{Item, ItemKey};
pub use notify::ChangeNotifier;
pub use search::{LocalSearch, RemoteEvent, RemotePurpose, RemoteSearch, RemoteSource};
pub use selection::{SelectedEntry, SelectedId, SelectedItems, SelectionState};
pub use template::{Template, extract_placeholders, render};
