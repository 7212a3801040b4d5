use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AutocompleteError, Result};
use crate::item::{Item, ItemKey};

/// A picked item and the position it held in the suggestion list, so that
/// removing it from the selection can put it back where it was.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedEntry {
    pub item: Item,
    pub origin_index: usize,
}

/// The externally bound "selected id(s)" value.
///
/// Serializes as `null`, a scalar, or an array.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum SelectedId {
    #[default]
    Unset,
    Single(ItemKey),
    Multiple(Vec<ItemKey>),
}

impl SelectedId {
    /// Validate a raw id value against the selection mode.
    ///
    /// `null` unsets. A scalar is wrapped when `multiple` is set; an array
    /// is rejected when it is not. Only numbers and strings are legal ids.
    pub fn parse(value: &Value, multiple: bool) -> Result<Self> {
        let invalid_type = || {
            AutocompleteError::configuration(
                "the type of \"selectedId\" must be number, string or array of numbers or strings",
            )
        };

        match value {
            Value::Null => Ok(Self::Unset),
            Value::Array(_) if !multiple => Err(AutocompleteError::configuration(
                "an array was passed as \"selectedId\"; pass a single value or enable \"multiple\"",
            )),
            Value::Array(elements) => elements
                .iter()
                .map(|e| ItemKey::from_value(e).ok_or_else(invalid_type))
                .collect::<Result<Vec<_>>>()
                .map(Self::Multiple),
            scalar => {
                let key = ItemKey::from_value(scalar).ok_or_else(invalid_type)?;
                Ok(if multiple {
                    Self::Multiple(vec![key])
                } else {
                    Self::Single(key)
                })
            }
        }
    }

    pub fn is_unset(&self) -> bool {
        match self {
            Self::Unset => true,
            Self::Single(_) => false,
            Self::Multiple(keys) => keys.is_empty(),
        }
    }

    pub fn keys(&self) -> &[ItemKey] {
        match self {
            Self::Unset => &[],
            Self::Single(key) => std::slice::from_ref(key),
            Self::Multiple(keys) => keys,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Unset => Value::Null,
            Self::Single(key) => key.to_value(),
            Self::Multiple(keys) => Value::Array(keys.iter().map(ItemKey::to_value).collect()),
        }
    }
}

/// The externally visible "selected item(s)" projection.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum SelectedItems {
    #[default]
    None,
    Single(Item),
    Multiple(Vec<Item>),
}

impl SelectedItems {
    pub fn items(&self) -> &[Item] {
        match self {
            Self::None => &[],
            Self::Single(item) => std::slice::from_ref(item),
            Self::Multiple(items) => items,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Selection {
    Single {
        id: Option<ItemKey>,
        item: Option<Item>,
    },
    Multiple {
        ids: Vec<ItemKey>,
        entries: Vec<SelectedEntry>,
    },
}

/// Owns the selected id(s) and item(s) and keeps them consistent.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionState {
    key: String,
    selection: Selection,
}

impl SelectionState {
    pub fn new(key: impl Into<String>, multiple: bool) -> Self {
        let selection = if multiple {
            Selection::Multiple {
                ids: Vec::new(),
                entries: Vec::new(),
            }
        } else {
            Selection::Single {
                id: None,
                item: None,
            }
        };
        Self {
            key: key.into(),
            selection,
        }
    }

    pub fn is_multiple(&self) -> bool {
        matches!(self.selection, Selection::Multiple { .. })
    }

    pub fn key_field(&self) -> &str {
        &self.key
    }

    pub fn is_empty(&self) -> bool {
        self.selected_id().is_unset()
    }

    pub fn selected_id(&self) -> SelectedId {
        match &self.selection {
            Selection::Single { id: Some(id), .. } => SelectedId::Single(id.clone()),
            Selection::Single { id: None, .. } => SelectedId::Unset,
            Selection::Multiple { ids, .. } if ids.is_empty() => SelectedId::Unset,
            Selection::Multiple { ids, .. } => SelectedId::Multiple(ids.clone()),
        }
    }

    /// Selection records in multiple mode; empty in single mode.
    pub fn entries(&self) -> &[SelectedEntry] {
        match &self.selection {
            Selection::Multiple { entries, .. } => entries,
            Selection::Single { .. } => &[],
        }
    }

    /// The selected item(s) as seen from outside.
    pub fn project(&self) -> SelectedItems {
        match &self.selection {
            Selection::Single { item: Some(item), .. } => SelectedItems::Single(item.clone()),
            Selection::Single { item: None, .. } => SelectedItems::None,
            Selection::Multiple { entries, .. } if entries.is_empty() => SelectedItems::None,
            Selection::Multiple { entries, .. } => {
                SelectedItems::Multiple(entries.iter().map(|e| e.item.clone()).collect())
            }
        }
    }

    /// Whether an item with the same identity as `item` is selected.
    pub fn contains(&self, item: &Item) -> bool {
        let Some(candidate) = item.key(&self.key) else {
            return false;
        };
        match &self.selection {
            Selection::Single { item: Some(selected), .. } => {
                selected.key(&self.key).as_ref() == Some(&candidate)
            }
            Selection::Single { item: None, .. } => false,
            Selection::Multiple { entries, .. } => entries
                .iter()
                .any(|e| e.item.key(&self.key).as_ref() == Some(&candidate)),
        }
    }

    /// Record a pick. Returns `false` if the item was already selected in
    /// multiple mode and nothing changed.
    pub fn select(&mut self, item: Item, origin_index: usize) -> Result<bool> {
        let key = item.require_key(&self.key)?;
        let changed = match &mut self.selection {
            Selection::Single { id, item: current } => {
                *id = Some(key);
                *current = Some(item);
                true
            }
            Selection::Multiple { ids, entries } => {
                if ids.contains(&key) {
                    tracing::debug!(%key, "item already selected");
                    false
                } else {
                    ids.push(key);
                    entries.push(SelectedEntry { item, origin_index });
                    true
                }
            }
        };
        self.debug_check();
        Ok(changed)
    }

    /// Remove the entry at `position` (multiple mode only) and return it.
    pub fn deselect(&mut self, position: usize) -> Result<SelectedEntry> {
        let Selection::Multiple { ids, entries } = &mut self.selection else {
            return Err(AutocompleteError::NotMultiple);
        };
        if position >= entries.len() {
            return Err(AutocompleteError::SelectionOutOfRange {
                position,
                len: entries.len(),
            });
        }

        ids.remove(position);
        let entry = entries.remove(position);
        self.debug_check();
        Ok(entry)
    }

    pub fn clear(&mut self) {
        match &mut self.selection {
            Selection::Single { id, item } => {
                *id = None;
                *item = None;
            }
            Selection::Multiple { ids, entries } => {
                ids.clear();
                entries.clear();
            }
        }
    }

    /// Rebuild the selection for `ids` from `candidates`.
    ///
    /// Multiple mode keeps every candidate whose key is listed, in candidate
    /// order, recording its candidate index as origin; ids that match nothing
    /// are dropped so ids and entries stay paired. Single mode keeps the id
    /// even when no candidate matches, leaving the item unset.
    pub fn reconstruct(&mut self, wanted: &SelectedId, candidates: &[Item]) {
        let key_field = self.key.clone();
        match &mut self.selection {
            Selection::Single { id, item } => {
                *id = wanted.keys().first().cloned();
                *item = id.as_ref().and_then(|wanted_key| {
                    candidates
                        .iter()
                        .rev()
                        .find(|c| c.key(&key_field).as_ref() == Some(wanted_key))
                        .cloned()
                });
                if let (Some(wanted_key), None) = (id.as_ref(), item.as_ref()) {
                    tracing::warn!(%wanted_key, "selected id matches no available item");
                }
            }
            Selection::Multiple { ids, entries } => {
                let wanted_keys = wanted.keys();
                *entries = candidates
                    .iter()
                    .enumerate()
                    .filter(|(_, c)| c.key(&key_field).is_some_and(|k| wanted_keys.contains(&k)))
                    .map(|(origin_index, c)| SelectedEntry {
                        item: c.clone(),
                        origin_index,
                    })
                    .collect();
                *ids = entries
                    .iter()
                    .filter_map(|e| e.item.key(&key_field))
                    .collect();

                let missing = wanted_keys.iter().filter(|k| !ids.contains(k)).count();
                if missing > 0 {
                    tracing::warn!(missing, "selected ids match no available item");
                }
            }
        }
        self.debug_check();
    }

    fn debug_check(&self) {
        if let Selection::Multiple { ids, entries } = &self.selection {
            debug_assert_eq!(ids.len(), entries.len());
            debug_assert!(
                ids.iter()
                    .zip(entries)
                    .all(|(id, e)| e.item.key(&self.key).as_ref() == Some(id))
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn person(id: i64, name: &str) -> Item {
        Item::from_value(json!({"id": id, "name": name})).unwrap()
    }

    fn assert_paired(state: &SelectionState) {
        let ids = state.selected_id();
        let keys: Vec<ItemKey> = state.entries().iter().map(|e| e.item.key("id").unwrap()).collect();
        assert_eq!(ids.keys(), keys.as_slice());
    }

    #[test]
    fn test_parse_scalar_single() {
        assert_eq!(
            SelectedId::parse(&json!(2), false).unwrap(),
            SelectedId::Single(ItemKey::from(2i64))
        );
    }

    #[test]
    fn test_parse_wraps_scalar_in_multiple_mode() {
        assert_eq!(
            SelectedId::parse(&json!("a"), true).unwrap(),
            SelectedId::Multiple(vec![ItemKey::from("a")])
        );
    }

    #[test]
    fn test_parse_rejects_array_in_single_mode() {
        let err = SelectedId::parse(&json!([1, 2]), false).unwrap_err();
        assert!(matches!(err, AutocompleteError::Configuration(_)));
    }

    #[test]
    fn test_parse_rejects_structured_ids() {
        assert!(SelectedId::parse(&json!({"id": 1}), false).is_err());
        assert!(SelectedId::parse(&json!({"id": 1}), true).is_err());
        assert!(SelectedId::parse(&json!([1, {"id": 2}]), true).is_err());
        assert!(SelectedId::parse(&json!([1, null]), true).is_err());
        assert!(SelectedId::parse(&json!(true), false).is_err());
    }

    #[test]
    fn test_parse_null_unsets() {
        assert!(SelectedId::parse(&json!(null), true).unwrap().is_unset());
    }

    #[test]
    fn test_selected_id_serializes_like_form_value() {
        let ids = SelectedId::Multiple(vec![1i64.into(), "x".into()]);
        assert_eq!(serde_json::to_value(&ids).unwrap(), json!([1, "x"]));
        assert_eq!(serde_json::to_value(SelectedId::Unset).unwrap(), json!(null));
    }

    #[test]
    fn test_single_select_replaces() {
        let mut state = SelectionState::new("id", false);
        state.select(person(1, "Ann"), 0).unwrap();
        state.select(person(2, "Bob"), 1).unwrap();
        assert_eq!(state.selected_id(), SelectedId::Single(2i64.into()));
        assert_eq!(state.project(), SelectedItems::Single(person(2, "Bob")));
    }

    #[test]
    fn test_multiple_select_and_deselect_stay_paired() {
        let mut state = SelectionState::new("id", true);
        state.select(person(1, "Ann"), 0).unwrap();
        state.select(person(2, "Bob"), 0).unwrap();
        state.select(person(3, "Cid"), 2).unwrap();
        assert_paired(&state);

        let removed = state.deselect(1).unwrap();
        assert_eq!(removed.item, person(2, "Bob"));
        assert_eq!(removed.origin_index, 0);
        assert_paired(&state);
        assert_eq!(
            state.project(),
            SelectedItems::Multiple(vec![person(1, "Ann"), person(3, "Cid")])
        );

        state.deselect(0).unwrap();
        state.deselect(0).unwrap();
        assert_eq!(state.selected_id(), SelectedId::Unset);
        assert_eq!(state.project(), SelectedItems::None);
    }

    #[test]
    fn test_duplicate_select_is_ignored() {
        let mut state = SelectionState::new("id", true);
        assert!(state.select(person(1, "Ann"), 0).unwrap());
        assert!(!state.select(person(1, "Ann"), 0).unwrap());
        assert_eq!(state.entries().len(), 1);
    }

    #[test]
    fn test_select_requires_key() {
        let mut state = SelectionState::new("id", true);
        let keyless = Item::from_value(json!({"name": "Nobody"})).unwrap();
        assert!(state.select(keyless, 0).is_err());
        assert!(state.is_empty());
    }

    #[test]
    fn test_deselect_errors() {
        let mut single = SelectionState::new("id", false);
        assert!(matches!(single.deselect(0), Err(AutocompleteError::NotMultiple)));

        let mut multiple = SelectionState::new("id", true);
        assert!(matches!(
            multiple.deselect(0),
            Err(AutocompleteError::SelectionOutOfRange { position: 0, len: 0 })
        ));
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut state = SelectionState::new("id", true);
        state.select(person(1, "Ann"), 0).unwrap();
        state.clear();
        let once = state.clone();
        state.clear();
        assert_eq!(state, once);
        assert!(state.is_empty());
    }

    #[test]
    fn test_contains_by_key() {
        let mut state = SelectionState::new("id", true);
        state.select(person(1, "Ann"), 0).unwrap();
        assert!(state.contains(&person(1, "Renamed")));
        assert!(!state.contains(&person(2, "Bob")));
    }

    #[test]
    fn test_reconstruct_single() {
        let data = vec![person(1, "Ann"), person(2, "Bob")];
        let mut state = SelectionState::new("id", false);
        state.reconstruct(&SelectedId::Single(2i64.into()), &data);
        assert_eq!(state.project(), SelectedItems::Single(person(2, "Bob")));
    }

    #[test]
    fn test_reconstruct_single_unknown_keeps_id() {
        let data = vec![person(1, "Ann")];
        let mut state = SelectionState::new("id", false);
        state.reconstruct(&SelectedId::Single(9i64.into()), &data);
        assert_eq!(state.selected_id(), SelectedId::Single(9i64.into()));
        assert_eq!(state.project(), SelectedItems::None);
    }

    #[test]
    fn test_reconstruct_multiple_uses_data_order_and_drops_unknown() {
        let data = vec![person(1, "Ann"), person(2, "Bob"), person(3, "Cid")];
        let mut state = SelectionState::new("id", true);
        let wanted = SelectedId::Multiple(vec![3i64.into(), 9i64.into(), 1i64.into()]);
        state.reconstruct(&wanted, &data);

        assert_eq!(
            state.selected_id(),
            SelectedId::Multiple(vec![1i64.into(), 3i64.into()])
        );
        assert_eq!(state.entries()[1].origin_index, 2);
        assert_paired(&state);
    }

    #[test]
    fn test_reconstruct_unset_clears() {
        let data = vec![person(1, "Ann")];
        let mut state = SelectionState::new("id", true);
        state.select(person(1, "Ann"), 0).unwrap();
        state.reconstruct(&SelectedId::Unset, &data);
        assert!(state.is_empty());
    }
}
