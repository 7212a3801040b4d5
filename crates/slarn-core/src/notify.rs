use crate::selection::{SelectedId, SelectedItems};

pub type ItemListener = Box<dyn FnMut(&SelectedItems) + Send>;
pub type ChangeCallback = Box<dyn FnMut(&SelectedId) + Send>;
pub type TouchedCallback = Box<dyn FnMut() + Send>;

/// Fans selection changes out to item listeners and the form binding.
#[derive(Default)]
pub struct ChangeNotifier {
    item_listeners: Vec<ItemListener>,
    on_change: Option<ChangeCallback>,
    on_touched: Option<TouchedCallback>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to the selected item(s) projection.
    pub fn subscribe(&mut self, listener: impl FnMut(&SelectedItems) + Send + 'static) {
        self.item_listeners.push(Box::new(listener));
    }

    /// Register the form binding that receives raw id values.
    pub fn register_on_change(&mut self, callback: impl FnMut(&SelectedId) + Send + 'static) {
        self.on_change = Some(Box::new(callback));
    }

    pub fn unregister_on_change(&mut self) {
        self.on_change = None;
    }

    /// Accepted for forms API parity; never invoked.
    pub fn register_on_touched(&mut self, callback: impl FnMut() + Send + 'static) {
        self.on_touched = Some(Box::new(callback));
    }

    pub fn has_form_binding(&self) -> bool {
        self.on_change.is_some()
    }

    /// Item listeners first, then the form binding if one is registered.
    pub fn notify(&mut self, items: &SelectedItems, id: &SelectedId) {
        for listener in &mut self.item_listeners {
            listener(items);
        }
        if let Some(callback) = self.on_change.as_mut() {
            callback(id);
        }
    }
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("item_listeners", &self.item_listeners.len())
            .field("on_change", &self.on_change.is_some())
            .field("on_touched", &self.on_touched.is_some())
            .finish()
    }
}
