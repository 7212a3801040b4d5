//! Key codes that decide whether a key-up runs a search.

/// Delete, quote, backspace and space.
pub const SEARCH_TRIGGER_KEYS: [u32; 4] = [46, 222, 8, 32];

/// Alphanumeric keys (including the numpad) and the trigger keys search.
/// Arrow keys move through suggestions and never do.
pub fn is_search_trigger(code: u32) -> bool {
    (48..=105).contains(&code) || SEARCH_TRIGGER_KEYS.contains(&code)
}
