use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::Result;
use crate::item::{Item, display_text};

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#[A-Za-z0-9_.]+#").expect("valid placeholder regex"));

/// Scan `template` for `#path#` tokens, in textual order, duplicates kept.
pub fn extract_placeholders(template: &str) -> Vec<String> {
    PLACEHOLDER_RE
        .find_iter(template)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Render `template` for `item`, substituting each token in `placeholders`.
///
/// Tokens are replaced one occurrence at a time, in order, so a token that
/// appears twice in the template is listed twice and replaced twice.
pub fn render(template: &str, placeholders: &[String], item: &Item) -> Result<String> {
    let mut view = template.to_string();
    for token in placeholders {
        let path = token.trim_matches('#');
        let value = display_text(item.resolve_path(path)?);
        view = view.replacen(token.as_str(), &value, 1);
    }
    Ok(view)
}

/// A template string together with its placeholders, scanned once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    placeholders: Vec<String>,
}

impl Template {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let placeholders = extract_placeholders(&source);
        Self {
            source,
            placeholders,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn placeholders(&self) -> &[String] {
        &self.placeholders
    }

    pub fn render(&self, item: &Item) -> Result<String> {
        render(&self.source, &self.placeholders, item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AutocompleteError;
    use serde_json::json;

    fn item(value: serde_json::Value) -> Item {
        Item::from_value(value).unwrap()
    }

    #[test]
    fn test_extract_in_order_with_duplicates() {
        let found = extract_placeholders("<b>#name#</b> (#user.id#) #name#");
        assert_eq!(found, vec!["#name#", "#user.id#", "#name#"]);
    }

    #[test]
    fn test_extract_ignores_invalid_tokens() {
        assert!(extract_placeholders("# spaced # and ## and #a-b#").is_empty());
    }

    #[test]
    fn test_render_nested_path() {
        let tpl = Template::new("#user.name#");
        assert_eq!(tpl.render(&item(json!({"user": {"name": "X"}}))).unwrap(), "X");
    }

    #[test]
    fn test_render_missing_segment_fails() {
        let tpl = Template::new("#user.name#");
        let err = tpl.render(&item(json!({"user": {}}))).unwrap_err();
        assert!(matches!(err, AutocompleteError::FieldResolution { .. }));
    }

    #[test]
    fn test_render_repeated_token() {
        let tpl = Template::new("#name#/#name#");
        assert_eq!(tpl.render(&item(json!({"name": "Ann"}))).unwrap(), "Ann/Ann");
    }

    #[test]
    fn test_render_default_template_and_numbers() {
        let tpl = Template::new("<div>#name#</div> #id#");
        let view = tpl.render(&item(json!({"id": 3, "name": "Bob"}))).unwrap();
        assert_eq!(view, "<div>Bob</div> 3");
    }

    #[test]
    fn test_render_leaves_no_placeholder_behind() {
        let tpl = Template::new("#a# #b.c# #a# #b.d.e#");
        let view = tpl
            .render(&item(json!({"a": "1", "b": {"c": 2, "d": {"e": true}}})))
            .unwrap();
        assert_eq!(view, "1 2 1 true");
        assert!(extract_placeholders(&view).is_empty());
    }

    #[test]
    fn test_template_without_placeholders_is_literal() {
        let tpl = Template::new("static");
        assert_eq!(tpl.render(&Item::default()).unwrap(), "static");
    }
}
