use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AutocompleteError, Result};
use crate::item::Item;
use crate::template::Template;

pub const DEFAULT_EMPTY_LIST_VIEW: &str = "No match found!";
pub const DEFAULT_LOADING_VIEW: &str = "Loading data...";
pub const DEFAULT_DEBOUNCE_MS: u64 = 250;

/// Control configuration as supplied by the embedding application.
///
/// Accepts both snake_case and the camelCase spellings used by web forms.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawConfiguration {
    /// Field used as the identity of an item.
    pub key: String,
    /// Field shown in the input once an item is picked.
    pub value: String,
    /// Suggestion template with `#field.path#` placeholders.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Deprecated, kept so existing configurations still parse.
    #[serde(alias = "placeHolder", skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiple: Option<bool>,
    #[serde(alias = "loadingView", skip_serializing_if = "Option::is_none")]
    pub loading_view: Option<String>,
    #[serde(alias = "emptyListView", skip_serializing_if = "Option::is_none")]
    pub empty_list_view: Option<String>,
    #[serde(alias = "debounceMs", skip_serializing_if = "Option::is_none")]
    pub debounce_ms: Option<u64>,
    /// Local mode: the full candidate list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Item>>,
    /// Remote mode: the search endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Where candidates come from.
#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    Local(Vec<Item>),
    Remote(String),
}

impl DataSource {
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}

/// Normalized, immutable configuration. Every optional field is filled.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub key: String,
    pub value: String,
    pub template: Template,
    pub name: Option<String>,
    pub placeholder: Option<String>,
    pub multiple: bool,
    pub loading_view: String,
    pub empty_list_view: String,
    pub debounce: Duration,
    pub source: DataSource,
}

impl RawConfiguration {
    /// Local-mode configuration over `data`.
    pub fn local(key: &str, value: &str, data: Vec<Item>) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
            data: Some(data),
            ..Self::default()
        }
    }

    /// Remote-mode configuration against `url`.
    pub fn remote(key: &str, value: &str, url: &str) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
            url: Some(url.to_string()),
            ..Self::default()
        }
    }

    pub fn with_multiple(mut self, multiple: bool) -> Self {
        self.multiple = Some(multiple);
        self
    }

    pub fn with_template(mut self, template: &str) -> Self {
        self.template = Some(template.to_string());
        self
    }

    pub fn with_debounce_ms(mut self, debounce_ms: u64) -> Self {
        self.debounce_ms = Some(debounce_ms);
        self
    }

    /// Load from a `.json` file, or TOML for any other extension.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        if is_json {
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(toml::from_str(&contents)?)
        }
    }

    /// Standard config file path: `~/.config/slarn/config.toml`
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("SLARN_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("slarn")
            .join("config.toml")
    }

    /// Fill defaults and validate. Exactly one of `data`/`url` must be set.
    pub fn normalize(self) -> Result<Configuration> {
        if self.key.is_empty() {
            return Err(AutocompleteError::configuration("\"key\" must be set"));
        }
        if self.value.is_empty() {
            return Err(AutocompleteError::configuration("\"value\" must be set"));
        }

        let source = match (self.data, self.url) {
            (Some(data), None) => DataSource::Local(data),
            (None, Some(url)) if !url.is_empty() => DataSource::Remote(url),
            (None, Some(_)) => {
                return Err(AutocompleteError::configuration("\"url\" must not be empty"));
            }
            (Some(_), Some(_)) => {
                return Err(AutocompleteError::configuration(
                    "set either \"data\" or \"url\", not both",
                ));
            }
            (None, None) => {
                return Err(AutocompleteError::configuration(
                    "one of \"data\" or \"url\" is required",
                ));
            }
        };

        let template = self
            .template
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| format!("<div>#{}#</div>", self.value));

        Ok(Configuration {
            key: self.key,
            value: self.value,
            template: Template::new(template),
            name: self.name,
            placeholder: self.placeholder,
            multiple: self.multiple.unwrap_or(false),
            loading_view: self
                .loading_view
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_LOADING_VIEW.to_string()),
            empty_list_view: self
                .empty_list_view
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_EMPTY_LIST_VIEW.to_string()),
            debounce: Duration::from_millis(self.debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS)),
            source,
        })
    }
}

impl Configuration {
    pub fn is_remote(&self) -> bool {
        self.source.is_remote()
    }
}
