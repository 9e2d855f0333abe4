use crate::errors::ConfigError;
use crate::overlay::OverlayMode;
use content_link_dom::NodeId;
use serde::{Deserialize, Serialize};
use url::Url;

/// Controller options, as they arrive from the embedding page
///
/// ```json
/// { "baseEditingUrl": "https://acme.admin.datocms.com", "environment": "staging", "overlay": "hover" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentLinkOptions {
    /// Editor origin every deep link is built on
    #[serde(default)]
    pub base_editing_url: String,

    /// Environment written into generated links
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,

    /// Subtree to manage; the document when unset
    #[serde(skip)]
    pub root: Option<NodeId>,

    /// Stamp debug attributes explaining each match
    #[serde(default)]
    pub debug: bool,

    /// Enable right after construction
    #[serde(default = "default_true")]
    pub auto_enable: bool,

    /// Diagnostics panel settings, kept for the panel itself
    #[serde(default)]
    pub dev_panel: DevPanelOption,

    /// Keep metadata when a framework strips markers but leaves the text
    #[serde(default = "default_true")]
    pub persist_after_clean: bool,

    #[serde(default)]
    pub overlay: OverlayMode,
}

fn default_true() -> bool {
    true
}

/// `devPanel: true` or `devPanel: { "position": "bottom-right" }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DevPanelOption {
    Enabled(bool),
    Positioned { position: DevPanelPosition },
}

impl Default for DevPanelOption {
    fn default() -> Self {
        DevPanelOption::Enabled(false)
    }
}

impl DevPanelOption {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, DevPanelOption::Enabled(false))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DevPanelPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
}

impl ContentLinkOptions {
    pub fn new(base_editing_url: impl Into<String>) -> Self {
        Self {
            base_editing_url: base_editing_url.into(),
            environment: None,
            root: None,
            debug: false,
            auto_enable: true,
            dev_panel: DevPanelOption::default(),
            persist_after_clean: true,
            overlay: OverlayMode::default(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Options(e.to_string()))
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    pub fn with_root(mut self, root: NodeId) -> Self {
        self.root = Some(root);
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_auto_enable(mut self, auto_enable: bool) -> Self {
        self.auto_enable = auto_enable;
        self
    }

    pub fn with_persist_after_clean(mut self, persist: bool) -> Self {
        self.persist_after_clean = persist;
        self
    }

    pub fn with_overlay(mut self, overlay: OverlayMode) -> Self {
        self.overlay = overlay;
        self
    }

    /// Check the base URL: present, parseable, http(s).
    pub fn validate(&self) -> Result<Url, ConfigError> {
        let raw = self.base_editing_url.trim();
        if raw.is_empty() {
            return Err(ConfigError::MissingBaseUrl);
        }

        let url = Url::parse(raw).map_err(|e| ConfigError::InvalidBaseUrl {
            url: raw.to_string(),
            reason: e.to_string(),
        })?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            _ => Err(ConfigError::UnsupportedScheme {
                url: raw.to_string(),
            }),
        }
    }

    /// Environment, when set to something non-blank.
    pub fn environment(&self) -> Option<&str> {
        self.environment
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_options() {
        let json = r#"{
            "baseEditingUrl": "https://acme.admin.datocms.com",
            "environment": "staging",
            "debug": true,
            "devPanel": { "position": "top-left" },
            "overlay": "off"
        }"#;

        let options = ContentLinkOptions::from_json(json).unwrap();
        assert_eq!(options.environment(), Some("staging"));
        assert!(options.debug);
        assert!(options.auto_enable);
        assert!(options.persist_after_clean);
        assert_eq!(options.overlay, OverlayMode::Off);
        assert_eq!(
            options.dev_panel,
            DevPanelOption::Positioned {
                position: DevPanelPosition::TopLeft
            }
        );
        assert!(options.dev_panel.is_enabled());
    }

    #[test]
    fn test_dev_panel_bool() {
        let options =
            ContentLinkOptions::from_json(r#"{"baseEditingUrl":"https://a.b","devPanel":true}"#)
                .unwrap();
        assert_eq!(options.dev_panel, DevPanelOption::Enabled(true));
    }

    #[test]
    fn test_validate() {
        assert_eq!(
            ContentLinkOptions::new("").validate(),
            Err(ConfigError::MissingBaseUrl)
        );
        assert!(matches!(
            ContentLinkOptions::new("not a url").validate(),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));
        assert!(matches!(
            ContentLinkOptions::new("ftp://acme.admin.datocms.com").validate(),
            Err(ConfigError::UnsupportedScheme { .. })
        ));
        assert!(ContentLinkOptions::new("https://acme.admin.datocms.com")
            .validate()
            .is_ok());
    }

    #[test]
    fn test_malformed_json_is_config_error() {
        assert!(matches!(
            ContentLinkOptions::from_json("{"),
            Err(ConfigError::Options(_))
        ));
    }
}
