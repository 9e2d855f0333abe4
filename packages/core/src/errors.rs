//! Error types for the content link engine

use thiserror::Error;

/// Problems with the options a controller was built from.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("baseEditingUrl is required")]
    MissingBaseUrl,

    #[error("baseEditingUrl '{url}' is not a valid URL: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("baseEditingUrl '{url}' must use http or https")]
    UnsupportedScheme { url: String },

    #[error("Invalid options: {0}")]
    Options(String),
}

/// Why an editor link could not be produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeepLinkError {
    #[error("Base editing URL is empty")]
    EmptyBaseUrl,

    #[error("Base editing URL '{url}' is invalid: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("Cannot build an editor link without an item id or a same-origin edit URL")]
    MissingItemId,
}

pub type DeepLinkResult<T> = Result<T, DeepLinkError>;

#[derive(Error, Debug)]
pub enum ContentLinkError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Deep link error: {0}")]
    DeepLink(#[from] DeepLinkError),

    #[error("Controller has been disposed")]
    Disposed,
}

pub type ContentLinkResult<T> = Result<T, ContentLinkError>;
