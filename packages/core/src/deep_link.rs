//! # Deep-Link Builder
//!
//! Produces the editor URL that opens a record (and, when known, the exact
//! field and locale) in the CMS.
//!
//! ```text
//! <base>[/environments/<env>]/editor/[item_types/<type>/]items/<id>/edit[#fieldPath=<path>[.<locale>]]
//! ```
//!
//! An `editUrl` that already points at the same origin as the base is
//! trusted as-is; it only gets the locale merged into its field path.

use crate::errors::{DeepLinkError, DeepLinkResult};
use crate::field_path::{normalize_field_path_str, with_locale};
use crate::info::DecodedInfo;
use url::Url;

const FIELD_PATH_PARAM: &str = "fieldPath";

/// Parse and sanity-check a base editing URL.
pub fn parse_base_url(base_editing_url: &str) -> DeepLinkResult<Url> {
    let trimmed = base_editing_url.trim();
    if trimmed.is_empty() {
        return Err(DeepLinkError::EmptyBaseUrl);
    }

    let url = Url::parse(trimmed).map_err(|e| DeepLinkError::InvalidBaseUrl {
        url: trimmed.to_string(),
        reason: e.to_string(),
    })?;

    if url.cannot_be_a_base() {
        return Err(DeepLinkError::InvalidBaseUrl {
            url: trimmed.to_string(),
            reason: "URL cannot be used as a base".to_string(),
        });
    }

    Ok(url)
}

/// Build the editor link for `info`.
///
/// `environment` overrides whatever environment the metadata carries.
pub fn build_deep_link(
    info: &DecodedInfo,
    base_editing_url: &str,
    environment: Option<&str>,
) -> DeepLinkResult<String> {
    let base = parse_base_url(base_editing_url)?;
    let locale = info.locale.as_deref();

    if let Some(edit_url) = info.edit_url.as_deref() {
        let same_origin = Url::parse(edit_url)
            .map(|parsed| parsed.origin() == base.origin())
            .unwrap_or(false);
        if same_origin {
            return Ok(merge_locale(edit_url, info.field_path.as_deref(), locale));
        }
    }

    let item_id = info
        .item_id
        .as_deref()
        .ok_or(DeepLinkError::MissingItemId)?;
    let environment = environment
        .filter(|e| !e.trim().is_empty())
        .or(info.environment.as_deref());

    let mut url = base;
    url.set_query(None);
    url.set_fragment(None);
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| DeepLinkError::InvalidBaseUrl {
                url: base_editing_url.to_string(),
                reason: "URL cannot be used as a base".to_string(),
            })?;
        segments.pop_if_empty();
        if let Some(env) = environment {
            segments.extend(["environments", env]);
        }
        segments.push("editor");
        if let Some(item_type_id) = info.item_type_id.as_deref() {
            segments.extend(["item_types", item_type_id]);
        }
        segments.extend(["items", item_id, "edit"]);
    }

    if let Some(path) = info.field_path.as_deref() {
        let fragment = format!("{}={}", FIELD_PATH_PARAM, with_locale(path, locale));
        url.set_fragment(Some(&fragment));
    }

    Ok(url.into())
}

/// Merge the locale into an existing link's `fieldPath` fragment.
///
/// Without a locale, or when the path already ends with it, the link comes
/// back byte-identical. Other fragment parameters keep their order.
fn merge_locale(edit_url: &str, field_path: Option<&str>, locale: Option<&str>) -> String {
    if locale.map_or(true, str::is_empty) {
        return edit_url.to_string();
    }

    let (head, fragment) = match edit_url.split_once('#') {
        Some((head, fragment)) => (head, fragment),
        None => (edit_url, ""),
    };

    let mut params: Vec<(String, Option<String>)> = fragment
        .split('&')
        .filter(|part| !part.is_empty())
        .map(|part| match part.split_once('=') {
            Some((key, value)) => (key.to_string(), Some(value.to_string())),
            None => (part.to_string(), None),
        })
        .collect();

    let existing = params.iter().position(|(key, _)| key == FIELD_PATH_PARAM);
    let current = existing
        .and_then(|i| params[i].1.as_deref())
        .and_then(normalize_field_path_str)
        .or_else(|| field_path.map(str::to_string));

    let Some(path) = current else {
        return edit_url.to_string();
    };
    let merged = with_locale(&path, locale);

    match existing {
        Some(i) if params[i].1.as_deref() == Some(merged.as_str()) => {
            return edit_url.to_string();
        }
        Some(i) => params[i].1 = Some(merged),
        None => params.push((FIELD_PATH_PARAM.to_string(), Some(merged))),
    }

    let fragment = params
        .into_iter()
        .map(|(key, value)| match value {
            Some(value) => format!("{}={}", key, value),
            None => key,
        })
        .collect::<Vec<_>>()
        .join("&");

    format!("{}#{}", head, fragment)
}
