//! # Marker Codec
//!
//! Turns marker payloads into [`DecodedInfo`].
//!
//! Payloads come in two flavours. Newer ones spell the fields out:
//!
//! ```json
//! { "itemId": "123", "itemTypeId": "post", "fieldPath": "title", "locale": "en" }
//! ```
//!
//! Older ones only carry the editor link, and the fields have to be read
//! back out of it:
//!
//! ```json
//! { "origin": "datocms.com",
//!   "href": "https://acme.admin.datocms.com/environments/main/editor/item_types/post/items/123/edit#fieldPath=title.en" }
//! ```
//!
//! Decoding never fails loudly. Anything that does not yield an item id or
//! an edit URL is simply `None`; a malformed marker must not break rendering.

use crate::field_path::normalize_field_path;
use crate::info::{DecodedInfo, InfoFields};
use content_link_stega::{self as stega, StegaSplit};
use serde_json::{Map, Value};
use url::Url;

/// Registrable domain of the CMS; editor links live on its subdomains.
pub const CMS_DOMAIN: &str = "datocms.com";

/// Decode the first marker in `text`.
///
/// `precomputed` lets callers that already split the text (to get the
/// cleaned value) skip a second scan.
pub fn decode(text: &str, precomputed: Option<&StegaSplit>) -> Option<DecodedInfo> {
    if text.is_empty() {
        return None;
    }

    let owned;
    let split = match precomputed {
        Some(split) => split,
        None => {
            owned = stega::split(text);
            &owned
        }
    };

    let encoded = split.encoded.as_deref()?;
    let raw = stega::decode_encoded(encoded).ok()?;
    info_from_payload(raw)
}

/// Visible text with the marker removed; `text` itself when there is none.
pub fn strip(text: &str, precomputed: Option<&StegaSplit>) -> String {
    match precomputed {
        Some(split) => split.cleaned.clone(),
        None => stega::strip(text),
    }
}

/// Build edit metadata from a decoded payload object.
pub fn info_from_payload(raw: Value) -> Option<DecodedInfo> {
    let object = raw.as_object()?;
    let mut fields = fields_from_object(object);

    if let Some(derived) = object
        .get("href")
        .and_then(Value::as_str)
        .and_then(derive_from_href)
    {
        fields.fill_missing(derived);
    }

    DecodedInfo::new(fields, raw)
}

/// Read the camelCase metadata keys of a payload or an edit-info attribute.
pub(crate) fn fields_from_object(object: &Map<String, Value>) -> InfoFields {
    InfoFields {
        item_id: string_field(object, "itemId"),
        item_type_id: string_field(object, "itemTypeId"),
        field_path: object.get("fieldPath").and_then(normalize_field_path),
        locale: string_field(object, "locale"),
        environment: string_field(object, "environment"),
        edit_url: string_field(object, "editUrl"),
    }
}

fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    match object.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn is_cms_host(host: &str) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    host == CMS_DOMAIN || host.ends_with(&format!(".{}", CMS_DOMAIN))
}

/// Recover metadata from an editor link on the CMS domain.
///
/// Reads `environments/<env>`, `item_types/<id>` and `items/<id>` pairs from
/// the path and `fieldPath` from the fragment.
pub fn derive_from_href(href: &str) -> Option<InfoFields> {
    let url = Url::parse(href).ok()?;
    if !is_cms_host(url.host_str()?) {
        return None;
    }

    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    let mut fields = InfoFields {
        edit_url: Some(href.to_string()),
        ..Default::default()
    };

    let mut i = 0;
    while i + 1 < segments.len() {
        let value = Some(segments[i + 1].to_string());
        match segments[i] {
            "environments" => fields.environment = value,
            "item_types" => fields.item_type_id = value,
            "items" => fields.item_id = value,
            _ => {
                i += 1;
                continue;
            }
        }
        i += 2;
    }

    if let Some(fragment) = url.fragment() {
        fields.field_path = url::form_urlencoded::parse(fragment.as_bytes())
            .find(|(key, _)| key == "fieldPath")
            .and_then(|(_, value)| normalize_field_path(&Value::String(value.into_owned())));
    }

    Some(fields)
}
