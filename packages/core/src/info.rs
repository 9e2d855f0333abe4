//! Edit metadata carried by markers and explicit tags.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which CMS produced the metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CmsTag {
    #[default]
    Datocms,
}

/// Loose metadata fields before the item-id/edit-url invariant is checked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InfoFields {
    pub item_id: Option<String>,
    pub item_type_id: Option<String>,
    pub field_path: Option<String>,
    pub locale: Option<String>,
    pub environment: Option<String>,
    pub edit_url: Option<String>,
}

impl InfoFields {
    /// Take values from `other` only where `self` has none.
    pub fn fill_missing(&mut self, other: InfoFields) {
        fn fill(slot: &mut Option<String>, value: Option<String>) {
            if slot.is_none() {
                *slot = value;
            }
        }
        fill(&mut self.item_id, other.item_id);
        fill(&mut self.item_type_id, other.item_type_id);
        fill(&mut self.field_path, other.field_path);
        fill(&mut self.locale, other.locale);
        fill(&mut self.environment, other.environment);
        fill(&mut self.edit_url, other.edit_url);
    }

    /// Overwrite with every value `other` has.
    pub fn override_with(&mut self, other: InfoFields) {
        let mut merged = other;
        merged.fill_missing(std::mem::take(self));
        *self = merged;
    }
}

/// Decoded edit metadata for one piece of content.
///
/// Always has a non-empty `item_id` or a non-empty `edit_url`; the only way
/// to build one is [`DecodedInfo::new`], which enforces that.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedInfo {
    pub cms: CmsTag,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_type_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_path: Option<String>,
    pub locale: Option<String>,
    pub environment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edit_url: Option<String>,
    /// Payload exactly as found
    pub raw: Value,
}

impl DecodedInfo {
    pub fn new(fields: InfoFields, raw: Value) -> Option<Self> {
        let item_id = non_empty(fields.item_id);
        let edit_url = non_empty(fields.edit_url);
        if item_id.is_none() && edit_url.is_none() {
            return None;
        }

        Some(Self {
            cms: CmsTag::Datocms,
            item_id,
            item_type_id: non_empty(fields.item_type_id),
            field_path: non_empty(fields.field_path),
            locale: non_empty(fields.locale),
            environment: non_empty(fields.environment),
            edit_url,
            raw,
        })
    }
}

/// What actually gets written onto a generated element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditInfo {
    pub edit_url: String,
    pub item_id: Option<String>,
    pub item_type_id: Option<String>,
    pub environment: Option<String>,
    pub locale: Option<String>,
}

impl EditInfo {
    pub fn from_decoded(info: &DecodedInfo, edit_url: String, environment: Option<&str>) -> Self {
        Self {
            edit_url,
            item_id: info.item_id.clone(),
            item_type_id: info.item_type_id.clone(),
            environment: environment
                .map(str::to_string)
                .or_else(|| info.environment.clone()),
            locale: info.locale.clone(),
        }
    }
}

pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
