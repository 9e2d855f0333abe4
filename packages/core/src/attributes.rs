//! Attribute vocabulary shared with page authors and other tooling.
//!
//! Everything the engine reads or writes on the page lives under the
//! `data-datocms-` prefix.

pub const EDIT_URL: &str = "data-datocms-edit-url";
pub const ITEM_ID: &str = "data-datocms-item-id";
pub const ITEM_TYPE_ID: &str = "data-datocms-item-type-id";
pub const ENVIRONMENT: &str = "data-datocms-environment";
pub const LOCALE: &str = "data-datocms-locale";
pub const FIELD_PATH: &str = "data-datocms-field-path";

/// JSON object with explicit edit metadata, written by authors
pub const EDIT_INFO: &str = "data-datocms-edit-info";

/// Set on every element the engine stamped from a decoded marker
pub const GENERATED: &str = "data-datocms-generated";
pub const GENERATED_VALUE: &str = "stega";

/// Set on every edit target, generated or explicit
pub const EDITABLE: &str = "data-datocms-editable";

pub const DEBUG_REASON: &str = "data-datocms-debug-reason";
pub const DEBUG_URL: &str = "data-datocms-debug-url";
pub const DEBUG_INFO: &str = "data-datocms-debug-info";

pub const CLICK_CONFLICT: &str = "data-datocms-click-conflict";
pub const ALLOW_FOLLOW: &str = "data-datocms-allow-follow";

pub const OVERLAY: &str = "data-datocms-overlay";
pub const OVERLAY_SEGMENT: &str = "data-datocms-overlay-segment";

pub const ALT: &str = "alt";

/// Author-facing tags, in signature order.
pub const EXPLICIT: [&str; 7] = [
    EDIT_INFO,
    EDIT_URL,
    ITEM_ID,
    ITEM_TYPE_ID,
    FIELD_PATH,
    LOCALE,
    ENVIRONMENT,
];

/// Everything the stamper may leave behind on a generated element.
pub const GENERATED_SET: [&str; 7] = [
    EDIT_URL,
    ITEM_ID,
    ITEM_TYPE_ID,
    ENVIRONMENT,
    LOCALE,
    GENERATED,
    EDITABLE,
];

pub const DEBUG_SET: [&str; 3] = [DEBUG_REASON, DEBUG_URL, DEBUG_INFO];

/// Attribute names the mutation subscription listens to.
pub fn observed() -> Vec<String> {
    std::iter::once(ALT)
        .chain(EXPLICIT)
        .map(str::to_string)
        .collect()
}
