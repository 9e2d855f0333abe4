//! # Content Link Stega
//!
//! Zero-width steganographic marker codec.
//!
//! Content strings delivered by the CMS carry an invisible marker appended to
//! (or embedded in) their visible text. The marker is a JSON payload spelled
//! out in four zero-width characters, one base-4 digit each:
//!
//! ```text
//! "Hello" + [U+200B x4 prefix] + [4 digits per payload byte ...]
//! ```
//!
//! This crate only knows how to find, split, encode and decode those runs.
//! It has no idea what the payload means; the `content-link` crate turns
//! decoded payloads into edit metadata.
//!
//! ## Usage
//!
//! ```rust
//! use content_link_stega::{combine, decode_raw, split};
//! use serde_json::json;
//!
//! let text = combine("Hello", &json!({ "itemId": "123" })).unwrap();
//! assert_ne!(text, "Hello");
//!
//! let parts = split(&text);
//! assert_eq!(parts.cleaned, "Hello");
//! assert_eq!(decode_raw(&text).unwrap(), json!({ "itemId": "123" }));
//! ```

mod codec;
mod error;
mod value;

pub use codec::{
    combine, contains_marker, decode_encoded, decode_raw, encode, split, strip, StegaSplit,
    MARKER_PREFIX, ZERO_WIDTHS,
};
pub use error::{StegaError, StegaResult};
pub use value::strip_value;
