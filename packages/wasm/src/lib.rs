use content_link::{build_deep_link, codec, normalize_field_path};
use content_link_stega as stega;
use serde::Serialize;
use serde_json::Value;
use wasm_bindgen::prelude::*;

#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SplitOutput {
    cleaned: String,
    has_marker: bool,
}

/// Decode the first marker in `text`; edit metadata as JSON, or `undefined`
#[wasm_bindgen(js_name = decode)]
pub fn decode_js(text: &str) -> Result<Option<String>, JsValue> {
    decode_json(text).map_err(|e| JsValue::from_str(&e))
}

/// Visible text with every marker removed
#[wasm_bindgen(js_name = strip)]
pub fn strip_js(text: &str) -> String {
    codec::strip(text, None)
}

/// Split `text` into its cleaned value and whether a marker was found
#[wasm_bindgen(js_name = split)]
pub fn split_js(text: &str) -> Result<String, JsValue> {
    split_json(text).map_err(|e| JsValue::from_str(&e))
}

/// Append a marker carrying `payload_json` to `visible`
#[wasm_bindgen(js_name = combine)]
pub fn combine_js(visible: &str, payload_json: &str) -> Result<String, JsValue> {
    combine_json(visible, payload_json).map_err(|e| JsValue::from_str(&e))
}

/// Editor URL for the metadata in `info_json`
#[wasm_bindgen(js_name = buildDeepLink)]
pub fn build_deep_link_js(
    info_json: &str,
    base_editing_url: &str,
    environment: Option<String>,
) -> Result<String, JsValue> {
    deep_link(info_json, base_editing_url, environment.as_deref()).map_err(|e| JsValue::from_str(&e))
}

/// Dot-joined field path, or `undefined` when the input cannot be one
#[wasm_bindgen(js_name = normalizeFieldPath)]
pub fn normalize_field_path_js(path_json: &str) -> Option<String> {
    serde_json::from_str::<Value>(path_json)
        .ok()
        .and_then(|value| normalize_field_path(&value))
}

fn decode_json(text: &str) -> Result<Option<String>, String> {
    match codec::decode(text, None) {
        Some(info) => serde_json::to_string(&info)
            .map(Some)
            .map_err(|e| format!("Serialization error: {}", e)),
        None => Ok(None),
    }
}

fn split_json(text: &str) -> Result<String, String> {
    let split = stega::split(text);
    let output = SplitOutput {
        has_marker: split.encoded.is_some(),
        cleaned: split.cleaned,
    };
    serde_json::to_string(&output).map_err(|e| format!("Serialization error: {}", e))
}

fn combine_json(visible: &str, payload_json: &str) -> Result<String, String> {
    let payload: Value =
        serde_json::from_str(payload_json).map_err(|e| format!("Invalid payload: {}", e))?;
    stega::combine(visible, &payload).map_err(|e| format!("Encode error: {}", e))
}

fn deep_link(info_json: &str, base_editing_url: &str, environment: Option<&str>) -> Result<String, String> {
    let raw: Value =
        serde_json::from_str(info_json).map_err(|e| format!("Invalid metadata: {}", e))?;
    let info = codec::info_from_payload(raw)
        .ok_or_else(|| "Metadata needs an itemId or an editUrl".to_string())?;
    build_deep_link(&info, base_editing_url, environment).map_err(|e| e.to_string())
}
