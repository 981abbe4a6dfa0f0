//! Conversion between [`OrderedMap`] and native BSON documents.
//!
//! Both directions go through JSON text (MongoDB Extended JSON) rather than
//! converting field by field. A single well-tested JSON parser handles the
//! native side, and the text is what gets logged when debugging.
//!
//! ```text
//! OrderedMap --map_to_json--> JSON --json_to_document--> Document
//! Document --document_to_json--> JSON --json_to_map--> OrderedMap
//! ```
//!
//! All map values are text. On the way in every value becomes a JSON string,
//! with two exceptions: an `_id` holding a valid object id becomes a native
//! object id so that filters on `_id` match stored documents, and an update
//! operator entry (`$set`, `$unset`, ...) whose value is JSON object text is
//! embedded as an object so operator updates can be expressed as maps.
//!
//! On the way out strings are copied verbatim and object ids become their
//! hex form. Any other value is returned as compact JSON text.

use bson::{Bson, Document};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value as JsonValue;

use crate::map::OrderedMap;
use crate::oid::{ID_FIELD, is_oid_valid};
use crate::{DocmapError, Result};

/// Serialize a map to its JSON interchange text
pub fn map_to_json(map: &OrderedMap) -> Result<String> {
    serde_json::to_string(&InterchangeMap(map))
        .map_err(|e| DocmapError::Codec(format!("failed to serialize map: {}", e)))
}

/// Parse JSON interchange text into a native document
pub fn json_to_document(json: &str) -> Result<Document> {
    let value: JsonValue = serde_json::from_str(json)
        .map_err(|e| DocmapError::Codec(format!("malformed interchange text: {}", e)))?;

    let bson = Bson::try_from(value)
        .map_err(|e| DocmapError::Codec(format!("invalid extended JSON: {}", e)))?;

    match bson {
        Bson::Document(document) => Ok(document),
        other => Err(DocmapError::Codec(format!(
            "expected a JSON object, found {:?}",
            other.element_type()
        ))),
    }
}

/// Convert a map into a freshly built native document
pub fn map_to_document(map: &OrderedMap) -> Result<Document> {
    let json = map_to_json(map)?;
    tracing::trace!(json = %json, "map to document");
    json_to_document(&json)
}

/// Render a native document as relaxed Extended JSON text
pub fn document_to_json(document: &Document) -> Result<String> {
    let value = Bson::Document(document.clone()).into_relaxed_extjson();
    serde_json::to_string(&value)
        .map_err(|e| DocmapError::Codec(format!("failed to render document: {}", e)))
}

/// Merge the top-level fields of a JSON object into `map`.
///
/// Existing entries with other keys are kept; entries with the same key are
/// replaced. Pass an empty map for a clean result.
pub fn json_to_map(map: &mut OrderedMap, json: &str) -> Result<()> {
    let value: JsonValue = serde_json::from_str(json)
        .map_err(|e| DocmapError::Codec(format!("malformed interchange text: {}", e)))?;

    let JsonValue::Object(fields) = value else {
        return Err(DocmapError::Codec(
            "interchange text is not a JSON object".to_string(),
        ));
    };

    for (key, value) in fields {
        map.set(key, json_value_to_text(value));
    }
    Ok(())
}

/// Decode a native document into `map`, see [`json_to_map`]
pub fn document_to_map(map: &mut OrderedMap, document: &Document) -> Result<()> {
    let json = document_to_json(document)?;
    tracing::trace!(json = %json, "document to map");
    json_to_map(map, &json)
}

/// Decode a native document into a new map
pub fn document_into_map(document: &Document) -> Result<OrderedMap> {
    let mut map = OrderedMap::with_capacity(document.len());
    document_to_map(&mut map, document)?;
    Ok(map)
}

fn json_value_to_text(value: JsonValue) -> String {
    match value {
        JsonValue::String(s) => s,
        JsonValue::Object(ref fields) if fields.len() == 1 => match fields.get("$oid") {
            Some(JsonValue::String(hex)) => hex.clone(),
            _ => value.to_string(),
        },
        other => other.to_string(),
    }
}

/// Serializes a map with `_id` object ids in Extended JSON form
struct InterchangeMap<'a>(&'a OrderedMap);

impl Serialize for InterchangeMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut out = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in self.0.iter() {
            if key == ID_FIELD && is_oid_valid(Some(value)) {
                out.serialize_entry(key, &ExtendedOid(value))?;
            } else if let Some(operand) = operator_operand(key, value) {
                out.serialize_entry(key, &operand)?;
            } else {
                out.serialize_entry(key, value)?;
            }
        }
        out.end()
    }
}

/// The object operand of an update operator entry, if `value` is one
fn operator_operand(key: &str, value: &str) -> Option<JsonValue> {
    if !key.starts_with('$') {
        return None;
    }
    match serde_json::from_str::<JsonValue>(value) {
        Ok(operand @ JsonValue::Object(_)) => Some(operand),
        _ => None,
    }
}

struct ExtendedOid<'a>(&'a str);

impl Serialize for ExtendedOid<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut out = serializer.serialize_map(Some(1))?;
        out.serialize_entry("$oid", self.0)?;
        out.end()
    }
}
