//! Filter matching and update application for in-memory documents

use bson::{Bson, Document};
use docmap_core::{DocmapError, ID_FIELD, Result, is_operator_update};

/// Check that `filter` only uses what this store understands
pub(crate) fn check_filter(filter: &Document) -> Result<()> {
    match filter.keys().find(|key| key.starts_with('$')) {
        Some(key) => Err(DocmapError::Driver(format!(
            "query operator '{}' is not supported by the memory store",
            key
        ))),
        None => Ok(()),
    }
}

/// Whether every field of `filter` is present in `document` with an equal value
pub(crate) fn matches(document: &Document, filter: &Document) -> bool {
    filter
        .iter()
        .all(|(key, expected)| document.get(key) == Some(expected))
}

/// Apply `update` to `document`, returning whether anything changed.
///
/// Operator updates support `$set` and `$unset`. Anything else is a
/// replacement, which keeps the stored `_id`.
pub(crate) fn apply_update(document: &mut Document, update: &Document) -> Result<bool> {
    if is_operator_update(update) {
        let mut changed = false;
        for (operator, operand) in update {
            let Bson::Document(fields) = operand else {
                return Err(DocmapError::Store(format!(
                    "modifier '{}' requires a document operand",
                    operator
                )));
            };
            match operator.as_str() {
                "$set" => changed |= apply_set(document, fields)?,
                "$unset" => changed |= apply_unset(document, fields)?,
                other => {
                    return Err(DocmapError::Store(format!(
                        "unknown update modifier '{}'",
                        other
                    )));
                }
            }
        }
        return Ok(changed);
    }

    replace(document, update)
}

fn apply_set(document: &mut Document, fields: &Document) -> Result<bool> {
    let mut changed = false;
    for (key, value) in fields {
        guard_id(document, key, Some(value))?;
        if document.get(key) != Some(value) {
            document.insert(key.clone(), value.clone());
            changed = true;
        }
    }
    Ok(changed)
}

fn apply_unset(document: &mut Document, fields: &Document) -> Result<bool> {
    let mut changed = false;
    for key in fields.keys() {
        guard_id(document, key, None)?;
        changed |= document.remove(key).is_some();
    }
    Ok(changed)
}

fn replace(document: &mut Document, replacement: &Document) -> Result<bool> {
    if replacement.keys().any(|key| key.starts_with('$')) {
        return Err(DocmapError::Store(
            "replacement document must not contain update operators".to_string(),
        ));
    }
    let id = document.get(ID_FIELD).cloned();
    if let (Some(current), Some(requested)) = (&id, replacement.get(ID_FIELD)) {
        if current != requested {
            return Err(DocmapError::Store(
                "the (immutable) field '_id' was found to have been altered".to_string(),
            ));
        }
    }

    let mut next = Document::new();
    if let Some(id) = id {
        next.insert(ID_FIELD, id);
    }
    for (key, value) in replacement {
        if key != ID_FIELD {
            next.insert(key.clone(), value.clone());
        }
    }

    let changed = next != *document;
    *document = next;
    Ok(changed)
}

fn guard_id(document: &Document, key: &str, value: Option<&Bson>) -> Result<()> {
    if key != ID_FIELD || value.is_some_and(|v| document.get(ID_FIELD) == Some(v)) {
        return Ok(());
    }
    Err(DocmapError::Store(
        "performing an update on the path '_id' would modify the immutable field '_id'"
            .to_string(),
    ))
}
