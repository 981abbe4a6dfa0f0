//! Object identifier helpers

use bson::oid::ObjectId;

/// Length of the hexadecimal form of an object id
pub const OID_HEX_LEN: usize = 24;

/// Reserved field holding a document's identifier
pub const ID_FIELD: &str = "_id";

/// Check that `oid` looks like the external form of an object id.
///
/// Only the format is checked: exactly 24 characters, all lower-case hex.
/// Upper-case hex is rejected. The timestamp and counter parts are not
/// inspected.
pub fn is_oid_valid(oid: Option<&str>) -> bool {
    let Some(oid) = oid else {
        return false;
    };
    if oid.len() != OID_HEX_LEN {
        return false;
    }
    oid.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Generate a fresh object id.
///
/// Ids are assumed unique; collisions are not checked.
pub fn generate_oid() -> ObjectId {
    ObjectId::new()
}
