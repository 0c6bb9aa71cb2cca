// SPDX-FileCopyrightText: 2026 SyncPlus Developers
//
// SPDX-License-Identifier: Apache-2.0

//! jCard (RFC 7095) serialization for vCard components.

use serde_json::{Map, Value, json};

use crate::component::Component;

/// Serializes a vCard component to the jCard array form:
/// `["vcard", [[name, {params}, "text", value], ...]]`.
///
/// Property and parameter names are lowercased as RFC 7095 §3.3 requires;
/// values are carried unescaped since JSON has its own escaping.
#[must_use]
pub fn write_jcard(card: &Component) -> Value {
    let mut properties = Vec::with_capacity(card.properties.len());
    for property in &card.properties {
        let mut params = Map::new();
        for (name, value) in &property.params {
            params.insert(name.to_ascii_lowercase(), Value::String(value.clone()));
        }
        properties.push(json!([
            property.name.to_ascii_lowercase(),
            Value::Object(params),
            "text",
            property.text(),
        ]));
    }
    json!(["vcard", properties])
}
