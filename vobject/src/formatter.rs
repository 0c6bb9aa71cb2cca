// SPDX-FileCopyrightText: 2026 SyncPlus Developers
//
// SPDX-License-Identifier: Apache-2.0

//! Serializer: CRLF line endings, folding at 75 octets.

use crate::component::{Component, Property};

const FOLD_AT: usize = 75;

/// Serializes a component tree to wire text.
#[must_use]
pub fn write(component: &Component) -> String {
    let mut out = String::new();
    write_component(component, &mut out);
    out
}

fn write_component(component: &Component, out: &mut String) {
    push_folded(&format!("BEGIN:{}", component.name), out);
    for property in &component.properties {
        push_folded(&render_property(property), out);
    }
    for child in &component.components {
        write_component(child, out);
    }
    push_folded(&format!("END:{}", component.name), out);
}

fn render_property(property: &Property) -> String {
    let mut line = property.name.clone();
    for (name, value) in &property.params {
        line.push(';');
        line.push_str(name);
        line.push('=');
        // Quote parameter values containing separator characters.
        if value.contains([';', ':', ',']) {
            line.push('"');
            line.push_str(value);
            line.push('"');
        } else {
            line.push_str(value);
        }
    }
    line.push(':');
    line.push_str(&property.value);
    line
}

/// Appends a logical line, folding at [`FOLD_AT`] octets on char boundaries.
fn push_folded(line: &str, out: &mut String) {
    let mut budget = FOLD_AT;
    let mut taken = 0;
    for (idx, c) in line.char_indices() {
        if idx - taken + c.len_utf8() > budget {
            out.push_str(&line[taken..idx]);
            out.push_str("\r\n ");
            taken = idx;
            // Continuation lines lose one octet to the leading space.
            budget = FOLD_AT - 1;
        }
    }
    out.push_str(&line[taken..]);
    out.push_str("\r\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn writes_crlf_lines() {
        let mut card = Component::new("VCARD");
        card.set_property("VERSION", "3.0");
        card.set_property("UID", "u-1");
        assert_eq!(
            write(&card),
            "BEGIN:VCARD\r\nVERSION:3.0\r\nUID:u-1\r\nEND:VCARD\r\n"
        );
    }

    #[test]
    fn folds_long_lines_and_reparses() {
        let mut card = Component::new("VCARD");
        card.set_property("VERSION", "3.0");
        card.set_property("NOTE", "x".repeat(300));
        let text = write(&card);
        for line in text.split("\r\n") {
            assert!(line.len() <= FOLD_AT, "line too long: {}", line.len());
        }
        let reparsed = parse(&text).unwrap();
        assert_eq!(reparsed[0].property("NOTE").unwrap().value, "x".repeat(300));
    }

    #[test]
    fn quotes_parameter_values_with_separators() {
        let mut prop = Property::new("TEL", "+49 30 1234");
        prop.params.push(("TYPE".to_string(), "work,voice".to_string()));
        let mut card = Component::new("VCARD");
        card.properties.push(prop);
        assert!(write(&card).contains("TEL;TYPE=\"work,voice\":+49 30 1234"));
    }

    #[test]
    fn roundtrips_nested_components() {
        let input = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nBEGIN:VEVENT\r\nUID:e1\r\nSUMMARY:Team meeting\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
        let parsed = parse(input).unwrap();
        assert_eq!(write(&parsed[0]), input);
    }
}
