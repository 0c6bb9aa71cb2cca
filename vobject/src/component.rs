// SPDX-FileCopyrightText: 2026 SyncPlus Developers
//
// SPDX-License-Identifier: Apache-2.0

//! Component tree and property access helpers.

/// One content line: `NAME;PARAM=V:VALUE`.
///
/// `value` is stored in its escaped wire form; use [`Property::text`] or
/// [`Property::values`] to get unescaped data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    /// Property name, stored as written but matched case-insensitively.
    pub name: String,
    /// Parameters in order of appearance. Quoting is stripped on parse.
    pub params: Vec<(String, String)>,
    /// Raw (escaped) property value.
    pub value: String,
}

impl Property {
    /// Creates a property with an already-escaped value and no parameters.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            value: value.into(),
        }
    }

    /// Returns the first parameter with the given name (case-insensitive).
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns the unescaped text value.
    #[must_use]
    pub fn text(&self) -> String {
        unescape(&self.value)
    }

    /// Splits the value on unescaped commas and unescapes each part.
    ///
    /// Empty parts are dropped, matching how CATEGORIES lists are consumed.
    #[must_use]
    pub fn values(&self) -> Vec<String> {
        split_unescaped(&self.value, ',')
            .into_iter()
            .map(|part| unescape(&part))
            .filter(|part| !part.is_empty())
            .collect()
    }
}

/// A `BEGIN:`/`END:` delimited component (VCALENDAR, VEVENT, VCARD, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Component {
    /// Component name, uppercased on parse.
    pub name: String,
    /// Properties in order of appearance.
    pub properties: Vec<Property>,
    /// Nested components in order of appearance.
    pub components: Vec<Component>,
}

impl Component {
    /// Creates an empty component with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
            components: Vec::new(),
        }
    }

    /// Returns the first property with the given name (case-insensitive).
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Returns all properties with the given name (case-insensitive).
    pub fn properties<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Property> {
        self.properties
            .iter()
            .filter(move |p| p.name.eq_ignore_ascii_case(name))
    }

    /// Replaces all properties with the given name by a single new one.
    pub fn set_property(&mut self, name: &str, value: impl Into<String>) {
        self.remove_property(name);
        self.properties.push(Property::new(name, value));
    }

    /// Removes all properties with the given name.
    pub fn remove_property(&mut self, name: &str) {
        self.properties.retain(|p| !p.name.eq_ignore_ascii_case(name));
    }

    /// Returns the unescaped UID, if any.
    ///
    /// For iCalendar payloads the UID lives on the first nested component
    /// (VEVENT/VTODO), so nested components are searched too.
    #[must_use]
    pub fn uid(&self) -> Option<String> {
        if let Some(p) = self.property("UID") {
            return Some(p.text());
        }
        self.components.iter().find_map(Component::uid)
    }

    /// Returns the merged CATEGORIES values.
    #[must_use]
    pub fn categories(&self) -> Vec<String> {
        self.properties("CATEGORIES")
            .flat_map(Property::values)
            .collect()
    }

    /// Replaces CATEGORIES with the given list; removes the property when
    /// the list is empty.
    pub fn set_categories<I, S>(&mut self, categories: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.remove_property("CATEGORIES");
        let joined = categories
            .into_iter()
            .map(|c| escape(c.as_ref()))
            .collect::<Vec<_>>()
            .join(",");
        if !joined.is_empty() {
            self.properties.push(Property::new("CATEGORIES", joined));
        }
    }

    /// Whether this vCard represents a contact group.
    ///
    /// vCard 4 uses `KIND:group`; Apple-style vCard 3 uses
    /// `X-ADDRESSBOOKSERVER-KIND:group`.
    #[must_use]
    pub fn is_group(&self) -> bool {
        let kind_is_group = |name: &str| {
            self.property(name)
                .is_some_and(|p| p.text().eq_ignore_ascii_case("group"))
        };
        kind_is_group("KIND") || kind_is_group("X-ADDRESSBOOKSERVER-KIND")
    }

    /// Member UIDs of a group vCard.
    ///
    /// Reads both `MEMBER:urn:uuid:...` (vCard 4) and
    /// `X-ADDRESSBOOKSERVER-MEMBER:urn:uuid:...` (vCard 3).
    #[must_use]
    pub fn group_member_uids(&self) -> Vec<String> {
        self.properties("MEMBER")
            .chain(self.properties("X-ADDRESSBOOKSERVER-MEMBER"))
            .map(|p| {
                let text = p.text();
                text.strip_prefix("urn:uuid:")
                    .map_or(text.clone(), str::to_string)
            })
            .collect()
    }

    /// Rewrites the member list of a group vCard.
    ///
    /// `vcard4` selects `MEMBER` + `KIND:group`, otherwise the
    /// `X-ADDRESSBOOKSERVER-*` vCard 3 form.
    pub fn set_group_member_uids<I, S>(&mut self, uids: I, vcard4: bool)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.remove_property("MEMBER");
        self.remove_property("X-ADDRESSBOOKSERVER-MEMBER");
        self.remove_property("KIND");
        self.remove_property("X-ADDRESSBOOKSERVER-KIND");

        let (kind_name, member_name) = if vcard4 {
            ("KIND", "MEMBER")
        } else {
            ("X-ADDRESSBOOKSERVER-KIND", "X-ADDRESSBOOKSERVER-MEMBER")
        };
        self.properties.push(Property::new(kind_name, "group"));
        for uid in uids {
            self.properties.push(Property::new(
                member_name,
                format!("urn:uuid:{}", escape(uid.as_ref())),
            ));
        }
    }

    /// Sets the VERSION property ("3.0" or "4.0" for vCards, "2.0" for
    /// iCalendar), keeping it as the first property as servers expect.
    pub fn set_version(&mut self, version: &str) {
        self.remove_property("VERSION");
        self.properties
            .insert(0, Property::new("VERSION", version));
    }
}

/// Escapes a text value per RFC 5545 §3.3.11 / RFC 6350 §3.4.
#[must_use]
pub(crate) fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            _ => out.push(c),
        }
    }
    out
}

/// Reverses [`escape`]. Unknown escape sequences keep the escaped character.
#[must_use]
pub(crate) fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n' | 'N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Splits on a separator, honoring backslash escapes.
pub(crate) fn split_unescaped(value: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut escaped = false;
    for c in value.chars() {
        if escaped {
            current.push('\\');
            current.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == sep {
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    if escaped {
        current.push('\\');
    }
    parts.push(current);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_roundtrip() {
        let original = "a,b;c\\d\ne";
        assert_eq!(unescape(&escape(original)), original);
    }

    #[test]
    fn categories_split_on_unescaped_commas() {
        let prop = Property::new("CATEGORIES", "Family,Work\\, Inc.,");
        assert_eq!(prop.values(), vec!["Family", "Work, Inc."]);
    }

    #[test]
    fn set_categories_escapes_and_joins() {
        let mut card = Component::new("VCARD");
        card.set_categories(["Family", "Work, Inc."]);
        assert_eq!(
            card.property("CATEGORIES").unwrap().value,
            "Family,Work\\, Inc."
        );
        card.set_categories(Vec::<String>::new());
        assert!(card.property("CATEGORIES").is_none());
    }

    #[test]
    fn group_members_both_vcard_dialects() {
        let mut card = Component::new("VCARD");
        card.set_group_member_uids(["u1", "u2"], false);
        assert!(card.is_group());
        assert_eq!(card.group_member_uids(), vec!["u1", "u2"]);

        card.set_group_member_uids(["u3"], true);
        assert!(card.is_group());
        assert_eq!(card.group_member_uids(), vec!["u3"]);
        assert!(card.property("X-ADDRESSBOOKSERVER-MEMBER").is_none());
    }

    #[test]
    fn uid_found_in_nested_component() {
        let mut cal = Component::new("VCALENDAR");
        let mut event = Component::new("VEVENT");
        event.set_property("UID", "abc");
        cal.components.push(event);
        assert_eq!(cal.uid().as_deref(), Some("abc"));
    }
}
