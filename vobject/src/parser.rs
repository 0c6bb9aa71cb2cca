// SPDX-FileCopyrightText: 2026 SyncPlus Developers
//
// SPDX-License-Identifier: Apache-2.0

//! Content-line parser: unfolding, name/parameter/value splitting,
//! `BEGIN`/`END` tree building.

use crate::VObjectError;
use crate::component::{Component, Property};

/// Parses one or more top-level components from wire text.
///
/// Folded lines (continuation lines starting with a space or tab) are
/// unfolded first; both CRLF and bare LF input are accepted. Empty input
/// yields an empty vec.
///
/// # Errors
///
/// Returns an error for content lines without a `:`, properties outside any
/// component, mismatched or unmatched `END` lines, and input that ends while
/// a component is still open.
pub fn parse(input: &str) -> Result<Vec<Component>, VObjectError> {
    let mut roots = Vec::new();
    let mut stack: Vec<Component> = Vec::new();

    for (line_no, line) in unfold(input) {
        let upper_prefix = line.get(..6).map(str::to_ascii_uppercase);

        if upper_prefix.as_deref() == Some("BEGIN:") {
            let name = line[6..].trim().to_ascii_uppercase();
            stack.push(Component::new(name));
            continue;
        }

        // `get` instead of slicing: byte offset 4 may fall inside a
        // multi-byte character of a non-ASCII property name.
        if line.get(..4).is_some_and(|p| p.eq_ignore_ascii_case("END:")) {
            let name = line[4..].trim().to_ascii_uppercase();
            let Some(done) = stack.pop() else {
                return Err(VObjectError::UnmatchedEnd(line_no));
            };
            if done.name != name {
                return Err(VObjectError::MismatchedEnd {
                    line: line_no,
                    found: name,
                    expected: done.name,
                });
            }
            match stack.last_mut() {
                Some(parent) => parent.components.push(done),
                None => roots.push(done),
            }
            continue;
        }

        let property = parse_content_line(&line, line_no)?;
        match stack.last_mut() {
            Some(component) => component.properties.push(property),
            None => return Err(VObjectError::OutsideComponent(line_no)),
        }
    }

    if let Some(open) = stack.pop() {
        return Err(VObjectError::UnexpectedEof(open.name));
    }
    Ok(roots)
}

/// Unfolds physical lines into logical content lines, keeping the line
/// number of each logical line's first physical line.
fn unfold(input: &str) -> Vec<(usize, String)> {
    let mut lines: Vec<(usize, String)> = Vec::new();

    for (idx, raw) in input.split('\n').enumerate() {
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        if raw.is_empty() {
            continue;
        }
        if let Some(rest) = raw.strip_prefix(' ').or_else(|| raw.strip_prefix('\t')) {
            if let Some((_, last)) = lines.last_mut() {
                last.push_str(rest);
                continue;
            }
        }
        lines.push((idx + 1, raw.to_string()));
    }

    lines
}

/// Splits `NAME;PARAM=V;PARAM2="q:v":VALUE`, honoring quoted param values.
fn parse_content_line(line: &str, line_no: usize) -> Result<Property, VObjectError> {
    let mut in_quotes = false;
    let mut colon = None;
    for (i, c) in line.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ':' if !in_quotes => {
                colon = Some(i);
                break;
            }
            _ => {}
        }
    }
    let Some(colon) = colon else {
        return Err(VObjectError::MissingDelimiter(line_no));
    };

    let (head, value) = (&line[..colon], &line[colon + 1..]);
    let mut segments = split_quoted(head, ';').into_iter();
    let name = segments.next().unwrap_or_default();

    let mut params = Vec::new();
    for segment in segments {
        let (pname, pvalue) = match segment.split_once('=') {
            Some((n, v)) => (n.to_string(), strip_quotes(v)),
            // Parameter without a value (legacy vCard 2.1 style).
            None => (segment, String::new()),
        };
        params.push((pname, pvalue));
    }

    Ok(Property {
        name,
        params,
        value: value.to_string(),
    })
}

fn split_quoted(input: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for c in input.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            c if c == sep && !in_quotes => parts.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    parts.push(current);
    parts
}

fn strip_quotes(value: &str) -> String {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
        .to_string()
}
