//! `?` / `@name` placeholder scanning and rewriting to PostgreSQL `$n`.
//!
//! Quoted strings, quoted identifiers, dollar-quoted bodies and comments are copied
//! verbatim. `??` stands for a literal `?` (e.g. the jsonb `?` operator).

use crate::error::{QueryError, QueryResult};
use crate::param::{BoundValue, NamedParams, Param};

#[derive(Debug, PartialEq, Eq)]
enum Segment<'a> {
    Text(&'a str),
    Positional,
    Named(&'a str),
    Question,
}

fn is_ident_start(b: u8) -> bool {
    b == b'_' || b.is_ascii_alphabetic()
}

fn is_ident_char(b: u8) -> bool {
    b == b'_' || b.is_ascii_alphanumeric()
}

/// Index just past a `quote`-delimited run starting at `i`. Doubled quotes escape.
fn skip_quoted(bytes: &[u8], mut i: usize, quote: u8) -> usize {
    i += 1;
    while i < bytes.len() {
        if bytes[i] == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

/// Index just past a `$tag$ ... $tag$` body starting at `i`, if one starts there.
fn skip_dollar_quoted(sql: &str, i: usize) -> Option<usize> {
    let bytes = sql.as_bytes();
    let mut j = i + 1;
    if j < bytes.len() && bytes[j] != b'$' {
        if !is_ident_start(bytes[j]) {
            return None;
        }
        while j < bytes.len() && is_ident_char(bytes[j]) {
            j += 1;
        }
    }
    if bytes.get(j) != Some(&b'$') {
        return None;
    }
    let tag = &sql[i..=j];
    let body = j + 1;
    Some(match sql[body..].find(tag) {
        Some(pos) => body + pos + tag.len(),
        None => bytes.len(),
    })
}

fn scan(sql: &str) -> Vec<Segment<'_>> {
    let bytes = sql.as_bytes();
    let mut segments = Vec::new();
    let mut text_start = 0;
    let mut i = 0;

    fn flush<'a>(segments: &mut Vec<Segment<'a>>, sql: &'a str, from: usize, to: usize) {
        if to > from {
            segments.push(Segment::Text(&sql[from..to]));
        }
    }

    while i < bytes.len() {
        match bytes[i] {
            q @ (b'\'' | b'"') => i = skip_quoted(bytes, i, q),
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                i = match sql[i..].find('\n') {
                    Some(pos) => i + pos + 1,
                    None => bytes.len(),
                };
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = match sql[i + 2..].find("*/") {
                    Some(pos) => i + 2 + pos + 2,
                    None => bytes.len(),
                };
            }
            b'$' => i = skip_dollar_quoted(sql, i).unwrap_or(i + 1),
            b'?' => {
                flush(&mut segments, sql, text_start, i);
                if bytes.get(i + 1) == Some(&b'?') {
                    segments.push(Segment::Question);
                    i += 2;
                } else {
                    segments.push(Segment::Positional);
                    i += 1;
                }
                text_start = i;
            }
            b'@' => {
                let starts_name = bytes.get(i + 1).is_some_and(|&b| is_ident_start(b));
                let prev_ok = i == 0 || !(is_ident_char(bytes[i - 1]) || bytes[i - 1] == b'@');
                if starts_name && prev_ok {
                    flush(&mut segments, sql, text_start, i);
                    let mut end = i + 1;
                    while end < bytes.len() && is_ident_char(bytes[end]) {
                        end += 1;
                    }
                    segments.push(Segment::Named(&sql[i + 1..end]));
                    i = end;
                    text_start = i;
                } else {
                    i += 1;
                }
            }
            _ => i += 1,
        }
    }
    flush(&mut segments, sql, text_start, bytes.len());
    segments
}

fn split_values(values: &[BoundValue]) -> (Vec<&Param>, Option<&NamedParams>) {
    let mut positional = Vec::new();
    let mut named = None;
    for value in values {
        match value {
            BoundValue::Positional(p) => positional.push(p),
            BoundValue::Named(map) => named = Some(map),
        }
    }
    (positional, named)
}

/// Rewrite placeholders to `$1, $2, ...` and order the parameters to match.
///
/// Positional values take `$1..$n` in order; each distinct referenced name then gets
/// the next index, in order of first reference.
pub(crate) fn render(sql: &str, values: &[BoundValue]) -> QueryResult<(String, Vec<Param>)> {
    let (positional, named) = split_values(values);
    let mut out = String::with_capacity(sql.len() + 8);
    let mut params: Vec<Param> = positional.iter().map(|p| (*p).clone()).collect();
    let mut names: Vec<&str> = Vec::new();
    let mut next_positional = 0usize;

    for segment in scan(sql) {
        match segment {
            Segment::Text(text) => out.push_str(text),
            Segment::Question => out.push('?'),
            Segment::Positional => {
                next_positional += 1;
                if next_positional > positional.len() {
                    return Err(QueryError::validation(format!(
                        "more `?` placeholders than positional values({})",
                        positional.len()
                    )));
                }
                out.push('$');
                out.push_str(&next_positional.to_string());
            }
            Segment::Named(name) => {
                let idx = match names.iter().position(|n| *n == name) {
                    Some(pos) => positional.len() + pos + 1,
                    None => {
                        let value = named.and_then(|m| m.get(name)).ok_or_else(|| {
                            QueryError::validation(format!("named parameter @{name} is not bound"))
                        })?;
                        names.push(name);
                        params.push(value.clone());
                        positional.len() + names.len()
                    }
                };
                out.push('$');
                out.push_str(&idx.to_string());
            }
        }
    }

    if next_positional != positional.len() {
        return Err(QueryError::validation(format!(
            "placeholders({next_positional}) != positional values({})",
            positional.len()
        )));
    }
    Ok((out, params))
}

/// Render SQL with bound values inlined as literals. For display only.
pub(crate) fn explain(sql: &str, values: &[BoundValue]) -> String {
    let (positional, named) = split_values(values);
    let mut out = String::with_capacity(sql.len() + 16);
    let mut next_positional = 0usize;

    for segment in scan(sql) {
        match segment {
            Segment::Text(text) => out.push_str(text),
            Segment::Question => out.push('?'),
            Segment::Positional => {
                match positional.get(next_positional) {
                    Some(value) => out.push_str(&literal(value)),
                    None => out.push('?'),
                }
                next_positional += 1;
            }
            Segment::Named(name) => match named.and_then(|m| m.get(name)) {
                Some(value) => out.push_str(&literal(value)),
                None => {
                    out.push('@');
                    out.push_str(name);
                }
            },
        }
    }
    out
}

fn literal(value: &Param) -> String {
    let debug = format!("{value:?}");
    match debug.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        Some(inner) => format!("'{}'", inner.replace('\'', "''")),
        None => debug,
    }
}
