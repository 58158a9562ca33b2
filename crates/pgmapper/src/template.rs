//! Named-placeholder statement templates.
//!
//! Mapper statements name their parameters with braces:
//!
//! ```text
//! UPDATE users SET name = {name} WHERE id = {id}
//! ```
//!
//! PostgreSQL only understands positional `$1, $2, ...` placeholders, so a template
//! is turned into two things that are always used together:
//!
//! - [`translate`] rewrites every `{...}` into the next `$k` marker;
//! - [`extract`] pulls the value for every `{...}` out of a parameter [`Record`].
//!
//! Both walk the same scanner, so marker `$k` always lines up with the k-th
//! extracted value. A repeated name produces a new marker and a new value each
//! time; names are never coalesced.
//!
//! Scanning rules:
//! - the name is the raw text between `{` and the next `}` (case-sensitive, not trimmed);
//! - a `}` outside a placeholder is ordinary text;
//! - a `{` inside an open placeholder restarts it, dropping the partial name;
//! - an unterminated `{...` at the end of the template is dropped and yields no value.

use crate::error::{MapperError, MapperResult};
use crate::value::{Record, Value};
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    Text(&'a str),
    Placeholder(&'a str),
}

fn scan(template: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut text_start = 0;
    let mut open: Option<usize> = None;

    for (idx, ch) in template.char_indices() {
        match ch {
            '{' => {
                if open.is_none() && text_start < idx {
                    segments.push(Segment::Text(&template[text_start..idx]));
                }
                open = Some(idx + 1);
            }
            '}' => {
                if let Some(start) = open.take() {
                    segments.push(Segment::Placeholder(&template[start..idx]));
                    text_start = idx + 1;
                }
            }
            _ => {}
        }
    }

    if open.is_none() && text_start < template.len() {
        segments.push(Segment::Text(&template[text_start..]));
    }
    segments
}

/// Placeholder names in order of appearance, repeats included.
pub fn placeholder_names(template: &str) -> Vec<&str> {
    scan(template)
        .into_iter()
        .filter_map(|seg| match seg {
            Segment::Placeholder(name) => Some(name),
            Segment::Text(_) => None,
        })
        .collect()
}

/// Rewrite `{name}` placeholders into `$1, $2, ...`.
///
/// ```
/// assert_eq!(
///     pgmapper::translate("SELECT * FROM users WHERE name = {name} AND email = {email}"),
///     "SELECT * FROM users WHERE name = $1 AND email = $2",
/// );
/// ```
pub fn translate(template: &str) -> String {
    let mut out = String::with_capacity(template.len());
    let mut idx: usize = 0;

    for seg in scan(template) {
        match seg {
            Segment::Text(s) => out.push_str(s),
            Segment::Placeholder(_) => {
                idx += 1;
                let _ = write!(&mut out, "${}", idx);
            }
        }
    }
    out
}

/// Collect the argument vector for `template` from `params`.
///
/// Returns one value per placeholder occurrence, in the order [`translate`]
/// numbers them. Fails with [`MapperError::MissingParameter`] on the first name
/// that `params` does not contain. A template without placeholders yields an
/// empty vector.
pub fn extract(template: &str, params: &Record) -> MapperResult<Vec<Value>> {
    placeholder_names(template)
        .into_iter()
        .map(|name| {
            params
                .get(name)
                .cloned()
                .ok_or_else(|| MapperError::missing(name))
        })
        .collect()
}

/// A template scanned once and reused for many parameter sets.
///
/// Update and delete run the same statement once per object; `Template` keeps
/// the translated SQL and the placeholder order so each object only pays for
/// lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    sql: String,
    names: Vec<String>,
}

impl Template {
    pub fn parse(template: &str) -> Self {
        let mut sql = String::with_capacity(template.len());
        let mut names = Vec::new();

        for seg in scan(template) {
            match seg {
                Segment::Text(s) => sql.push_str(s),
                Segment::Placeholder(name) => {
                    names.push(name.to_string());
                    let _ = write!(&mut sql, "${}", names.len());
                }
            }
        }
        Self { sql, names }
    }

    /// The translated statement with `$k` markers.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Placeholder names; index `k - 1` belongs to marker `$k`.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn placeholder_count(&self) -> usize {
        self.names.len()
    }

    /// Look up every placeholder in `params`, borrowing the values.
    pub fn bind<'p>(&self, params: &'p Record) -> MapperResult<Vec<&'p Value>> {
        self.names
            .iter()
            .map(|name| params.get(name).ok_or_else(|| MapperError::missing(name)))
            .collect()
    }
}
