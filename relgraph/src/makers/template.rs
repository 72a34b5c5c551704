/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Reversible string templates and composite identifiers.
//!
//! A template such as `http://ex.org/res{t.col1}-{t.col2}.rdf` alternates
//! literal parts with column placeholders, each optionally run through an
//! invertible string transform. Forward evaluation concatenates; reverse
//! matching recovers the per-column values from a candidate string, which is
//! how a query's constant term becomes a relational filter.
//!
//! Ambiguity policy: when two placeholders are adjacent with no literal
//! separator, the earlier placeholder matches non-greedily and the last one
//! takes the rest. Construction and matching use the same rule, so a value
//! built by `value()` always reverse-matches to the column values that built
//! it whenever the match is unambiguous, and to a consistent split when it
//! is not. This mirrors the behavior existing mappings depend on; do not
//! "fix" it.

use std::collections::BTreeSet;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use rustc_hash::FxHashMap;

use nom::{
    branch::alt,
    bytes::complete::is_not,
    character::complete::char,
    combinator::opt,
    multi::many0,
    sequence::preceded,
    IResult,
};

use crate::algebra::{Column, Expr, SqlLiteral};
use crate::error::{RelgraphError, Result};
use crate::makers::row::ResultRow;
use crate::schema::Catalog;

/// Characters kept verbatim by the urlencode column function; everything
/// else is percent-encoded.
const URL_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// An invertible (or canonical-form) string transform applied to one
/// placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Encoding {
    #[default]
    Identity,
    /// Percent-encoding per RFC 3986 unreserved characters.
    UrlEncode,
    /// Canonical lower case. Not invertible: reverse matching only accepts
    /// candidates already in lower case.
    Lowercase,
    /// Canonical upper case. Not invertible.
    Uppercase,
}

impl Encoding {
    pub fn from_name(name: &str) -> Option<Encoding> {
        match name {
            "urlencode" => Some(Encoding::UrlEncode),
            "lowercase" => Some(Encoding::Lowercase),
            "uppercase" => Some(Encoding::Uppercase),
            _ => None,
        }
    }

    pub fn encode(&self, value: &str) -> String {
        match self {
            Encoding::Identity => value.to_string(),
            Encoding::UrlEncode => utf8_percent_encode(value, URL_SAFE).to_string(),
            Encoding::Lowercase => value.to_lowercase(),
            Encoding::Uppercase => value.to_uppercase(),
        }
    }

    /// Invert an encoded capture. `None` means the capture cannot have been
    /// produced by this encoding.
    pub fn decode(&self, value: &str) -> Option<String> {
        match self {
            Encoding::Identity => Some(value.to_string()),
            Encoding::UrlEncode => percent_decode_str(value)
                .decode_utf8()
                .ok()
                .map(|s| s.into_owned()),
            // Case folding loses information; accept only values already in
            // canonical form, whose preimage is taken to be themselves.
            Encoding::Lowercase => {
                if value == value.to_lowercase() {
                    Some(value.to_string())
                } else {
                    None
                }
            }
            Encoding::Uppercase => {
                if value == value.to_uppercase() {
                    Some(value.to_string())
                } else {
                    None
                }
            }
        }
    }

    /// The SQL rendering of this transform applied to a column, if one
    /// exists. Percent-encoding has no portable SQL form.
    pub fn sql_expr(&self, column: &Column) -> Option<Expr> {
        let col = Expr::Column(column.clone());
        match self {
            Encoding::Identity => Some(col),
            Encoding::UrlEncode => None,
            Encoding::Lowercase => Some(Expr::Apply {
                function: "LOWER".to_string(),
                arg: Box::new(col),
            }),
            Encoding::Uppercase => Some(Expr::Apply {
                function: "UPPER".to_string(),
                arg: Box::new(col),
            }),
        }
    }
}

enum Segment {
    Literal(String),
    Placeholder { column: String, encoding: Option<String> },
}

fn placeholder(input: &str) -> IResult<&str, Segment> {
    let (input, _) = char('{')(input)?;
    let (input, column) = is_not("|}")(input)?;
    let (input, encoding) = opt(preceded(char('|'), is_not("}")))(input)?;
    let (input, _) = char('}')(input)?;
    Ok((
        input,
        Segment::Placeholder {
            column: column.to_string(),
            encoding: encoding.map(|e| e.to_string()),
        },
    ))
}

fn literal(input: &str) -> IResult<&str, Segment> {
    let (input, text) = is_not("{")(input)?;
    Ok((input, Segment::Literal(text.to_string())))
}

fn segments(input: &str) -> IResult<&str, Vec<Segment>> {
    many0(alt((placeholder, literal)))(input)
}

/// A reversible string template over qualified columns.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Template {
    /// Always `columns.len() + 1` entries; entries may be empty strings.
    literals: Vec<String>,
    columns: Vec<Column>,
    encodings: Vec<Encoding>,
}

impl Template {
    /// Parse the textual form: `literal{table.column}literal`, with an
    /// optional `|urlencode` / `|lowercase` / `|uppercase` suffix inside a
    /// placeholder.
    pub fn parse(text: &str) -> Result<Template> {
        let (rest, parsed) = segments(text)
            .map_err(|_| RelgraphError::InvalidTemplate(text.to_string()))?;
        if !rest.is_empty() {
            return Err(RelgraphError::InvalidTemplate(text.to_string()));
        }

        let mut literals = vec![String::new()];
        let mut columns = Vec::new();
        let mut encodings = Vec::new();
        for segment in parsed {
            match segment {
                Segment::Literal(text) => {
                    literals.last_mut().unwrap().push_str(&text);
                }
                Segment::Placeholder { column, encoding } => {
                    let (table, name) = column.split_once('.').ok_or_else(|| {
                        RelgraphError::InvalidTemplate(format!(
                            "placeholder `{}` is not table-qualified",
                            column
                        ))
                    })?;
                    let encoding = match encoding {
                        None => Encoding::Identity,
                        Some(name) => Encoding::from_name(&name).ok_or_else(|| {
                            RelgraphError::InvalidTemplate(format!(
                                "unknown column function `{}`",
                                name
                            ))
                        })?,
                    };
                    columns.push(Column::new(table, name));
                    encodings.push(encoding);
                    literals.push(String::new());
                }
            }
        }
        Ok(Template {
            literals,
            columns,
            encodings,
        })
    }

    /// Build from parts. `literals` must have one more entry than `columns`.
    pub fn new(
        literals: Vec<String>,
        columns: Vec<Column>,
        encodings: Vec<Encoding>,
    ) -> Result<Template> {
        if literals.len() != columns.len() + 1 || encodings.len() != columns.len() {
            return Err(RelgraphError::InvalidTemplate(
                "literal parts must surround every placeholder".to_string(),
            ));
        }
        Ok(Template {
            literals,
            columns,
            encodings,
        })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_set(&self) -> BTreeSet<Column> {
        self.columns.iter().cloned().collect()
    }

    pub fn encodings(&self) -> &[Encoding] {
        &self.encodings
    }

    fn first_literal(&self) -> &str {
        self.literals.first().map(String::as_str).unwrap_or("")
    }

    fn last_literal(&self) -> &str {
        self.literals.last().map(String::as_str).unwrap_or("")
    }

    /// Forward evaluation; any null column makes the whole value null.
    pub fn value(&self, row: &ResultRow) -> Option<String> {
        let mut out = String::from(&self.literals[0]);
        for (i, column) in self.columns.iter().enumerate() {
            let raw = row.column(column)?;
            out.push_str(&self.encodings[i].encode(raw));
            out.push_str(&self.literals[i + 1]);
        }
        Some(out)
    }

    /// Cheap structural pre-check: does the candidate carry this template's
    /// leading and trailing literal parts?
    pub fn could_fit(&self, candidate: &str) -> bool {
        let total: usize = self.literals.iter().map(|l| l.len()).sum();
        candidate.len() >= total
            && candidate.starts_with(self.first_literal())
            && candidate.ends_with(self.last_literal())
    }

    /// Reverse-match a candidate, recovering decoded per-column values.
    /// `None` means the candidate cannot have been produced here.
    pub fn attribute_conditions(&self, candidate: &str) -> Option<FxHashMap<Column, String>> {
        if !self.could_fit(candidate) {
            return None;
        }
        let mut out = FxHashMap::default();
        match self.columns.len() {
            0 => {
                if candidate != self.literals[0] {
                    return None;
                }
            }
            1 => {
                // Single placeholder: the middle substring, directly.
                let middle = candidate
                    .strip_prefix(self.first_literal())?
                    .strip_suffix(self.last_literal())?;
                let decoded = self.encodings[0].decode(middle)?;
                out.insert(self.columns[0].clone(), decoded);
            }
            _ => {
                let regex = self.matcher().ok()?;
                let captures = regex.captures(candidate)?;
                for (i, column) in self.columns.iter().enumerate() {
                    let capture = captures.get(i + 1)?.as_str();
                    let decoded = self.encodings[i].decode(capture)?;
                    if let Some(previous) = out.get(column) {
                        // The same column twice must extract consistently.
                        if previous != &decoded {
                            return None;
                        }
                    } else {
                        out.insert(column.clone(), decoded);
                    }
                }
            }
        }
        Some(out)
    }

    /// The regular expression implementing reverse matching: escaped literal
    /// parts with one capturing group per placeholder. All groups are
    /// non-greedy except the last, matching forward construction order
    /// (the documented adjacent-placeholder ambiguity policy).
    fn matcher(&self) -> std::result::Result<Regex, regex::Error> {
        let mut pattern = String::from("^");
        let last = self.columns.len() - 1;
        for (i, literal) in self.literals.iter().enumerate() {
            pattern.push_str(&regex::escape(literal));
            if i < self.columns.len() {
                pattern.push_str(if i == last { "(.*)" } else { "(.*?)" });
            }
        }
        pattern.push('$');
        Regex::new(&pattern)
    }

    /// The predicate "this template's value equals `candidate`": one column
    /// equality per recovered value, or false when the candidate cannot fit
    /// or a recovered value is not representable in its column type.
    pub fn value_expression(&self, candidate: &str, catalog: &Catalog) -> Result<Expr> {
        let conditions = match self.attribute_conditions(candidate) {
            Some(c) => c,
            None => return Ok(Expr::False),
        };
        let mut conjuncts = Vec::new();
        for (column, value) in conditions {
            match catalog.to_literal(&column, &value)? {
                Some(literal) => conjuncts.push(Expr::equality(
                    Expr::Column(column),
                    Expr::Literal(literal),
                )),
                None => return Ok(Expr::False),
            }
        }
        Ok(Expr::conjunction(conjuncts))
    }

    /// The SQL value of this template as a concatenation. The boolean is
    /// true when some encoding has no SQL form and the rendering falls back
    /// to the bare column (the caller must flag the combination as
    /// unsupported).
    pub fn sql_expr(&self) -> (Expr, bool) {
        let mut unsupported = false;
        let mut parts = Vec::new();
        for (i, literal) in self.literals.iter().enumerate() {
            if !literal.is_empty() {
                parts.push(Expr::Literal(SqlLiteral::new(format!(
                    "'{}'",
                    literal.replace('\'', "''")
                ))));
            }
            if i < self.columns.len() {
                match self.encodings[i].sql_expr(&self.columns[i]) {
                    Some(expr) => parts.push(expr),
                    None => {
                        unsupported = true;
                        parts.push(Expr::Column(self.columns[i].clone()));
                    }
                }
            }
        }
        let expr = match parts.len() {
            0 => Expr::Literal(SqlLiteral::new("''")),
            1 => parts.into_iter().next().unwrap(),
            _ => Expr::Concat(parts),
        };
        (expr, unsupported)
    }

    /// Same literal parts and encodings; equal templates over possibly
    /// different columns. Structural equivalence licenses per-placeholder
    /// column equalities.
    pub fn structurally_equal(&self, other: &Template) -> bool {
        self.literals == other.literals && self.encodings == other.encodings
    }

    /// Whether values of the two templates can coincide at all, judged by
    /// their leading and trailing literal parts. A disagreement within the
    /// shared prefix (or suffix) proves emptiness without touching SQL.
    pub fn affix_compatible(&self, other: &Template) -> bool {
        let (a, b) = (self.first_literal(), other.first_literal());
        let n = a.len().min(b.len());
        if a.as_bytes()[..n] != b.as_bytes()[..n] {
            return false;
        }
        let (a, b) = (self.last_literal(), other.last_literal());
        let n = a.len().min(b.len());
        a.as_bytes()[a.len() - n..] == b.as_bytes()[b.len() - n..]
    }

    /// Rebuild with every column substituted.
    pub fn rewrite_columns(&self, rename: &impl Fn(&Column) -> Column) -> Template {
        Template {
            literals: self.literals.clone(),
            columns: self.columns.iter().map(rename).collect(),
            encodings: self.encodings.clone(),
        }
    }
}

/// Separator between the prefix and the column values of a composite id.
pub const COMPOSITE_SEPARATOR: &str = "@@";

/// A synthetic multi-column identifier: `prefix@@v1@@v2...`, used for terms
/// with no natural single-column key (typically blank nodes).
///
/// Column values are joined verbatim; a value containing the separator
/// produces an id that fails reverse matching (wrong part count) rather
/// than mis-splitting.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CompositeId {
    pub prefix: String,
    pub columns: Vec<Column>,
}

impl CompositeId {
    pub fn new(prefix: impl Into<String>, columns: Vec<Column>) -> Self {
        CompositeId {
            prefix: prefix.into(),
            columns,
        }
    }

    pub fn column_set(&self) -> BTreeSet<Column> {
        self.columns.iter().cloned().collect()
    }

    /// Two composite ids can only ever coincide when prefix and arity agree.
    pub fn same_shape(&self, other: &CompositeId) -> bool {
        self.prefix == other.prefix && self.columns.len() == other.columns.len()
    }

    pub fn value(&self, row: &ResultRow) -> Option<String> {
        let mut out = self.prefix.clone();
        for column in &self.columns {
            out.push_str(COMPOSITE_SEPARATOR);
            out.push_str(row.column(column)?);
        }
        Some(out)
    }

    pub fn could_fit(&self, candidate: &str) -> bool {
        if self.columns.is_empty() {
            return candidate == self.prefix;
        }
        candidate
            .strip_prefix(&self.prefix)
            .is_some_and(|rest| rest.starts_with(COMPOSITE_SEPARATOR))
    }

    pub fn attribute_conditions(&self, candidate: &str) -> Option<FxHashMap<Column, String>> {
        let rest = candidate.strip_prefix(&self.prefix)?;
        if self.columns.is_empty() {
            return rest.is_empty().then(FxHashMap::default);
        }
        let rest = rest.strip_prefix(COMPOSITE_SEPARATOR)?;
        let parts: Vec<&str> = rest.split(COMPOSITE_SEPARATOR).collect();
        if parts.len() != self.columns.len() {
            return None;
        }
        let mut out = FxHashMap::default();
        for (column, part) in self.columns.iter().zip(parts) {
            if let Some(previous) = out.get(column) {
                if previous != part {
                    return None;
                }
            } else {
                out.insert(column.clone(), part.to_string());
            }
        }
        Some(out)
    }

    pub fn value_expression(&self, candidate: &str, catalog: &Catalog) -> Result<Expr> {
        let conditions = match self.attribute_conditions(candidate) {
            Some(c) => c,
            None => return Ok(Expr::False),
        };
        let mut conjuncts = Vec::new();
        for (column, value) in conditions {
            match catalog.to_literal(&column, &value)? {
                Some(literal) => conjuncts.push(Expr::equality(
                    Expr::Column(column),
                    Expr::Literal(literal),
                )),
                None => return Ok(Expr::False),
            }
        }
        Ok(Expr::conjunction(conjuncts))
    }

    pub fn sql_expr(&self) -> Expr {
        let mut parts = vec![Expr::Literal(SqlLiteral::new(format!(
            "'{}'",
            self.prefix.replace('\'', "''")
        )))];
        for column in &self.columns {
            parts.push(Expr::Literal(SqlLiteral::new(format!(
                "'{}'",
                COMPOSITE_SEPARATOR
            ))));
            parts.push(Expr::Column(column.clone()));
        }
        if parts.len() == 1 {
            parts.into_iter().next().unwrap()
        } else {
            Expr::Concat(parts)
        }
    }

    pub fn rewrite_columns(&self, rename: &impl Fn(&Column) -> Column) -> CompositeId {
        CompositeId {
            prefix: self.prefix.clone(),
            columns: self.columns.iter().map(rename).collect(),
        }
    }
}
