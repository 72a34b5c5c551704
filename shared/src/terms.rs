/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! RDF terms, triple patterns and bindings shared across the workspace.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use url::Url;

/// A concrete RDF term: URI, blank node, or literal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RdfTerm {
    Uri(String),
    BlankNode(String),
    Literal {
        value: String,
        language: Option<String>,
        datatype: Option<String>,
    },
}

impl RdfTerm {
    pub fn uri(iri: impl Into<String>) -> Self {
        RdfTerm::Uri(iri.into())
    }

    /// Build a URI term only if the string is an absolute IRI.
    pub fn absolute_uri(iri: impl Into<String>) -> Option<Self> {
        let iri = iri.into();
        Url::parse(&iri).ok()?;
        Some(RdfTerm::Uri(iri))
    }

    pub fn blank_node(id: impl Into<String>) -> Self {
        RdfTerm::BlankNode(id.into())
    }

    pub fn plain(value: impl Into<String>) -> Self {
        RdfTerm::Literal {
            value: value.into(),
            language: None,
            datatype: None,
        }
    }

    pub fn lang_string(value: impl Into<String>, lang: impl Into<String>) -> Self {
        RdfTerm::Literal {
            value: value.into(),
            language: Some(lang.into()),
            datatype: None,
        }
    }

    pub fn typed(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        RdfTerm::Literal {
            value: value.into(),
            language: None,
            datatype: Some(datatype.into()),
        }
    }

    pub fn is_uri(&self) -> bool {
        matches!(self, RdfTerm::Uri(_))
    }

    pub fn is_blank_node(&self) -> bool {
        matches!(self, RdfTerm::BlankNode(_))
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, RdfTerm::Literal { .. })
    }

    /// The lexical form: URI string, blank node label, or literal value.
    pub fn lexical_form(&self) -> &str {
        match self {
            RdfTerm::Uri(s) => s,
            RdfTerm::BlankNode(s) => s,
            RdfTerm::Literal { value, .. } => value,
        }
    }
}

impl fmt::Display for RdfTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RdfTerm::Uri(s) => write!(f, "<{}>", s),
            RdfTerm::BlankNode(s) => write!(f, "_:{}", s),
            RdfTerm::Literal {
                value,
                language,
                datatype,
            } => {
                write!(f, "\"{}\"", value)?;
                if let Some(lang) = language {
                    write!(f, "@{}", lang)?;
                } else if let Some(dt) = datatype {
                    write!(f, "^^<{}>", dt)?;
                }
                Ok(())
            }
        }
    }
}

/// The kind of term a node maker produces.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TermKind {
    Uri,
    BlankNode,
    PlainLiteral,
    LangLiteral(String),
    TypedLiteral(String),
}

impl TermKind {
    /// Classify a concrete term.
    pub fn of(term: &RdfTerm) -> TermKind {
        match term {
            RdfTerm::Uri(_) => TermKind::Uri,
            RdfTerm::BlankNode(_) => TermKind::BlankNode,
            RdfTerm::Literal {
                language: Some(lang),
                ..
            } => TermKind::LangLiteral(lang.clone()),
            RdfTerm::Literal {
                datatype: Some(dt), ..
            } => TermKind::TypedLiteral(dt.clone()),
            RdfTerm::Literal { .. } => TermKind::PlainLiteral,
        }
    }

    /// Wrap a lexical form into a term of this kind.
    pub fn term(&self, value: String) -> RdfTerm {
        match self {
            TermKind::Uri => RdfTerm::Uri(value),
            TermKind::BlankNode => RdfTerm::BlankNode(value),
            TermKind::PlainLiteral => RdfTerm::plain(value),
            TermKind::LangLiteral(lang) => RdfTerm::lang_string(value, lang.clone()),
            TermKind::TypedLiteral(dt) => RdfTerm::typed(value, dt.clone()),
        }
    }
}

/// A query variable.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Variable(pub String);

impl Variable {
    pub fn new(name: impl Into<String>) -> Self {
        Variable(name.into())
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.0)
    }
}

/// One position of a triple pattern: a variable or a fixed term.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PatternTerm {
    Var(Variable),
    Term(RdfTerm),
}

impl PatternTerm {
    pub fn var(name: impl Into<String>) -> Self {
        PatternTerm::Var(Variable::new(name))
    }

    pub fn is_var(&self) -> bool {
        matches!(self, PatternTerm::Var(_))
    }

    pub fn as_var(&self) -> Option<&Variable> {
        match self {
            PatternTerm::Var(v) => Some(v),
            PatternTerm::Term(_) => None,
        }
    }
}

/// Subject, predicate or object slot of a triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TriplePosition {
    Subject,
    Predicate,
    Object,
}

impl TriplePosition {
    pub const ALL: [TriplePosition; 3] = [
        TriplePosition::Subject,
        TriplePosition::Predicate,
        TriplePosition::Object,
    ];
}

/// A single triple pattern of a basic graph pattern.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TriplePattern {
    pub subject: PatternTerm,
    pub predicate: PatternTerm,
    pub object: PatternTerm,
}

impl TriplePattern {
    pub fn new(subject: PatternTerm, predicate: PatternTerm, object: PatternTerm) -> Self {
        TriplePattern {
            subject,
            predicate,
            object,
        }
    }

    pub fn term_at(&self, position: TriplePosition) -> &PatternTerm {
        match position {
            TriplePosition::Subject => &self.subject,
            TriplePosition::Predicate => &self.predicate,
            TriplePosition::Object => &self.object,
        }
    }

    /// All distinct variables of this pattern, in subject/predicate/object order.
    pub fn variables(&self) -> Vec<&Variable> {
        let mut vars = Vec::new();
        for position in TriplePosition::ALL {
            if let PatternTerm::Var(v) = self.term_at(position) {
                if !vars.contains(&v) {
                    vars.push(v);
                }
            }
        }
        vars
    }
}

/// An assignment of terms to the variables of a pattern.
pub type Binding = HashMap<Variable, RdfTerm>;
