/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Node makers: row-to-RDF-term converters.

use std::collections::BTreeSet;

use shared::terms::{RdfTerm, TermKind};

use crate::algebra::{Column, Projection};
use crate::makers::row::ResultRow;
use crate::makers::value::ValueMaker;

/// Produces one RDF term per result row.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeMaker {
    /// Never yields a term.
    Empty,
    /// Always yields the same term, bypassing the row.
    Fixed(RdfTerm),
    /// Wraps a value maker's lexical form into a term of the given kind.
    Typed {
        kind: TermKind,
        maker: ValueMaker,
        /// Whether distinct rows are guaranteed to yield distinct terms
        /// (the maker's columns contain a unique key). Feeds the
        /// duplicate-free check of condition merging.
        unique: bool,
    },
}

impl NodeMaker {
    pub fn fixed(term: RdfTerm) -> Self {
        NodeMaker::Fixed(term)
    }

    pub fn typed(kind: TermKind, maker: ValueMaker) -> Self {
        NodeMaker::Typed {
            kind,
            maker,
            unique: false,
        }
    }

    pub fn typed_unique(kind: TermKind, maker: ValueMaker) -> Self {
        NodeMaker::Typed {
            kind,
            maker,
            unique: true,
        }
    }

    pub fn make_term(&self, row: &ResultRow) -> Option<RdfTerm> {
        match self {
            NodeMaker::Empty => None,
            NodeMaker::Fixed(term) => Some(term.clone()),
            NodeMaker::Typed { kind, maker, .. } => {
                maker.value(row).map(|value| kind.term(value))
            }
        }
    }

    pub fn columns(&self) -> BTreeSet<Column> {
        match self {
            NodeMaker::Empty | NodeMaker::Fixed(_) => BTreeSet::new(),
            NodeMaker::Typed { maker, .. } => maker.columns(),
        }
    }

    pub fn projections(&self) -> BTreeSet<Projection> {
        match self {
            NodeMaker::Empty | NodeMaker::Fixed(_) => BTreeSet::new(),
            NodeMaker::Typed { maker, .. } => maker.projections(),
        }
    }

    pub fn is_unique(&self) -> bool {
        match self {
            NodeMaker::Empty => true,
            NodeMaker::Fixed(_) => false,
            NodeMaker::Typed { unique, .. } => *unique,
        }
    }

    pub fn rewrite_columns(&self, rename: &impl Fn(&Column) -> Column) -> NodeMaker {
        match self {
            NodeMaker::Empty => NodeMaker::Empty,
            NodeMaker::Fixed(term) => NodeMaker::Fixed(term.clone()),
            NodeMaker::Typed {
                kind,
                maker,
                unique,
            } => NodeMaker::Typed {
                kind: kind.clone(),
                maker: maker.rewrite_columns(rename),
                unique: *unique,
            },
        }
    }
}
