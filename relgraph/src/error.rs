/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Error types for relational expression construction and translation.
//!
//! Only malformed construction is an error here. An unsatisfiable
//! combination of restrictions is not an error (it yields zero rows and the
//! combination is dropped), and a relationally-unexpressible join is a
//! warning flag on the constraint builder, not a failure.

use thiserror::Error;

/// Errors raised while building relational expressions or translating
/// patterns. All of these indicate a mapping or programmer mistake and are
/// never recovered from.
#[derive(Debug, Error)]
pub enum RelgraphError {
    /// A table name that the catalog does not know.
    #[error("unknown table: {0}")]
    UnknownTable(String),

    /// A column name that the catalog does not know.
    #[error("unknown column: {0}")]
    UnknownColumn(String),

    /// A column referenced above a node that none of its children exposes.
    #[error("column {0} is not exposed by the child relation")]
    MissingColumn(String),

    /// Two join operands expose the same table name.
    #[error("join operands share table name: {0}")]
    DuplicateTable(String),

    /// An equality over columns with different canonical encodings.
    #[error("incompatible column formats: {left} vs {right}")]
    IncompatibleFormats { left: String, right: String },

    /// An alias applied to a relation that exposes more than one table.
    #[error("alias requires a single-table child, found tables: {0}")]
    AliasOverMultipleTables(String),

    /// A template string that does not parse.
    #[error("invalid template: {0}")]
    InvalidTemplate(String),

    /// The cartesian product of candidate bridges does not fit in memory.
    #[error("too many candidate combinations for pattern")]
    TooManyCombinations,
}

pub type Result<T> = std::result::Result<T, RelgraphError>;
