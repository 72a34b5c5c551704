/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Immutable relational expression algebra
//!
//! This module defines the plan representation the whole engine works on:
//!
//! - `types`: table references, qualified columns, literals, order specs
//! - `expr`: boolean/value expression trees with eager simplification
//! - `relation`: the `RelationalExpr` tree and its validating constructors
//! - `rewrite`: the generic tree transform, with `Renamer` (table aliasing)
//!   and `ColumnRenamer` (join elimination) as its two instantiations
//!
//! Plans are pure values with structural equality; the translator relies on
//! that for deduplication and the optimizer for grouping.

pub mod expr;
pub mod relation;
pub mod rewrite;
pub mod types;

pub use expr::Expr;
pub use relation::{Projection, RelationalExpr};
pub use rewrite::{transform, ColumnRenamer, ExprTransform, Renamer};
pub use types::{Column, ColumnEquality, OrderSpec, SqlLiteral, TableRef};
