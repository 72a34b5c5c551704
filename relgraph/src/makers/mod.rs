/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Value, node and binding makers
//!
//! The maker stack converts between result rows and graph terms:
//!
//! - `row`: the stringly-typed result row handed over by the database layer
//! - `template`: reversible string templates and composite identifiers
//! - `value`: row → lexical form, plus predicate building for fixed values
//! - `node`: row → RDF term (kind wrapping, fixed terms)
//! - `binding`: row → binding, and the relation/maker pair types

pub mod binding;
pub mod node;
pub mod row;
pub mod template;
pub mod value;

pub use binding::{BindingMaker, NodeRelation, TripleRelation};
pub use node::NodeMaker;
pub use row::ResultRow;
pub use template::{CompositeId, Encoding, Template, COMPOSITE_SEPARATOR};
pub use value::ValueMaker;
