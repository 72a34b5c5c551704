/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Plan optimization passes.
//!
//! Both passes are purely structural rewrites over translated plans:
//! foreign-key join elimination shrinks each plan, condition merging then
//! collapses plans that share a base relation into one query with gated
//! binding makers. Each pass preserves the multiset of bindings the plans
//! produce.

pub mod condition_merge;
pub mod join_elimination;

pub use condition_merge::{merge_conditions, MergedRelation};
pub use join_elimination::eliminate_joins;

use crate::error::Result;
use crate::makers::NodeRelation;
use crate::schema::Catalog;

/// The default pipeline: eliminate joins per plan, then merge conditions
/// across plans.
pub fn optimize(catalog: &Catalog, relations: Vec<NodeRelation>) -> Result<Vec<MergedRelation>> {
    let reduced = relations
        .into_iter()
        .map(|relation| eliminate_joins(catalog, relation))
        .collect::<Result<Vec<_>>>()?;
    merge_conditions(catalog, reduced)
}
