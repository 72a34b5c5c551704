/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

pub mod algebra;
pub mod constraint;
pub mod context;
pub mod error;
pub mod makers;
pub mod optimizer;
pub mod schema;
pub mod translator;

pub use context::{TranslationContext, TranslationStats};
pub use error::{RelgraphError, Result};
pub use translator::GraphPatternTranslator;
