/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Caller-supplied translation context.
//!
//! Counters are atomic so combination evaluation can fan out across
//! threads; there is no process-global state anywhere in the engine.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct TranslationContext {
    combinations_considered: AtomicU64,
    combinations_dropped: AtomicU64,
    unsupported_flagged: AtomicU64,
}

/// A point-in-time copy of the context counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TranslationStats {
    pub combinations_considered: u64,
    pub combinations_dropped: u64,
    pub unsupported_flagged: u64,
}

impl TranslationContext {
    pub fn new() -> Self {
        TranslationContext::default()
    }

    pub fn count_considered(&self) {
        self.combinations_considered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count_dropped(&self) {
        self.combinations_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count_unsupported(&self) {
        self.unsupported_flagged.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> TranslationStats {
        TranslationStats {
            combinations_considered: self.combinations_considered.load(Ordering::Relaxed),
            combinations_dropped: self.combinations_dropped.load(Ordering::Relaxed),
            unsupported_flagged: self.unsupported_flagged.load(Ordering::Relaxed),
        }
    }
}
