// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use thiserror::Error;

/// Domain failures surfaced to the command layer. Anything not covered here
/// travels as `anyhow::Error` with context attached at the call site.
#[derive(Debug, Error)]
pub enum StewardError {
    #[error("{0}")]
    Validation(String),

    /// Expense admission control: the request exceeds what is left in the
    /// category budget. Carries the available amount for the user message.
    #[error("over budget: {available} available")]
    OverBudget { available: i64 },

    #[error("{0} not found")]
    NotFound(String),

    #[error("no active period")]
    NoActivePeriod,

    #[error("AI service error: {0}")]
    Ai(String),
}

pub type Result<T> = std::result::Result<T, StewardError>;
