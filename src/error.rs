// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use thiserror::Error;

use crate::models::SubscriptionStatus;

/// Failures raised by the bookkeeping core.
///
/// Store failures are surfaced unchanged; nothing in the core retries.
#[derive(Debug, Error)]
pub enum MeiError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Subscription cannot go from '{from}' on {event}")]
    InvalidTransition {
        from: SubscriptionStatus,
        event: String,
    },
    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type MeiResult<T> = Result<T, MeiError>;

impl MeiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        MeiError::Validation(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        MeiError::Config(msg.into())
    }
}
