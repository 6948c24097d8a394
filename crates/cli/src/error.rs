// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User-friendly error display with context and suggestions.
//!
//! Each error says what went wrong (message), why it might have happened
//! (context) and how to fix it (suggestions).

use crate::primitive::Kind;
use kvlock_adapters::{KvError, SessionError};
use kvlock_engine::CoordinationError;
use std::fmt;

/// Error with context and recovery suggestions for user-friendly display.
#[derive(Debug)]
pub struct CliError {
    /// What went wrong
    pub message: String,
    /// Why it might have happened
    pub context: Vec<String>,
    /// How to fix it
    pub suggestions: Vec<String>,
    /// Original error if any
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: Vec::new(),
            suggestions: Vec::new(),
            source: None,
        }
    }

    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context.push(ctx.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "error: {}", self.message)?;

        if !self.context.is_empty() {
            writeln!(f)?;
            for ctx in &self.context {
                writeln!(f, "  -> {}", ctx)?;
            }
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            writeln!(f, "suggestions:")?;
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                writeln!(f, "  {}. {}", i + 1, suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Builders for the failures users actually hit.
impl CliError {
    /// Acquiring a lock or semaphore slot failed
    pub fn acquire_failed(kind: Kind, prefix: &str, err: CoordinationError) -> Self {
        Self::coordination(format!("Failed to acquire {kind} '{prefix}'"), prefix, err)
    }

    /// Destroying a lock or semaphore failed
    pub fn destroy_failed(kind: Kind, prefix: &str, err: CoordinationError) -> Self {
        Self::coordination(format!("Failed to destroy {kind} '{prefix}'"), prefix, err)
    }

    /// The command could not be started
    pub fn spawn_failed(program: &str, err: std::io::Error) -> Self {
        CliError::new(format!("Failed to start '{program}'"))
            .with_context(err.to_string())
            .with_suggestion("Check that the command exists and is executable")
            .with_source(err)
    }

    fn coordination(message: String, prefix: &str, err: CoordinationError) -> Self {
        let error = CliError::new(message).with_context(err.to_string());
        let error = match &err {
            CoordinationError::Held | CoordinationError::InUse => error
                .with_context("Another participant currently holds it")
                .with_suggestion("Wait for the current holder to release"),
            CoordinationError::MaxAttemptsReached { .. } => error
                .with_suggestion("Increase the --try duration")
                .with_suggestion("Drop --try to wait indefinitely"),
            CoordinationError::Conflict { .. } => error
                .with_context("The key is used by a different kind of primitive")
                .with_suggestion("A limit of 1 takes a lock, a larger limit takes a semaphore")
                .with_suggestion(format!("Use a prefix other than '{prefix}'")),
            CoordinationError::LimitConflict { remote, .. } => error
                .with_context("Every participant must agree on the limit")
                .with_suggestion(format!("Use --limit {remote}")),
            CoordinationError::SessionExpired(_) => error
                .with_context("The session was invalidated before the operation finished")
                .with_suggestion("Use a longer --ttl"),
            CoordinationError::Kv(KvError::Unavailable(_))
            | CoordinationError::Session(SessionError::Unavailable(_)) => error
                .with_context("The coordination service could not be reached")
                .with_suggestion("Check --address or KVLOCK_HTTP_ADDR")
                .with_suggestion("Check that the service is running"),
            CoordinationError::Kv(KvError::Status { status: 403, .. })
            | CoordinationError::Session(SessionError::Status { status: 403, .. }) => error
                .with_context("The request was denied")
                .with_suggestion("Check --token or KVLOCK_HTTP_TOKEN"),
            _ => error,
        };
        error.with_source(err)
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
