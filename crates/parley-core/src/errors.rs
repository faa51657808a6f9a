//! The hub error taxonomy.
//!
//! [`HubError`] covers every failure a relay operation can surface to a
//! caller. Validation errors (`EmptyMessage`, `MissingRecipient`,
//! `Forbidden`, `MissingParameter`) are returned synchronously and are
//! never persisted or fanned out; a store failure aborts the send entirely
//! and is retried by the caller, not by the hub. Partial fan-out failure
//! is deliberately absent — it is logged per target and never surfaced.

use thiserror::Error;

// ── Wire error codes ────────────────────────────────────────────────

/// No valid identity at connect time; the connection is refused.
pub const UNAUTHENTICATED: &str = "UNAUTHENTICATED";
/// Authenticated but not entitled to the requested action.
pub const FORBIDDEN: &str = "FORBIDDEN";
/// Both text content and attachment were absent.
pub const EMPTY_MESSAGE: &str = "EMPTY_MESSAGE";
/// A directed send named no recipient.
pub const MISSING_RECIPIENT: &str = "MISSING_RECIPIENT";
/// A privileged query omitted a required parameter.
pub const MISSING_PARAMETER: &str = "MISSING_PARAMETER";
/// The persistence store rejected or could not complete the operation.
pub const STORE_ERROR: &str = "STORE_ERROR";

/// Errors surfaced to callers of relay operations.
#[derive(Debug, Error)]
pub enum HubError {
    /// No verified identity was presented at connect time.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// The caller's identity does not permit the requested action.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Both content and attachment were absent or blank.
    #[error("message has no content and no attachment")]
    EmptyMessage,

    /// A directed send named no recipient (absent or zero user id).
    #[error("recipient user id is missing")]
    MissingRecipient,

    /// A privileged history query omitted the counterpart parameter.
    #[error("missing parameter: {0}")]
    MissingParameter(String),

    /// The persistence store failed; the send was aborted before fan-out.
    #[error("store error: {0}")]
    Store(String),
}

impl HubError {
    /// Wrap a store failure. Kept as a constructor rather than `From` so
    /// the core crate stays independent of the store crate.
    #[must_use]
    pub fn store(err: impl std::fmt::Display) -> Self {
        Self::Store(err.to_string())
    }

    /// Machine-readable wire code for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated(_) => UNAUTHENTICATED,
            Self::Forbidden(_) => FORBIDDEN,
            Self::EmptyMessage => EMPTY_MESSAGE,
            Self::MissingRecipient => MISSING_RECIPIENT,
            Self::MissingParameter(_) => MISSING_PARAMETER,
            Self::Store(_) => STORE_ERROR,
        }
    }

    /// Whether this error was caught before anything was persisted.
    ///
    /// True for every variant except `Store`, which can only occur after
    /// validation passed and the append was attempted.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        !matches!(self, Self::Store(_))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
