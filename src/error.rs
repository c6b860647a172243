//! Error types used by the fanhub scope and its pipelines.
//!
//! This module defines two main types:
//!
//! - [`SourceError`] — a clonable error produced by the upstream source.
//! - [`HubError`] — errors raised by the hub itself: misuse of the scope
//!   lifecycle, or terminal faults delivered to pipelines.
//!
//! Both types provide an `as_label` helper for logging/metrics, and
//! [`HubError`] additionally classifies itself via [`HubError::is_usage`]
//! and [`HubError::is_cancellation`].

use std::sync::Arc;
use thiserror::Error;

/// # Error produced by the upstream source.
///
/// Clonable so a single upstream failure can be fanned out to every
/// registered pipeline; each pipeline observes this exact value inside
/// [`HubError::Upstream`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct SourceError {
    message: Arc<str>,
}

impl SourceError {
    /// Creates a new source error with the given message.
    ///
    /// # Example
    /// ```
    /// use fanhub::SourceError;
    ///
    /// let err = SourceError::new("connection reset");
    /// assert_eq!(err.message(), "connection reset");
    /// ```
    pub fn new(message: impl Into<Arc<str>>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the underlying message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// # Errors produced by the fan-out hub.
///
/// Two families share this enum, the way the scope API surfaces them:
///
/// - **Usage errors** — programming mistakes against the scope lifecycle
///   (registering after freeze, reentrant registration, freezing an empty
///   scope, collecting too early or twice). These are fatal and never
///   swallowed; see [`HubError::is_usage`].
/// - **Terminal faults** — delivered through pipeline streams when the
///   collection stops abnormally: [`HubError::Upstream`] carries the source
///   error verbatim, [`HubError::Cancelled`] marks cooperative shutdown,
///   [`HubError::BuilderPanicked`] marks a pipeline whose builder panicked.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HubError {
    /// The scope is frozen; registrations are no longer accepted.
    #[error("selector scope is frozen; registrations are no longer accepted")]
    Frozen,

    /// The scope is closed; no operation is possible anymore.
    #[error("selector scope is closed")]
    Closed,

    /// `register` was called from inside another in-flight `register`.
    #[error("cannot register a pipeline from inside another registration")]
    NestedRegister,

    /// `freeze` was called on a scope with zero registered pipelines.
    #[error("cannot freeze a selector scope with no registered pipelines")]
    NoPipelines,

    /// A pipeline output was collected before the scope was frozen.
    #[error("only a frozen selector scope can be collected")]
    NotFrozen,

    /// A pipeline output was collected twice.
    #[error("pipeline {pipeline} was already collected")]
    AlreadyCollected {
        /// Index of the pipeline.
        pipeline: usize,
    },

    /// A pipeline builder panicked while constructing its output stream.
    #[error("pipeline builder panicked: {reason}")]
    BuilderPanicked {
        /// Captured panic message.
        reason: Arc<str>,
    },

    /// The upstream source failed; carries its error verbatim.
    #[error("upstream source failed: {0}")]
    Upstream(#[source] SourceError),

    /// The overall collection was cancelled before the upstream finished.
    #[error("collection cancelled")]
    Cancelled,
}

impl HubError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use fanhub::HubError;
    ///
    /// assert_eq!(HubError::NestedRegister.as_label(), "nested_register");
    /// assert_eq!(HubError::Cancelled.as_label(), "cancelled");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            HubError::Frozen => "scope_frozen",
            HubError::Closed => "scope_closed",
            HubError::NestedRegister => "nested_register",
            HubError::NoPipelines => "no_pipelines",
            HubError::NotFrozen => "not_frozen",
            HubError::AlreadyCollected { .. } => "already_collected",
            HubError::BuilderPanicked { .. } => "builder_panicked",
            HubError::Upstream(_) => "upstream_failed",
            HubError::Cancelled => "cancelled",
        }
    }

    /// Indicates whether the error is a usage error — a caller defect in the
    /// scope lifecycle rather than a runtime condition.
    ///
    /// Usage errors are surfaced immediately and never retried or swallowed.
    ///
    /// # Example
    /// ```
    /// use fanhub::{HubError, SourceError};
    ///
    /// assert!(HubError::NoPipelines.is_usage());
    /// assert!(!HubError::Upstream(SourceError::new("boom")).is_usage());
    /// ```
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            HubError::Frozen
                | HubError::Closed
                | HubError::NestedRegister
                | HubError::NoPipelines
                | HubError::NotFrozen
                | HubError::AlreadyCollected { .. }
        )
    }

    /// Indicates whether the error marks cooperative cancellation, as
    /// opposed to an upstream failure or a caller defect.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, HubError::Cancelled)
    }
}
