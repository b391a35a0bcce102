// Diagnostics channel for recoverable evaluation failures
//
// No failure in this engine is fatal: parse failures degrade to an empty
// program, expression failures to false, key failures to the raw key text.
// Every degradation is reported here so template-authoring tooling can
// surface actionable errors upstream.

use std::sync::Mutex;

use crate::params::ParameterMap;

/// The kind of recoverable failure being reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// Substituted template text was not valid JSON
    ParseFailure,
    /// A condition-query expression failed to parse or evaluate
    ExpressionFailure,
    /// A dynamic `[...]` object key failed to compute
    KeyFailure,
    /// Two parameter names sanitize to the same expression identifier
    IdentifierCollision,
}

/// A single recoverable-failure report, carrying the offending text and a
/// snapshot of the parameter values at the time of failure.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    /// The offending expression, key, or substituted template text
    pub source: String,
    pub params: ParameterMap,
}

impl Diagnostic {
    pub fn new(
        kind: DiagnosticKind,
        message: impl Into<String>,
        source: impl Into<String>,
        params: &ParameterMap,
    ) -> Self {
        Diagnostic {
            kind,
            message: message.into(),
            source: source.into(),
            params: params.clone(),
        }
    }
}

/// Where recoverable failures are reported.
///
/// The sink is injected through the evaluation entry points so hosts can
/// route reports wherever they like and tests can assert on them.
pub trait DiagnosticSink {
    fn report(&self, diagnostic: &Diagnostic);
}

/// Default sink: structured `tracing` warnings.
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: &Diagnostic) {
        tracing::warn!(
            kind = ?diagnostic.kind,
            source = %diagnostic.source,
            params = ?diagnostic.params,
            "{}",
            diagnostic.message
        );
    }
}

/// Collecting sink for tests and tooling.
#[derive(Default)]
pub struct MemorySink {
    reports: Mutex<Vec<Diagnostic>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<Diagnostic> {
        self.reports.lock().expect("diagnostics lock poisoned").clone()
    }

    pub fn is_empty(&self) -> bool {
        self.reports().is_empty()
    }
}

impl DiagnosticSink for MemorySink {
    fn report(&self, diagnostic: &Diagnostic) {
        self.reports
            .lock()
            .expect("diagnostics lock poisoned")
            .push(diagnostic.clone());
    }
}
