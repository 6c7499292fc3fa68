use thiserror::Error;

use crate::events::EventKind;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ArgError {
    #[error("missing argument `{0}`")]
    Missing(&'static str),
    #[error("argument `{field}` is not {expected}")]
    Malformed {
        field: &'static str,
        expected: &'static str,
    },
}

/// A raw event could not be shaped into its canonical payload.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to enrich {kind} event: {source}")]
pub struct EnrichmentError {
    pub kind: EventKind,
    #[source]
    pub source: ArgError,
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("unknown proposal state {0}")]
pub struct UnknownProposalState(pub u8);
