use thiserror::Error;

use crate::{graph::GraphErrors, key::Key, types::DynError};

/// Errors raised by container operations.
#[derive(Error, Debug)]
pub enum ContainerError {
    /// The component list failed graph validation. Nothing was
    /// constructed.
    #[error(transparent)]
    Validation(#[from] GraphErrors),

    /// A scoped component was requested with no scope active.
    #[error("'{key}' is scoped but no scope is active - resolve it inside run_scope")]
    ScopeRequired { key: Key },

    /// The stored instance is not of the requested type.
    #[error("'{key}' holds a '{actual}', not a '{requested}'")]
    TypeMismatch {
        key: Key,
        requested: &'static str,
        actual: &'static str,
    },

    /// A factory or post-construct hook failed. The original error is
    /// carried unchanged as the source.
    #[error("construction of '{key}' failed: {source}")]
    Construction {
        key: Key,
        #[source]
        source: DynError,
    },
}

/// Errors raised while driving an application's lifecycle.
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Container(#[from] ContainerError),

    /// A module lifecycle hook failed.
    #[error("{stage} hook failed: {source}")]
    Hook {
        stage: &'static str,
        #[source]
        source: DynError,
    },
}
