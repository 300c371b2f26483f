use std::path::PathBuf;
use thiserror::Error;

/// Startup-fatal failures while loading the dataset.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read dataset file '{}'", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse dataset file '{}'", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("dataset file '{}' has no columns", path.display())]
    NoColumns { path: PathBuf },
}

/// Failures of the selection-to-chart derivation.
///
/// These are wiring errors: a control offered a value that does not come
/// from the table's own option lists. The HTTP layer logs them and falls
/// back to the no-render placeholder instead of surfacing them to the user.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeriveError {
    #[error("unknown metric column '{0}'")]
    UnknownColumn(String),

    #[error("unknown chart kind '{0}'")]
    UnknownChartKind(String),
}
