use std::path::PathBuf;

/// Fatal failures surfaced by the core pipeline.
///
/// Structural anomalies and resource-limit decisions are not represented
/// here — they are recovered or abandoned locally and only ever reach
/// `tracing::warn!`/`tracing::debug!`.
#[derive(thiserror::Error, Debug)]
pub enum GraphError {
    #[error("{path}:{line}: expected {expected} whitespace-separated fields, found {found}")]
    FieldCount {
        path: PathBuf,
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("{path}:{line}: field {field} ({value:?}) is not a valid {kind}")]
    NotNumeric {
        path: PathBuf,
        line: usize,
        field: &'static str,
        value: String,
        kind: &'static str,
    },

    #[error("node name {0:?} does not match <digits>+:[BE] or \"NA\"")]
    BadNodeName(String),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GraphError>;
