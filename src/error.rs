use std::path::Path;

use thiserror::Error;

/// Failures that abort an ETL run or a snapshot load.
///
/// Row-level conversion problems are not represented here: they are
/// coerced to `None` on the spot and counted in the ETL report.
#[derive(Debug, Error)]
pub enum ObservatoryError {
    #[error("data source {path}: {message}")]
    DataSource { path: String, message: String },
    #[error("schema error in source '{source_name}': missing column '{column}'")]
    Schema { source_name: String, column: String },
    #[error("snapshot {path}: {message}")]
    Snapshot { path: String, message: String },
    #[error("geometry error: {message}")]
    Geometry { message: String },
    #[error("export {path}: {message}")]
    Export { path: String, message: String },
}

impl ObservatoryError {
    pub fn data_source(path: impl AsRef<Path>, message: impl ToString) -> Self {
        Self::DataSource {
            path: path.as_ref().display().to_string(),
            message: message.to_string(),
        }
    }

    pub fn schema(source_name: impl Into<String>, column: impl Into<String>) -> Self {
        Self::Schema {
            source_name: source_name.into(),
            column: column.into(),
        }
    }

    pub fn snapshot(path: impl AsRef<Path>, message: impl ToString) -> Self {
        Self::Snapshot {
            path: path.as_ref().display().to_string(),
            message: message.to_string(),
        }
    }

    pub fn geometry(message: impl Into<String>) -> Self {
        Self::Geometry {
            message: message.into(),
        }
    }

    pub fn export(path: impl AsRef<Path>, message: impl ToString) -> Self {
        Self::Export {
            path: path.as_ref().display().to_string(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ObservatoryError>;
