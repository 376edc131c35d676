use thiserror::Error;

#[derive(Error, Debug)]
pub enum RouteError {
    #[error("Table not loaded: {0}")]
    NotLoaded(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Unreadable table: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Unreadable workbook: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("InvalidData: {0}")]
    InvalidData(String),

    #[error("{0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, RouteError>;

#[cfg(feature = "python")]
impl From<RouteError> for pyo3::PyErr {
    fn from(err: RouteError) -> pyo3::PyErr {
        pyo3::exceptions::PyRuntimeError::new_err(err.to_string())
    }
}

#[cfg(feature = "python")]
impl From<pyo3::PyErr> for RouteError {
    fn from(err: pyo3::PyErr) -> Self {
        RouteError::General(err.to_string())
    }
}
