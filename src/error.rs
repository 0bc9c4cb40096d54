use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Unknown indicator '{0}'")]
    UnknownIndicator(String),

    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidRange { start: chrono::NaiveDate, end: chrono::NaiveDate },

    #[error("Option '{option}' is not available for {context}")]
    UnsupportedOption { option: String, context: String },

    #[error("No data loaded")]
    NoData,

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DashboardError {
    pub fn unsupported(option: impl ToString, context: impl ToString) -> Self {
        DashboardError::UnsupportedOption {
            option: option.to_string(),
            context: context.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;
