use thiserror::Error;

/// Failures of a forecast or prediction request
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("Insufficient data for prediction: at least {required} data points are required, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Site {0} not found")]
    SiteNotFound(String),

    #[error("Failed to fetch {what}: {source}")]
    UpstreamRead {
        what: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to store forecast batch {batch}: {source}")]
    PersistenceWrite {
        batch: usize,
        #[source]
        source: anyhow::Error,
    },
}

impl ForecastError {
    pub fn upstream(what: &'static str, source: anyhow::Error) -> Self {
        Self::UpstreamRead { what, source }
    }

    /// Whether the caller supplied something unusable
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::InsufficientData { .. } | Self::InvalidInput(_) | Self::SiteNotFound(_)
        )
    }
}
