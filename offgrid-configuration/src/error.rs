use offgrid::config::ConfigBuildError;
use offgrid_core::OriginError;
use offgrid_page::config::PageConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_saphyr::Error),
    #[error("invalid origin: {0}")]
    Origin(#[from] OriginError),
    #[error("invalid interceptor configuration: {0}")]
    Interceptor(#[from] ConfigBuildError),
    #[error("invalid page configuration, `{field}`: {reason}")]
    Page { field: &'static str, reason: String },
}

impl From<PageConfigError> for ConfigError {
    fn from(error: PageConfigError) -> Self {
        Self::Page {
            field: error.field,
            reason: error.reason,
        }
    }
}
