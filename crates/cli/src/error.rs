use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Metro(#[from] model::MetroError),

    #[error(transparent)]
    Store(#[from] store::StoreError),

    #[error(transparent)]
    Network(#[from] network::LoadError),

    #[error(transparent)]
    Scrape(#[from] scrape::ScrapeError),

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error("{0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, CliError>;
