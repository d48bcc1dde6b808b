use thiserror::Error;

#[derive(Debug, Error)]
pub enum BotError {
    #[error(transparent)]
    Metro(#[from] model::MetroError),

    #[error(transparent)]
    Engine(#[from] conversation::EngineError),

    #[error(transparent)]
    Store(#[from] store::StoreError),

    #[error("transport request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("host returned an error: {0}")]
    Host(String),
}

pub type Result<T> = std::result::Result<T, BotError>;
