use thiserror::Error;

/// Fatal setup problems. A session refuses to start while any of these hold.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("BPM must be a finite value greater than zero (got {0})")]
    NonPositiveBpm(f64),
    #[error("distance per beat must be a finite value greater than zero (got {0})")]
    NonPositiveDistancePerBeat(f64),
    #[error("'{key}' must be finite (got {value})")]
    NonFinite { key: &'static str, value: f64 },
    #[error("'{key}' is out of range (got {value})")]
    OutOfRange { key: &'static str, value: f64 },
    #[error("judgment windows are inconsistent: {0}")]
    InvalidWindows(String),
    #[error("pool '{0}' must hold at least one entity")]
    EmptyPool(&'static str),
    #[error("unknown difficulty tier '{0}'")]
    UnknownTier(String),
    #[error("[{section}] {key} = '{value}' is not a valid number")]
    BadValue {
        section: &'static str,
        key: &'static str,
        value: String,
    },
    #[error("failed to read config: {0}")]
    Ini(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("handle {index}:{generation} does not belong to a live entity")]
    StaleHandle { index: u32, generation: u32 },
    #[error("handle {index}:{generation} was already released")]
    AlreadyReleased { index: u32, generation: u32 },
}

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("chart JSON is malformed: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
