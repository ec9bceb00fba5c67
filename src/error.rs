use thiserror::Error;

/// エラー型の定義
///
/// Per-column and per-group variants are recoverable: the detector logs them and
/// moves on. Only [`Error::Config`] aborts a run.
#[derive(Error, Debug)]
pub enum Error {
    #[error("could not fetch series group {group}: {reason}")]
    Fetch { group: String, reason: String },

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("insufficient data in column {column}: need {required} usable points, found {found}")]
    InsufficientData {
        column: String,
        required: usize,
        found: usize,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("column not found: {0}")]
    ColumnNotFound(String),

    // 下位ライブラリのエラー
    #[error("I/O error")]
    Io(#[source] std::io::Error),

    #[error("CSV error")]
    Csv(#[source] csv::Error),

    #[error("JSON error")]
    Json(#[source] serde_json::Error),

    #[error("YAML error")]
    Yaml(#[source] serde_yaml::Error),

    #[error("TOML error")]
    Toml(#[source] toml::de::Error),
}

impl Error {
    /// Fatal errors stop the whole batch; everything else only skips a group or column.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}

/// Resultの型エイリアス
pub type Result<T> = std::result::Result<T, Error>;

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::Csv(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Yaml(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Toml(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}
