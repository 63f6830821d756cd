use reqwest::StatusCode;
use thiserror::Error;

/// Every way a report pull can fail
///
/// Each step of the run maps its failure into one of these kinds, and only the
/// top-level handler in `main` decides how to report it and which exit code to
/// use.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Usage(#[from] clap::Error),

    #[error("config error: {0:#}")]
    Config(anyhow::Error),

    #[error("template error: {0:#}")]
    Template(anyhow::Error),

    #[error("network error: {0:#}")]
    Network(anyhow::Error),

    #[error("server response: {0}")]
    Status(StatusCode),

    #[error("output error: {0:#}")]
    Io(anyhow::Error),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(anyhow::Error::from(err))
    }
}

impl Error {
    /// Returns the process exit code for this error
    ///
    /// Help and version output come back from clap as errors, but they are not
    /// failures.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(err) if !err.use_stderr() => 0,
            _ => 1,
        }
    }
}
