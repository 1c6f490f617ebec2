use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to connect to Chrome: {0}")]
    ConnectionFailed(String),

    #[error("Failed to launch Chrome: {0}")]
    LaunchFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// A login form field could not be located by any strategy. Fatal.
    #[error("Login field not found: {0}")]
    FieldNotFound(&'static str),

    #[error("Invalid menu choice: {0:?} (expected 1 or 2)")]
    InvalidChoice(String),

    #[error("Missing credential: set {0} in the environment or .env file")]
    MissingCredential(&'static str),

    #[error("Script execution failed: {0}")]
    Script(String),

    #[error("No page available")]
    NoPage,

    #[error("CDP error: {0}")]
    CdpError(#[from] chromiumoxide::error::CdpError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Interrupted")]
    Interrupted,

    #[error("Other error: {0}")]
    Other(String),
}

impl Error {
    /// Errors that abort the whole run instead of being turned into a
    /// per-lesson or per-video outcome.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::FieldNotFound(_)
                | Error::InvalidChoice(_)
                | Error::MissingCredential(_)
                | Error::LaunchFailed(_)
                | Error::ConnectionFailed(_)
                | Error::Interrupted
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
