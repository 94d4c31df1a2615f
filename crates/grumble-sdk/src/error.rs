use std::fmt;

#[derive(Debug)]
pub enum GrumbleSDKError {
    /// Caller handed us something unusable (empty name, empty tag set, ...).
    InvalidInput(String),
    /// Encoding or decoding a record failed.
    Serialization(String),
    IO(String),
    /// Local mirror file could not be read or written.
    Storage(String),
    /// Remote sync channel rejected or dropped an operation.
    Channel(String),
    /// Authentication provider failure (sign-out, missing session).
    Auth(String),
    NotLoggedIn,
    NotFound(String),
    Config(String),
}

impl fmt::Display for GrumbleSDKError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrumbleSDKError::InvalidInput(e) => write!(f, "Invalid input: {}", e),
            GrumbleSDKError::Serialization(e) => write!(f, "Serialization error: {}", e),
            GrumbleSDKError::IO(e) => write!(f, "IO error: {}", e),
            GrumbleSDKError::Storage(e) => write!(f, "Storage error: {}", e),
            GrumbleSDKError::Channel(e) => write!(f, "Sync channel error: {}", e),
            GrumbleSDKError::Auth(e) => write!(f, "Authentication error: {}", e),
            GrumbleSDKError::NotLoggedIn => write!(f, "Not logged in"),
            GrumbleSDKError::NotFound(e) => write!(f, "Not found: {}", e),
            GrumbleSDKError::Config(e) => write!(f, "Config error: {}", e),
        }
    }
}

impl std::error::Error for GrumbleSDKError {}

impl From<serde_json::Error> for GrumbleSDKError {
    fn from(error: serde_json::Error) -> Self {
        GrumbleSDKError::Serialization(error.to_string())
    }
}

impl From<std::io::Error> for GrumbleSDKError {
    fn from(error: std::io::Error) -> Self {
        GrumbleSDKError::IO(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GrumbleSDKError>;
