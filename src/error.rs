use crate::codec::CodecError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Path validation failed: {path}")]
    InvalidPath { path: String },

    #[error("Host operation failed: {message}")]
    Host { message: String },

    #[error("Cache artifact {path} could not be decoded: {message}")]
    Artifact { path: String, message: String },

    #[error("No cached artifact matches '{selector}'")]
    CacheEntryNotFound { selector: String },

    #[error("Operation was cancelled by user")]
    Cancelled,

    #[error(transparent)]
    Codec(#[from] CodecError),
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for BridgeError {
    fn user_message(&self) -> String {
        match self {
            BridgeError::Config { message } => {
                format!("Configuration error: {}", message)
            }
            BridgeError::InvalidPath { path } => {
                format!("Invalid file path: {}", path)
            }
            BridgeError::Host { message } => {
                format!("Scene host failed: {}", message)
            }
            BridgeError::Artifact { path, message } => {
                format!("Corrupted cache artifact {}: {}", path, message)
            }
            BridgeError::CacheEntryNotFound { selector } => {
                format!("No cache found for: {}", selector)
            }
            BridgeError::Cancelled => "Operation was cancelled by user".to_string(),
            _ => self.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            BridgeError::Config { .. } => Some(
                "Check your configuration file syntax, or regenerate one with `rizombridge init-config`.".to_string()
            ),
            BridgeError::InvalidPath { .. } => Some(
                "Make sure the FBX file exists and the path is spelled correctly.".to_string()
            ),
            BridgeError::Host { .. } => Some(
                "Check the [host] commands in your configuration, or pass a staged export with --from.".to_string()
            ),
            BridgeError::Artifact { .. } => Some(
                "Import the source FBX again to regenerate its cache, or delete it with `rizombridge cache delete`.".to_string()
            ),
            BridgeError::CacheEntryNotFound { .. } => Some(
                "Run `rizombridge cache list` to see available caches. Import that FBX first to create its cache.".to_string()
            ),
            BridgeError::Codec(CodecError::ExecutableMissing { .. }) => Some(
                "Point --extractor/--injector (or the [codecs] section) at the codec binaries.".to_string()
            ),
            BridgeError::Codec(CodecError::TimedOut { .. }) => Some(
                "The codec took longer than expected. Increase the limit with --timeout.".to_string()
            ),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for BridgeError {
    fn from(error: toml::de::Error) -> Self {
        BridgeError::Config {
            message: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
