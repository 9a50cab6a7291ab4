// SPDX-License-Identifier: MPL-2.0
use crate::notifications::NotificationId;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    #[error("I/O Error: {0}")]
    Io(String),
    #[error("Config Error: {0}")]
    Config(String),
    /// The identity generator handed out an id that is still in the store.
    ///
    /// This is a broken internal contract, never a user-facing condition.
    #[error("Duplicate notification id: {0}")]
    DuplicateId(NotificationId),
    /// A tokio-backed scheduler was requested outside of a runtime.
    #[error("No tokio runtime available: {0}")]
    NoRuntime(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
