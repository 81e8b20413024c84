use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;
use url::ParseError;

pub type Result<T, E = AlumniError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum AlumniError {
    #[error("Client Error: status={status}, message={message}, data={data:?}")]
    ClientError {
        status: StatusCode,
        message: String,
        data: Option<Value>,
    },

    #[error("Server Error: status={status}, message={message}")]
    ServerError { status: StatusCode, message: String },

    #[error("WebSocket Error: {0}")]
    WebsocketError(String),

    #[error("Session Error: {0}")]
    SessionError(String),

    #[error("Configuration Error: {0}")]
    ConfigError(String),

    #[error("HTTP Request Error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("JSON Serialization/Deserialization Error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("URL Parsing Error: {0}")]
    UrlParseError(#[from] ParseError),

    #[error("Invalid HTTP Header Value: {0}")]
    InvalidHeaderValue(#[from] reqwest::header::InvalidHeaderValue),

    #[error("IO Error: {0}")]
    IoError(#[from] std::io::Error),
}
