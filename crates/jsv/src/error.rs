use thiserror::Error;

#[derive(Debug, Error)]
pub enum JsvError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Protocol error: {0}")]
    ProtocolError(String),
}

pub fn protocol_error<T>(message: String) -> crate::Result<T> {
    Err(JsvError::ProtocolError(message))
}
