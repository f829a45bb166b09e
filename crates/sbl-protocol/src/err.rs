use thiserror::Error as TError;

#[derive(Debug, TError)]
pub enum Error {
    /// Transport error
    #[error("Port error: {0}")]
    Port(#[from] sbl_port::err::Error),

    /// bincode decode error
    #[error("Bincode decode error: {0:?}")]
    Decode(bincode::error::DecodeError),
    /// bincode encode error
    #[error("Bincode encode error: {0:?}")]
    Encode(bincode::error::EncodeError),
}

impl From<bincode::error::DecodeError> for Error {
    fn from(value: bincode::error::DecodeError) -> Self {
        Self::Decode(value)
    }
}

impl From<bincode::error::EncodeError> for Error {
    fn from(value: bincode::error::EncodeError) -> Self {
        Self::Encode(value)
    }
}
