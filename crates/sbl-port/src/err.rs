use thiserror::Error as TError;

#[derive(Debug, TError)]
pub enum Error {
    /// The other end went away before the transfer completed
    #[error("Transport closed")]
    Closed,

    #[cfg(feature = "serialport")]
    /// `serialport` crate error
    #[error("serialport error: {0}")]
    SerialPort(#[from] serialport::Error),

    #[cfg(feature = "std")]
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "std")]
    /// Any other error
    #[error("{0}")]
    Custom(#[from] Box<dyn core::error::Error + Send + Sync>),
}
