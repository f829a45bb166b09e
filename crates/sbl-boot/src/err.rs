use thiserror::Error as TError;

#[derive(Debug, TError)]
pub enum Error {
    /// More than one serial port is available and none was selected
    #[error("Please disconnect other serial devices or select one with --port")]
    MoreThanOneDevice,
    /// The device never answered the sync sequence
    #[error("Device didn't answer the sync sequence")]
    SyncFailed,

    /// The device acknowledged with something else than the instruction byte
    #[error("Invalid ACK! Expected {0:#04x}, got {1:#04x}")]
    InvalidAck(u8, u8),
    /// The device returned invalid status of command
    #[error("Invalid status! Expected {0:#06x}, got {1:#06x}")]
    InvalidStatus(u16, u16),
    /// Transfer size or chunk size doesn't fit the access width
    #[error("{size:#x} bytes in chunks of {chunk:#x} don't fit {width}-bit accesses")]
    Unaligned { size: usize, chunk: usize, width: u32 },
    /// Read back data differs from what was written
    #[error("Data doesn't match at {addr:#010x}! Expected {expected:#04x}, got {actual:#04x}")]
    VerifyMismatch { addr: u32, expected: u8, actual: u8 },

    /// sbl-protocol error
    #[error("Protocol error: {0}")]
    Protocol(#[from] sbl_protocol::err::Error),
    /// sbl-port error
    #[error("Port error: {0}")]
    Port(#[from] sbl_port::err::Error),

    /// Malformed Intel HEX file
    #[error("Intel HEX error: {0}")]
    IntelHex(#[from] ihex::ReaderError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// serialport crate error
    #[error("serialport error: {0}")]
    SerialPort(#[from] serialport::Error),
    /// rustyline crate error
    #[error("Readline error: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),
    /// Any other error
    #[error("{0}")]
    Custom(#[from] Box<dyn std::error::Error>),
}
