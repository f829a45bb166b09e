#![cfg_attr(not(any(feature = "std", test)), no_std)]

//! SBL, the Simple Boot Loader protocol: read, write, exec, that's it.
//!
//! Every request starts with a 5 bytes header, all fields little-endian:
//!
//! | CLA | INS | OFFSET (u16) | LEN |
//! |-----|-----|--------------|-----|
//!
//! `CLA` selects the access width, `INS` the instruction. The device answers
//! with the instruction byte as an acknowledge before any bulk data (READ,
//! WRITE and a well-formed BASE only) and terminates every command with a
//! 2 bytes status, see [`Status`].

#[cfg(feature = "std")]
use core::fmt::Display;

use bincode::{Decode, Encode};
use derive_ctor::ctor;
use derive_more::IsVariant;
use ufmt::{uDisplay, uWrite, uwrite};

use crate::err::Error;

pub mod backend;
pub mod dispatcher;
pub mod err;
#[cfg(feature = "std")]
pub mod ram;

pub use backend::{MemoryBackend, RawMemory};
pub use dispatcher::{Dispatcher, Served};
#[cfg(feature = "std")]
pub use ram::Ram;

pub type Result<T> = core::result::Result<T, Error>;

/// Size of the request header on the wire.
pub const HEADER_SIZE: usize = 5;

/// 8-bit access class.
pub const CLA_8: u8 = 0x08;
/// 16-bit access class.
pub const CLA_16: u8 = 0x10;
/// 32-bit access class.
pub const CLA_32: u8 = 0x20;
/// Class of the commands without an access width (BASE and EXEC).
pub const CLA_NONE: u8 = 0x00;

pub const INS_READ: u8 = 0x0A;
pub const INS_BASE: u8 = 0x0B;
pub const INS_WRITE: u8 = 0x0C;
pub const INS_EXEC: u8 = 0x0E;

pub const CMD_READ_8: u16 = command_code(CLA_8, INS_READ);
pub const CMD_READ_16: u16 = command_code(CLA_16, INS_READ);
pub const CMD_READ_32: u16 = command_code(CLA_32, INS_READ);

pub const CMD_WRITE_8: u16 = command_code(CLA_8, INS_WRITE);
pub const CMD_WRITE_16: u16 = command_code(CLA_16, INS_WRITE);
pub const CMD_WRITE_32: u16 = command_code(CLA_32, INS_WRITE);

pub const CMD_BASE: u16 = command_code(CLA_NONE, INS_BASE);
pub const CMD_EXEC: u16 = command_code(CLA_NONE, INS_EXEC);

/// The only `LEN` a BASE command is accepted with.
pub const BASE_LEN: u8 = 4;

/// Pack `cla` and `ins` the way they travel on the wire: class in the low byte.
pub const fn command_code(cla: u8, ins: u8) -> u16 {
    cla as u16 | (ins as u16) << 8
}

/// Number of elements a `len` bytes transfer carries for the access class `cla`.
///
/// The remainder is dropped, a `LEN` of 7 with 32-bit accesses moves one word.
pub const fn element_count(len: u8, cla: u8) -> u8 {
    match cla {
        CLA_16 => len >> 1,
        CLA_32 => len >> 2,
        _ => len,
    }
}

/// Width of each element of a READ or WRITE burst.
///
/// The discriminant is both the class byte and the number of bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IsVariant)]
#[repr(u8)]
pub enum Width {
    W8 = CLA_8,
    W16 = CLA_16,
    W32 = CLA_32,
}

impl Width {
    pub const fn from_class(cla: u8) -> Option<Self> {
        match cla {
            CLA_8 => Some(Self::W8),
            CLA_16 => Some(Self::W16),
            CLA_32 => Some(Self::W32),
            _ => None,
        }
    }

    pub const fn class(self) -> u8 {
        self as u8
    }

    pub const fn bits(self) -> u32 {
        self as u32
    }

    /// Address increment between two elements.
    pub const fn bytes(self) -> u32 {
        self.bits() / 8
    }

    pub const fn count(self, len: u8) -> u8 {
        element_count(len, self.class())
    }

    /// Addresses touched by a burst of `count` elements starting at `addr`.
    pub fn burst(self, addr: u32, count: u8) -> impl Iterator<Item = u32> {
        let step = self.bytes();
        (0..count as u32).map(move |i| addr.wrapping_add(i * step))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, IsVariant)]
#[repr(u8)]
pub enum Instruction {
    Read = INS_READ,
    Base = INS_BASE,
    Write = INS_WRITE,
    Exec = INS_EXEC,
}

impl Instruction {
    pub const fn from_byte(ins: u8) -> Option<Self> {
        match ins {
            INS_READ => Some(Self::Read),
            INS_BASE => Some(Self::Base),
            INS_WRITE => Some(Self::Write),
            INS_EXEC => Some(Self::Exec),
            _ => None,
        }
    }

    /// Acknowledge byte, the instruction echoed back.
    pub const fn ack(self) -> u8 {
        self as u8
    }
}

/// Final status of a command.
///
/// There is no way to tell an unknown command from a malformed BASE, both are [`Status::Failure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, IsVariant)]
#[repr(u16)]
pub enum Status {
    /// `90 00` on the wire
    Success = 0x0090,
    /// `64 00` on the wire
    Failure = 0x0064,
}

impl Status {
    pub const fn code(self) -> u16 {
        self as u16
    }

    pub const fn from_code(code: u16) -> Option<Self> {
        match code {
            0x0090 => Some(Self::Success),
            0x0064 => Some(Self::Failure),
            _ => None,
        }
    }

    pub const fn to_bytes(self) -> [u8; 2] {
        self.code().to_le_bytes()
    }
}

/// Request header as it is sent by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ctor, Encode, Decode)]
pub struct Header {
    /// Access class, low byte of the command code
    pub cla: u8,
    /// Instruction, high byte of the command code
    pub ins: u8,
    /// Offset from the base register
    pub offset: u16,
    /// Length of the data phase in bytes
    pub len: u8,
}

fn config() -> impl bincode::config::Config {
    bincode::config::standard()
        .with_little_endian()
        .with_fixed_int_encoding()
}

impl Header {
    pub fn read(width: Width, offset: u16, len: u8) -> Self {
        Self::new(width.class(), INS_READ, offset, len)
    }

    pub fn write(width: Width, offset: u16, len: u8) -> Self {
        Self::new(width.class(), INS_WRITE, offset, len)
    }

    pub fn base() -> Self {
        Self::new(CLA_NONE, INS_BASE, 0, BASE_LEN)
    }

    pub fn exec(offset: u16) -> Self {
        Self::new(CLA_NONE, INS_EXEC, offset, 0)
    }

    pub const fn code(&self) -> u16 {
        command_code(self.cla, self.ins)
    }

    pub fn decode(bytes: &[u8; HEADER_SIZE]) -> Result<Self> {
        Ok(bincode::decode_from_slice(bytes, config())?.0)
    }

    pub fn encode(&self) -> Result<[u8; HEADER_SIZE]> {
        let mut bytes = [0; HEADER_SIZE];
        bincode::encode_into_slice(self, &mut bytes, config())?;
        Ok(bytes)
    }

    /// Resolve the header against the current base register.
    pub fn resolve(&self, base: u32) -> Command {
        let addr = base.wrapping_add(self.offset as u32);

        match (Instruction::from_byte(self.ins), Width::from_class(self.cla)) {
            (Some(Instruction::Read), Some(width)) => Command::Read {
                width,
                addr,
                count: width.count(self.len),
            },
            (Some(Instruction::Write), Some(width)) => Command::Write {
                width,
                addr,
                count: width.count(self.len),
            },
            (Some(Instruction::Base), None) if self.cla == CLA_NONE => {
                Command::Base { len: self.len }
            }
            (Some(Instruction::Exec), None) if self.cla == CLA_NONE => Command::Exec { addr },
            _ => Command::Unknown { code: self.code() },
        }
    }
}

/// A header resolved against the base register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IsVariant)]
pub enum Command {
    /// Send `count` elements starting at `addr`.
    Read { width: Width, addr: u32, count: u8 },
    /// Receive `count` elements and store them starting at `addr`.
    Write { width: Width, addr: u32, count: u8 },
    /// Replace the base register, only valid with `len` == [`BASE_LEN`].
    Base { len: u8 },
    /// Transfer execution to `addr`.
    Exec { addr: u32 },
    /// Any other command code.
    Unknown { code: u16 },
}

impl Command {
    pub fn instruction(&self) -> Option<Instruction> {
        match self {
            Self::Read { .. } => Some(Instruction::Read),
            Self::Write { .. } => Some(Instruction::Write),
            Self::Base { .. } => Some(Instruction::Base),
            Self::Exec { .. } => Some(Instruction::Exec),
            Self::Unknown { .. } => None,
        }
    }
}

impl uDisplay for Width {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> core::result::Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        uwrite!(f, "{}", self.bits())
    }
}

impl uDisplay for Command {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> core::result::Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        match self {
            Self::Read { width, addr, count } => {
                uwrite!(f, "Read{} @ 0x{:08x} for {} elements", width, *addr, *count)
            }
            Self::Write { width, addr, count } => {
                uwrite!(f, "Write{} @ 0x{:08x} for {} elements", width, *addr, *count)
            }
            Self::Base { len } if *len == BASE_LEN => uwrite!(f, "Base"),
            Self::Base { len } => uwrite!(f, "Base with invalid length {}", *len),
            Self::Exec { addr } => uwrite!(f, "Exec @ 0x{:08x}", *addr),
            Self::Unknown { code } => uwrite!(f, "Unknown command 0x{:04x}", *code),
        }
    }
}

impl uDisplay for Status {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> core::result::Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        match self {
            Self::Success => uwrite!(f, "OK"),
            Self::Failure => uwrite!(f, "KO"),
        }
    }
}

#[cfg(feature = "std")]
struct Adapter<'a, 'b>(&'a mut core::fmt::Formatter<'b>);

#[cfg(feature = "std")]
impl<'a, 'b> uWrite for Adapter<'a, 'b> {
    type Error = core::fmt::Error;

    fn write_str(&mut self, s: &str) -> core::result::Result<(), Self::Error> {
        core::fmt::Write::write_str(self.0, s)
    }
}

#[cfg(feature = "std")]
impl Display for Command {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut adapter = Adapter(f);
        uwrite!(&mut adapter, "{}", self)
    }
}

#[cfg(feature = "std")]
impl Display for Status {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut adapter = Adapter(f);
        uwrite!(&mut adapter, "{}", self)
    }
}
