#![cfg_attr(not(any(feature = "std", test)), no_std)]

//! Byte transport used by both halves of the SBL protocol.
//!
//! The device side implements [`SimpleRead`] and [`SimpleWrite`] on top of
//! whatever link it boots from (UART, USB CDC, ...). The host side gets an
//! implementation for [`Port`] with the `serialport` feature.

#[cfg(feature = "serialport")]
use serialport::SerialPort;
#[cfg(feature = "serialport")]
use std::io::{Read as _, Write as _};

use crate::err::Error;

pub mod err;

pub type Result<T> = core::result::Result<T, Error>;

#[cfg(feature = "serialport")]
pub type Port = Box<dyn SerialPort>;

/// Values sent over the wire, always little-endian.
pub trait FromBytes<const N: usize> {
    fn from_le(bytes: [u8; N]) -> Self;
}

pub trait ToBytes<const N: usize> {
    fn to_le(&self) -> [u8; N];
}

/// Blocking byte source.
pub trait SimpleRead {
    /// Fill the whole `buf`, blocking until every byte has arrived.
    fn read(&mut self, buf: &mut [u8]) -> Result<()>;

    fn simple_read_le<T: FromBytes<N>, const N: usize>(&mut self) -> Result<T> {
        let mut bytes = [0; N];
        self.read(&mut bytes)?;
        Ok(T::from_le(bytes))
    }

    fn read_u8(&mut self) -> Result<u8> {
        self.simple_read_le()
    }

    fn read_u16_le(&mut self) -> Result<u16> {
        self.simple_read_le()
    }

    fn read_u32_le(&mut self) -> Result<u32> {
        self.simple_read_le()
    }
}

/// Blocking (or buffered) byte sink.
pub trait SimpleWrite {
    fn write(&mut self, buf: &[u8]) -> Result<()>;

    fn simple_write_le<T: ToBytes<N>, const N: usize>(&mut self, value: T) -> Result<()> {
        self.write(&value.to_le())
    }

    fn write_u8(&mut self, value: u8) -> Result<()> {
        self.simple_write_le(value)
    }

    fn write_u16_le(&mut self, value: u16) -> Result<()> {
        self.simple_write_le(value)
    }

    fn write_u32_le(&mut self, value: u32) -> Result<()> {
        self.simple_write_le(value)
    }
}

impl<T: SimpleRead + ?Sized> SimpleRead for &mut T {
    fn read(&mut self, buf: &mut [u8]) -> Result<()> {
        (**self).read(buf)
    }
}

impl<T: SimpleWrite + ?Sized> SimpleWrite for &mut T {
    fn write(&mut self, buf: &[u8]) -> Result<()> {
        (**self).write(buf)
    }
}

macro_rules! le_bytes {
    ($($ty:ty => $n:literal),+) => {$(
        impl FromBytes<$n> for $ty {
            fn from_le(bytes: [u8; $n]) -> Self {
                Self::from_le_bytes(bytes)
            }
        }

        impl ToBytes<$n> for $ty {
            fn to_le(&self) -> [u8; $n] {
                self.to_le_bytes()
            }
        }
    )+};
}

le_bytes!(u8 => 1, u16 => 2, u32 => 4);

#[cfg(feature = "serialport")]
impl SimpleRead for Port {
    fn read(&mut self, buf: &mut [u8]) -> Result<()> {
        self.read_exact(buf).map_err(|e| e.into())
    }
}

#[cfg(feature = "serialport")]
impl SimpleWrite for Port {
    fn write(&mut self, buf: &[u8]) -> Result<()> {
        self.write_all(buf).map_err(|e| e.into())
    }
}
