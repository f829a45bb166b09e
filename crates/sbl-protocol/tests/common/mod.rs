#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};

use sbl_port::{SimpleRead, SimpleWrite, err::Error};
use sbl_protocol::{Dispatcher, Header, MemoryBackend, Width};

/// Transport fed from a fixed host script, capturing everything the device sends.
#[derive(Default)]
pub struct Script {
    pub input: VecDeque<u8>,
    pub output: Vec<u8>,
}

impl Script {
    pub fn new(input: &[u8]) -> Self {
        Self {
            input: input.iter().copied().collect(),
            output: Vec::new(),
        }
    }
}

impl SimpleRead for Script {
    fn read(&mut self, buf: &mut [u8]) -> sbl_port::Result<()> {
        if buf.len() > self.input.len() {
            return Err(Error::Closed);
        }
        for byte in buf.iter_mut() {
            *byte = self.input.pop_front().ok_or(Error::Closed)?;
        }
        Ok(())
    }
}

impl SimpleWrite for Script {
    fn write(&mut self, buf: &[u8]) -> sbl_port::Result<()> {
        self.output.extend_from_slice(buf);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read(Width, u32),
    Write(Width, u32),
}

/// Sparse byte-addressed memory that logs every access.
#[derive(Default)]
pub struct Recorder {
    pub bytes: BTreeMap<u32, u8>,
    pub accesses: Vec<Access>,
    pub jumps: Vec<u32>,
}

impl Recorder {
    pub fn with(bytes: impl IntoIterator<Item = (u32, u8)>) -> Self {
        Self {
            bytes: bytes.into_iter().collect(),
            ..Default::default()
        }
    }

    fn get<const N: usize>(&self, addr: u32) -> [u8; N] {
        core::array::from_fn(|i| {
            *self
                .bytes
                .get(&addr.wrapping_add(i as u32))
                .unwrap_or(&0)
        })
    }

    fn put(&mut self, addr: u32, bytes: &[u8]) {
        for (i, byte) in bytes.iter().enumerate() {
            self.bytes.insert(addr.wrapping_add(i as u32), *byte);
        }
    }
}

impl MemoryBackend for Recorder {
    fn read8(&mut self, addr: u32) -> u8 {
        self.accesses.push(Access::Read(Width::W8, addr));
        u8::from_le_bytes(self.get(addr))
    }

    fn read16(&mut self, addr: u32) -> u16 {
        self.accesses.push(Access::Read(Width::W16, addr));
        u16::from_le_bytes(self.get(addr))
    }

    fn read32(&mut self, addr: u32) -> u32 {
        self.accesses.push(Access::Read(Width::W32, addr));
        u32::from_le_bytes(self.get(addr))
    }

    fn write8(&mut self, addr: u32, value: u8) {
        self.accesses.push(Access::Write(Width::W8, addr));
        self.put(addr, &value.to_le_bytes());
    }

    fn write16(&mut self, addr: u32, value: u16) {
        self.accesses.push(Access::Write(Width::W16, addr));
        self.put(addr, &value.to_le_bytes());
    }

    fn write32(&mut self, addr: u32, value: u32) {
        self.accesses.push(Access::Write(Width::W32, addr));
        self.put(addr, &value.to_le_bytes());
    }

    fn exec(&mut self, addr: u32) {
        self.jumps.push(addr);
    }
}

pub fn header(header: Header) -> Vec<u8> {
    header.encode().unwrap().to_vec()
}

/// Bytes of a BASE command setting the base register to `base`.
pub fn set_base(base: u32) -> Vec<u8> {
    let mut bytes = header(Header::base());
    bytes.extend_from_slice(&base.to_le_bytes());
    bytes
}

pub fn dispatcher(input: &[u8], memory: Recorder) -> Dispatcher<Script, Recorder> {
    Dispatcher::new(Script::new(input), memory)
}
