use std::ops::Range;

use crate::MemoryBackend;

/// A window of plain memory at `base`, used to emulate a target on the host.
///
/// Values are stored little-endian. Accesses that don't fit the window read
/// as zero, are dropped on write, and bump [`Ram::faults`]. `exec` records the
/// target and returns.
#[derive(Debug, Clone)]
pub struct Ram {
    base: u32,
    data: Vec<u8>,
    jumps: Vec<u32>,
    faults: usize,
}

impl Ram {
    pub fn new(base: u32, size: usize) -> Self {
        Self::with_data(base, vec![0; size])
    }

    pub fn with_data(base: u32, data: Vec<u8>) -> Self {
        Self {
            base,
            data,
            jumps: Vec::new(),
            faults: 0,
        }
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Every address `exec` was called with, oldest first.
    pub fn jumps(&self) -> &[u32] {
        &self.jumps
    }

    /// Number of accesses that fell outside of the window.
    pub fn faults(&self) -> usize {
        self.faults
    }

    /// `len` bytes at `addr`, if the whole range is inside the window.
    pub fn slice(&self, addr: u32, len: usize) -> Option<&[u8]> {
        self.range(addr, len).map(|r| &self.data[r])
    }

    fn range(&self, addr: u32, len: usize) -> Option<Range<usize>> {
        let start = addr.checked_sub(self.base)? as usize;
        let end = start.checked_add(len)?;
        (end <= self.data.len()).then_some(start..end)
    }

    fn load<const N: usize>(&mut self, addr: u32) -> [u8; N] {
        let mut bytes = [0; N];
        match self.range(addr, N) {
            Some(r) => bytes.copy_from_slice(&self.data[r]),
            None => self.faults += 1,
        }
        bytes
    }

    fn store<const N: usize>(&mut self, addr: u32, bytes: [u8; N]) {
        match self.range(addr, N) {
            Some(r) => self.data[r].copy_from_slice(&bytes),
            None => self.faults += 1,
        }
    }
}

impl MemoryBackend for Ram {
    fn read8(&mut self, addr: u32) -> u8 {
        u8::from_le_bytes(self.load(addr))
    }

    fn read16(&mut self, addr: u32) -> u16 {
        u16::from_le_bytes(self.load(addr))
    }

    fn read32(&mut self, addr: u32) -> u32 {
        u32::from_le_bytes(self.load(addr))
    }

    fn write8(&mut self, addr: u32, value: u8) {
        self.store(addr, value.to_le_bytes())
    }

    fn write16(&mut self, addr: u32, value: u16) {
        self.store(addr, value.to_le_bytes())
    }

    fn write32(&mut self, addr: u32, value: u32) {
        self.store(addr, value.to_le_bytes())
    }

    fn exec(&mut self, addr: u32) {
        self.jumps.push(addr);
    }
}
