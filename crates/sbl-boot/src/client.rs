use sbl_port::{SimpleRead, SimpleWrite};
use sbl_protocol::{Header, Status, Width};

use crate::{Result, err::Error};

/// Largest `LEN` a single command can carry that is a multiple of every access width.
pub const DEFAULT_CHUNK: usize = 252;

/// Host side of the protocol.
///
/// Addresses are split into a base, kept on the device and cached here, and a
/// 16-bit offset. The base is only resent when a transfer moves to another
/// 64K window.
pub struct Client<T: SimpleRead + SimpleWrite> {
    io: T,
    base: Option<u32>,
}

impl<T: SimpleRead + SimpleWrite> Client<T> {
    pub fn new(io: T) -> Self {
        Self { io, base: None }
    }

    pub fn into_inner(self) -> T {
        self.io
    }

    /// Base the device is known to use, if any was sent.
    pub fn base(&self) -> Option<u32> {
        self.base
    }

    /// Unconditionally replace the base register on the device.
    pub fn set_base(&mut self, base: u32) -> Result<()> {
        self.base = None;
        self.transact(Header::base(), &base.to_le_bytes(), 0, true, true)?;
        self.base = Some(base);

        Ok(())
    }

    /// Read `size` bytes at `addr` with `width` accesses, `chunk` bytes per command.
    pub fn read(&mut self, addr: u32, size: usize, width: Width, chunk: usize) -> Result<Vec<u8>> {
        check_alignment(size, width, chunk)?;

        let mut data = Vec::with_capacity(size);
        for start in (0..size).step_by(chunk) {
            let len = chunk.min(size - start);
            let chunk_addr = addr.wrapping_add(start as u32);
            data.extend(self.read_chunk(chunk_addr, len as u8, width)?);
        }

        Ok(data)
    }

    /// Write `data` to `addr` with `width` accesses, `chunk` bytes per command.
    pub fn write(&mut self, addr: u32, data: &[u8], width: Width, chunk: usize) -> Result<()> {
        check_alignment(data.len(), width, chunk)?;

        for (i, part) in data.chunks(chunk).enumerate() {
            let chunk_addr = addr.wrapping_add((i * chunk) as u32);
            self.write_chunk(chunk_addr, part, width)?;
        }

        Ok(())
    }

    /// Fill `size` bytes at `addr` with `pattern` repeated.
    pub fn fill(
        &mut self,
        addr: u32,
        size: usize,
        pattern: &[u8],
        width: Width,
        chunk: usize,
    ) -> Result<()> {
        if pattern.is_empty() {
            return Err(Error::Custom("Fill pattern is empty".into()));
        }

        let data = pattern.iter().copied().cycle().take(size).collect::<Vec<_>>();
        self.write(addr, &data, width, chunk)
    }

    /// Read `data.len()` bytes back from `addr` and compare them with `data`.
    pub fn verify(&mut self, addr: u32, data: &[u8], width: Width, chunk: usize) -> Result<()> {
        let actual = self.read(addr, data.len(), width, chunk)?;
        match data.iter().zip(&actual).position(|(e, a)| e != a) {
            Some(i) => Err(Error::VerifyMismatch {
                addr: addr.wrapping_add(i as u32),
                expected: data[i],
                actual: actual[i],
            }),
            None => Ok(()),
        }
    }

    /// Jump to `addr`, then send `payload` to the code running there and
    /// receive `rx_len` bytes back from it.
    ///
    /// The device only answers with a status if that code returns, so the
    /// status is read only when `wait` is set.
    pub fn exec(&mut self, addr: u32, payload: &[u8], rx_len: usize, wait: bool) -> Result<Vec<u8>> {
        let offset = self.rebase(addr)?;
        self.transact(Header::exec(offset), payload, rx_len, false, wait)
    }

    /// Run a single command.
    ///
    /// Sends `header`, checks the ACK against the instruction byte if
    /// `wait_ack`, sends `payload`, receives `rx_len` bytes and finally checks
    /// the status if `wait_status`.
    pub fn transact(
        &mut self,
        header: Header,
        payload: &[u8],
        rx_len: usize,
        wait_ack: bool,
        wait_status: bool,
    ) -> Result<Vec<u8>> {
        self.io.write(&header.encode()?)?;

        if wait_ack {
            let ack = self.io.read_u8()?;
            if ack != header.ins {
                // a refused command only gets its status, drop the second byte
                self.io.read_u8()?;
                return Err(Error::InvalidAck(header.ins, ack));
            }
        }

        self.io.write(payload)?;
        let mut data = vec![0; rx_len];
        self.io.read(&mut data)?;

        if wait_status {
            let status = self.io.read_u16_le()?;
            if status != Status::Success.code() {
                return Err(Error::InvalidStatus(Status::Success.code(), status));
            }
        }

        Ok(data)
    }

    fn read_chunk(&mut self, addr: u32, len: u8, width: Width) -> Result<Vec<u8>> {
        let offset = self.rebase(addr)?;
        self.transact(Header::read(width, offset, len), &[], len as usize, true, true)
    }

    fn write_chunk(&mut self, addr: u32, data: &[u8], width: Width) -> Result<()> {
        let offset = self.rebase(addr)?;
        self.transact(Header::write(width, offset, data.len() as u8), data, 0, true, true)?;
        Ok(())
    }

    /// Make sure `addr` is reachable from the device base and return its offset.
    fn rebase(&mut self, addr: u32) -> Result<u16> {
        let base = addr & !0xffff;
        if self.base != Some(base) {
            self.set_base(base)?;
        }

        Ok((addr - base) as u16)
    }
}

fn check_alignment(size: usize, width: Width, chunk: usize) -> Result<()> {
    let unit = width.bytes() as usize;
    if chunk == 0 || chunk > u8::MAX as usize || chunk % unit != 0 || size % unit != 0 {
        Err(Error::Unaligned {
            size,
            chunk,
            width: width.bits(),
        })
    } else {
        Ok(())
    }
}
