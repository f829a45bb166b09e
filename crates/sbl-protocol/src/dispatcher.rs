use core::convert::Infallible;

use derive_ctor::ctor;
use sbl_port::{SimpleRead, SimpleWrite};

use crate::{BASE_LEN, Command, HEADER_SIZE, Header, Instruction, MemoryBackend, Result, Status, Width};

/// Outcome of a single command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ctor)]
pub struct Served {
    pub command: Command,
    pub status: Status,
}

/// Device side of the protocol.
///
/// Waits for a header, runs the command against the backend, answers with a
/// status, and starts over. The base register is the only state kept between
/// commands.
///
/// Transport errors are not recovered here, they end [`Dispatcher::step`]
/// and [`Dispatcher::run`].
pub struct Dispatcher<T: SimpleRead + SimpleWrite, M: MemoryBackend> {
    io: T,
    memory: M,
    base: u32,
}

impl<T: SimpleRead + SimpleWrite, M: MemoryBackend> Dispatcher<T, M> {
    pub fn new(io: T, memory: M) -> Self {
        Self {
            io,
            memory,
            base: 0,
        }
    }

    /// Current value of the base register.
    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn memory(&self) -> &M {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut M {
        &mut self.memory
    }

    pub fn into_parts(self) -> (T, M) {
        (self.io, self.memory)
    }

    /// Serve commands until the transport fails.
    pub fn run(&mut self) -> Result<Infallible> {
        loop {
            self.step()?;
        }
    }

    /// Serve exactly one command.
    ///
    /// Doesn't return if the command is an EXEC that never comes back.
    pub fn step(&mut self) -> Result<Served> {
        let header = self.read_header()?;
        let command = header.resolve(self.base);
        let status = self.execute(command)?;
        self.io.write_u16_le(status.code())?;

        Ok(Served::new(command, status))
    }

    fn read_header(&mut self) -> Result<Header> {
        let mut bytes = [0; HEADER_SIZE];
        self.io.read(&mut bytes)?;
        Header::decode(&bytes)
    }

    fn execute(&mut self, command: Command) -> Result<Status> {
        match command {
            Command::Read { width, addr, count } => {
                self.ack(Instruction::Read)?;
                for addr in width.burst(addr, count) {
                    self.send_element(width, addr)?;
                }
                Ok(Status::Success)
            }
            Command::Write { width, addr, count } => {
                self.ack(Instruction::Write)?;
                for addr in width.burst(addr, count) {
                    self.receive_element(width, addr)?;
                }
                Ok(Status::Success)
            }
            Command::Base { len } if len == BASE_LEN => {
                self.ack(Instruction::Base)?;
                self.base = self.io.read_u32_le()?;
                Ok(Status::Success)
            }
            Command::Exec { addr } => {
                self.memory.exec(addr);
                Ok(Status::Success)
            }
            Command::Base { .. } | Command::Unknown { .. } => Ok(Status::Failure),
        }
    }

    fn ack(&mut self, instruction: Instruction) -> Result<()> {
        self.io.write_u8(instruction.ack()).map_err(|e| e.into())
    }

    fn send_element(&mut self, width: Width, addr: u32) -> Result<()> {
        match width {
            Width::W8 => self.io.write_u8(self.memory.read8(addr)),
            Width::W16 => self.io.write_u16_le(self.memory.read16(addr)),
            Width::W32 => self.io.write_u32_le(self.memory.read32(addr)),
        }
        .map_err(|e| e.into())
    }

    fn receive_element(&mut self, width: Width, addr: u32) -> Result<()> {
        match width {
            Width::W8 => {
                let value = self.io.read_u8()?;
                self.memory.write8(addr, value);
            }
            Width::W16 => {
                let value = self.io.read_u16_le()?;
                self.memory.write16(addr, value);
            }
            Width::W32 => {
                let value = self.io.read_u32_le()?;
                self.memory.write32(addr, value);
            }
        }

        Ok(())
    }
}
