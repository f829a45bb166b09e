use core::{mem::transmute, ptr};

/// Memory and execution primitives the dispatcher drives.
///
/// The dispatcher treats every call as infallible. An illegal address is the
/// backend's business: trap, fault, or silently ignore it.
pub trait MemoryBackend {
    fn read8(&mut self, addr: u32) -> u8;
    fn read16(&mut self, addr: u32) -> u16;
    fn read32(&mut self, addr: u32) -> u32;

    fn write8(&mut self, addr: u32, value: u8);
    fn write16(&mut self, addr: u32, value: u16);
    fn write32(&mut self, addr: u32, value: u32);

    /// Transfer execution to `addr`.
    ///
    /// Usually never returns. If it does, the dispatcher reports success and
    /// waits for the next header.
    fn exec(&mut self, addr: u32);
}

impl<M: MemoryBackend + ?Sized> MemoryBackend for &mut M {
    fn read8(&mut self, addr: u32) -> u8 {
        (**self).read8(addr)
    }

    fn read16(&mut self, addr: u32) -> u16 {
        (**self).read16(addr)
    }

    fn read32(&mut self, addr: u32) -> u32 {
        (**self).read32(addr)
    }

    fn write8(&mut self, addr: u32, value: u8) {
        (**self).write8(addr, value)
    }

    fn write16(&mut self, addr: u32, value: u16) {
        (**self).write16(addr, value)
    }

    fn write32(&mut self, addr: u32, value: u32) {
        (**self).write32(addr, value)
    }

    fn exec(&mut self, addr: u32) {
        (**self).exec(addr)
    }
}

/// Direct access to the address space of the running core.
///
/// Every access is a volatile load or store through the address as is, and
/// `exec` calls the address as an `extern "C" fn()`.
pub struct RawMemory {
    _private: (),
}

impl RawMemory {
    /// ### Safety
    /// - The caller must run on a target where the host is allowed to touch any address it sends
    /// - 16 and 32-bit accesses must be naturally aligned, the host is responsible for that
    /// - `exec` jumps to whatever is at the address, on Thumb targets the host sets the low bit
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl MemoryBackend for RawMemory {
    fn read8(&mut self, addr: u32) -> u8 {
        unsafe { ptr::read_volatile(addr as usize as *const u8) }
    }

    fn read16(&mut self, addr: u32) -> u16 {
        unsafe { ptr::read_volatile(addr as usize as *const u16) }
    }

    fn read32(&mut self, addr: u32) -> u32 {
        unsafe { ptr::read_volatile(addr as usize as *const u32) }
    }

    fn write8(&mut self, addr: u32, value: u8) {
        unsafe { ptr::write_volatile(addr as usize as *mut u8, value) }
    }

    fn write16(&mut self, addr: u32, value: u16) {
        unsafe { ptr::write_volatile(addr as usize as *mut u16, value) }
    }

    fn write32(&mut self, addr: u32, value: u32) {
        unsafe { ptr::write_volatile(addr as usize as *mut u32, value) }
    }

    fn exec(&mut self, addr: u32) {
        let entry: extern "C" fn() = unsafe { transmute(addr as usize) };
        entry()
    }
}

