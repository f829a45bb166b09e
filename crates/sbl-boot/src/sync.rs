use std::{
    io::{ErrorKind, Read, Write},
    time::Duration,
};

use sbl_port::Port;
use sbl_protocol::{HEADER_SIZE, Status};
use serialport::ClearBuffer;

use crate::{Result, err::Error};

/// Zero bytes to send before giving up.
///
/// A device left inside a WRITE8 of 255 bytes swallows all of them as payload
/// before the five zeros of the unknown command `0x0000` make it answer.
const SYNC_ATTEMPTS: usize = u8::MAX as usize + HEADER_SIZE + 40;
const SYNC_TIMEOUT: Duration = Duration::from_millis(100);

/// Bring the device back to "awaiting header".
pub fn sync(port: &mut Port) -> Result<()> {
    let timeout = port.timeout();
    port.clear(ClearBuffer::Input)?;
    port.set_timeout(SYNC_TIMEOUT)?;

    let ret = wait_for_failure(port);
    port.set_timeout(timeout)?;
    ret
}

/// Send single zero bytes until the failure status comes back.
fn wait_for_failure<T: Read + Write>(io: &mut T) -> Result<()> {
    let mut received = Vec::new();
    for _ in 0..SYNC_ATTEMPTS {
        io.write_all(&[0])?;
        io.flush()?;

        let mut buf = [0; 16];
        match io.read(&mut buf) {
            Ok(0) => return Err(sbl_port::err::Error::Closed.into()),
            Ok(n) => received.extend_from_slice(&buf[..n]),
            Err(e) if e.kind() == ErrorKind::TimedOut => (),
            Err(e) => return Err(e.into()),
        }

        if received.ends_with(&Status::Failure.to_bytes()) {
            return Ok(());
        }
    }

    Err(Error::SyncFailed)
}
