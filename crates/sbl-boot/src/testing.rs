//! Channel-backed link between a host [`Client`] and a device thread.

use std::{
    io::{self, ErrorKind},
    sync::mpsc::{Receiver, RecvTimeoutError, Sender, channel},
    thread::{self, JoinHandle},
    time::Duration,
};

use sbl_port::{SimpleRead, SimpleWrite, err::Error as PortError};
use sbl_protocol::{Dispatcher, Ram};

use crate::client::Client;

pub const RAM_BASE: u32 = 0x2000_0000;

/// How long [`io::Read`] waits for the first byte before timing out.
const READ_TIMEOUT: Duration = Duration::from_millis(10);

pub struct Pipe {
    tx: Sender<u8>,
    rx: Receiver<u8>,
}

impl SimpleRead for Pipe {
    fn read(&mut self, buf: &mut [u8]) -> sbl_port::Result<()> {
        for byte in buf.iter_mut() {
            *byte = self.rx.recv().map_err(|_| PortError::Closed)?;
        }
        Ok(())
    }
}

impl SimpleWrite for Pipe {
    fn write(&mut self, buf: &[u8]) -> sbl_port::Result<()> {
        for byte in buf {
            self.tx.send(*byte).map_err(|_| PortError::Closed)?;
        }
        Ok(())
    }
}

/// Serial-port flavored view: short reads and timeouts.
impl io::Read for Pipe {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        buf[0] = match self.rx.recv_timeout(READ_TIMEOUT) {
            Ok(byte) => byte,
            Err(RecvTimeoutError::Timeout) => return Err(ErrorKind::TimedOut.into()),
            Err(RecvTimeoutError::Disconnected) => return Ok(0),
        };

        let mut n = 1;
        while n < buf.len() {
            match self.rx.try_recv() {
                Ok(byte) => buf[n] = byte,
                Err(_) => break,
            }
            n += 1;
        }

        Ok(n)
    }
}

impl io::Write for Pipe {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        SimpleWrite::write(self, buf).map_err(|_| io::Error::from(ErrorKind::BrokenPipe))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub fn pipe() -> (Pipe, Pipe) {
    let (host_tx, device_rx) = channel();
    let (device_tx, host_rx) = channel();
    (
        Pipe {
            tx: host_tx,
            rx: host_rx,
        },
        Pipe {
            tx: device_tx,
            rx: device_rx,
        },
    )
}

/// Run a dispatcher over emulated RAM until the host hangs up.
pub fn device(ram: Ram) -> (Pipe, JoinHandle<Ram>) {
    let (host, device) = pipe();
    let handle = thread::spawn(move || {
        let mut dispatcher = Dispatcher::new(device, ram);
        let _ = dispatcher.run();
        dispatcher.into_parts().1
    });

    (host, handle)
}

pub fn client(ram: Ram) -> (Client<Pipe>, JoinHandle<Ram>) {
    let (host, handle) = device(ram);
    (Client::new(host), handle)
}

pub fn finish(client: Client<Pipe>, handle: JoinHandle<Ram>) -> Ram {
    drop(client);
    handle.join().unwrap()
}
