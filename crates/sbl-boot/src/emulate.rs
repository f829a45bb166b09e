use std::io::{ErrorKind, Read};

use colored::Colorize;
use sbl_port::{Port, SimpleRead, SimpleWrite, err::Error as PortError};
use sbl_protocol::{Dispatcher, Ram};

use crate::Result;

/// Serial port that waits through read timeouts instead of failing on them.
///
/// An emulated device sits idle between commands for as long as the host wants.
struct Patient(Port);

impl SimpleRead for Patient {
    fn read(&mut self, buf: &mut [u8]) -> sbl_port::Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            match Read::read(&mut self.0, &mut buf[filled..]) {
                Ok(0) => return Err(PortError::Closed),
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::TimedOut => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Ok(())
    }
}

impl SimpleWrite for Patient {
    fn write(&mut self, buf: &[u8]) -> sbl_port::Result<()> {
        SimpleWrite::write(&mut self.0, buf)
    }
}

/// Act as a device: serve commands on `port` against `ram` until the port fails.
pub fn run_emulator(port: Port, ram: Ram) -> Result<()> {
    println!(
        "Emulating {:#x} bytes of RAM at {:#010x}, Ctrl-C to exit",
        ram.data().len(),
        ram.base()
    );

    let mut dispatcher = Dispatcher::new(Patient(port), ram);
    let mut faults = 0;
    loop {
        let served = dispatcher.step()?;
        println!("=> {}", served.command);
        if served.status.is_success() {
            println!("<= {}", served.status.to_string().green());
        } else {
            println!("<= {}", served.status.to_string().red());
        }

        let total = dispatcher.memory().faults();
        if total > faults {
            let msg = format!("{} accesses outside of RAM", total - faults);
            eprintln!("{}", msg.yellow());
            faults = total;
        }
    }
}
