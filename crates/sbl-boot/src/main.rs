use std::{fs, path::PathBuf, thread::sleep, time::Duration};

use clap::{Parser, Subcommand, ValueEnum};
use clap_num::maybe_hex;
use colored::Colorize;
use sbl_port::Port;
use sbl_protocol::{Ram, Width};
use serialport::available_ports;

use crate::{
    client::{Client, DEFAULT_CHUNK},
    emulate::run_emulator,
    err::Error,
    image::{Image, is_ihex, upload},
    logging::hexdump,
    repl::run_repl,
    sync::sync,
};

mod client;
mod emulate;
mod err;
mod image;
mod logging;
mod repl;
mod sync;
#[cfg(test)]
mod testing;

type Result<T> = core::result::Result<T, Error>;

#[derive(Clone, Copy, ValueEnum)]
enum AccessWidth {
    #[value(name = "8")]
    W8,
    #[value(name = "16")]
    W16,
    #[value(name = "32")]
    W32,
}

impl From<AccessWidth> for Width {
    fn from(value: AccessWidth) -> Self {
        match value {
            AccessWidth::W8 => Width::W8,
            AccessWidth::W16 => Width::W16,
            AccessWidth::W32 => Width::W32,
        }
    }
}

#[derive(Parser)]
#[command(version)]
struct Cli {
    /// Serial port, the only available one is used if not set
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate
    #[arg(short, long, default_value_t = 115200)]
    baud: u32,

    /// Read timeout in milliseconds
    #[arg(short, long, default_value_t = 2000)]
    timeout: u64,

    /// Access width for memory transfers
    #[arg(short, long, value_enum, default_value = "8")]
    width: AccessWidth,

    /// Bytes per command, must be a multiple of the access width
    #[arg(short, long, default_value_t = DEFAULT_CHUNK)]
    chunk: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read `size` bytes at `addr` and dump them
    Read {
        #[arg(value_parser=maybe_hex::<u32>)]
        addr: u32,
        #[arg(value_parser=maybe_hex::<usize>)]
        size: usize,
        /// Save to a file instead of printing
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Write bytes to `addr`
    Write {
        #[arg(value_parser=maybe_hex::<u32>)]
        addr: u32,
        #[arg(num_args=1.., value_parser=hex_u8)]
        data: Vec<u8>,
    },
    /// Fill `size` bytes at `addr` with a repeated pattern
    Fill {
        #[arg(value_parser=maybe_hex::<u32>)]
        addr: u32,
        #[arg(value_parser=maybe_hex::<usize>)]
        size: usize,
        #[arg(num_args=1.., value_parser=hex_u8)]
        pattern: Vec<u8>,
    },
    /// Upload Intel HEX files and raw binaries, then optionally jump
    Load {
        /// Files to upload, `.hex` files are placed at their own addresses
        #[arg(short, long, value_delimiter = ' ', num_args = 1.., required = true)]
        input: Vec<PathBuf>,

        /// Addresses for raw binaries, in order
        #[arg(short, long, value_delimiter = ' ', num_args = 1.., value_parser=maybe_hex::<u32>)]
        upload_address: Vec<u32>,

        /// Read every file back after uploading it
        #[arg(long)]
        verify: bool,

        /// Final jump address, defaults to the start address of the last HEX file
        #[arg(short, long, value_parser=maybe_hex::<u32>)]
        jump: Option<u32>,
    },
    /// Jump to `addr`
    Exec {
        #[arg(value_parser=maybe_hex::<u32>)]
        addr: u32,
        /// Bytes sent to the code at `addr` after the jump
        #[arg(short, long, num_args=1.., value_parser=hex_u8)]
        data: Vec<u8>,
        /// Bytes to receive from the code at `addr`
        #[arg(short, long, value_parser=maybe_hex::<usize>, default_value_t = 0)]
        read: usize,
        /// Expect the code at `addr` to return
        #[arg(long)]
        wait: bool,
    },
    /// Interactive shell
    Repl,
    /// Act as a device with emulated RAM, for testing host tools
    Emulate {
        /// RAM base address
        #[arg(long, value_parser=maybe_hex::<u32>, default_value = "0x20000000")]
        ram_base: u32,
        /// RAM size
        #[arg(long, value_parser=maybe_hex::<usize>, default_value = "0x10000")]
        ram_size: usize,
        /// Binary to preload at the RAM base
        #[arg(long)]
        image: Option<PathBuf>,
    },
}

fn hex_u8(s: &str) -> core::result::Result<u8, String> {
    let s = s
        .strip_prefix("0x")
        .ok_or("byte must be 0x-prefixed hex (e.g. 0x1f)")?;

    u8::from_str_radix(s, 16).map_err(|_| format!("invalid hex byte: 0x{s}"))
}

fn open_port(cli: &Cli) -> Result<Port> {
    let name = match &cli.port {
        Some(name) => name.clone(),
        None => {
            log!("Waiting for the device");
            loop {
                let ports = available_ports()?;

                if ports.len() > 1 {
                    println!();
                    return Err(Error::MoreThanOneDevice);
                } else if let Some(port) = ports.into_iter().next() {
                    println!();
                    break port.port_name;
                }

                log!(".");
                sleep(Duration::from_millis(500));
            }
        }
    };

    println!("Using {name} at {} baud", cli.baud);
    Ok(serialport::new(name, cli.baud)
        .timeout(Duration::from_millis(cli.timeout))
        .open()?)
}

/// Upload every input and return the entry point of the last HEX file that has one.
fn load(
    client: &mut Client<Port>,
    input: Vec<PathBuf>,
    upload_address: Vec<u32>,
    verify: bool,
    width: Width,
    chunk: usize,
) -> Result<Option<u32>> {
    let binaries = input.iter().filter(|path| !is_ihex(path)).count();
    if binaries != upload_address.len() {
        return Err(Error::Custom(
            format!(
                "{binaries} raw binaries but {} upload addresses",
                upload_address.len()
            )
            .into(),
        ));
    }

    let mut addresses = upload_address.into_iter();
    let mut entry = None;
    for path in &input {
        let image = if is_ihex(path) {
            Image::from_ihex(&fs::read_to_string(path)?)?
        } else {
            let addr = addresses
                .next()
                .ok_or_else(|| Error::Custom(format!("No address for {}", path.display()).into()))?;
            Image::binary(addr, fs::read(path)?)
        };

        log!(
            "Uploading {} ({:#x} bytes in {} segments)...",
            path.display(),
            image.size(),
            image.segments.len()
        );
        status!(upload(client, &image, verify, width, chunk))?;
        entry = image.entry.or(entry);
    }

    Ok(entry)
}

fn run(cli: Cli) -> Result<()> {
    let mut port = open_port(&cli)?;
    let width = Width::from(cli.width);
    let chunk = cli.chunk;

    if let Command::Emulate {
        ram_base,
        ram_size,
        image,
    } = &cli.command
    {
        let mut data = vec![0; *ram_size];
        if let Some(image) = image {
            let image = fs::read(image)?;
            let len = image.len().min(*ram_size);
            data[..len].copy_from_slice(&image[..len]);
        }
        return run_emulator(port, Ram::with_data(*ram_base, data));
    }

    log!("Syncing with the device...");
    status!(sync(&mut port))?;

    let mut client = Client::new(port);
    match cli.command {
        Command::Read { addr, size, output } => {
            log!("Reading {size:#x} bytes at {addr:#x}...");
            let data = status!(client.read(addr, size, width, chunk))?;
            match output {
                Some(path) => fs::write(path, data)?,
                None => hexdump(addr, &data),
            }
        }
        Command::Write { addr, data } => {
            log!("Writing {:#x} bytes at {addr:#x}...", data.len());
            status!(client.write(addr, &data, width, chunk))?;
        }
        Command::Fill {
            addr,
            size,
            pattern,
        } => {
            log!("Filling {size:#x} bytes at {addr:#x}...");
            status!(client.fill(addr, size, &pattern, width, chunk))?;
        }
        Command::Load {
            input,
            upload_address,
            verify,
            jump,
        } => {
            let entry = load(&mut client, input, upload_address, verify, width, chunk)?;
            if let Some(jump) = jump.or(entry) {
                log!("Jumping to {jump:#x}...");
                status!(client.exec(jump, &[], 0, false))?;
            }
        }
        Command::Exec {
            addr,
            data,
            read,
            wait,
        } => {
            log!("Jumping to {addr:#x}...");
            let received = status!(client.exec(addr, &data, read, wait))?;
            if !received.is_empty() {
                hexdump(0, &received);
            }
        }
        Command::Repl => return run_repl(client, cli.width, chunk),
        Command::Emulate { .. } => unreachable!(),
    }

    Ok(())
}

fn main() -> core::result::Result<(), String> {
    let cli = Cli::parse();
    run(cli).map_err(|e| e.to_string())
}
