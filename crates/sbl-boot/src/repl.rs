use std::iter::once;

use clap::{Parser, Subcommand};
use clap_num::maybe_hex;
use colored::Colorize;
use rustyline::{DefaultEditor, error::ReadlineError};
use sbl_port::Port;

use crate::{AccessWidth, Result, client::Client, hex_u8, logging::hexdump};

#[derive(Parser)]
struct REPL {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read `size` bytes at `addr`.
    Read {
        #[arg(value_parser=maybe_hex::<u32>)]
        addr: u32,
        #[arg(value_parser=maybe_hex::<usize>)]
        size: usize,
        #[arg(short, long, value_enum)]
        width: Option<AccessWidth>,
    },
    /// Write `data` to `addr`.
    Write {
        #[arg(value_parser=maybe_hex::<u32>)]
        addr: u32,
        #[arg(num_args=1.., value_parser=hex_u8)]
        data: Vec<u8>,
        #[arg(short, long, value_enum)]
        width: Option<AccessWidth>,
    },
    /// Fill `size` bytes at `addr` with `pattern`.
    Fill {
        #[arg(value_parser=maybe_hex::<u32>)]
        addr: u32,
        #[arg(value_parser=maybe_hex::<usize>)]
        size: usize,
        #[arg(num_args=1.., value_parser=hex_u8)]
        pattern: Vec<u8>,
    },
    /// Set the base register.
    Base {
        #[arg(value_parser=maybe_hex::<u32>)]
        base: u32,
    },
    /// Jump to `addr`.
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
}

impl Command {
    fn run(self, client: &mut Client<Port>, width: AccessWidth, chunk: usize) -> Result<()> {
        match self {
            Self::Read { addr, size, width: w } => {
                let data = client.read(addr, size, w.unwrap_or(width).into(), chunk)?;
                hexdump(addr, &data);
            }
            Self::Write { addr, data, width: w } => {
                client.write(addr, &data, w.unwrap_or(width).into(), chunk)?;
            }
            Self::Fill {
                addr,
                size,
                pattern,
            } => client.fill(addr, size, &pattern, width.into(), chunk)?,
            Self::Base { base } => client.set_base(base)?,
            Self::Exec {
                addr,
                data,
                read,
                wait,
            } => {
                let received = client.exec(addr, &data, read, wait)?;
                if !received.is_empty() {
                    hexdump(0, &received);
                }
            }
        }

        Ok(())
    }
}

pub fn run_repl(mut client: Client<Port>, width: AccessWidth, chunk: usize) -> Result<()> {
    println!("Enter --help for help, Ctrl-C to exit");

    let mut rl = DefaultEditor::new()?;

    loop {
        let line = rl.readline("> ").map(|l| l.trim().to_owned());
        match line {
            Ok(line) => {
                if line.is_empty() {
                    continue;
                }

                rl.add_history_entry(&line)?;

                match REPL::try_parse_from(once("repl").chain(line.split_whitespace())) {
                    Ok(repl) => match repl.command.run(&mut client, width, chunk) {
                        Ok(()) => println!("{}", "ok".green()),
                        Err(e) => eprintln!("{}: {e}", "failed".red()),
                    },
                    Err(e) => {
                        e.print().ok();
                    }
                }
            }
            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => break,
            Err(e) => Err(e)?,
        }
    }

    Ok(())
}
