/// Print a progress message without a newline, the result follows via [`status!`].
#[macro_export]
macro_rules! log {
    ($($arg:tt)+) => {{
        print!($($arg)+);
        std::io::Write::flush(&mut std::io::stdout())?;
    }};
}

#[macro_export]
macro_rules! status {
    ($code:expr) => {{
        let ret = $code;
        match &ret {
            Ok(_) => println!("{}", "ok".green()),
            Err(_) => println!("{}", "failed".red()),
        }
        ret
    }};
}

/// Print `data` as a classic hex dump, 16 bytes per line, starting at `addr`.
pub fn hexdump(addr: u32, data: &[u8]) {
    for (i, line) in data.chunks(16).enumerate() {
        let bytes = line
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<Vec<_>>()
            .join(" ");
        println!("{:08x}: {bytes}", addr.wrapping_add((i * 16) as u32));
    }
}
