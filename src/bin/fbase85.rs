use std::io::{self, Write};
#[cfg(unix)]
use std::mem::ManuallyDrop;
#[cfg(unix)]
use std::os::unix::io::FromRawFd;
use std::path::Path;
use std::process;

use anyhow::Context;
use clap::Parser;

use base85_rs::base85::{self, Config, Format};
use base85_rs::common::io::open_file;
use base85_rs::common::{gnu_name, io_error_msg, reset_sigpipe};

#[derive(Parser)]
#[command(
    name = "base85",
    about = "Base85 encode or decode FILE, or standard input, to standard output.",
    after_help = "With no FILE, or when FILE is -, read standard input.\n\n\
        The data are encoded with the ASCII85 alphabet ('!' through 'u').\n\
        When decoding, the input may contain newlines in addition to the bytes of\n\
        the alphabet.  Use --ignore-garbage to attempt to recover from any other\n\
        non-alphabet bytes in the encoded stream.",
    version
)]
struct Cli {
    /// Decode data
    #[arg(short = 'd', long = "decode")]
    decode: bool,

    /// When decoding, ignore non-alphabet characters
    #[arg(short = 'i', long = "ignore-garbage")]
    ignore_garbage: bool,

    /// Wrap encoded lines after COLS character (default 76).
    /// Use 0 to disable line wrapping
    #[arg(
        short = 'w',
        long = "wrap",
        value_name = "COLS",
        default_value = "76",
        allow_hyphen_values = true,
        value_parser = base85::parse_wrap_width
    )]
    wrap: usize,

    /// Use 'z' for all-zero groups when encoding, and accept it when decoding
    #[arg(short = 'z', long = "zero-shorthand")]
    zero_shorthand: bool,

    /// Encode each byte as eight ASCII '0'/'1' digits instead of base85
    #[arg(short = 'b', long = "binary")]
    binary: bool,

    /// File to process (reads stdin if omitted or -)
    file: Option<String>,
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            format: if self.binary {
                Format::Binary
            } else {
                Format::Radix85
            },
            decode: self.decode,
            ignore_invalid: self.ignore_garbage,
            wrap_width: self.wrap,
            shorthand: self.zero_shorthand,
            ..Config::default()
        }
    }
}

/// Raw fd stdout for zero-overhead writes on Unix.
/// The driver already batches output through its own buffer.
#[cfg(unix)]
#[inline]
fn raw_stdout() -> ManuallyDrop<std::fs::File> {
    unsafe { ManuallyDrop::new(std::fs::File::from_raw_fd(1)) }
}

fn main() {
    reset_sigpipe();
    env_logger::init();

    let cli = Cli::parse();
    let config = cli.config();
    let filename = cli.file.as_deref().unwrap_or("-");

    #[cfg(unix)]
    let result = {
        let mut raw = raw_stdout();
        process_input(filename, &config, &mut *raw)
    };
    #[cfg(not(unix))]
    let result = {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        process_input(filename, &config, &mut out)
    };

    if let Err(e) = result {
        process::exit(report(&e, filename));
    }
}

fn process_input(filename: &str, config: &Config, out: &mut impl Write) -> anyhow::Result<()> {
    if filename == "-" {
        #[cfg(target_os = "linux")]
        let mut reader = base85_rs::common::io::RawStdin;
        #[cfg(not(target_os = "linux"))]
        let mut reader = io::stdin().lock();
        base85::run(&mut reader, out, config)?;
        return Ok(());
    }

    let mut file = open_file(Path::new(filename)).with_context(|| filename.to_string())?;
    base85::run(&mut file, out, config)?;
    Ok(())
}

/// Print a diagnostic for `err` and return the exit status.
fn report(err: &anyhow::Error, filename: &str) -> i32 {
    let tool = gnu_name(env!("CARGO_BIN_NAME"));
    if let Some(e) = err.downcast_ref::<base85::Error>() {
        if let Some(io_err) = e.io_error()
            && io_err.kind() == io::ErrorKind::BrokenPipe
        {
            return 0;
        }
        match e {
            base85::Error::Read(io_err) if filename != "-" => {
                eprintln!("{}: {}: read error: {}", tool, filename, io_error_msg(io_err))
            }
            base85::Error::Read(io_err) => eprintln!("{}: read error: {}", tool, io_error_msg(io_err)),
            base85::Error::Write(io_err) => {
                eprintln!("{}: write error: {}", tool, io_error_msg(io_err))
            }
            other => eprintln!("{}: {}", tool, other),
        }
    } else if let Some(io_err) = err.downcast_ref::<io::Error>() {
        eprintln!("{}: {}: {}", tool, filename, io_error_msg(io_err));
    } else {
        eprintln!("{}: {:#}", tool, err);
    }
    1
}
