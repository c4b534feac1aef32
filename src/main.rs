use std::fs::File;
use std::io;
use std::mem::ManuallyDrop;
use std::os::fd::FromRawFd;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use pacepipe::error::EngineError;
use pacepipe::Control::listener::ControlListener;
use pacepipe::Control::sender::{send_changes, ChangeSet};
use pacepipe::Core::fifo;
use pacepipe::Core::signal::SignalBridge;
use pacepipe::Pacing::EngineBuilder;
use pacepipe::Pacing::Structs::Engine_Structs::RateUnit;

/// Bandwidth limiting pipe with live retuning over a named pipe.
#[derive(Debug, Parser)]
#[command(name = "pacepipe", version)]
struct Cli {
    /// Bandwidth limit in the selected unit per second.
    limit: Option<f64>,

    /// Block size for input and output, in bytes.
    #[arg(short = 's', long, value_name = "BYTES", value_parser = clap::value_parser!(u64).range(1..))]
    blocksize: Option<u64>,

    /// Window of time in seconds.
    #[arg(short = 'w', long, value_name = "SECONDS", value_parser = clap::value_parser!(u64).range(1..))]
    window: Option<u64>,

    /// Create the named pipe and listen for change messages.
    #[arg(short = 'l', long, value_name = "FIFO", conflicts_with = "transmit")]
    listen: Option<PathBuf>,

    /// Transmit changed options to a running pacepipe process.
    #[arg(short = 't', long, value_name = "FIFO")]
    transmit: Option<PathBuf>,

    /// Limit is in bits per second.
    #[arg(short = 'b', group = "unit_flags")]
    bits: bool,

    /// Limit is in kilobits per second.
    #[arg(short = 'k', group = "unit_flags")]
    kilobits: bool,

    /// Limit is in megabits per second.
    #[arg(short = 'm', group = "unit_flags")]
    megabits: bool,

    /// Limit is in bytes per second (default).
    #[arg(short = 'B', group = "unit_flags")]
    bytes: bool,

    /// Limit is in kilobytes per second.
    #[arg(short = 'K', group = "unit_flags")]
    kilobytes: bool,

    /// Limit is in megabytes per second.
    #[arg(short = 'M', group = "unit_flags")]
    megabytes: bool,

    /// Run quietly.
    #[arg(short = 'q', conflicts_with = "verbose")]
    quiet: bool,

    /// Print informational messages to stderr at window intervals.
    #[arg(short = 'v')]
    verbose: bool,
}

impl Cli {
    /// The explicitly selected display unit, if any.
    fn unit(&self) -> Option<RateUnit> {
        if self.bits {
            Some(RateUnit::Bits)
        } else if self.kilobits {
            Some(RateUnit::Kilobits)
        } else if self.megabits {
            Some(RateUnit::Megabits)
        } else if self.bytes {
            Some(RateUnit::Bytes)
        } else if self.kilobytes {
            Some(RateUnit::Kilobytes)
        } else if self.megabytes {
            Some(RateUnit::Megabytes)
        } else {
            None
        }
    }

    /// The client-role batch: only options the user actually passed.
    fn change_set(&self) -> Result<ChangeSet, EngineError> {
        let unit = self.unit();
        let limit = match self.limit {
            Some(limit) if limit > 0.0 => {
                Some(limit * unit.unwrap_or(RateUnit::Bytes).multiplier())
            }
            Some(limit) => {
                return Err(EngineError::Config(format!("invalid limit {limit}")));
            }
            None => None,
        };
        let verbose = if self.verbose {
            Some(true)
        } else if self.quiet {
            Some(false)
        } else {
            None
        };
        Ok(ChangeSet {
            verbose,
            unit,
            limit,
            window: self.window,
            block_size: self.blocksize,
        })
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        error!("{err}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), EngineError> {
    match cli.transmit.clone() {
        Some(path) => transmit(&cli, &path),
        None => listen(cli),
    }
}

/// Client role: push the requested changes to a running listener.
fn transmit(cli: &Cli, path: &std::path::Path) -> Result<(), EngineError> {
    let changes = cli.change_set()?;
    if changes.is_empty() {
        return Err(EngineError::Config("no changes".into()));
    }

    let mut channel = fifo::open_sender(path).map_err(EngineError::ControlSend)?;
    send_changes(&mut channel, &changes)
    // channel closes on drop regardless of outcome
}

/// Server role: pace stdin to stdout, optionally listening on a fifo.
fn listen(cli: Cli) -> Result<(), EngineError> {
    let unit = cli.unit().unwrap_or(RateUnit::Bytes);
    let limit = cli
        .limit
        .ok_or_else(|| EngineError::Config("a bandwidth limit is required".into()))?;

    let mut builder = EngineBuilder::new(limit * unit.multiplier())
        .with_unit(unit)
        .with_verbose(cli.verbose);
    if let Some(window) = cli.window {
        builder = builder.with_window(window);
    }
    if let Some(blocksize) = cli.blocksize {
        builder = builder.with_block_size(blocksize as usize);
    }

    // Held for the lifetime of the run; dropping it unlinks the fifo.
    let mut _guard = None;
    if let Some(path) = cli.listen.clone() {
        SignalBridge::install().map_err(EngineError::Signal)?;

        let cleanup_path = path.clone();
        ctrlc::set_handler(move || {
            // Termination bypasses the main loop: tear down the fifo
            // object and leave immediately.
            fifo::remove(&cleanup_path);
            process::exit(1);
        })
        .map_err(|err| EngineError::Signal(io::Error::other(err.to_string())))?;

        let guard = fifo::create(&path).map_err(EngineError::Channel)?;
        let channel = fifo::open_listener(&path).map_err(EngineError::Channel)?;
        builder = builder.with_control(ControlListener::new(channel));
        _guard = Some(guard);
    }

    let mut engine = builder.build()?;

    // Raw descriptors, not the std handles: Stdin's internal buffering
    // would read ahead of the rate budget and Stdout's would batch the
    // paced writes. ManuallyDrop keeps the fds open for the process.
    let mut input = ManuallyDrop::new(unsafe { File::from_raw_fd(libc::STDIN_FILENO) });
    let mut output = ManuallyDrop::new(unsafe { File::from_raw_fd(libc::STDOUT_FILENO) });

    engine.run(&mut *input, &mut *output)?;
    Ok(())
}
