use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use xapilink_transport::{LinkStream, TcpTransport};

use crate::exit::{transport_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod call;
pub mod inspect;
pub mod listen;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load API definitions and print the command surface.
    Inspect(InspectArgs),
    /// Invoke a single command and print the decoded response.
    Call(CallArgs),
    /// Stream decoded events until interrupted.
    Listen(ListenArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Inspect(args) => inspect::run(args, format),
        Command::Call(args) => call::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// API definition documents (JSON).
    #[arg(required = true)]
    pub definitions: Vec<PathBuf>,
    /// Restrict output to one device.
    #[arg(long)]
    pub device: Option<String>,
}

#[derive(Args, Debug)]
pub struct CallArgs {
    /// Address: host:port for TCP, or a socket path.
    pub addr: String,
    /// Command as device.class.command.
    pub command: String,
    /// Command arguments, in declared parameter order. Integers accept
    /// decimal or 0x hex; binary fields take hex strings.
    pub args: Vec<String>,
    /// API definition documents (JSON).
    #[arg(long, value_name = "FILE", required = true)]
    pub api: Vec<PathBuf>,
    /// Response deadline (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Address: host:port for TCP, or a socket path.
    pub addr: String,
    /// API definition documents (JSON).
    #[arg(long, value_name = "FILE", required = true)]
    pub api: Vec<PathBuf>,
    /// Exit after printing N events.
    #[arg(long)]
    pub count: Option<usize>,
    /// Exit after this much time (e.g. 30s, 500ms).
    #[arg(long)]
    pub max_time: Option<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Connect to a device stack by address. `host:port` goes over TCP;
/// anything else is treated as a Unix socket path.
pub fn connect(addr: &str, timeout: Duration) -> CliResult<LinkStream> {
    if looks_like_tcp(addr) {
        return TcpTransport::connect_timeout(addr, timeout)
            .map_err(|err| transport_error("connect failed", err));
    }

    #[cfg(unix)]
    {
        xapilink_transport::UnixSocketTransport::connect(addr)
            .map_err(|err| transport_error("connect failed", err))
    }
    #[cfg(not(unix))]
    {
        Err(CliError::new(
            USAGE,
            format!("{addr} is not host:port and Unix sockets are unavailable here"),
        ))
    }
}

fn looks_like_tcp(addr: &str) -> bool {
    if addr.contains('/') {
        return false;
    }
    match addr.rsplit_once(':') {
        Some((host, port)) => !host.is_empty() && port.parse::<u16>().is_ok(),
        None => false,
    }
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        _ => Err(CliError::new(
            USAGE,
            format!("unsupported duration unit: {unit}"),
        )),
    }
}
