use std::time::Duration;

use avrlink_frame::Attribute;
use avrlink_session::{Controller, SessionConfig};
use avrlink_transport::{DeviceAddress, TcpConfig};
use clap::{Args, Subcommand};

use crate::exit::{session_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod get;
pub mod set;
pub mod status;
pub mod version;
pub mod watch;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Query one attribute.
    Get(GetArgs),
    /// Change one attribute and wait for the receiver to confirm it.
    Set(SetArgs),
    /// Query every attribute and the volume ceiling.
    Status(StatusArgs),
    /// Print updates pushed by the receiver.
    Watch(WatchArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Get(args) => get::run(args, format),
        Command::Set(args) => set::run(args, format),
        Command::Status(args) => status::run(args, format),
        Command::Watch(args) => watch::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ConnectionArgs {
    /// Receiver address: IP or IP:PORT (default port 23).
    pub address: String,
    /// Connection timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct GetArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,
    /// Attribute name: power, input, volume or mute.
    pub attribute: String,
}

#[derive(Args, Debug)]
pub struct SetArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,
    /// Attribute name: power, input, volume or mute.
    pub attribute: String,
    /// New value (on/off, an input name or code, or a volume like 42.5).
    pub value: String,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,
    /// Exit after printing N updates.
    #[arg(long)]
    pub count: Option<usize>,
    /// Pause between reads of the receiver stream (e.g. 100ms).
    #[arg(long, default_value = "100ms")]
    pub poll_interval: String,
    /// Query and print the current state before waiting for updates.
    #[arg(long)]
    pub initial: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

impl ConnectionArgs {
    pub fn device_address(&self) -> CliResult<DeviceAddress> {
        self.address
            .parse()
            .map_err(|err| CliError::new(USAGE, format!("invalid address: {err}")))
    }

    pub fn session_config(&self) -> CliResult<SessionConfig> {
        Ok(SessionConfig {
            tcp: TcpConfig {
                connect_timeout: parse_duration("timeout", &self.timeout)?,
                ..TcpConfig::default()
            },
            ..SessionConfig::default()
        })
    }

    pub fn connect(&self) -> CliResult<Controller> {
        let address = self.device_address()?;
        let config = self.session_config()?;
        Controller::connect(address, config).map_err(|err| session_error("connect failed", err))
    }
}

pub fn parse_attribute(input: &str) -> CliResult<Attribute> {
    input
        .parse()
        .map_err(|err| CliError::new(USAGE, format!("{err}")))
}

pub fn parse_duration(name: &str, input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, format!("{name} must not be empty")));
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
        .map_err(|_| CliError::new(USAGE, format!("invalid {name} value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, format!("{name} must be greater than zero")));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}
