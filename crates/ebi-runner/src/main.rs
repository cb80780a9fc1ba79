//! `ebi`: query and drive an EBI radio module over a serial port.
//!
//! Usage:
//!   ebi --port /dev/ttyUSB0 info
//!   ebi channel 2 7 0 1
//!   ebi --config ebi.yaml --setup send "hello" --repeat 0 --interval-ms 1000
//!   ebi --link lora-wan send --hex 01:02:03 --port 5
//!   ebi receive --follow

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use ebi_device::{DeviceSession, SerialTransport};
use ebi_protocol::*;
use serde::Serialize;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use ebi_runner::commands::{self, Bytes};
use ebi_runner::config::{Link, RunnerConfig};
use ebi_runner::{RunnerError, RunnerResult};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// Query and drive an EBI radio module.
#[derive(Parser)]
#[command(name = "ebi", version, about)]
struct Cli {
    /// YAML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial port path (overrides the config file).
    #[arg(short, long)]
    port: Option<String>,

    /// Network protocol for send/receive (overrides the config file).
    #[arg(long, value_enum)]
    link: Option<Link>,

    /// Run the setup sequence (reset, configure, start network) first.
    #[arg(long)]
    setup: bool,

    /// Print results as JSON.
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print module identity, state and firmware version.
    Info,

    /// Query the operating state.
    State,

    /// Reset the module and wait for it to boot.
    Reset,

    /// Get or set the output power.
    Power {
        /// Output power in dBm.
        #[arg(allow_negative_numbers = true)]
        dbm: Option<i8>,
    },

    /// Get or set channel and modulation.
    Channel {
        /// Channel, spreading factor, bandwidth and coding rate codes.
        #[arg(num_args = 4, value_names = ["CH", "SF", "BW", "CR"])]
        params: Option<Vec<u8>>,
    },

    /// Get or set the energy save policy.
    EnergySave {
        /// Policy to apply.
        #[arg(value_enum)]
        policy: Option<PolicyArg>,
    },

    /// Get or set the network address (decimal, 0-65535).
    Address {
        value: Option<String>,
    },

    /// Get or set the network identifier (decimal, 0-65535).
    NetworkId {
        value: Option<String>,
    },

    /// Get or set the network preference.
    Preference {
        /// Preferred network protocol.
        #[arg(long, value_enum)]
        protocol: Option<Link>,
        /// Join automatically after boot.
        #[arg(long)]
        auto_join: Option<bool>,
        /// Adaptive data rate.
        #[arg(long)]
        adr: Option<bool>,
    },

    /// Join the network.
    Start,

    /// Leave the network.
    Stop,

    /// Get or set the IEEE address (16 hex digits).
    Ieee {
        address: Option<String>,
    },

    /// Send a data packet.
    Send {
        /// Payload, as text unless --hex is given.
        payload: String,
        /// Treat the payload as hex digits.
        #[arg(long)]
        hex: bool,
        /// Destination address on the proprietary link (default: broadcast).
        #[arg(long)]
        dest: Option<u16>,
        /// Application port on LoRaWAN (1-223).
        #[arg(long)]
        port: Option<u8>,
        /// Number of times to send (0 = until Ctrl-C).
        #[arg(long, default_value_t = 1)]
        repeat: u32,
        /// Pause between repeated sends.
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
    },

    /// Wait for received packets.
    Receive {
        /// Seconds to wait (default: wait forever).
        #[arg(long)]
        timeout: Option<u64>,
        /// Keep printing packets until Ctrl-C.
        #[arg(long)]
        follow: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    AlwaysOn,
    RxWindow,
    TxOnly,
}

impl From<PolicyArg> for SleepPolicy {
    fn from(policy: PolicyArg) -> Self {
        match policy {
            PolicyArg::AlwaysOn => SleepPolicy::AlwaysOn,
            PolicyArg::RxWindow => SleepPolicy::RxWindow,
            PolicyArg::TxOnly => SleepPolicy::TxOnly,
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct InfoReport {
    protocol: LinkProtocol,
    module: ModuleModel,
    uuid: Bytes,
    firmware_version: Bytes,
    state: DeviceState,
}

impl std::fmt::Display for InfoReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "module: {}, protocol: {}, uuid: {}, firmware: {}, state: {}",
            self.module, self.protocol, self.uuid, self.firmware_version, self.state
        )
    }
}

#[derive(Serialize)]
struct Timestamped<T> {
    time: String,
    value: T,
}

struct Printer {
    json: bool,
}

impl Printer {
    fn print<T: Serialize + std::fmt::Display>(&self, label: &str, value: &T) -> RunnerResult<()> {
        if self.json {
            println!("{}", serde_json::to_string(value)?);
        } else {
            println!("{}: {}", label, value);
        }
        Ok(())
    }

    fn print_timestamped<T: Serialize + std::fmt::Display>(
        &self,
        label: &str,
        value: &T,
    ) -> RunnerResult<()> {
        let now = chrono::Local::now();
        if self.json {
            let stamped = Timestamped {
                time: now.to_rfc3339(),
                value,
            };
            println!("{}", serde_json::to_string(&stamped)?);
        } else {
            println!("[{}] {}: {}", now.format("%Y-%m-%d %H:%M:%S%.3f"), label, value);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> RunnerResult<RunnerConfig> {
    let mut config = match &cli.config {
        Some(path) => RunnerConfig::load(path)?,
        None => RunnerConfig::default(),
    };
    if let Some(port) = &cli.port {
        config.port = port.clone();
    }
    if let Some(link) = cli.link {
        config.link = link;
    }
    Ok(config)
}

fn run(cli: Cli) -> RunnerResult<()> {
    let config = load_config(&cli)?;
    ebi_device::metrics::describe_metrics();

    debug!(port = %config.port, link = ?config.link, "connecting");
    let mut session = DeviceSession::connect(&config.port, config.session.clone())?;
    let out = Printer { json: cli.json };

    if cli.setup {
        for step in commands::setup(&mut session, &config)? {
            out.print("setup", &step)?;
        }
    }

    execute(&mut session, &config, cli.command, &out)
}

fn execute(
    session: &mut DeviceSession<SerialTransport>,
    config: &RunnerConfig,
    command: Command,
    out: &Printer,
) -> RunnerResult<()> {
    match command {
        Command::Info => {
            let state = session.state();
            let report = InfoReport {
                protocol: state.link_protocol,
                module: state.module_model,
                uuid: Bytes(state.uuid.clone()),
                firmware_version: Bytes(state.firmware_version.as_bytes().to_vec()),
                state: state.operational_state,
            };
            out.print("info", &report)
        }

        Command::State => out.print("state", &session.device_state()?),

        Command::Reset => {
            let report = session.reset()?;
            out.print("reset", &report.status)?;
            out.print("state", &report.boot_state)
        }

        Command::Power { dbm: None } => out.print("power", &session.output_power()?),
        Command::Power { dbm: Some(dbm) } => {
            let status = commands::with_network_paused(session, |s| s.set_output_power(dbm))?;
            out.print("power", &status)
        }

        Command::Channel { params: None } => {
            out.print("channel", &session.operating_channel()?)
        }
        Command::Channel { params: Some(codes) } => {
            let params = match codes.as_slice() {
                [ch, sf, bw, cr] => RadioParameters::from_codes(*ch, *sf, *bw, *cr)?,
                _ => {
                    return Err(RunnerError::InvalidArgument(
                        "channel needs CH SF BW CR".to_string(),
                    ))
                }
            };
            let status =
                commands::with_network_paused(session, |s| s.set_operating_channel(params))?;
            out.print("channel", &status)
        }

        Command::EnergySave { policy: None } => {
            out.print("energy save", &session.energy_save()?)
        }
        Command::EnergySave {
            policy: Some(policy),
        } => out.print("energy save", &session.set_energy_save(policy.into())?),

        Command::Address { value: None } => {
            out.print("address", &Bytes(session.network_address()?))
        }
        Command::Address { value: Some(text) } => {
            let address = commands::parse_address(&text)?;
            let status =
                commands::with_network_paused(session, |s| s.set_network_address(&address))?;
            out.print("address", &status)
        }

        Command::NetworkId { value: None } => {
            out.print("network id", &Bytes(session.network_identifier()?))
        }
        Command::NetworkId { value: Some(text) } => {
            let identifier = commands::parse_address(&text)?;
            let status = commands::with_network_paused(session, |s| {
                s.set_network_identifier(&identifier)
            })?;
            out.print("network id", &status)
        }

        Command::Preference {
            protocol,
            auto_join,
            adr,
        } => {
            let current = session.network_preference()?;
            if protocol.is_none() && auto_join.is_none() && adr.is_none() {
                return out.print("preference", &Response::NetworkPreference(current));
            }
            let preference = NetworkPreference {
                protocol: protocol.map(Into::into).unwrap_or(current.protocol),
                auto_join: auto_join.unwrap_or(current.auto_join),
                adr: adr.unwrap_or(current.adr),
            };
            out.print("preference", &session.set_network_preference(preference)?)
        }

        Command::Start => out.print("network start", &session.network_start()?),
        Command::Stop => out.print("network stop", &session.network_stop()?),

        Command::Ieee { address: None } => out.print("ieee", &Bytes(session.ieee_address()?)),
        Command::Ieee {
            address: Some(text),
        } => {
            let address = commands::parse_ieee(&text)?;
            out.print("ieee", &session.set_ieee_address(address)?)
        }

        Command::Send {
            payload,
            hex,
            dest,
            port,
            repeat,
            interval_ms,
        } => {
            let data = commands::parse_payload(&payload, hex)?;
            let target = commands::send_target(config.protocol(), dest, port)?;
            let running = stop_flag()?;
            let mut sent = 0u32;
            while running.load(Ordering::SeqCst) && (repeat == 0 || sent < repeat) {
                if sent > 0 {
                    std::thread::sleep(Duration::from_millis(interval_ms));
                }
                let report = session.send_data(&data, target)?;
                out.print_timestamped("sent", &Response::Sent(report))?;
                sent += 1;
            }
            Ok(())
        }

        Command::Receive { timeout, follow } => {
            let protocol = config.protocol();
            let timeout = timeout.map(Duration::from_secs);
            if !follow {
                return match session.receive(protocol, timeout)? {
                    Some(packet) => out.print_timestamped("received", &packet),
                    None => {
                        info!("no packet received");
                        Ok(())
                    }
                };
            }

            let running = stop_flag()?;
            let poll = timeout.unwrap_or(Duration::from_secs(1));
            while running.load(Ordering::SeqCst) {
                match session.listen(protocol, Some(poll))? {
                    Some(Notification::Received(packet)) => {
                        out.print_timestamped("received", &packet)?
                    }
                    Some(Notification::DeviceState(state)) => {
                        out.print_timestamped("boot", &state)?
                    }
                    None => {}
                }
            }
            Ok(())
        }
    }
}

/// Flag cleared by Ctrl-C.
fn stop_flag() -> RunnerResult<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("interrupted, stopping");
        r.store(false, Ordering::SeqCst);
    })?;
    Ok(running)
}
