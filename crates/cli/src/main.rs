// LabWired FI Profiler - Fault-Injection Test Target
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fi_profiler_config::{ProfileConfig, WorkloadKind};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod link;
mod report;
mod session;

use link::{split_packets, TargetLink};
use report::{interpret, parse_hex, to_hex, Category};
use session::{run_session, SessionOptions};

const EXIT_PASS: u8 = 0;
const EXIT_CONFIG_ERROR: u8 = 2;
const EXIT_RUNTIME_ERROR: u8 = 3;

/// Serial read timeout; the cycle deadlines are enforced on top of it.
const PORT_POLL: Duration = Duration::from_millis(10);

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Host driver for fault-injection profiling targets",
    long_about = None
)]
struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a profile and print what each firmware build will expect.
    Check(CheckArgs),

    /// Decode captured target output (hex) into packets.
    Decode(DecodeArgs),

    /// Drive a target over a serial port and classify every cycle.
    Run(RunArgs),
}

#[derive(Parser, Debug)]
struct CheckArgs {
    /// Path to the workload profile (YAML); defaults apply when omitted
    #[arg(short, long)]
    profile: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct DecodeArgs {
    /// Workload the capture came from (counted-loop, buffer-copy, unrolled)
    #[arg(short, long)]
    workload: WorkloadKind,

    /// Path to the workload profile the target was built with
    #[arg(short, long)]
    profile: Option<PathBuf>,

    /// Captured bytes as hex; whitespace, ':' and ',' are ignored
    #[arg(required = true)]
    hex: Vec<String>,
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Serial device of the target (e.g. /dev/ttyUSB0)
    #[arg(long)]
    port: String,

    /// Workload the target runs (counted-loop, buffer-copy, unrolled)
    #[arg(short, long)]
    workload: WorkloadKind,

    /// Path to the workload profile the target was built with
    #[arg(short, long)]
    profile: Option<PathBuf>,

    /// Number of start commands to send
    #[arg(long, default_value = "100")]
    cycles: u64,

    /// How long to wait for the acknowledgment of each start command
    #[arg(long, default_value = "500")]
    ack_timeout_ms: u64,

    /// How long to wait for the response once acknowledged
    #[arg(long, default_value = "2000")]
    response_timeout_ms: u64,

    /// Wait for the target's reset marker before the first cycle
    #[arg(long)]
    wait_reset: bool,

    /// Override the profile's baud rate
    #[arg(long)]
    baud: Option<u32>,

    /// Also write the JSON lines to this file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.trace { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Commands::Check(args) => run_check(args),
        Commands::Decode(args) => run_decode(args),
        Commands::Run(args) => run_target(args),
    }
}

fn load_profile(path: Option<&Path>) -> Result<ProfileConfig> {
    match path {
        Some(p) => ProfileConfig::from_file(p),
        None => Ok(ProfileConfig::default()),
    }
}

fn run_check(args: CheckArgs) -> ExitCode {
    let profile = match load_profile(args.profile.as_deref()) {
        Ok(p) => p,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    for kind in WorkloadKind::ALL {
        let expected = match profile.expected_counter(kind) {
            Some(value) => format!("counter {}", value),
            None => format!(
                "destination {}",
                to_hex(&profile.buffer_copy.source_image())
            ),
        };
        println!(
            "{:<13} binary={:<17} expected={} fault_payload={}B",
            kind.as_str(),
            kind.firmware_binary(),
            expected,
            profile.fault_payload_len(kind)
        );
    }
    println!("serial baud={}", profile.serial.baud);
    ExitCode::from(EXIT_PASS)
}

fn run_decode(args: DecodeArgs) -> ExitCode {
    let profile = match load_profile(args.profile.as_deref()) {
        Ok(p) => p,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };
    let bytes = match parse_hex(&args.hex.join(" ")) {
        Ok(b) => b,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    for packet in split_packets(&bytes) {
        let line = match packet {
            Ok(p) => {
                let mut line = serde_json::json!({
                    "cmd": (p.cmd as char).to_string(),
                    "payload": to_hex(&p.payload),
                });
                if p.cmd == fi_profiler_core::Command::Fault.byte() {
                    line["interpretation"] =
                        serde_json::json!(interpret(&profile, args.workload, &p.payload));
                }
                line
            }
            Err(e) => serde_json::json!({ "error": e.to_string() }),
        };
        println!("{}", line);
    }
    ExitCode::from(EXIT_PASS)
}

fn run_target(args: RunArgs) -> ExitCode {
    let profile = match load_profile(args.profile.as_deref()) {
        Ok(p) => p,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    match drive(&args, &profile) {
        Ok(()) => ExitCode::from(EXIT_PASS),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(EXIT_RUNTIME_ERROR)
        }
    }
}

fn drive(args: &RunArgs, profile: &ProfileConfig) -> Result<()> {
    let baud = args.baud.unwrap_or(profile.serial.baud);
    let port = serialport::new(&args.port, baud)
        .timeout(PORT_POLL)
        .open()
        .with_context(|| format!("Failed to open serial port {}", args.port))?;
    info!(port = %args.port, baud, workload = %args.workload, "connected");

    let options = SessionOptions {
        workload: args.workload,
        cycles: args.cycles,
        ack_timeout: Duration::from_millis(args.ack_timeout_ms),
        response_timeout: Duration::from_millis(args.response_timeout_ms),
        wait_reset: args
            .wait_reset
            .then(|| Duration::from_millis(args.response_timeout_ms)),
    };

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file {:?}", path))?;
            Box::new(Tee {
                first: io::stdout(),
                second: BufWriter::new(file),
            })
        }
        None => Box::new(io::stdout()),
    };

    let mut link = TargetLink::new(port);
    let summary = run_session(&mut link, profile, &options, &mut out)?;

    info!(
        cycles = summary.cycles,
        nofault = summary.count(Category::NoFault),
        fault = summary.count(Category::Fault),
        reset = summary.count(Category::Reset),
        crash = summary.count(Category::Crash),
        "run finished"
    );
    if summary.count(Category::Crash) == summary.cycles && summary.cycles > 0 {
        warn!("every cycle crashed; check wiring, baud rate and the flashed workload");
    }
    Ok(())
}

/// Writes everything to two sinks.
struct Tee<A, B> {
    first: A,
    second: B,
}

impl<A: Write, B: Write> Write for Tee<A, B> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.first.write_all(buf)?;
        self.second.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.first.flush()?;
        self.second.flush()
    }
}
