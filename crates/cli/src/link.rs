// LabWired FI Profiler - Fault-Injection Test Target
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Host side of the profiling link.

use anyhow::{Context, Result};
use fi_profiler_core::frame::{self, FrameError};
use fi_profiler_core::Command;
use std::io::{self, Read, Write};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// One decoded packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub cmd: u8,
    pub payload: Vec<u8>,
}

impl Packet {
    pub fn command(&self) -> Option<Command> {
        Command::from_byte(self.cmd)
    }
}

/// Unbounded counterpart of the target's frame reader.
#[derive(Debug, Default)]
pub struct PacketAssembler {
    buf: Vec<u8>,
}

impl PacketAssembler {
    /// Feeds one byte. Returns a result each time a terminator arrives;
    /// empty frames are reported as [`FrameError::Empty`].
    pub fn push(&mut self, byte: u8) -> Option<Result<Packet, FrameError>> {
        self.buf.push(byte);
        if byte != frame::FRAME_BYTE {
            return None;
        }
        let decoded = frame::decode_in_place(&mut self.buf).map(|f| Packet {
            cmd: f.cmd,
            payload: f.payload.to_vec(),
        });
        self.buf.clear();
        Some(decoded)
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

/// Splits a captured byte stream into packets, skipping empty frames.
/// Trailing bytes without a terminator are ignored.
pub fn split_packets(bytes: &[u8]) -> Vec<Result<Packet, FrameError>> {
    let mut assembler = PacketAssembler::default();
    bytes
        .iter()
        .filter_map(|&b| assembler.push(b))
        .filter(|r| !matches!(r, Err(FrameError::Empty)))
        .collect()
}

/// Wire bytes of a payload-free packet.
pub fn bare_packet(cmd: Command) -> [u8; 2] {
    [cmd.byte(), frame::FRAME_BYTE]
}

/// What a single profiling cycle produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleResponse {
    /// `'e'`: workload ran clean.
    Expected,
    /// `'f'` with its diagnostic payload.
    Fault(Vec<u8>),
    /// The reset marker arrived instead of an ack or response.
    Reset,
    /// Nothing (or nothing sensible) arrived in time.
    Crash(CrashKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrashKind {
    AckTimeout,
    ResponseTimeout,
    /// A decodable packet that the protocol does not allow at this point.
    Unexpected(u8),
}

impl std::fmt::Display for CrashKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AckTimeout => f.write_str("ack timeout"),
            Self::ResponseTimeout => f.write_str("response timeout"),
            Self::Unexpected(cmd) => write!(f, "unexpected packet {:#04x}", cmd),
        }
    }
}

/// Drives a target over any byte stream with read timeouts, typically a
/// serial port.
pub struct TargetLink<P> {
    port: P,
    assembler: PacketAssembler,
}

impl<P: Read + Write> TargetLink<P> {
    pub fn new(port: P) -> Self {
        Self {
            port,
            assembler: PacketAssembler::default(),
        }
    }

    pub fn into_inner(self) -> P {
        self.port
    }

    /// Waits up to `timeout` for the next non-empty packet. Frames that fail
    /// to decode are logged and skipped.
    pub fn read_packet(&mut self, timeout: Duration) -> Result<Option<Packet>> {
        let deadline = Instant::now() + timeout;
        let mut byte = [0u8; 1];
        while Instant::now() < deadline {
            match self.port.read(&mut byte) {
                Ok(0) => anyhow::bail!("target link closed"),
                Ok(_) => match self.assembler.push(byte[0]) {
                    None | Some(Err(FrameError::Empty)) => {}
                    Some(Ok(packet)) => {
                        trace!(cmd = packet.cmd, len = packet.payload.len(), "packet");
                        return Ok(Some(packet));
                    }
                    Some(Err(err)) => warn!("dropping bad frame: {}", err),
                },
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                    ) => {}
                Err(e) => return Err(e).context("Failed to read from target"),
            }
        }
        Ok(None)
    }

    /// Waits for the reset marker, e.g. after power-cycling the target.
    pub fn wait_reset(&mut self, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.read_packet(remaining)? {
                Some(p) if p.command() == Some(Command::Reset) => return Ok(true),
                Some(p) => debug!(cmd = p.cmd, "ignoring packet while waiting for reset"),
                None => return Ok(false),
            }
        }
    }

    fn send_start(&mut self) -> Result<()> {
        self.assembler.clear();
        self.port
            .write_all(&bare_packet(Command::Start))
            .and_then(|()| self.port.flush())
            .context("Failed to send start command")
    }

    /// Runs one start/ack/response exchange.
    pub fn run_cycle(
        &mut self,
        ack_timeout: Duration,
        response_timeout: Duration,
    ) -> Result<CycleResponse> {
        self.send_start()?;

        match self.read_packet(ack_timeout)? {
            None => return Ok(CycleResponse::Crash(CrashKind::AckTimeout)),
            Some(p) => match p.command() {
                Some(Command::Start) => {}
                Some(Command::Reset) => return Ok(CycleResponse::Reset),
                _ => return Ok(CycleResponse::Crash(CrashKind::Unexpected(p.cmd))),
            },
        }

        let response = match self.read_packet(response_timeout)? {
            None => CycleResponse::Crash(CrashKind::ResponseTimeout),
            Some(p) => match p.command() {
                Some(Command::End) => CycleResponse::Expected,
                Some(Command::Fault) => CycleResponse::Fault(p.payload),
                Some(Command::Reset) => CycleResponse::Reset,
                _ => CycleResponse::Crash(CrashKind::Unexpected(p.cmd)),
            },
        };
        Ok(response)
    }
}
