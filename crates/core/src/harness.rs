// LabWired FI Profiler - Fault-Injection Test Target
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! The profiling state machine.
//!
//! ```text
//!   Boot ──► Idle ──'s'──► Armed ──ack──► Executing ──'e'/'f'──► Idle
//!             ▲  └─other─┘   └─ack failed─► Idle
//! ```

use core::sync::atomic::{compiler_fence, Ordering};

use crate::channel::PacketChannel;
use crate::hooks::{NoIndicator, StatusIndicator};
use crate::trigger::TriggerLine;
use crate::workload::{Verdict, Workload};
use crate::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Trigger not yet driven, reset marker not yet sent.
    Boot,
    /// Waiting for a start command.
    Idle,
    /// Start command accepted, acknowledgment pending.
    Armed,
    /// Acknowledged, one workload run pending.
    Executing,
}

/// How a completed cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// `'e'` was sent.
    Expected,
    /// `'f'` was sent with the workload's diagnostic payload.
    Fault,
}

/// Drives one workload through the command/ack/response protocol.
///
/// Everything is statically dispatched; the workload, the trigger and the
/// channel are owned for the lifetime of the harness.
pub struct Harness<C, T, W, I = NoIndicator> {
    channel: C,
    trigger: T,
    workload: W,
    indicator: I,
    state: State,
    cycles: u32,
}

impl<C, T, W> Harness<C, T, W>
where
    C: PacketChannel,
    T: TriggerLine,
    W: Workload,
{
    pub fn new(channel: C, trigger: T, workload: W) -> Self {
        Self::with_indicator(channel, trigger, workload, NoIndicator)
    }
}

impl<C, T, W, I> Harness<C, T, W, I>
where
    C: PacketChannel,
    T: TriggerLine,
    W: Workload,
    I: StatusIndicator,
{
    pub fn with_indicator(channel: C, trigger: T, workload: W, indicator: I) -> Self {
        Self {
            channel,
            trigger,
            workload,
            indicator,
            state: State::Boot,
            cycles: 0,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Number of workload executions so far.
    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    pub fn into_parts(self) -> (C, T, W, I) {
        (self.channel, self.trigger, self.workload, self.indicator)
    }

    /// Performs exactly one state transition. Returns the outcome when the
    /// transition completed a workload cycle.
    pub fn step(&mut self) -> Option<Outcome> {
        match self.state {
            State::Boot => {
                self.trigger.set_low();
                if let Err(_err) = self.channel.send_reset_marker() {
                    log_warn!("reset marker not sent: {}", _err);
                }
                log_debug!("harness ready");
                self.state = State::Idle;
                None
            }
            State::Idle => {
                match self.channel.read_command() {
                    Ok(frame) if frame.cmd == Command::Start.byte() => {
                        self.state = State::Armed;
                    }
                    Ok(_frame) => {
                        log_trace!(cmd = _frame.cmd, "ignoring command");
                    }
                    Err(_err) => {
                        log_trace!("discarding input: {}", _err);
                    }
                }
                None
            }
            State::Armed => {
                match self.channel.send_ack(Command::Start.byte()) {
                    Ok(()) => self.state = State::Executing,
                    Err(_err) => {
                        log_warn!("ack not sent, cycle skipped: {}", _err);
                        self.state = State::Idle;
                    }
                }
                None
            }
            State::Executing => {
                let outcome = self.execute();
                self.state = State::Idle;
                Some(outcome)
            }
        }
    }

    /// Steps until the harness is back in Idle. Returns `None` when the
    /// input did not lead to a workload execution.
    pub fn run_cycle(&mut self) -> Option<Outcome> {
        if self.state == State::Boot {
            self.step();
        }
        loop {
            let outcome = self.step();
            if self.state == State::Idle {
                return outcome;
            }
        }
    }

    /// Serves start commands forever.
    pub fn run(mut self) -> ! {
        loop {
            self.step();
        }
    }

    fn execute(&mut self) -> Outcome {
        self.workload.prepare();

        // The fences pin the trigger edges to the workload: no store from
        // `prepare` sinks into the window and no result escapes it early.
        compiler_fence(Ordering::SeqCst);
        self.trigger.set_high();
        compiler_fence(Ordering::SeqCst);
        let observed = self.workload.run();
        compiler_fence(Ordering::SeqCst);
        self.trigger.set_low();
        compiler_fence(Ordering::SeqCst);

        let status = self.cycles;
        self.cycles = self.cycles.wrapping_add(1);

        let (outcome, sent) = match self.workload.evaluate(observed) {
            Verdict::Expected => (
                Outcome::Expected,
                self.channel.write_packet(Command::End.byte(), &[]),
            ),
            Verdict::Fault(diagnostic) => (
                Outcome::Fault,
                self.channel
                    .write_packet(Command::Fault.byte(), diagnostic.as_bytes()),
            ),
        };
        if let Err(_err) = sent {
            log_warn!("response not sent: {}", _err);
        }

        match outcome {
            Outcome::Expected => self.indicator.ok(status),
            Outcome::Fault => {
                log_debug!(cycle = status, "workload diverged");
                self.indicator.error(status)
            }
        }
        outcome
    }
}
