// LabWired FI Profiler - Fault-Injection Test Target
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use fi_profiler_config::{ProfileConfig, WorkloadKind};
use std::io::{Read, Write};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::link::TargetLink;
use crate::report::{Category, CycleRecord, Summary};

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub workload: WorkloadKind,
    pub cycles: u64,
    pub ack_timeout: Duration,
    pub response_timeout: Duration,
    /// Wait for the reset marker before the first cycle.
    pub wait_reset: Option<Duration>,
}

/// Runs `options.cycles` profiling cycles and writes one JSON line per
/// cycle to `out`.
pub fn run_session<P: Read + Write>(
    link: &mut TargetLink<P>,
    profile: &ProfileConfig,
    options: &SessionOptions,
    out: &mut dyn Write,
) -> Result<Summary> {
    if let Some(timeout) = options.wait_reset {
        if link.wait_reset(timeout)? {
            info!("target announced reset");
        } else {
            warn!("no reset marker within {:?}, starting anyway", timeout);
        }
    }

    let mut summary = Summary::default();
    for cycle in 0..options.cycles {
        let started = Instant::now();
        let response = link.run_cycle(options.ack_timeout, options.response_timeout)?;
        let elapsed_us = started.elapsed().as_micros() as u64;

        let record = CycleRecord::new(cycle, &response, profile, options.workload, elapsed_us);
        if record.category != Category::NoFault {
            debug!(cycle, category = ?record.category, "cycle diverged");
        }
        summary.record(record.category);

        serde_json::to_writer(&mut *out, &record).context("Failed to serialize cycle record")?;
        writeln!(out).context("Failed to write cycle record")?;
    }
    out.flush().context("Failed to flush results")?;
    Ok(summary)
}
