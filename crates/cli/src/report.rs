// LabWired FI Profiler - Fault-Injection Test Target
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use fi_profiler_config::{ProfileConfig, WorkloadKind};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::link::CycleResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    NoFault,
    Fault,
    Reset,
    Crash,
}

/// Meaning of a fault payload for a given workload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Interpretation {
    Counter {
        observed: u32,
        expected: u32,
    },
    Buffer {
        /// Indices where the destination differs from the source image.
        differing: Vec<usize>,
        /// The destination still holds its initial image: the copy never ran.
        untouched: bool,
    },
    /// Payload size does not match the workload.
    Malformed {
        len: usize,
        expected_len: usize,
    },
}

pub fn interpret(profile: &ProfileConfig, kind: WorkloadKind, payload: &[u8]) -> Interpretation {
    let expected_len = profile.fault_payload_len(kind);
    if payload.len() != expected_len {
        return Interpretation::Malformed {
            len: payload.len(),
            expected_len,
        };
    }
    match (
        fi_profiler_core::decode_counter(payload),
        profile.expected_counter(kind),
    ) {
        (Some(observed), Some(expected)) => Interpretation::Counter { observed, expected },
        _ => {
            let source = profile.buffer_copy.source_image();
            let differing = payload
                .iter()
                .zip(&source)
                .enumerate()
                .filter(|(_, (got, want))| got != want)
                .map(|(i, _)| i)
                .collect();
            Interpretation::Buffer {
                differing,
                untouched: payload == profile.buffer_copy.destination_image().as_slice(),
            }
        }
    }
}

/// One line of `run` output.
#[derive(Debug, Clone, Serialize)]
pub struct CycleRecord {
    pub cycle: u64,
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interpretation: Option<Interpretation>,
    pub elapsed_us: u64,
}

impl CycleRecord {
    pub fn new(
        cycle: u64,
        response: &CycleResponse,
        profile: &ProfileConfig,
        kind: WorkloadKind,
        elapsed_us: u64,
    ) -> Self {
        let mut record = Self {
            cycle,
            category: Category::NoFault,
            detail: None,
            payload: None,
            interpretation: None,
            elapsed_us,
        };
        match response {
            CycleResponse::Expected => {}
            CycleResponse::Fault(payload) => {
                record.category = Category::Fault;
                record.payload = Some(to_hex(payload));
                record.interpretation = Some(interpret(profile, kind, payload));
            }
            CycleResponse::Reset => record.category = Category::Reset,
            CycleResponse::Crash(why) => {
                record.category = Category::Crash;
                record.detail = Some(why.to_string());
            }
        }
        record
    }
}

/// Per-category totals of a run.
#[derive(Debug, Default, Serialize)]
pub struct Summary {
    pub cycles: u64,
    pub categories: BTreeMap<Category, u64>,
}

impl Summary {
    pub fn record(&mut self, category: Category) {
        self.cycles += 1;
        *self.categories.entry(category).or_default() += 1;
    }

    pub fn count(&self, category: Category) -> u64 {
        self.categories.get(&category).copied().unwrap_or(0)
    }
}

pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Parses hex text, ignoring whitespace, `:`/`,` separators and `0x`
/// prefixes.
pub fn parse_hex(text: &str) -> anyhow::Result<Vec<u8>> {
    let digits: String = text
        .split(|c: char| c.is_whitespace() || c == ':' || c == ',')
        .map(|tok| {
            tok.strip_prefix("0x")
                .or_else(|| tok.strip_prefix("0X"))
                .unwrap_or(tok)
        })
        .collect();
    if let Some(c) = digits.chars().find(|c| !c.is_ascii_hexdigit()) {
        anyhow::bail!("Invalid hex digit '{}'", c);
    }
    if digits.len() % 2 != 0 {
        anyhow::bail!("Hex input has an odd number of digits ({})", digits.len());
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|e| anyhow::anyhow!("Invalid hex byte '{}': {}", &digits[i..i + 2], e))
        })
        .collect()
}
