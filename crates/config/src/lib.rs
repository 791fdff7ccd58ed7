// LabWired FI Profiler - Fault-Injection Test Target
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};
use std::path::Path;
use std::str::FromStr;

/// Schema version written by and accepted from profile files.
pub const SCHEMA_VERSION: &str = "1.0";

/// Execution counts the unrolled workload can be generated for.
pub const SUPPORTED_EXECUTIONS: [u32; 4] = [10, 100, 1000, 10000];

/// Width of counter fault payloads (little-endian `u32`).
pub const COUNTER_PAYLOAD_LEN: usize = 4;

fn default_schema_version() -> String {
    SCHEMA_VERSION.to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkloadKind {
    #[serde(alias = "loop")]
    CountedLoop,
    #[serde(alias = "memcpy")]
    BufferCopy,
    Unrolled,
}

impl WorkloadKind {
    pub const ALL: [WorkloadKind; 3] = [Self::CountedLoop, Self::BufferCopy, Self::Unrolled];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CountedLoop => "counted-loop",
            Self::BufferCopy => "buffer-copy",
            Self::Unrolled => "unrolled",
        }
    }

    /// Name of the firmware binary that runs this workload.
    pub fn firmware_binary(&self) -> &'static str {
        match self {
            Self::CountedLoop => "profile-loop",
            Self::BufferCopy => "profile-memcpy",
            Self::Unrolled => "profile-unrolled",
        }
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkloadKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "counted-loop" | "loop" => Ok(Self::CountedLoop),
            "buffer-copy" | "memcpy" => Ok(Self::BufferCopy),
            "unrolled" => Ok(Self::Unrolled),
            other => anyhow::bail!(
                "Unknown workload '{}'. Expected one of: counted-loop, buffer-copy, unrolled",
                other
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferRole {
    Source,
    Destination,
}

impl fmt::Display for BufferRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source => f.write_str("source"),
            Self::Destination => f.write_str("destination"),
        }
    }
}

/// Profile violations. All of them must stop a firmware build.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Unsupported schema_version '{found}'. Supported versions: '1.0'")]
    UnsupportedSchema { found: String },
    #[error("counted_loop needs at least one iteration (outer={outer}, inner={inner})")]
    ZeroIterations { outer: u32, inner: u32 },
    #[error("counted_loop outer*inner ({outer}*{inner}) does not fit the 32-bit fault payload")]
    IterationOverflow { outer: u32, inner: u32 },
    #[error("buffer_copy size must be greater than zero")]
    ZeroBufferSize,
    #[error("buffer_copy {role} sequence has {len} bytes but the buffer holds {size}")]
    SequenceTooLong {
        role: BufferRole,
        len: usize,
        size: usize,
    },
    #[error("buffer_copy source and destination start out identical; a skipped copy would go unnoticed")]
    IndistinguishableBuffers,
    #[error("unrolled executions {executions} is not supported (expected one of 10, 100, 1000, 10000)")]
    UnsupportedExecutions { executions: u32 },
    #[error("serial baud rate must be greater than zero")]
    ZeroBaud,
}

/// How a copy buffer is initialised before each cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferInitConfig {
    /// Every byte set to the same value.
    Fill(u8),
    /// Leading bytes, zero-padded to the buffer size.
    Sequence(Vec<u8>),
}

impl BufferInitConfig {
    /// The buffer content this init produces for a buffer of `size` bytes.
    pub fn image(&self, size: usize) -> Vec<u8> {
        match self {
            Self::Fill(byte) => vec![*byte; size],
            Self::Sequence(seq) => {
                let mut image = vec![0; size];
                let n = seq.len().min(size);
                image[..n].copy_from_slice(&seq[..n]);
                image
            }
        }
    }

    fn render(&self) -> String {
        match self {
            Self::Fill(byte) => format!("fi_profiler_core::BufferInit::Fill({byte:#04x})"),
            Self::Sequence(seq) => {
                let bytes: Vec<String> = seq.iter().map(|b| format!("{b:#04x}")).collect();
                format!(
                    "fi_profiler_core::BufferInit::Sequence(&[{}])",
                    bytes.join(", ")
                )
            }
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct CountedLoopConfig {
    pub outer: u32,
    pub inner: u32,
}

impl Default for CountedLoopConfig {
    fn default() -> Self {
        Self {
            outer: 500,
            inner: 500,
        }
    }
}

impl CountedLoopConfig {
    /// Counter value of a fault-free run, `None` if it overflows.
    pub fn expected(&self) -> Option<u32> {
        self.outer.checked_mul(self.inner)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct BufferCopyConfig {
    pub size: usize,
    #[serde(with = "serde_yaml::with::singleton_map")]
    pub source: BufferInitConfig,
    #[serde(with = "serde_yaml::with::singleton_map")]
    pub destination: BufferInitConfig,
}

impl Default for BufferCopyConfig {
    fn default() -> Self {
        Self {
            size: 68,
            source: BufferInitConfig::Fill(0xAA),
            destination: BufferInitConfig::Fill(0xBB),
        }
    }
}

impl BufferCopyConfig {
    /// Source content, which is also the destination after a good copy.
    pub fn source_image(&self) -> Vec<u8> {
        self.source.image(self.size)
    }

    /// Destination content before the copy.
    pub fn destination_image(&self) -> Vec<u8> {
        self.destination.image(self.size)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct UnrolledConfig {
    pub executions: u32,
}

impl Default for UnrolledConfig {
    fn default() -> Self {
        Self { executions: 100 }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct SerialConfig {
    pub baud: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self { baud: 38400 }
    }
}

/// Build-time parameters of all three profiling workloads.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ProfileConfig {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    #[serde(default)]
    pub counted_loop: CountedLoopConfig,
    #[serde(default)]
    pub buffer_copy: BufferCopyConfig,
    #[serde(default)]
    pub unrolled: UnrolledConfig,
    #[serde(default)]
    pub serial: SerialConfig,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            counted_loop: CountedLoopConfig::default(),
            buffer_copy: BufferCopyConfig::default(),
            unrolled: UnrolledConfig::default(),
            serial: SerialConfig::default(),
        }
    }
}

impl ProfileConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read profile at {:?}", path))?;
        Self::from_yaml(&content).with_context(|| format!("Invalid profile {:?}", path))
    }

    /// Parses and validates a profile.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let profile: Self =
            serde_yaml::from_str(yaml).context("Failed to parse Profile YAML")?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(ConfigError::UnsupportedSchema {
                found: self.schema_version.clone(),
            });
        }

        let CountedLoopConfig { outer, inner } = self.counted_loop;
        if outer == 0 || inner == 0 {
            return Err(ConfigError::ZeroIterations { outer, inner });
        }
        if self.counted_loop.expected().is_none() {
            return Err(ConfigError::IterationOverflow { outer, inner });
        }

        let copy = &self.buffer_copy;
        if copy.size == 0 {
            return Err(ConfigError::ZeroBufferSize);
        }
        for (role, init) in [
            (BufferRole::Source, &copy.source),
            (BufferRole::Destination, &copy.destination),
        ] {
            if let BufferInitConfig::Sequence(seq) = init {
                if seq.len() > copy.size {
                    return Err(ConfigError::SequenceTooLong {
                        role,
                        len: seq.len(),
                        size: copy.size,
                    });
                }
            }
        }
        if copy.source_image() == copy.destination_image() {
            return Err(ConfigError::IndistinguishableBuffers);
        }

        if !SUPPORTED_EXECUTIONS.contains(&self.unrolled.executions) {
            return Err(ConfigError::UnsupportedExecutions {
                executions: self.unrolled.executions,
            });
        }

        if self.serial.baud == 0 {
            return Err(ConfigError::ZeroBaud);
        }

        Ok(())
    }

    /// Expected counter for the counter workloads, `None` for Buffer-Copy.
    pub fn expected_counter(&self, kind: WorkloadKind) -> Option<u32> {
        match kind {
            WorkloadKind::CountedLoop => self.counted_loop.expected(),
            WorkloadKind::BufferCopy => None,
            WorkloadKind::Unrolled => Some(self.unrolled.executions),
        }
    }

    /// Size of the `'f'` payload the given workload sends.
    pub fn fault_payload_len(&self, kind: WorkloadKind) -> usize {
        match kind {
            WorkloadKind::CountedLoop | WorkloadKind::Unrolled => COUNTER_PAYLOAD_LEN,
            WorkloadKind::BufferCopy => self.buffer_copy.size,
        }
    }

    /// Renders the profile as Rust constants for inclusion into firmware.
    pub fn render_constants(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = writeln!(out, "// Generated from the profiling profile. Do not edit.");
        let _ = writeln!(out, "pub const LOOP_OUTER: u32 = {};", self.counted_loop.outer);
        let _ = writeln!(out, "pub const LOOP_INNER: u32 = {};", self.counted_loop.inner);
        let _ = writeln!(out, "pub const BUFFER_SIZE: usize = {};", self.buffer_copy.size);
        let _ = writeln!(
            out,
            "pub const BUFFER_SOURCE: fi_profiler_core::BufferInit<'static> = {};",
            self.buffer_copy.source.render()
        );
        let _ = writeln!(
            out,
            "pub const BUFFER_DESTINATION: fi_profiler_core::BufferInit<'static> = {};",
            self.buffer_copy.destination.render()
        );
        let _ = writeln!(
            out,
            "pub const UNROLLED_EXECUTIONS: u32 = {};",
            self.unrolled.executions
        );
        let _ = writeln!(out, "pub const BAUD: u32 = {};", self.serial.baud);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_firmware() {
        let profile = ProfileConfig::default();
        assert!(profile.validate().is_ok());
        assert_eq!(profile.expected_counter(WorkloadKind::CountedLoop), Some(250_000));
        assert_eq!(profile.expected_counter(WorkloadKind::Unrolled), Some(100));
        assert_eq!(profile.expected_counter(WorkloadKind::BufferCopy), None);
        assert_eq!(profile.fault_payload_len(WorkloadKind::BufferCopy), 68);
        assert_eq!(profile.fault_payload_len(WorkloadKind::CountedLoop), 4);
        assert_eq!(profile.serial.baud, 38400);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = r#"
counted_loop:
  outer: 1000
unrolled:
  executions: 10000
"#;
        let profile = ProfileConfig::from_yaml(yaml).unwrap();
        assert_eq!(profile.schema_version, "1.0");
        assert_eq!(profile.counted_loop.outer, 1000);
        assert_eq!(profile.counted_loop.inner, 500);
        assert_eq!(profile.unrolled.executions, 10000);
        assert_eq!(profile.buffer_copy, BufferCopyConfig::default());
    }

    #[test]
    fn test_sequence_image_is_zero_padded() {
        let init = BufferInitConfig::Sequence(vec![1, 2, 3]);
        assert_eq!(init.image(5), vec![1, 2, 3, 0, 0]);
        assert_eq!(BufferInitConfig::Fill(0xAA).image(3), vec![0xAA; 3]);
    }

    #[test]
    fn test_workload_kind_names() {
        assert_eq!("loop".parse::<WorkloadKind>().unwrap(), WorkloadKind::CountedLoop);
        assert_eq!("memcpy".parse::<WorkloadKind>().unwrap(), WorkloadKind::BufferCopy);
        assert_eq!("Unrolled".parse::<WorkloadKind>().unwrap(), WorkloadKind::Unrolled);
        assert!("aes".parse::<WorkloadKind>().is_err());
        for kind in WorkloadKind::ALL {
            assert_eq!(kind.to_string().parse::<WorkloadKind>().unwrap(), kind);
        }
        assert_eq!(WorkloadKind::BufferCopy.firmware_binary(), "profile-memcpy");
    }

    #[test]
    fn test_buffer_init_serializes_as_map() {
        let yaml = serde_yaml::to_string(&ProfileConfig::default()).unwrap();
        assert!(yaml.contains("fill: 170"), "yaml: {}", yaml);
        assert!(!yaml.contains('!'));
        assert_eq!(ProfileConfig::from_yaml(&yaml).unwrap(), ProfileConfig::default());
    }

    #[test]
    fn test_render_constants() {
        let mut profile = ProfileConfig::default();
        profile.buffer_copy.destination = BufferInitConfig::Sequence(vec![0x01, 0xFF]);
        let rendered = profile.render_constants();
        assert!(rendered.contains("pub const LOOP_OUTER: u32 = 500;"));
        assert!(rendered.contains("pub const BUFFER_SIZE: usize = 68;"));
        assert!(rendered.contains("BufferInit::Fill(0xaa)"));
        assert!(rendered.contains("BufferInit::Sequence(&[0x01, 0xff])"));
        assert!(rendered.contains("pub const UNROLLED_EXECUTIONS: u32 = 100;"));
        assert!(rendered.contains("pub const BAUD: u32 = 38400;"));
    }
}
