// LabWired FI Profiler - Fault-Injection Test Target
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use fi_profiler_config::ProfileConfig;
use std::env;
use std::fs;
use std::path::PathBuf;

fn main() -> Result<()> {
    let out_dir = PathBuf::from(env::var("OUT_DIR").context("OUT_DIR is not set")?);
    fs::copy("memory.x", out_dir.join("memory.x")).context("Failed to copy memory.x")?;
    println!("cargo:rustc-link-search={}", out_dir.display());
    println!("cargo:rustc-link-arg=-Tlink.x");
    println!("cargo:rerun-if-changed=memory.x");

    // An invalid profile stops the build here, before any firmware exists.
    println!("cargo:rerun-if-env-changed=FI_PROFILE");
    let profile_path = env::var_os("FI_PROFILE")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("profile.yaml"));
    println!("cargo:rerun-if-changed={}", profile_path.display());

    let profile = ProfileConfig::from_file(&profile_path)?;
    fs::write(out_dir.join("profile.rs"), profile.render_constants())
        .context("Failed to write generated profile constants")?;
    Ok(())
}
