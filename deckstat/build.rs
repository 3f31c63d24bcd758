//! Build script for deckstat
//!
//! The binary opens every run with
//! `Starting deckstat v<version> [<GIT_HASH>] built <BUILD_TIMESTAMP> (<BUILD_PROFILE>)`,
//! so report and aggregate files can be traced back to the build that
//! produced them. The script reruns on every build to keep those current.

use std::process::Command;

fn main() {
    println!("cargo:rustc-env=GIT_HASH={}", git_revision());
    println!("cargo:rustc-env=BUILD_TIMESTAMP={}", build_timestamp());
    println!("cargo:rustc-env=BUILD_PROFILE={}", build_profile());
}

/// Short commit hash, suffixed with `-dirty` when the tree has local edits
fn git_revision() -> String {
    let Some(hash) = git(&["rev-parse", "--short=8", "HEAD"]) else {
        return "unknown".to_string();
    };
    match git(&["status", "--porcelain", "--untracked-files=no"]) {
        Some(changes) if !changes.is_empty() => format!("{}-dirty", hash),
        _ => hash,
    }
}

/// Trimmed stdout of a successful git invocation
fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout)
        .ok()
        .map(|s| s.trim().to_string())
}

/// UTC, to match the timestamps on pipeline events
fn build_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

fn build_profile() -> String {
    std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string())
}
