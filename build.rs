//! Stamps `--version` output with the commit and build time.
//!
//! - `BUILD_GIT_HASH`: short commit hash, `-dirty` when the tree has changes
//! - `BUILD_DATETIME`: UTC build time; honours `SOURCE_DATE_EPOCH` so
//!   packaged builds are reproducible
//!
//! Both can be preset in the environment (release pipelines do this).

use std::path::Path;
use std::process::Command;

fn main() {
    let git_hash = std::env::var("BUILD_GIT_HASH")
        .ok()
        .or_else(git_hash)
        .unwrap_or_else(|| "unknown".to_string());
    let datetime = std::env::var("BUILD_DATETIME").unwrap_or_else(|_| build_datetime());

    println!("cargo:rustc-env=BUILD_GIT_HASH={git_hash}");
    println!("cargo:rustc-env=BUILD_DATETIME={datetime}");

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=BUILD_GIT_HASH");
    println!("cargo:rerun-if-env-changed=BUILD_DATETIME");
    println!("cargo:rerun-if-env-changed=SOURCE_DATE_EPOCH");
    // New commits and staged changes move the hash
    for git_file in [".git/HEAD", ".git/index"] {
        if Path::new(git_file).exists() {
            println!("cargo:rerun-if-changed={git_file}");
        }
    }
}

fn build_datetime() -> String {
    let now = std::env::var("SOURCE_DATE_EPOCH")
        .ok()
        .and_then(|epoch| epoch.parse::<i64>().ok())
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
        .unwrap_or_else(chrono::Utc::now);
    now.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn git_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let hash = String::from_utf8(output.stdout).ok()?;

    let dirty = Command::new("git")
        .args(["diff", "--quiet", "HEAD"])
        .status()
        .is_ok_and(|status| !status.success());

    Some(format!("{}{}", hash.trim(), if dirty { "-dirty" } else { "" }))
}
