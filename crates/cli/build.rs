//! Build script for the agrisight CLI
//!
//! Generates build-time metadata for `--version` output

use std::env;

fn main() {
    println!("cargo:rerun-if-env-changed=GIT_COMMIT_HASH");
    println!(
        "cargo:rustc-env=BUILT_GIT_COMMIT_HASH={}",
        env::var("GIT_COMMIT_HASH").unwrap_or_else(|_| "unknown".to_string())
    );
    println!(
        "cargo:rustc-env=BUILT_TIME_UTC={}",
        chrono::Utc::now().to_rfc3339()
    );
}
