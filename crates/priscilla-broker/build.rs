use std::env;
use std::process::Command;

/// Build identifier shown by `priscilla --version`.
///
/// Release pipelines set `PRISCILLA_BUILD` explicitly; local builds describe
/// the checkout, and anything outside a git tree is a development build.
fn build_id() -> String {
    if let Ok(id) = env::var("PRISCILLA_BUILD") {
        if !id.trim().is_empty() {
            return id.trim().to_string();
        }
    }

    Command::new("git")
        .args(["describe", "--always", "--dirty", "--abbrev=8"])
        .output()
        .ok()
        .filter(|out| out.status.success())
        .and_then(|out| String::from_utf8(out.stdout).ok())
        .map(|desc| desc.trim().to_string())
        .filter(|desc| !desc.is_empty())
        .unwrap_or_else(|| "development".to_string())
}

fn main() {
    println!("cargo:rustc-env=PRISCILLA_BUILD={}", build_id());
    println!("cargo:rerun-if-env-changed=PRISCILLA_BUILD");
    println!("cargo:rerun-if-changed=../../.git/HEAD");
    println!("cargo:rerun-if-changed=../../.git/index");
}
