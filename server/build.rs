use std::{env, process::Command};

fn main() {
    println!("cargo:rerun-if-env-changed=RUSTC_VERSION");

    let rustc_version = env::var("RUSTC_VERSION").unwrap_or_else(|_| {
        let rustc = env::var("RUSTC").unwrap_or_else(|_| "rustc".to_string());
        Command::new(rustc)
            .arg("--version")
            .output()
            .ok()
            .and_then(|output| String::from_utf8(output.stdout).ok())
            .map_or_else(|| "unknown".to_string(), |version| version.trim().to_string())
    });

    println!("cargo:rustc-env=RUSTC_VERSION={rustc_version}");
}
