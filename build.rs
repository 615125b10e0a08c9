//! Build script that reports the native libraries the monitor links against.
//!
//! `OpenCV` is located through pkg-config; ONNX Runtime is fetched or located by the
//! `ort` crate itself, so only the override variable is surfaced here.

use std::env;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=PKG_CONFIG_PATH");
    println!("cargo:rerun-if-env-changed=OPENCV_LINK_PATHS");
    println!("cargo:rerun-if-env-changed=OPENCV_INCLUDE_PATHS");
    println!("cargo:rerun-if-env-changed=ORT_LIB_LOCATION");

    report_opencv();

    if let Ok(location) = env::var("ORT_LIB_LOCATION") {
        println!("cargo:warning=Using ONNX Runtime from {location}");
    }

    println!(
        "cargo:rustc-env=BUILD_TARGET={}",
        env::var("TARGET").unwrap_or_default()
    );
}

fn pkg_config_version(package: &str) -> Option<String> {
    let output = Command::new("pkg-config").args(["--modversion", package]).output().ok()?;
    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn report_opencv() {
    if let Some(version) = ["opencv4", "opencv"].into_iter().find_map(pkg_config_version) {
        println!("cargo:warning=Found OpenCV version: {version}");
        return;
    }

    println!("cargo:warning=OpenCV not found via pkg-config. Make sure OpenCV is installed.");
    println!("cargo:warning=On Ubuntu: sudo apt-get install libopencv-dev");
    println!("cargo:warning=On macOS: brew install opencv");
}
