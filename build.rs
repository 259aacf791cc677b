use std::env;
use std::path::PathBuf;

// Build hints for locating FFmpeg on Windows. Nothing here affects the
// build itself; ffmpeg-sys-next does the actual discovery.
fn main() {
    println!("cargo:rerun-if-env-changed=FFMPEG_DIR");
    println!("cargo:rerun-if-env-changed=VCPKG_ROOT");
    println!("cargo:rerun-if-env-changed=VCPKGRS_TRIPLET");

    // Without the `ffmpeg` feature there is nothing to link.
    if env::var_os("CARGO_FEATURE_FFMPEG").is_none() {
        return;
    }
    if env::var("CARGO_CFG_TARGET_OS").unwrap_or_default() != "windows" {
        return;
    }
    if env::var_os("FFMPEG_DIR").is_some() {
        return;
    }

    let Ok(vcpkg_root) = env::var("VCPKG_ROOT") else {
        println!(
            "cargo:warning=framesift: FFMPEG_DIR is not set. Install FFmpeg (e.g. via vcpkg) and point FFMPEG_DIR at it, or build with --no-default-features."
        );
        return;
    };

    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| "x64-windows".to_string());
    let candidate = PathBuf::from(&vcpkg_root).join("installed").join(&triplet);
    if candidate.exists() {
        println!(
            "cargo:warning=framesift: found vcpkg FFmpeg at {0}; set FFMPEG_DIR={0} to use it explicitly.",
            candidate.display(),
        );
    } else {
        println!(
            "cargo:warning=framesift: VCPKG_ROOT is set but {} does not exist.",
            candidate.display(),
        );
    }
}
