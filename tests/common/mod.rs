//! Shared helpers for the integration suite.
//!
//! These tests exercise the real external tools, so every test first
//! checks availability and skips (with a note) when neither
//! GraphicsMagick nor ImageMagick is on `PATH`.

#![allow(dead_code)] // each test crate uses its own subset

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

pub fn gm_available() -> bool {
    tool_available("gm", &["-version"])
}

pub fn imagemagick_available() -> bool {
    tool_available("identify", &["-version"])
}

fn tool_available(program: &str, args: &[&str]) -> bool {
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

pub fn skip(test: &str) {
    eprintln!("skipping {test}: no usable Magick tool on PATH");
}

/// Writes a gradient JPEG of exactly `width` x `height` into `dir`.
///
/// A gradient (rather than a flat color) keeps the encoder honest: the
/// file has real entropy, so a resized copy is measurably smaller.
pub fn jpeg_fixture(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    img.save_with_format(&path, image::ImageFormat::Jpeg).unwrap();
    path
}
