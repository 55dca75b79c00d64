//! # Magick Variants
//!
//! Resize uploaded images into named variants, identify their pixel
//! dimensions, and extract archival metadata by shelling out to
//! [GraphicsMagick](http://www.graphicsmagick.org/) or
//! [ImageMagick](https://imagemagick.org/), with watchdog timeouts,
//! captured diagnostics, and guaranteed temp-file cleanup.
//!
//! # Architecture
//!
//! Four layers, each knowing only the one below it:
//!
//! ```text
//! GalleryProcessor   upload → variants → dimensions → caller's sink
//!       │
//! MagickTool         resize / identify-dimension / identify-metadata
//!       │            (GraphicsMagickTool or ImageMagickTool)
//! MagickCommand      argv + working dir + watchdog + stderr capture
//!       │
//! external process   gm convert ... / identify ...
//! ```
//!
//! Results and errors flow back up the same chain. One operation runs
//! synchronously on the calling thread; concurrency across *independent*
//! uploads is the caller's business.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`dimension`] | `Dimension` value type with the tools' `0 = unbounded` geometry semantics |
//! | [`command`] | One-shot external invocation: argv building, watchdog timeout, diagnostics |
//! | [`magick`] | The [`MagickTool`] trait and the two tool-family strategies |
//! | [`config`] | Explicit TOML configuration: tool family, timeout, executables, variants |
//! | [`processor`] | The facade: persist upload, scale per variant, fall back gracefully |
//!
//! # Design Decisions
//!
//! ## Subprocesses, Not Codecs
//!
//! The crate never decodes a pixel. Resizing and identification are
//! delegated to the battle-tested external tools, which handle every
//! format their build supports without this crate growing codec
//! dependencies. The cost is process-launch overhead and a filesystem
//! round trip; both are negligible next to actual image work.
//!
//! ## Failure Means the Original Image
//!
//! A failed resize or a failed identify of the resized file downgrades to
//! a warning and the unscaled original. Uploads must never be lost to a
//! misconfigured tool path or a corrupt-but-displayable image; only
//! failure to persist or read the original itself is fatal.
//!
//! ## Everything Explicit
//!
//! Tool paths, timeouts, and variant tables arrive as one
//! [`config::ProcessorConfig`] value. No system properties, no
//! environment lookups, no thread-locals: the upload travels as an
//! explicit [`processor::Upload`] context between the two facade calls,
//! which also makes every piece testable with fake paths and a mock tool.
//!
//! # Example
//!
//! ```no_run
//! use magick_variants::config::ProcessorConfig;
//! use magick_variants::processor::GalleryProcessor;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ProcessorConfig::from_toml_str(
//!     r#"
//!     [[variants]]
//!     name = "thumbnail"
//!     width = 100
//!     height = 100
//!     "#,
//! )?;
//! let processor = GalleryProcessor::new(config);
//!
//! let mut data = std::fs::File::open("hippo.jpg")?;
//! let upload = processor.begin_upload(&mut data, "hippo.jpg")?;
//!
//! let mut stored_bytes = Vec::new();
//! let stored = processor.store_variant(&upload, "thumbnail", &mut stored_bytes)?;
//! println!("stored {}x{}", stored.width, stored.height);
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod config;
pub mod dimension;
pub mod magick;
pub mod processor;

pub use command::{ExecuteError, MagickCommand};
pub use config::{ProcessorConfig, ToolFamily, ToolSettings, Variant};
pub use dimension::{Dimension, DimensionError};
pub use magick::{GraphicsMagickTool, ImageMagickTool, MagickTool};
pub use processor::{GalleryProcessor, StoredImage, Upload};
