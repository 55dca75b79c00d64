//! Upload processing facade.
//!
//! Orchestrates one "store this upload" operation end to end: persist the
//! incoming stream to a temp file, extract archival metadata once, then
//! for each named variant resize into a second temp file, identify the
//! result, and stream the bytes into the caller's sink.
//!
//! The external tools need filesystem paths, not streams, which is why
//! the upload is materialized at all. Every temp file is uniquely named
//! (`_magickproc*` prefix, original extension kept) and owned by the
//! invocation that created it; RAII deletes it on every exit path.
//!
//! ## Failure semantics
//!
//! Only failures around the *original* upload are fatal: persisting the
//! input stream, identifying the original, or streaming it into the sink.
//! Everything on the scaled path (resize, identify of the resized file)
//! degrades to a warning and a transparent fallback to the unscaled
//! original. Metadata extraction is best-effort and never propagates.
//! Nothing is retried; a failed tool invocation is reported once.
//!
//! One operation runs synchronously on the calling thread; variants are
//! processed one at a time. Independent uploads on independent threads
//! never share a temp path.

use crate::command::ExecuteError;
use crate::config::{ProcessorConfig, Variant};
use crate::dimension::Dimension;
use crate::magick::{MagickTool, tool_for};
use log::{debug, warn};
use std::ffi::OsStr;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use tempfile::{Builder, NamedTempFile};
use thiserror::Error;

/// Recognizable temp file prefix, for operator debugging of a crashed run.
const TEMP_FILE_PREFIX: &str = "_magickproc";

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Execute(#[from] ExecuteError),
}

/// A materialized upload, handed from [`GalleryProcessor::begin_upload`]
/// to [`GalleryProcessor::store_variant`].
///
/// Owns the source temp file; dropping the `Upload` deletes it. Not meant
/// to outlive the logical store operation.
pub struct Upload {
    source: NamedTempFile,
    file_name: String,
    metadata: Option<String>,
}

impl Upload {
    /// Path of the persisted original image.
    pub fn source_path(&self) -> &Path {
        self.source.path()
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Verbose tool metadata of the original, if extraction succeeded.
    /// Opaque text for archival/audit storage; nothing parses it.
    pub fn metadata(&self) -> Option<&str> {
        self.metadata.as_deref()
    }
}

/// Dimensions of a stored image, committed only after its bytes have been
/// fully streamed into the caller's sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredImage {
    pub width: u32,
    pub height: u32,
}

/// Facade over one tool strategy and the configured variant table.
pub struct GalleryProcessor {
    tool: Box<dyn MagickTool>,
    variants: Vec<Variant>,
}

impl GalleryProcessor {
    pub fn new(config: ProcessorConfig) -> Self {
        Self::with_tool(tool_for(config.settings), config.variants)
    }

    /// Assembles a processor from parts; the seam tests use to inject a
    /// recording tool.
    pub fn with_tool(tool: Box<dyn MagickTool>, variants: Vec<Variant>) -> Self {
        Self { tool, variants }
    }

    /// Configured variants, in declaration (processing) order.
    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    /// The desired dimension configured for a named variant.
    pub fn variant_dimension(&self, name: &str) -> Option<Dimension> {
        self.variants
            .iter()
            .find(|v| v.name == name)
            .map(Variant::dimension)
    }

    /// Persists the upload stream to a temp file and best-effort extracts
    /// its verbose metadata once.
    ///
    /// Failure to persist the original is fatal; metadata extraction
    /// failure is logged and swallowed.
    pub fn begin_upload(
        &self,
        data: &mut dyn Read,
        file_name: &str,
    ) -> Result<Upload, ProcessorError> {
        let source = temp_file(TEMP_FILE_PREFIX, file_name)?;

        let mut out = BufWriter::new(source.as_file());
        io::copy(data, &mut out)?;
        out.flush()?;
        drop(out);

        let metadata = match self.tool.identify_all_metadata(source.path()) {
            Ok(text) => Some(text),
            Err(e) => {
                warn!("metadata extraction failed for '{file_name}': {e}");
                None
            }
        };

        Ok(Upload {
            source,
            file_name: file_name.to_string(),
            metadata,
        })
    }

    /// Produces one named variant of the upload into `sink`.
    ///
    /// With a bounded configured dimension, resizes into a temp target,
    /// identifies it, and streams it. Any failure on that path falls back
    /// to the original, unscaled image. Without a bounded dimension (or
    /// for an unknown variant name) the original is streamed directly.
    pub fn store_variant(
        &self,
        upload: &Upload,
        variant_name: &str,
        sink: &mut dyn Write,
    ) -> Result<StoredImage, ProcessorError> {
        let configured = self
            .variant_dimension(variant_name)
            .filter(|d| d.is_bounded());

        let scaled = match configured {
            Some(dimension) => {
                debug!(
                    "resizing '{}' for variant '{variant_name}' to {dimension}",
                    upload.file_name
                );
                match self.scaled_copy(upload, variant_name, dimension) {
                    Ok(scaled) => Some(scaled),
                    Err(e) => {
                        warn!("scaling failed for variant '{variant_name}', using original image instead: {e}");
                        None
                    }
                }
            }
            None => {
                debug!(
                    "no bounded dimension configured for variant '{variant_name}', using original image"
                );
                None
            }
        };

        // The target temp file (when any) lives exactly until the end of
        // this call; streaming completes before it is dropped and deleted.
        match scaled {
            Some((target, dimension)) => {
                stream(target.path(), sink)?;
                Ok(StoredImage {
                    width: dimension.width,
                    height: dimension.height,
                })
            }
            None => {
                let dimension = self.tool.identify_dimension(upload.source_path())?;
                stream(upload.source_path(), sink)?;
                Ok(StoredImage {
                    width: dimension.width,
                    height: dimension.height,
                })
            }
        }
    }

    /// The scaled path: resize into a fresh temp target and identify it.
    ///
    /// Returns the target file together with its actual dimensions so the
    /// caller commits only a fully verified result. An error here never
    /// leaks the target: the `NamedTempFile` is dropped, and deleted,
    /// with it.
    fn scaled_copy(
        &self,
        upload: &Upload,
        variant_name: &str,
        dimension: Dimension,
    ) -> Result<(NamedTempFile, Dimension), ProcessorError> {
        let prefix = format!("{TEMP_FILE_PREFIX}_{}", variant_name.replace(':', "_"));
        let target = temp_file(&prefix, &upload.file_name)?;

        self.tool
            .resize(upload.source_path(), target.path(), dimension, &[])?;
        let actual = self.tool.identify_dimension(target.path())?;

        Ok((target, actual))
    }
}

/// Creates a uniquely named temp file carrying the upload's extension, so
/// the external tool can sniff the format from the name.
fn temp_file(prefix: &str, original_name: &str) -> io::Result<NamedTempFile> {
    let mut builder = Builder::new();
    builder.prefix(prefix);

    let suffix = Path::new(original_name)
        .extension()
        .and_then(OsStr::to_str)
        .map(|ext| format!(".{ext}"));
    if let Some(suffix) = &suffix {
        builder.suffix(suffix);
    }

    builder.tempfile()
}

/// Streams a file's bytes into the sink, buffered. Returns only after the
/// full copy succeeded.
fn stream(path: &Path, sink: &mut dyn Write) -> io::Result<u64> {
    let mut reader = BufReader::new(File::open(path)?);
    io::copy(&mut reader, sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::magick::tool::tests::{MockTool, RecordedOp};
    use std::sync::Arc;

    fn variants() -> Vec<Variant> {
        vec![
            Variant {
                name: "thumbnail".into(),
                width: 100,
                height: 100,
            },
            Variant {
                name: "original".into(),
                width: 0,
                height: 0,
            },
        ]
    }

    /// Processor around a shared mock; the second handle lets tests
    /// inspect the recorded operations afterwards.
    fn processor(tool: MockTool) -> (GalleryProcessor, Arc<MockTool>) {
        let tool = Arc::new(tool);
        let p = GalleryProcessor::with_tool(Box::new(Arc::clone(&tool)), variants());
        (p, tool)
    }

    fn upload(processor: &GalleryProcessor) -> Upload {
        let mut data: &[u8] = b"original-bytes";
        processor.begin_upload(&mut data, "hippo.jpg").unwrap()
    }

    #[test]
    fn begin_upload_persists_stream_and_extracts_metadata() {
        let (p, _tool) = processor(MockTool::new());
        let u = upload(&p);

        assert_eq!(std::fs::read(u.source_path()).unwrap(), b"original-bytes");
        assert_eq!(u.metadata(), Some("Format: JPEG"));
        assert_eq!(u.file_name(), "hippo.jpg");

        let name = u.source_path().file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("_magickproc"));
        assert!(name.ends_with(".jpg"));
    }

    #[test]
    fn metadata_failure_is_swallowed() {
        let (p, _tool) = processor(MockTool {
            fail_metadata: true,
            ..MockTool::new()
        });
        let u = upload(&p);
        assert_eq!(u.metadata(), None);
    }

    #[test]
    fn bounded_variant_streams_the_scaled_copy() {
        let (p, _tool) = processor(MockTool::with_dimensions(vec![Dimension::new(100, 67)]));
        let u = upload(&p);

        let mut sink = Vec::new();
        let stored = p.store_variant(&u, "thumbnail", &mut sink).unwrap();

        assert_eq!(sink, b"scaled-bytes");
        assert_eq!(
            stored,
            StoredImage {
                width: 100,
                height: 67
            }
        );
    }

    #[test]
    fn scaled_target_is_deleted_after_store() {
        let (p, tool) = processor(MockTool::new());
        let u = upload(&p);

        let mut sink = Vec::new();
        p.store_variant(&u, "thumbnail", &mut sink).unwrap();

        let target = tool
            .operations()
            .into_iter()
            .find_map(|op| match op {
                RecordedOp::Resize { target, .. } => Some(target),
                _ => None,
            })
            .unwrap();
        assert!(!target.exists());
    }

    #[test]
    fn resize_failure_falls_back_to_original() {
        let (p, tool) = processor(MockTool {
            fail_resize: true,
            dimensions: std::sync::Mutex::new(vec![Dimension::new(400, 300)]),
            ..MockTool::new()
        });
        let u = upload(&p);

        let mut sink = Vec::new();
        let stored = p.store_variant(&u, "thumbnail", &mut sink).unwrap();

        // The original bytes, with the original's identified dimension.
        assert_eq!(sink, b"original-bytes");
        assert_eq!(
            stored,
            StoredImage {
                width: 400,
                height: 300
            }
        );

        // The failed resize left no target behind.
        let target = tool
            .operations()
            .into_iter()
            .find_map(|op| match op {
                RecordedOp::Resize { target, .. } => Some(target),
                _ => None,
            })
            .unwrap();
        assert!(!target.exists());
    }

    #[test]
    fn unbounded_variant_skips_scaling_entirely() {
        let (p, tool) = processor(MockTool::new());
        let u = upload(&p);

        let mut sink = Vec::new();
        p.store_variant(&u, "original", &mut sink).unwrap();
        assert_eq!(sink, b"original-bytes");

        let resized = tool
            .operations()
            .iter()
            .any(|op| matches!(op, RecordedOp::Resize { .. }));
        assert!(!resized);
    }

    #[test]
    fn unknown_variant_uses_the_original() {
        let (p, _tool) = processor(MockTool::new());
        let u = upload(&p);

        let mut sink = Vec::new();
        let stored = p.store_variant(&u, "banner", &mut sink).unwrap();

        assert_eq!(sink, b"original-bytes");
        assert_eq!(
            stored,
            StoredImage {
                width: 79,
                height: 53
            }
        );
    }

    #[test]
    fn upload_temp_file_is_deleted_on_drop() {
        let (p, _tool) = processor(MockTool::new());
        let u = upload(&p);
        let path = u.source_path().to_path_buf();

        assert!(path.exists());
        drop(u);
        assert!(!path.exists());
    }

    #[test]
    fn variant_dimension_lookup() {
        let (p, _tool) = processor(MockTool::new());
        assert_eq!(
            p.variant_dimension("thumbnail"),
            Some(Dimension::new(100, 100))
        );
        assert_eq!(p.variant_dimension("original"), Some(Dimension::new(0, 0)));
        assert_eq!(p.variant_dimension("banner"), None);
    }
}
