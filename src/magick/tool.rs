//! The tool abstraction the processor programs against.
//!
//! [`MagickTool`] defines the three operations every tool family must
//! support: resize, identify-dimension, and identify-all-metadata.
//!
//! The two production implementations are
//! [`GraphicsMagickTool`](super::graphics::GraphicsMagickTool) and
//! [`ImageMagickTool`](super::imagemagick::ImageMagickTool). They build
//! the same operations out of different command lines and keep their
//! deliberate behavioral differences (ImageMagick's `-size` hint and
//! default profile stripping) to themselves rather than leaking them
//! into shared code.

use crate::command::ExecuteError;
use crate::dimension::Dimension;
use std::path::Path;

/// Trait for external image tool families.
///
/// Implementations are stateless per call: each operation composes a
/// fresh command, runs it, and parses the output. `Send + Sync` so one
/// tool instance can serve independent calling threads.
pub trait MagickTool: Send + Sync {
    /// Resize `source` into `target` to fit `dimension`.
    ///
    /// `extra_arguments` are passed through to the tool verbatim, between
    /// the resize directive and the target path, so callers can request
    /// e.g. color-profile handling themselves.
    fn resize(
        &self,
        source: &Path,
        target: &Path,
        dimension: Dimension,
        extra_arguments: &[&str],
    ) -> Result<(), ExecuteError>;

    /// The pixel dimensions of `source`, via `identify -format %wx%h`.
    fn identify_dimension(&self, source: &Path) -> Result<Dimension, ExecuteError>;

    /// All metadata of `source` as one opaque text blob, via
    /// `identify -verbose`. Used for archival storage only; nothing
    /// parses it.
    fn identify_all_metadata(&self, source: &Path) -> Result<String, ExecuteError>;
}

// Lets callers share one tool between a processor and themselves (tests
// inject an Arc'd recording mock this way).
impl<T: MagickTool + ?Sized> MagickTool for std::sync::Arc<T> {
    fn resize(
        &self,
        source: &Path,
        target: &Path,
        dimension: Dimension,
        extra_arguments: &[&str],
    ) -> Result<(), ExecuteError> {
        (**self).resize(source, target, dimension, extra_arguments)
    }

    fn identify_dimension(&self, source: &Path) -> Result<Dimension, ExecuteError> {
        (**self).identify_dimension(source)
    }

    fn identify_all_metadata(&self, source: &Path) -> Result<String, ExecuteError> {
        (**self).identify_all_metadata(source)
    }
}

/// Renders a path as a command line argument, absolutized so the tool's
/// working directory (the temp dir) cannot reinterpret it.
pub(crate) fn path_argument(path: &Path) -> Result<String, ExecuteError> {
    let absolute = std::path::absolute(path)?;
    Ok(absolute.to_string_lossy().into_owned())
}
