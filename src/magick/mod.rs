//! External tool strategies.
//!
//! | Operation | Command line (GraphicsMagick / ImageMagick) |
//! |---|---|
//! | **Resize** | `gm convert src -resize WxH dst` / `convert -size WxH src -resize WxH +profile "*" dst` |
//! | **Identify dimension** | `gm identify -format %wx%h src` / `identify -format %wx%h src` |
//! | **Identify metadata** | `gm identify -verbose src` / `identify -verbose src` |
//!
//! The module is split into:
//! - **Tool**: the [`MagickTool`] trait the processor programs against
//! - **Graphics**: the GraphicsMagick strategy (`gm` multi-tool binary)
//! - **Imagemagick**: the ImageMagick strategy (one binary per sub-command)

mod graphics;
mod imagemagick;
pub mod tool;

pub use graphics::GraphicsMagickTool;
pub use imagemagick::ImageMagickTool;
pub use tool::MagickTool;

use crate::config::{ToolFamily, ToolSettings};

/// Builds the strategy selected by `settings.tool`.
pub fn tool_for(settings: ToolSettings) -> Box<dyn MagickTool> {
    match settings.tool {
        ToolFamily::GraphicsMagick => Box::new(GraphicsMagickTool::new(settings)),
        ToolFamily::ImageMagick => Box::new(ImageMagickTool::new(settings)),
    }
}
