//! Image dimension value type.
//!
//! A [`Dimension`] is a width/height pair with the bounding-box semantics
//! that GraphicsMagick and ImageMagick geometry arguments use:
//!
//! - both sides `> 0`: a bounding box, aspect-preserving fit
//! - one side `0`: that axis is unbounded, fit to the other axis
//! - both sides `0`: no resize at all, the image is merely copied
//!
//! [`Dimension::to_command_argument`] renders the geometry string passed to
//! the tool (`"120x120"`, `"120"`, `"x120"`, or `"100%"` for the copy-only
//! case). `Display` always renders `"WxH"`, which is also the form
//! [`FromStr`](std::str::FromStr) parses and the form `identify -format
//! %wx%h` prints.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid dimension: '{0}'")]
pub struct DimensionError(pub String);

/// A non-negative width/height pair.
///
/// Width and height are `u32`, so negative dimensions are unrepresentable;
/// the string parser rejects signs explicitly so `"-1x5"` still fails
/// rather than wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimension {
    pub width: u32,
    pub height: u32,
}

impl Dimension {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Whether both axes are constrained (`> 0`).
    ///
    /// A variant configured with an unbounded or zero axis is stored from
    /// the original image without any scaling attempt.
    pub fn is_bounded(self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Geometry argument for the tool command line.
    ///
    /// A width or height of 0 means "unbounded" on that axis. When both are
    /// 0 there is nothing to scale and the argument degrades to `"100%"`,
    /// which copies the image unchanged.
    pub fn to_command_argument(self) -> String {
        let mut arg = String::with_capacity(20);

        if self.width == 0 && self.height == 0 {
            arg.push_str("100%");
        }
        if self.width > 0 {
            arg.push_str(&self.width.to_string());
        }
        if self.height > 0 {
            arg.push('x');
            arg.push_str(&self.height.to_string());
        }

        arg
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Dimension {
    type Err = DimensionError;

    /// Parses `"WxH"` with non-negative integer sides.
    ///
    /// Note the asymmetry with [`Dimension::to_command_argument`]: `0x0`
    /// serializes to `"100%"`, which this parser rejects.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || DimensionError(s.to_string());
        let (w, h) = s.trim().split_once('x').ok_or_else(err)?;

        // u32::from_str accepts a leading '+'; dimensions never carry signs.
        if w.starts_with(['+', '-']) || h.starts_with(['+', '-']) {
            return Err(err());
        }

        let width = w.parse::<u32>().map_err(|_| err())?;
        let height = h.parse::<u32>().map_err(|_| err())?;

        Ok(Self { width, height })
    }
}
