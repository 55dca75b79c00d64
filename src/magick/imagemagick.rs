//! ImageMagick tool family.
//!
//! ImageMagick (v6 layout) ships one binary per sub-command: `convert`,
//! `identify`. The sub-command therefore selects the executable name, not
//! an argument.
//!
//! Two deliberate behavioral differences from the GraphicsMagick adapter,
//! kept here rather than unified:
//!
//! - resize passes a `-size` decode hint before the source, unless the
//!   caller supplied their own;
//! - resize strips embedded color profiles (`+profile "*"`) before the
//!   target, unless the caller passed any profile flag themselves.

use super::tool::{MagickTool, path_argument};
use crate::command::{ExecuteError, MagickCommand, SubCommandStyle};
use crate::config::ToolSettings;
use crate::dimension::Dimension;
use std::path::Path;

const SUB_COMMAND_CONVERT: &str = "convert";
const SUB_COMMAND_IDENTIFY: &str = "identify";

/// ImageMagick strategy: `<sub-command> <arguments...>`.
pub struct ImageMagickTool {
    settings: ToolSettings,
    executable_override: Option<String>,
}

impl ImageMagickTool {
    pub fn new(settings: ToolSettings) -> Self {
        Self {
            settings,
            executable_override: None,
        }
    }

    /// Overrides the executable for every sub-command, ahead of the
    /// per-sub-command settings entries and the bare sub-command name.
    pub fn with_executable(mut self, executable: impl Into<String>) -> Self {
        self.executable_override = Some(executable.into());
        self
    }

    fn command(&self, sub_command: &str) -> MagickCommand {
        // Empty executable means "use the sub-command as the program".
        let executable = self
            .executable_override
            .as_deref()
            .or_else(|| self.settings.executable_for(sub_command))
            .unwrap_or("");

        let mut cmd = MagickCommand::new(executable, sub_command, SubCommandStyle::Executable);
        cmd.set_working_directory(self.settings.working_directory());
        cmd.set_timeout(self.settings.timeout());
        cmd
    }
}

impl ImageMagickTool {
    fn resize_command(
        &self,
        source: &Path,
        target: &Path,
        dimension: Dimension,
        extra_arguments: &[&str],
    ) -> Result<MagickCommand, ExecuteError> {
        let mut cmd = self.command(SUB_COMMAND_CONVERT);

        // Decode hint: lets ImageMagick decode large JPEGs at reduced
        // resolution. Meaningless for an unbounded geometry, and skipped
        // when the caller controls it.
        if dimension.is_bounded() && !extra_arguments.contains(&"-size") {
            cmd.add_argument("-size")?;
            cmd.add_argument(dimension.to_command_argument())?;
        }

        cmd.add_argument(path_argument(source)?)?;
        cmd.add_argument("-resize")?;
        cmd.add_argument(dimension.to_command_argument())?;

        for argument in extra_arguments {
            cmd.add_argument(*argument)?;
        }

        let caller_controls_profiles = extra_arguments
            .iter()
            .any(|arg| *arg == "-profile" || *arg == "+profile");

        if !caller_controls_profiles {
            cmd.add_argument("+profile")?;
            cmd.add_argument("*")?;
        }

        cmd.add_argument(path_argument(target)?)?;

        Ok(cmd)
    }
}

impl MagickTool for ImageMagickTool {
    fn resize(
        &self,
        source: &Path,
        target: &Path,
        dimension: Dimension,
        extra_arguments: &[&str],
    ) -> Result<(), ExecuteError> {
        self.resize_command(source, target, dimension, extra_arguments)?
            .execute(None)
    }

    fn identify_dimension(&self, source: &Path) -> Result<Dimension, ExecuteError> {
        let mut cmd = self.command(SUB_COMMAND_IDENTIFY);

        cmd.add_argument("-format")?;
        cmd.add_argument("%wx%h")?;
        cmd.add_argument(path_argument(source)?)?;

        let mut out = Vec::with_capacity(40);
        cmd.execute(Some(&mut out))?;

        Ok(String::from_utf8_lossy(&out).trim().parse()?)
    }

    fn identify_all_metadata(&self, source: &Path) -> Result<String, ExecuteError> {
        let mut cmd = self.command(SUB_COMMAND_IDENTIFY);

        cmd.add_argument("-verbose")?;
        cmd.add_argument(path_argument(source)?)?;

        let mut out = Vec::with_capacity(8192);
        cmd.execute(Some(&mut out))?;

        Ok(String::from_utf8_lossy(&out).trim().to_string())
    }
}
