//! GraphicsMagick tool family.
//!
//! GraphicsMagick ships one multi-tool binary, `gm`, selecting its mode
//! with a sub-command: `gm convert ...`, `gm identify ...`.

use super::tool::{MagickTool, path_argument};
use crate::command::{ExecuteError, MagickCommand, SubCommandStyle};
use crate::config::ToolSettings;
use crate::dimension::Dimension;
use std::path::Path;

/// Default GraphicsMagick executable, resolved via `PATH`.
pub const DEFAULT_EXECUTABLE: &str = "gm";

const SUB_COMMAND_CONVERT: &str = "convert";
const SUB_COMMAND_IDENTIFY: &str = "identify";

/// GraphicsMagick strategy: `gm <sub-command> <arguments...>`.
pub struct GraphicsMagickTool {
    settings: ToolSettings,
    executable_override: Option<String>,
}

impl GraphicsMagickTool {
    pub fn new(settings: ToolSettings) -> Self {
        Self {
            settings,
            executable_override: None,
        }
    }

    /// Overrides the executable for every sub-command, ahead of both the
    /// per-sub-command settings entries and the `gm` default.
    pub fn with_executable(mut self, executable: impl Into<String>) -> Self {
        self.executable_override = Some(executable.into());
        self
    }

    fn command(&self, sub_command: &str) -> MagickCommand {
        let executable = self
            .executable_override
            .as_deref()
            .or_else(|| self.settings.executable_for(sub_command))
            .unwrap_or(DEFAULT_EXECUTABLE);

        let mut cmd = MagickCommand::new(executable, sub_command, SubCommandStyle::Argument);
        cmd.set_working_directory(self.settings.working_directory());
        cmd.set_timeout(self.settings.timeout());
        cmd
    }
}

impl GraphicsMagickTool {
    fn resize_command(
        &self,
        source: &Path,
        target: &Path,
        dimension: Dimension,
        extra_arguments: &[&str],
    ) -> Result<MagickCommand, ExecuteError> {
        let mut cmd = self.command(SUB_COMMAND_CONVERT);

        cmd.add_argument(path_argument(source)?)?;
        cmd.add_argument("-resize")?;
        cmd.add_argument(dimension.to_command_argument())?;

        for argument in extra_arguments {
            cmd.add_argument(*argument)?;
        }

        cmd.add_argument(path_argument(target)?)?;

        Ok(cmd)
    }
}

impl MagickTool for GraphicsMagickTool {
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
