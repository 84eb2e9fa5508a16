//! Hand the resolved instance over to `aws ssm start-session`.

use std::ffi::OsStr;
use std::process::Command;

use crate::error::SsmError;
use crate::logging::Logger;

#[derive(Debug, Clone, Default)]
pub struct SessionCommand {
    pub instance_id: String,
    pub profile: Option<String>,
    pub region: Option<String>,
    /// Passed through verbatim after `--target`.
    pub extra_args: Vec<String>,
}

impl SessionCommand {
    pub fn new(instance_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            ..Default::default()
        }
    }

    pub fn profile(mut self, profile: Option<String>) -> Self {
        self.profile = profile;
        self
    }

    pub fn region(mut self, region: Option<String>) -> Self {
        self.region = region;
        self
    }

    pub fn extra_args(mut self, extra_args: Vec<String>) -> Self {
        self.extra_args = extra_args;
        self
    }

    pub fn command(&self) -> Command {
        let mut cmd = Command::new("aws");

        if let Some(profile) = self.profile.as_deref() {
            cmd.args(["--profile", profile]);
        }

        if let Some(region) = self.region.as_deref() {
            cmd.args(["--region", region]);
        }

        cmd.args(["ssm", "start-session", "--target", self.instance_id.as_str()]);
        cmd.args(&self.extra_args);
        cmd
    }

    /// Run the session with inherited stdio and return its exit code.
    ///
    /// A session killed by a signal reports 1.
    pub fn launch(&self, log: &Logger) -> Result<i32, SsmError> {
        let mut cmd = self.command();

        let rendered: Vec<&OsStr> = std::iter::once(cmd.get_program())
            .chain(cmd.get_args())
            .collect();
        log.debug(&format!(
            "Running: {}",
            rendered
                .iter()
                .map(|arg| arg.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        ));
        log.info(&format!("Starting SSM session to {}...", self.instance_id));

        let status = cmd.status()?;
        Ok(status.code().unwrap_or(1))
    }
}
