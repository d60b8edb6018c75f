//! Probe for the installed fish version.
//!
//! `fish --version` prints `fish, version 3.7.1`. The server refuses to start
//! when this probe fails, since neither linting nor formatting could work.

use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::config::FishlintConfig;
use crate::process::{Invocation, ProcessError, ProcessRunner};

static VERSION_LINE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(\S+), version (\S+)").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FishVersion {
    pub name: String,
    pub version: String,
}

impl fmt::Display for FishVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, version {}", self.name, self.version)
    }
}

#[derive(Debug, Error)]
pub enum VersionError {
    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("could not read a version from `{program} --version` output: {output:?}")]
    Unrecognized { program: String, output: String },
}

/// Find the first `<name>, version <version>` line.
pub fn parse_version(output: &str) -> Option<FishVersion> {
    VERSION_LINE_REGEX.captures(output).map(|caps| FishVersion {
        name: caps[1].to_string(),
        version: caps[2].to_string(),
    })
}

/// Run `<checker> --version` and parse its output (stdout, then stderr).
pub async fn probe_version(
    runner: &dyn ProcessRunner,
    config: &FishlintConfig,
    cwd: Option<PathBuf>,
) -> Result<FishVersion, VersionError> {
    let invocation = Invocation::new(&config.checker)
        .arg("--version")
        .cwd(cwd)
        .timeout(config.timeout_duration());
    let result = runner.run(&invocation).await?;

    parse_version(&result.stdout)
        .or_else(|| parse_version(&result.stderr))
        .ok_or_else(|| VersionError::Unrecognized {
            program: config.checker.clone(),
            output: format!("{}{}", result.stdout, result.stderr).trim().to_string(),
        })
}
