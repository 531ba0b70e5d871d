//! Build command configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default build timeout: five minutes.
pub const DEFAULT_TIMEOUT_MS: u64 = 300_000;

/// Default number of spawn attempts before the build is reported unavailable.
pub const DEFAULT_SPAWN_ATTEMPTS: u32 = 2;

/// How to run the project's build.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildCommand {
    /// Human-readable name used in logs.
    pub name: String,

    /// Command to execute (first element is the executable).
    pub command: Vec<String>,

    /// Directory the build runs in.
    pub work_dir: PathBuf,

    /// Timeout in milliseconds. Zero disables the timeout.
    pub timeout_ms: u64,

    pub spawn_attempts: u32,
}

impl BuildCommand {
    pub fn new(
        name: impl Into<String>,
        command: Vec<String>,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            command,
            work_dir: work_dir.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            spawn_attempts: DEFAULT_SPAWN_ATTEMPTS,
        }
    }

    /// `npm run build` in `dir`.
    pub fn npm_build(dir: &Path) -> Self {
        Self::new(
            "npm_build",
            vec!["npm".to_string(), "run".to_string(), "build".to_string()],
            dir,
        )
    }

    /// Split a shell-style command line on whitespace. No quoting support.
    pub fn from_command_line(line: &str, dir: &Path) -> Self {
        let command: Vec<String> = line.split_whitespace().map(str::to_string).collect();
        let name = command.first().cloned().unwrap_or_default();
        Self::new(name, command, dir)
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_spawn_attempts(mut self, attempts: u32) -> Self {
        self.spawn_attempts = attempts.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_npm_build_defaults() {
        let cmd = BuildCommand::npm_build(Path::new("/work/app"));
        assert_eq!(cmd.command, vec!["npm", "run", "build"]);
        assert_eq!(cmd.work_dir, PathBuf::from("/work/app"));
        assert_eq!(cmd.timeout_ms, 300_000);
        assert_eq!(cmd.spawn_attempts, 2);
    }

    #[test]
    fn test_from_command_line() {
        let cmd = BuildCommand::from_command_line("pnpm  build --no-lint", Path::new("."));
        assert_eq!(cmd.name, "pnpm");
        assert_eq!(cmd.command, vec!["pnpm", "build", "--no-lint"]);
    }

    #[test]
    fn test_spawn_attempts_at_least_one() {
        let cmd = BuildCommand::npm_build(Path::new(".")).with_spawn_attempts(0);
        assert_eq!(cmd.spawn_attempts, 1);
    }
}
