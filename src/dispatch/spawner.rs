use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::dispatch::exit::ExitOutcome;
use crate::error::InvocationError;
use crate::invocation::InvocationDescriptor;

/// Runs the real command behind an intercepted invocation.
pub trait Spawner {
    /// Run the command to completion and report how it ended.
    fn spawn(&self, descriptor: &InvocationDescriptor) -> Result<ExitOutcome, InvocationError>;
}

/// Spawns the command as a child process of the wrapper.
///
/// The child gets exactly the captured environment (the wrapper's own
/// environment is cleared first), the captured working directory, and the
/// wrapper's stdio. The call blocks until the child exits; there is no
/// timeout.
#[derive(Debug, Clone)]
pub struct ProcessSpawner {
    allow_self_wrap: bool,
    self_exe: Option<PathBuf>,
}

impl Default for ProcessSpawner {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessSpawner {
    pub fn new() -> Self {
        let self_exe = std::env::current_exe()
            .ok()
            .and_then(|p| p.canonicalize().ok());
        Self {
            allow_self_wrap: false,
            self_exe,
        }
    }

    pub fn allow_self_wrap(mut self, allow: bool) -> Self {
        self.allow_self_wrap = allow;
        self
    }

    /// Override the executable treated as "this wrapper".
    pub fn with_self_exe(mut self, path: Option<PathBuf>) -> Self {
        self.self_exe = path.and_then(|p| p.canonicalize().ok());
        self
    }

    /// Resolve the command the way the child would see it: bare names are
    /// looked up on the captured `PATH`, paths relative to the captured cwd.
    pub fn resolve(&self, descriptor: &InvocationDescriptor) -> Result<PathBuf, InvocationError> {
        let cwd = descriptor
            .cwd()
            .map(Path::to_path_buf)
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        let spawn_error = |kind: io::ErrorKind, message: String| InvocationError::Spawn {
            command: descriptor.command().to_string(),
            arguments: descriptor.arguments().to_vec(),
            source: io::Error::new(kind, message),
        };

        // Paths are not searched; one that exists but cannot run is a
        // permission problem, not a missing command.
        let command = Path::new(descriptor.command());
        if command.components().count() > 1 {
            let candidate = cwd.join(command);
            if candidate.is_dir() {
                return Err(spawn_error(
                    io::ErrorKind::PermissionDenied,
                    format!("{} is a directory", candidate.display()),
                ));
            }
            if candidate.is_file() && !is_executable(&candidate) {
                return Err(spawn_error(
                    io::ErrorKind::PermissionDenied,
                    format!("{} is not executable", candidate.display()),
                ));
            }
        }

        let search_path = descriptor.environment().get("PATH");
        which::which_in(descriptor.command(), search_path, &cwd)
            .map_err(|e| spawn_error(io::ErrorKind::NotFound, e.to_string()))
    }

    fn check_not_self(&self, resolved: &Path) -> Result<(), InvocationError> {
        if self.allow_self_wrap {
            return Ok(());
        }
        let Some(self_exe) = &self.self_exe else {
            return Ok(());
        };
        match resolved.canonicalize() {
            Ok(canonical) if &canonical == self_exe => Err(InvocationError::SelfInvocation {
                command: resolved.to_path_buf(),
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|meta| meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    true
}

impl Spawner for ProcessSpawner {
    fn spawn(&self, descriptor: &InvocationDescriptor) -> Result<ExitOutcome, InvocationError> {
        let resolved = self.resolve(descriptor)?;
        self.check_not_self(&resolved)?;

        let mut command = Command::new(&resolved);
        command
            .args(descriptor.arguments())
            .env_clear()
            .envs(descriptor.environment().iter());
        if let Some(cwd) = descriptor.cwd() {
            command.current_dir(cwd);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.arg0(descriptor.command());
        }

        tracing::debug!(
            command = %descriptor.command(),
            resolved = %resolved.display(),
            args = descriptor.arguments().len(),
            "Dispatching invocation"
        );

        let status = command.status().map_err(|source| InvocationError::Spawn {
            command: descriptor.command().to_string(),
            arguments: descriptor.arguments().to_vec(),
            source,
        })?;
        let outcome = ExitOutcome::from(status);

        tracing::debug!(command = %descriptor.command(), outcome = %outcome, "Invocation finished");
        Ok(outcome)
    }
}
