use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::InvocationError;
use crate::invocation::environment::EnvSnapshot;

/// One intercepted toolchain invocation: what was run, with which
/// arguments, in which environment.
///
/// A descriptor is never mutated once built. Every recorded step and report
/// works from its own clone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DescriptorRepr")]
pub struct InvocationDescriptor {
    command: String,
    arguments: Vec<String>,
    environment: EnvSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cwd: Option<PathBuf>,
}

#[derive(Deserialize)]
struct DescriptorRepr {
    command: String,
    #[serde(default)]
    arguments: Vec<String>,
    #[serde(default)]
    environment: EnvSnapshot,
    #[serde(default)]
    cwd: Option<PathBuf>,
}

impl TryFrom<DescriptorRepr> for InvocationDescriptor {
    type Error = InvocationError;

    fn try_from(repr: DescriptorRepr) -> Result<Self, Self::Error> {
        Ok(Self::new(repr.command, repr.arguments, repr.environment)?.with_cwd_opt(repr.cwd))
    }
}

impl InvocationDescriptor {
    pub fn new(
        command: impl Into<String>,
        arguments: Vec<String>,
        environment: EnvSnapshot,
    ) -> Result<Self, InvocationError> {
        let command = command.into();
        if command.is_empty() {
            return Err(InvocationError::Config(
                "invocation command must not be empty".to_string(),
            ));
        }
        Ok(Self {
            command,
            arguments,
            environment,
            cwd: None,
        })
    }

    /// Build a descriptor from a wrapper argv tail (`<command> [args...]`)
    /// and an environment snapshot taken by the caller.
    pub fn from_argv<I>(argv: I, environment: EnvSnapshot) -> Result<Self, InvocationError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut argv = argv.into_iter();
        let command = argv.next().ok_or_else(|| {
            InvocationError::Config("no command given to wrap".to_string())
        })?;
        Self::new(command, argv.collect(), environment)
    }

    pub fn with_cwd(self, cwd: impl Into<PathBuf>) -> Self {
        self.with_cwd_opt(Some(cwd.into()))
    }

    pub fn with_cwd_opt(mut self, cwd: Option<PathBuf>) -> Self {
        self.cwd = cwd;
        self
    }

    /// Same invocation with a different environment (used for scrubbed
    /// renderings; the original is left untouched).
    pub fn with_environment(&self, environment: EnvSnapshot) -> Self {
        Self {
            environment,
            ..self.clone()
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    pub fn environment(&self) -> &EnvSnapshot {
        &self.environment
    }

    pub fn cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    /// Hex SHA-256 over command, arguments, environment and cwd.
    ///
    /// Every field is length-prefixed so `["a b"]` and `["a", "b"]` differ.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hash_field(&mut hasher, self.command.as_bytes());
        hasher.update((self.arguments.len() as u64).to_le_bytes());
        for arg in &self.arguments {
            hash_field(&mut hasher, arg.as_bytes());
        }
        hasher.update((self.environment.len() as u64).to_le_bytes());
        for (name, value) in self.environment.iter() {
            hash_field(&mut hasher, name.as_encoded_bytes());
            hash_field(&mut hasher, value.as_encoded_bytes());
        }
        match &self.cwd {
            Some(cwd) => {
                hasher.update([1u8]);
                hash_field(&mut hasher, cwd.as_os_str().as_encoded_bytes());
            }
            None => hasher.update([0u8]),
        }
        hasher
            .finalize()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }
}

fn hash_field(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}
