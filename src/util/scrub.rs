use std::ffi::OsString;

use regex::Regex;

use crate::error::InvocationError;
use crate::invocation::{EnvSnapshot, InvocationDescriptor};

const REDACTED: &str = "[REDACTED]";

/// Redaction rules applied to environment values before they are rendered
/// into artifacts or reports. Dispatch always uses the unscrubbed snapshot.
#[derive(Debug, Clone)]
pub struct ScrubConfig {
    patterns: Vec<Regex>,
    secret_names: Vec<Regex>,
}

impl ScrubConfig {
    pub fn new(patterns: Vec<Regex>, secret_names: Vec<Regex>) -> Self {
        Self {
            patterns,
            secret_names,
        }
    }

    pub fn default_patterns() -> Vec<Regex> {
        // Keep patterns simple: the Rust `regex` crate doesn't support look-behind.
        let raw = [
            r"sk-[A-Za-z0-9]{10,}",
            r"Bearer\s+[A-Za-z0-9._-]{10,}",
            r"gh[pousr]_[A-Za-z0-9]{20,}",
            r"AKIA[0-9A-Z]{16}",
        ];
        raw.into_iter().filter_map(|p| Regex::new(p).ok()).collect()
    }

    /// Variable names whose whole value is replaced.
    pub fn default_secret_names() -> Vec<Regex> {
        let raw = [r"(?i)(token|secret|password|passwd|api[_-]?key|credential)"];
        raw.into_iter().filter_map(|p| Regex::new(p).ok()).collect()
    }

    pub fn default_shareable() -> Self {
        Self::new(Self::default_patterns(), Self::default_secret_names())
    }

    /// Defaults plus user-supplied value patterns.
    pub fn with_extra_patterns(extra: &[String]) -> Result<Self, InvocationError> {
        let mut config = Self::default_shareable();
        for raw in extra {
            let re = Regex::new(raw).map_err(|e| {
                InvocationError::Config(format!("invalid scrub pattern `{raw}`: {e}"))
            })?;
            config.patterns.push(re);
        }
        Ok(config)
    }

    pub fn scrub_string(&self, input: &str) -> String {
        let mut out = input.to_string();
        for re in &self.patterns {
            out = re.replace_all(&out, REDACTED).into_owned();
        }
        out
    }

    fn is_secret_name(&self, name: &str) -> bool {
        self.secret_names.iter().any(|re| re.is_match(name))
    }

    /// Values that are not valid UTF-8 pass through untouched; rendering
    /// rejects them later anyway.
    pub fn scrub_environment(&self, env: &EnvSnapshot) -> EnvSnapshot {
        env.iter()
            .map(|(name, value)| {
                let scrubbed: OsString = match (name.to_str(), value.to_str()) {
                    (Some(n), Some(_)) if self.is_secret_name(n) => REDACTED.into(),
                    (_, Some(v)) => self.scrub_string(v).into(),
                    (_, None) => value.to_os_string(),
                };
                (name.to_os_string(), scrubbed)
            })
            .collect()
    }

    pub fn scrub_descriptor(&self, descriptor: &InvocationDescriptor) -> InvocationDescriptor {
        descriptor.with_environment(self.scrub_environment(descriptor.environment()))
    }
}
