use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::InvocationError;
use crate::recorder::artifact::{
    default_nix_system, is_valid_nix_system, ArtifactFormat, ArtifactOptions,
    DEFAULT_NIXPKGS_URL,
};
use crate::recorder::{RecorderOptions, StepRecorder, DEFAULT_STEP_WIDTH};
use crate::report::DEFAULT_REPORT_PREFIX;
use crate::util::paths::{config_path, reports_dir, steps_dir};
use crate::util::scrub::ScrubConfig;

/// Example configuration file contents (bundled with the binary)
pub const EXAMPLE_CONFIG: &str = include_str!("config.toml.example");

const MAX_STEP_WIDTH: usize = 20;

/// Wrapper configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub record: RecordConfig,
    pub report: ReportConfig,
    pub dispatch: DispatchConfig,
    pub scrub: ScrubSettings,
}

#[derive(Debug, Clone)]
pub struct RecordConfig {
    pub enabled: bool,
    pub root: PathBuf,
    pub format: ArtifactFormat,
    pub step_width: usize,
    /// Seed numbering from the highest existing step directory
    pub continue_numbering: bool,
    pub system: String,
    pub nixpkgs_url: String,
}

#[derive(Debug, Clone)]
pub struct ReportConfig {
    /// When unset, reports are written only in simulate mode, to
    /// `<data_dir>/reports`
    pub dir: Option<PathBuf>,
    pub prefix: String,
    pub simulate: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DispatchConfig {
    pub allow_self_wrap: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ScrubSettings {
    pub enabled: bool,
    pub patterns: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            record: RecordConfig {
                enabled: true,
                root: steps_dir(),
                format: ArtifactFormat::default(),
                step_width: DEFAULT_STEP_WIDTH,
                continue_numbering: true,
                system: default_nix_system(),
                nixpkgs_url: DEFAULT_NIXPKGS_URL.to_string(),
            },
            report: ReportConfig {
                dir: None,
                prefix: DEFAULT_REPORT_PREFIX.to_string(),
                simulate: false,
            },
            dispatch: DispatchConfig::default(),
            scrub: ScrubSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlRecordConfig {
    pub enabled: Option<bool>,
    pub root: Option<PathBuf>,
    pub format: Option<ArtifactFormat>,
    pub step_width: Option<usize>,
    pub continue_numbering: Option<bool>,
    pub system: Option<String>,
    pub nixpkgs_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlReportConfig {
    pub dir: Option<PathBuf>,
    pub prefix: Option<String>,
    pub simulate: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlDispatchConfig {
    pub allow_self_wrap: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlScrubConfig {
    pub enabled: Option<bool>,
    pub patterns: Option<Vec<String>>,
}

/// TOML representation of the config file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    pub record: Option<TomlRecordConfig>,
    pub report: Option<TomlReportConfig>,
    pub dispatch: Option<TomlDispatchConfig>,
    pub scrub: Option<TomlScrubConfig>,
}

impl Config {
    /// Load `<data_dir>/config.toml`, creating the commented example on
    /// first run.
    pub fn load() -> Result<Self, InvocationError> {
        let config_file = config_path();
        if !config_file.exists() {
            Self::create_default_config(&config_file);
        }
        Self::load_from(&config_file)
    }

    /// Load a specific file. A missing file yields the defaults; a file that
    /// exists but does not parse is an error, never silently ignored.
    pub fn load_from(path: &Path) -> Result<Self, InvocationError> {
        let mut config = Config::default();
        if !path.exists() {
            return Ok(config);
        }

        let contents = fs::read_to_string(path).map_err(|e| {
            InvocationError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let toml_config = toml::from_str::<TomlConfig>(&contents).map_err(|e| {
            InvocationError::Config(format!("cannot parse {}: {e}", path.display()))
        })?;
        config.merge(toml_config);
        config.validate()?;
        Ok(config)
    }

    pub fn merge(&mut self, toml_config: TomlConfig) {
        if let Some(record) = toml_config.record {
            if let Some(enabled) = record.enabled {
                self.record.enabled = enabled;
            }
            if let Some(root) = record.root {
                self.record.root = root;
            }
            if let Some(format) = record.format {
                self.record.format = format;
            }
            if let Some(width) = record.step_width {
                self.record.step_width = width;
            }
            if let Some(continue_numbering) = record.continue_numbering {
                self.record.continue_numbering = continue_numbering;
            }
            if let Some(system) = record.system {
                self.record.system = system;
            }
            if let Some(url) = record.nixpkgs_url {
                self.record.nixpkgs_url = url;
            }
        }

        if let Some(report) = toml_config.report {
            if report.dir.is_some() {
                self.report.dir = report.dir;
            }
            if let Some(prefix) = report.prefix {
                self.report.prefix = prefix;
            }
            if let Some(simulate) = report.simulate {
                self.report.simulate = simulate;
            }
        }

        if let Some(dispatch) = toml_config.dispatch {
            if let Some(allow) = dispatch.allow_self_wrap {
                self.dispatch.allow_self_wrap = allow;
            }
        }

        if let Some(scrub) = toml_config.scrub {
            if let Some(enabled) = scrub.enabled {
                self.scrub.enabled = enabled;
            }
            if let Some(patterns) = scrub.patterns {
                self.scrub.patterns = patterns;
            }
        }
    }

    pub fn validate(&self) -> Result<(), InvocationError> {
        if self.record.step_width == 0 || self.record.step_width > MAX_STEP_WIDTH {
            return Err(InvocationError::Config(format!(
                "record.step_width must be between 1 and {MAX_STEP_WIDTH}, got {}",
                self.record.step_width
            )));
        }
        if !is_valid_nix_system(&self.record.system) {
            return Err(InvocationError::Config(format!(
                "record.system `{}` is not a valid Nix system name",
                self.record.system
            )));
        }
        Ok(())
    }

    /// Directory that receives dry-run reports, if any. Simulate mode always
    /// gets one, since the report is its only output.
    pub fn report_dir(&self) -> Option<PathBuf> {
        match &self.report.dir {
            Some(dir) => Some(dir.clone()),
            None if self.report.simulate => Some(reports_dir()),
            None => None,
        }
    }

    /// Compiled scrub rules, or `None` when scrubbing is off.
    pub fn scrub_config(&self) -> Result<Option<ScrubConfig>, InvocationError> {
        if !self.scrub.enabled {
            return Ok(None);
        }
        ScrubConfig::with_extra_patterns(&self.scrub.patterns).map(Some)
    }

    pub fn artifact_options(&self) -> Result<ArtifactOptions, InvocationError> {
        Ok(ArtifactOptions {
            format: self.record.format,
            system: self.record.system.clone(),
            nixpkgs_url: self.record.nixpkgs_url.clone(),
            scrub: self.scrub_config()?,
        })
    }

    /// The step recorder for this configuration, or `None` when recording
    /// is disabled.
    pub fn build_recorder(&self) -> Result<Option<StepRecorder>, InvocationError> {
        if !self.record.enabled {
            return Ok(None);
        }
        self.validate()?;
        let options = RecorderOptions {
            root: self.record.root.clone(),
            step_width: self.record.step_width,
            artifact: self.artifact_options()?,
        };
        let recorder = if self.record.continue_numbering {
            StepRecorder::resume(options)?
        } else {
            StepRecorder::new(options)
        };
        Ok(Some(recorder))
    }

    /// Create the default config file from the bundled example
    fn create_default_config(path: &Path) {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                if let Err(e) = fs::create_dir_all(parent) {
                    tracing::warn!(path = %parent.display(), error = %e, "Failed to create config directory");
                    return;
                }
            }
        }

        if let Err(e) = fs::write(path, EXAMPLE_CONFIG) {
            tracing::warn!(path = %path.display(), error = %e, "Failed to write default config");
        }
    }
}
