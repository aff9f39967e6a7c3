//! Rendering and reading of declarative step artifacts.
//!
//! Rendering is pure: it turns a descriptor into text without touching the
//! filesystem, so the format can be checked on its own.

use std::fmt::Write as _;
use std::path::Path;

use serde::de::Error as _;
use serde::{Deserialize, Serialize};

use crate::error::InvocationError;
use crate::invocation::InvocationDescriptor;
use crate::util::scrub::ScrubConfig;

pub const ARTIFACT_SCHEMA_VERSION: u32 = 1;
pub const FLAKE_FILENAME: &str = "flake.nix";
pub const JSON_FILENAME: &str = "step.json";
pub const DEFAULT_NIXPKGS_URL: &str = "github:NixOS/nixpkgs/nixos-unstable";

const EMBED_MARKER: &str = "invocation = builtins.fromJSON ''";

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactFormat {
    /// `flake.nix` describing the step as a derivation
    #[default]
    Flake,
    /// `step.json` holding the descriptor
    Json,
}

impl ArtifactFormat {
    pub fn file_name(&self) -> &'static str {
        match self {
            ArtifactFormat::Flake => FLAKE_FILENAME,
            ArtifactFormat::Json => JSON_FILENAME,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactFormat::Flake => "flake",
            ArtifactFormat::Json => "json",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArtifactOptions {
    pub format: ArtifactFormat,
    /// Nix system double, e.g. `x86_64-linux`
    pub system: String,
    pub nixpkgs_url: String,
    pub scrub: Option<ScrubConfig>,
}

impl Default for ArtifactOptions {
    fn default() -> Self {
        Self {
            format: ArtifactFormat::default(),
            system: default_nix_system(),
            nixpkgs_url: DEFAULT_NIXPKGS_URL.to_string(),
            scrub: None,
        }
    }
}

/// Nix system double for the host this binary was built for.
pub fn default_nix_system() -> String {
    let os = match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    };
    format!("{}-{}", std::env::consts::ARCH, os)
}

/// Whether `system` can be used bare as a Nix attribute name.
pub fn is_valid_nix_system(system: &str) -> bool {
    let mut chars = system.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StepDocument {
    schema_version: u32,
    step: u64,
    fingerprint: String,
    invocation: InvocationDescriptor,
}

/// Render the artifact for step `label` (e.g. `"007"`).
pub fn render_artifact(
    label: &str,
    step: u64,
    descriptor: &InvocationDescriptor,
    options: &ArtifactOptions,
) -> Result<String, InvocationError> {
    let fingerprint = descriptor.fingerprint();
    let scrubbed;
    let descriptor = match &options.scrub {
        Some(scrub) => {
            scrubbed = scrub.scrub_descriptor(descriptor);
            &scrubbed
        }
        None => descriptor,
    };

    match options.format {
        ArtifactFormat::Json => {
            let doc = StepDocument {
                schema_version: ARTIFACT_SCHEMA_VERSION,
                step,
                fingerprint,
                invocation: descriptor.clone(),
            };
            let mut out = serde_json::to_string_pretty(&doc)?;
            out.push('\n');
            Ok(out)
        }
        ArtifactFormat::Flake => render_flake(label, &fingerprint, descriptor, options),
    }
}

fn render_flake(
    label: &str,
    fingerprint: &str,
    descriptor: &InvocationDescriptor,
    options: &ArtifactOptions,
) -> Result<String, InvocationError> {
    if !is_valid_nix_system(&options.system) {
        return Err(InvocationError::Config(format!(
            "`{}` is not a valid Nix system name",
            options.system
        )));
    }
    let embedded = embed_json(descriptor)?;
    let system = &options.system;

    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = writeln!(out, "# stepwrap build step {label}");
    let _ = writeln!(out, "# fingerprint: {fingerprint}");
    let _ = writeln!(out, "# command: {}", quote(descriptor.command())?);
    let _ = writeln!(out, "# arguments ({}):", descriptor.arguments().len());
    for (idx, arg) in descriptor.arguments().iter().enumerate() {
        let _ = writeln!(out, "#   [{idx}] {}", quote(arg)?);
    }
    if let Some(cwd) = descriptor.cwd() {
        let _ = writeln!(out, "# cwd: {}", quote(&cwd.to_string_lossy())?);
    }
    let _ = writeln!(out, "# environment ({}):", descriptor.environment().len());
    for (name, value) in descriptor.environment().iter() {
        let _ = writeln!(
            out,
            "#   {} = {}",
            quote(&name.to_string_lossy())?,
            quote(&value.to_string_lossy())?
        );
    }

    let _ = write!(
        out,
        r#"{{
  description = "stepwrap build step {label}";

  inputs.nixpkgs.url = {nixpkgs};

  outputs = {{ self, nixpkgs }}:
    let
      pkgs = import nixpkgs {{ system = "{system}"; }};
      {marker}
        {embedded}
      '';
    in
    {{
      packages.{system}.default = pkgs.stdenv.mkDerivation {{
        pname = "stepwrap-step-{label}";
        version = "0.1.0";
        passthru = {{ inherit invocation; }};
        buildCommand = ''
          echo "Command: "${{pkgs.lib.escapeShellArg invocation.command}}
          echo "Args: "${{pkgs.lib.escapeShellArgs invocation.arguments}}
          echo "Env: "${{pkgs.lib.escapeShellArg (builtins.toJSON invocation.environment)}}
          touch $out
        '';
      }};
    }};
}}
"#,
        marker = EMBED_MARKER,
        nixpkgs = nix_string(&options.nixpkgs_url),
    );
    Ok(out)
}

/// Compact JSON that is safe inside a Nix `''` string: `'` and `$` only ever
/// occur inside JSON string literals, where their `\u` escapes are
/// equivalent, so no Nix escape sequence can form.
fn embed_json(descriptor: &InvocationDescriptor) -> Result<String, InvocationError> {
    let json = serde_json::to_string(descriptor)?;
    Ok(json.replace('\'', "\\u0027").replace('$', "\\u0024"))
}

fn quote(s: &str) -> Result<String, InvocationError> {
    Ok(serde_json::to_string(s)?)
}

/// Nix double-quoted string literal.
fn nix_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '$' if chars.peek() == Some(&'{') => out.push_str("\\$"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

/// Parse an artifact's text back into the descriptor it records.
pub fn parse_artifact(contents: &str) -> Result<InvocationDescriptor, InvocationError> {
    if contents.trim_start().starts_with('{') {
        let doc: StepDocument = serde_json::from_str(contents)?;
        return Ok(doc.invocation);
    }

    let mut lines = contents.lines();
    lines
        .by_ref()
        .find(|line| line.trim_end().ends_with(EMBED_MARKER))
        .ok_or_else(|| {
            serde_json::Error::custom("artifact has no embedded invocation")
        })?;
    let embedded = lines
        .map(str::trim)
        .find(|line| !line.is_empty())
        .ok_or_else(|| serde_json::Error::custom("embedded invocation is empty"))?;
    Ok(serde_json::from_str(embedded)?)
}

/// Read a recorded artifact (`flake.nix` or `step.json`) from disk.
pub fn read_artifact(path: &Path) -> Result<InvocationDescriptor, InvocationError> {
    let contents =
        std::fs::read_to_string(path).map_err(|e| InvocationError::io(path, e))?;
    parse_artifact(&contents)
}
