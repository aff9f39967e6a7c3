use std::path::{Component, Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::InvocationError;
use crate::invocation::{FieldValue, InvocationDescriptor, PassthroughFields};
use crate::util::fs::write_atomic;
use crate::util::scrub::ScrubConfig;

/// Keys every report carries; passthrough fields may not reuse them.
pub const RESERVED_KEYS: [&str; 4] = ["command", "arguments", "environment", "cwd"];

/// Render a dry-run report as pretty JSON.
///
/// Top-level keys are `command`, `arguments` (in invocation order),
/// `environment`, `cwd` when the descriptor has one, and every passthrough
/// field. Keys are written in sorted order, passthrough fields included.
pub fn render_report(
    descriptor: &InvocationDescriptor,
    fields: &PassthroughFields,
    scrub: Option<&ScrubConfig>,
) -> Result<Vec<u8>, InvocationError> {
    if let Some(key) = fields.keys().find(|k| RESERVED_KEYS.contains(&k.as_str())) {
        return Err(InvocationError::Config(format!(
            "passthrough field `{key}` collides with a report key"
        )));
    }

    let environment = match scrub {
        Some(scrub) => serde_json::to_value(scrub.scrub_environment(descriptor.environment()))?,
        None => serde_json::to_value(descriptor.environment())?,
    };

    let mut doc = Map::new();
    doc.insert(
        "command".to_string(),
        Value::String(descriptor.command().to_string()),
    );
    doc.insert(
        "arguments".to_string(),
        serde_json::to_value(descriptor.arguments())?,
    );
    doc.insert("environment".to_string(), environment);
    if let Some(cwd) = descriptor.cwd() {
        doc.insert("cwd".to_string(), serde_json::to_value(cwd)?);
    }
    for (key, value) in fields {
        doc.insert(key.clone(), field_to_json(value));
    }

    let mut bytes = serde_json::to_vec_pretty(&Value::Object(doc))?;
    bytes.push(b'\n');
    Ok(bytes)
}

fn field_to_json(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => Value::Null,
        FieldValue::Bool(b) => Value::Bool(*b),
        FieldValue::Integer(n) => Value::from(*n),
        FieldValue::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        FieldValue::String(s) => Value::String(s.clone()),
    }
}

/// Writes dry-run reports describing an invocation.
#[derive(Debug, Clone, Default)]
pub struct DryRunEmitter {
    fields: PassthroughFields,
    scrub: Option<ScrubConfig>,
}

impl DryRunEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fields(mut self, fields: PassthroughFields) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_scrub(mut self, scrub: Option<ScrubConfig>) -> Self {
        self.scrub = scrub;
        self
    }

    /// Write the report for `descriptor` to `output_directory/filename`,
    /// creating the directory if needed. An existing file of the same name is
    /// replaced.
    pub fn emit(
        &self,
        descriptor: &InvocationDescriptor,
        output_directory: &Path,
        filename: &str,
    ) -> Result<PathBuf, InvocationError> {
        validate_filename(output_directory, filename)?;
        let bytes = render_report(descriptor, &self.fields, self.scrub.as_ref())?;
        ensure_output_directory(output_directory)?;

        let path = output_directory.join(filename);
        write_atomic(&path, &bytes)?;
        tracing::info!(
            command = %descriptor.command(),
            path = %path.display(),
            "Wrote dry-run report"
        );
        Ok(path)
    }
}

fn validate_filename(output_directory: &Path, filename: &str) -> Result<(), InvocationError> {
    let mut components = Path::new(filename).components();
    let plain = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !filename.contains(['/', '\\']);
    if plain {
        Ok(())
    } else {
        Err(InvocationError::path(
            output_directory.join(filename),
            format!("report filename `{filename}` must be a single plain file name"),
        ))
    }
}

fn ensure_output_directory(dir: &Path) -> Result<(), InvocationError> {
    if dir.as_os_str().is_empty() {
        return Err(InvocationError::path(dir, "output directory path is empty"));
    }
    if dir.exists() && !dir.is_dir() {
        return Err(InvocationError::path(dir, "exists and is not a directory"));
    }
    std::fs::create_dir_all(dir)
        .map_err(|e| InvocationError::path(dir, format!("cannot create directory: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invocation::EnvSnapshot;
    use tempfile::tempdir;

    fn rustc_0() -> InvocationDescriptor {
        let env: EnvSnapshot = [("TEST_VAR", "test_value_0")].into_iter().collect();
        InvocationDescriptor::new("rustc_0", vec!["--version".into()], env)
            .unwrap()
            .with_cwd("/tmp/0")
    }

    #[test]
    fn report_has_fixed_keys() {
        let bytes = render_report(&rustc_0(), &PassthroughFields::new(), None).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(
            value,
            serde_json::json!({
                "command": "rustc_0",
                "arguments": ["--version"],
                "environment": {"TEST_VAR": "test_value_0"},
                "cwd": "/tmp/0",
            })
        );
    }

    #[test]
    fn cwd_is_omitted_when_not_captured() {
        let descriptor =
            InvocationDescriptor::new("cc", vec![], EnvSnapshot::empty()).unwrap();
        let bytes = render_report(&descriptor, &PassthroughFields::new(), None).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(value.get("cwd").is_none());
    }

    #[test]
    fn passthrough_fields_are_added() {
        let mut fields = PassthroughFields::new();
        fields.insert("dry_run_nix_json".into(), true.into());
        fields.insert("attempt".into(), FieldValue::Integer(2));
        fields.insert("ratio".into(), FieldValue::Float(0.5));

        let bytes = render_report(&rustc_0(), &fields, None).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["dry_run_nix_json"], true);
        assert_eq!(value["attempt"], 2);
        assert_eq!(value["ratio"], 0.5);
    }

    #[test]
    fn keys_are_written_sorted() {
        let mut fields = PassthroughFields::new();
        fields.insert("zz_last".into(), true.into());
        fields.insert("alpha".into(), true.into());

        let text = String::from_utf8(render_report(&rustc_0(), &fields, None).unwrap()).unwrap();
        let position = |key: &str| text.find(&format!("\"{key}\":")).unwrap();
        assert!(position("alpha") < position("arguments"));
        assert!(position("arguments") < position("command"));
        assert!(position("cwd") < position("environment"));
        assert!(position("environment") < position("zz_last"));
    }

    #[test]
    fn reserved_field_is_rejected() {
        let mut fields = PassthroughFields::new();
        fields.insert("command".into(), "other".into());
        let err = render_report(&rustc_0(), &fields, None).unwrap_err();
        assert!(matches!(err, InvocationError::Config(_)));
    }

    #[test]
    fn emit_creates_directory_and_file() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("reports").join("nested");

        let path = DryRunEmitter::new()
            .emit(&rustc_0(), &out, "xpy_json_output_1_0.json")
            .unwrap();

        assert_eq!(path, out.join("xpy_json_output_1_0.json"));
        let value: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(value["command"], "rustc_0");
    }

    #[test]
    fn emit_rejects_bad_locations() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("occupied");
        std::fs::write(&file, b"x").unwrap();
        let emitter = DryRunEmitter::new();

        let err = emitter.emit(&rustc_0(), &file, "r.json").unwrap_err();
        assert!(matches!(err, InvocationError::Path { .. }));

        let err = emitter.emit(&rustc_0(), Path::new(""), "r.json").unwrap_err();
        assert!(matches!(err, InvocationError::Path { .. }));

        for bad in ["", "..", "a/b.json", "."] {
            let err = emitter.emit(&rustc_0(), dir.path(), bad).unwrap_err();
            assert!(matches!(err, InvocationError::Path { .. }), "{bad:?}");
        }
    }

    #[test]
    fn same_filename_overwrites() {
        let dir = tempdir().unwrap();
        let emitter = DryRunEmitter::new();
        emitter.emit(&rustc_0(), dir.path(), "r.json").unwrap();
        let other = InvocationDescriptor::new("rustc_1", vec![], EnvSnapshot::empty()).unwrap();
        let path = emitter.emit(&other, dir.path(), "r.json").unwrap();

        let value: Value = serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();
        assert_eq!(value["command"], "rustc_1");
    }

    #[test]
    fn scrubbed_report_hides_secrets() {
        let env: EnvSnapshot = [("GITHUB_TOKEN", "ghp_abcdefghijklmnopqrstuvwxyz")]
            .into_iter()
            .collect();
        let descriptor = InvocationDescriptor::new("rustc", vec![], env).unwrap();
        let scrub = ScrubConfig::default_shareable();

        let bytes = render_report(&descriptor, &PassthroughFields::new(), Some(&scrub)).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(!text.contains("ghp_"));
        assert!(text.contains("[REDACTED]"));
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_environment_is_serialization_error() {
        use std::ffi::OsString;
        use std::os::unix::ffi::OsStringExt;

        let env: EnvSnapshot = [(OsString::from("BAD"), OsString::from_vec(vec![0xff]))]
            .into_iter()
            .collect();
        let descriptor = InvocationDescriptor::new("rustc", vec![], env).unwrap();
        let dir = tempdir().unwrap();

        let err = DryRunEmitter::new()
            .emit(&descriptor, dir.path(), "r.json")
            .unwrap_err();
        assert!(matches!(err, InvocationError::Serialization(_)));
        assert!(!dir.path().join("r.json").exists());
    }
}
