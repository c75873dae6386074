use std::{
    fmt::{Display, Formatter},
    fs,
    path::{Path, PathBuf},
};
use toml::Value;

/// Project-level settings loaded from `project.toml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    pub name: String,
    pub main_graph: String,
    pub export: ExportConfig,
}

/// Export pipeline knobs from the `[export]` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    /// Output directory, relative to the project root.
    pub output_dir: String,
    /// Name of the assets directory under the output root.
    pub assets_dir: String,
    /// Allow whole-build and per-asset incremental skips.
    pub incremental: bool,
    /// Distribution builds always run the full pipeline and re-export
    /// top-level outputs even when fingerprints are unchanged.
    pub distribution: bool,
    /// Treat unresolved field references as a build failure.
    pub fail_on_missing: bool,
    /// Best-effort guard against restoring partially written artifacts:
    /// cached outputs smaller than this are re-exported. Policy, not a
    /// correctness guarantee.
    pub min_plausible_asset_bytes: u64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: "dist".to_string(),
            assets_dir: "assets".to_string(),
            incremental: true,
            distribution: false,
            fail_on_missing: false,
            min_plausible_asset_bytes: 16,
        }
    }
}

impl ProjectConfig {
    pub fn default_for_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            main_graph: "res://main.graph".to_string(),
            export: ExportConfig::default(),
        }
    }
}

/// Resolved on-disk layout for one export run. Computed once up front so a
/// bad project root fails the build before any traversal work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPaths {
    pub project_root: PathBuf,
    pub res_dir: PathBuf,
    pub output_root: PathBuf,
    pub assets_dir: PathBuf,
    pub cache_file: PathBuf,
    pub lock_file: PathBuf,
    pub program_file: PathBuf,
    pub scripts_manifest: PathBuf,
    /// Where user script sources are copied so the manifest's `#[path]`
    /// imports resolve from the output root.
    pub scripts_dir: PathBuf,
}

impl ExportPaths {
    pub fn resolve(project_root: &Path, config: &ExportConfig) -> Result<Self, ProjectError> {
        if !project_root.is_dir() {
            return Err(ProjectError::InvalidProjectRoot(project_root.to_path_buf()));
        }
        let output_root = project_root.join(&config.output_dir);
        Ok(Self {
            project_root: project_root.to_path_buf(),
            res_dir: project_root.join("res"),
            assets_dir: output_root.join(&config.assets_dir),
            cache_file: output_root.join(".galgo").join("export_cache.json"),
            lock_file: output_root.join(".galgo").join("build.lock"),
            program_file: output_root.join("scene.gen.rs"),
            scripts_manifest: output_root.join("scripts.gen.rs"),
            scripts_dir: output_root.join("scripts"),
            output_root,
        })
    }

    /// Map a `res://` path onto the project's res directory.
    pub fn resolve_res_path(&self, path: &str) -> Option<PathBuf> {
        let stripped = path.strip_prefix("res://")?;
        Some(self.res_dir.join(stripped))
    }
}

#[derive(Debug)]
pub enum ProjectError {
    Io(std::io::Error),
    ParseToml(toml::de::Error),
    MissingField(&'static str),
    InvalidField(&'static str, String),
    InvalidProjectRoot(PathBuf),
}

impl Display for ProjectError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "{err}"),
            Self::ParseToml(err) => write!(f, "{err}"),
            Self::MissingField(field) => write!(f, "missing required field `{field}`"),
            Self::InvalidField(field, reason) => write!(f, "invalid field `{field}`: {reason}"),
            Self::InvalidProjectRoot(path) => {
                write!(f, "project root is not a directory: {}", path.display())
            }
        }
    }
}

impl std::error::Error for ProjectError {}

impl From<std::io::Error> for ProjectError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<toml::de::Error> for ProjectError {
    fn from(value: toml::de::Error) -> Self {
        Self::ParseToml(value)
    }
}

pub fn load_project_toml(root: &Path) -> Result<ProjectConfig, ProjectError> {
    let project_toml = fs::read_to_string(root.join("project.toml"))?;
    parse_project_toml(&project_toml)
}

pub fn ensure_project_toml(root: &Path, default_name: &str) -> std::io::Result<()> {
    let project_toml = root.join("project.toml");
    if project_toml.exists() {
        return Ok(());
    }
    fs::write(project_toml, default_project_toml(default_name))
}

pub fn default_project_toml(name: &str) -> String {
    format!(
        r#"[project]
name = "{name}"
main_graph = "res://main.graph"

[export]
output_dir = "dist"
assets_dir = "assets"
incremental = true
"#
    )
}

pub fn parse_project_toml(contents: &str) -> Result<ProjectConfig, ProjectError> {
    let value: Value = contents.parse::<Value>()?;
    let project_table = value
        .get("project")
        .and_then(Value::as_table)
        .ok_or(ProjectError::MissingField("project"))?;

    let name = project_table
        .get("name")
        .and_then(Value::as_str)
        .ok_or(ProjectError::MissingField("project.name"))?
        .to_string();

    let main_graph = project_table
        .get("main_graph")
        .and_then(Value::as_str)
        .unwrap_or("res://main.graph")
        .to_string();
    validate_res_path("project.main_graph", &main_graph)?;

    let mut export = ExportConfig::default();
    if let Some(export_table) = value.get("export").and_then(Value::as_table) {
        if let Some(raw) = export_table.get("output_dir").and_then(Value::as_str) {
            validate_relative_dir("export.output_dir", raw)?;
            export.output_dir = raw.to_string();
        }
        if let Some(raw) = export_table.get("assets_dir").and_then(Value::as_str) {
            validate_relative_dir("export.assets_dir", raw)?;
            export.assets_dir = raw.to_string();
        }
        if let Some(raw) = export_table.get("incremental").and_then(Value::as_bool) {
            export.incremental = raw;
        }
        if let Some(raw) = export_table.get("distribution").and_then(Value::as_bool) {
            export.distribution = raw;
        }
        if let Some(raw) = export_table.get("fail_on_missing").and_then(Value::as_bool) {
            export.fail_on_missing = raw;
        }
        if let Some(raw) = export_table
            .get("min_plausible_asset_bytes")
            .and_then(Value::as_integer)
        {
            export.min_plausible_asset_bytes = u64::try_from(raw).map_err(|_| {
                ProjectError::InvalidField(
                    "export.min_plausible_asset_bytes",
                    "must be a non-negative integer".to_string(),
                )
            })?;
        }
    }

    Ok(ProjectConfig {
        name,
        main_graph,
        export,
    })
}

fn validate_res_path(field: &'static str, path: &str) -> Result<(), ProjectError> {
    if path.starts_with("res://") {
        return Ok(());
    }
    Err(ProjectError::InvalidField(
        field,
        "must start with `res://`".to_string(),
    ))
}

fn validate_relative_dir(field: &'static str, raw: &str) -> Result<(), ProjectError> {
    if raw.is_empty() {
        return Err(ProjectError::InvalidField(
            field,
            "must not be empty".to_string(),
        ));
    }
    if Path::new(raw).is_absolute() || raw.contains("..") {
        return Err(ProjectError::InvalidField(
            field,
            "must be a relative path inside the project".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_project_toml_reads_export_table() {
        let toml = r#"
[project]
name = "Game"
main_graph = "res://world.graph"

[export]
output_dir = "build/web"
assets_dir = "assets"
incremental = false
fail_on_missing = true
min_plausible_asset_bytes = 64
"#;

        let parsed = parse_project_toml(toml).expect("failed to parse project.toml");
        assert_eq!(parsed.name, "Game");
        assert_eq!(parsed.main_graph, "res://world.graph");
        assert_eq!(parsed.export.output_dir, "build/web");
        assert!(!parsed.export.incremental);
        assert!(parsed.export.fail_on_missing);
        assert_eq!(parsed.export.min_plausible_asset_bytes, 64);
    }

    #[test]
    fn parse_project_toml_defaults_export_when_absent() {
        let toml = r#"
[project]
name = "Game"
"#;

        let parsed = parse_project_toml(toml).expect("failed to parse project.toml");
        assert_eq!(parsed.main_graph, "res://main.graph");
        assert_eq!(parsed.export, ExportConfig::default());
    }

    #[test]
    fn parse_project_toml_rejects_non_res_graph_path() {
        let toml = r#"
[project]
name = "Game"
main_graph = "./main.graph"
"#;

        let err = parse_project_toml(toml).expect_err("expected parse failure");
        assert!(matches!(
            err,
            ProjectError::InvalidField("project.main_graph", _)
        ));
    }

    #[test]
    fn parse_project_toml_rejects_escaping_output_dir() {
        let toml = r#"
[project]
name = "Game"

[export]
output_dir = "../elsewhere"
"#;

        let err = parse_project_toml(toml).expect_err("expected parse failure");
        assert!(matches!(
            err,
            ProjectError::InvalidField("export.output_dir", _)
        ));
    }

    #[test]
    fn export_paths_resolve_layout() {
        let root = std::env::temp_dir();
        let paths = ExportPaths::resolve(&root, &ExportConfig::default()).unwrap();
        assert_eq!(paths.output_root, root.join("dist"));
        assert_eq!(paths.assets_dir, root.join("dist").join("assets"));
        assert_eq!(paths.scripts_dir, root.join("dist").join("scripts"));
        assert_eq!(
            paths.resolve_res_path("res://tex/player.png"),
            Some(root.join("res").join("tex/player.png"))
        );
        assert_eq!(paths.resolve_res_path("player.png"), None);
    }

    #[test]
    fn export_paths_reject_missing_root() {
        let bogus = std::env::temp_dir().join("galgo-definitely-missing-root");
        let err = ExportPaths::resolve(&bogus, &ExportConfig::default()).expect_err("must fail");
        assert!(matches!(err, ProjectError::InvalidProjectRoot(_)));
    }
}
