//! Scripts manifest generation. Scans the project's `res/` tree for
//! user-authored script files, extracts the exported type name from each,
//! and renders a generated module that imports them all and re-exports a
//! lookup table keyed by type name.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::ExportError;
use crate::registry::ReferenceRegistry;

/// One discovered script file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptEntry {
    /// Path relative to the `res/` root, forward slashes.
    pub rel: String,
    pub module: String,
    pub type_name: String,
    /// False for scripts that only exist inside the editor session
    /// (anything under an `editor/` directory).
    pub available: bool,
    /// Set when another file already claimed this type name; the registry
    /// row for this entry is commented out.
    pub duplicate_of: Option<String>,
}

#[derive(Debug, Default)]
pub struct ScriptsManifest {
    pub entries: Vec<ScriptEntry>,
}

impl ScriptsManifest {
    /// Walk `res_dir` for `.rs` files and build the entry list. Entries are
    /// ordered by relative path so the generated manifest is deterministic.
    pub fn scan(res_dir: &Path) -> Result<Self, ExportError> {
        let mut files = Vec::new();
        collect_rs_files(res_dir, res_dir, &mut files)?;
        files.sort();

        let mut entries = Vec::new();
        let mut first_by_type: HashMap<String, String> = HashMap::new();
        for rel in files {
            let source = fs::read_to_string(res_dir.join(&rel))?;
            let Some(type_name) = first_struct_name(&source) else {
                log::debug!("no exported type in {rel}, skipping");
                continue;
            };
            let available = !is_editor_path(&rel);
            let duplicate_of = if available {
                match first_by_type.get(&type_name) {
                    Some(first) => {
                        log::warn!(
                            "duplicate script type `{type_name}` in {rel} (first defined in {first})"
                        );
                        Some(first.clone())
                    }
                    None => {
                        first_by_type.insert(type_name.clone(), rel.clone());
                        None
                    }
                }
            } else {
                None
            };
            entries.push(ScriptEntry {
                module: module_name_from_rel(&rel),
                rel,
                type_name,
                available,
                duplicate_of,
            });
        }
        Ok(Self { entries })
    }

    /// Feed the known-type table so emitters can skip components whose
    /// backing type cannot be imported.
    pub fn apply_known_types(&self, registry: &mut ReferenceRegistry) {
        for entry in &self.entries {
            registry.set_known_type(&entry.type_name, entry.available);
        }
    }

    /// Copy every importable script under `scripts_dir` so the rendered
    /// manifest's `#[path]` imports resolve from the output root. Returns
    /// the number of files copied.
    pub fn sync_sources(&self, res_dir: &Path, scripts_dir: &Path) -> Result<usize, ExportError> {
        let mut copied = 0;
        for entry in self.entries.iter().filter(|e| e.available) {
            let dst = scripts_dir.join(&entry.rel);
            if let Some(parent) = dst.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(res_dir.join(&entry.rel), &dst)?;
            copied += 1;
        }
        Ok(copied)
    }

    /// Render the generated manifest module. Imports point into the synced
    /// `scripts/` directory next to the manifest. Duplicate type names keep
    /// their module import (the file is still processed) but their registry
    /// row is commented out with a warning so the table never collides.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("#![allow(unused_imports, unused_variables, dead_code)]\n");
        out.push_str("// AUTO-GENERATED by Galgo Export. Do not edit by hand.\n\n");
        out.push_str("use galgo_runtime::ScriptConstructor;\n\n");

        for entry in self.entries.iter().filter(|e| e.available) {
            out.push_str(&format!("#[path = \"scripts/{}\"]\n", entry.rel));
            out.push_str(&format!("pub mod {};\n\n", entry.module));
        }

        out.push_str("pub static SCRIPT_REGISTRY: &[(&str, ScriptConstructor)] = &[\n");
        for entry in self.entries.iter().filter(|e| e.available) {
            match &entry.duplicate_of {
                None => out.push_str(&format!(
                    "    (\"{}\", {}::galgo_create_script as ScriptConstructor),\n",
                    entry.type_name, entry.module
                )),
                Some(first) => out.push_str(&format!(
                    "    // (\"{}\", {}::galgo_create_script as ScriptConstructor), // WARNING: duplicate type name, first defined in {first}\n",
                    entry.type_name, entry.module
                )),
            }
        }
        out.push_str("];\n");
        out
    }
}

fn collect_rs_files(root: &Path, dir: &Path, out: &mut Vec<String>) -> Result<(), ExportError> {
    if !dir.is_dir() {
        return Ok(());
    }
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_rs_files(root, &path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            if let Ok(rel) = path.strip_prefix(root) {
                out.push(rel.to_string_lossy().replace('\\', "/"));
            }
        }
    }
    Ok(())
}

fn is_editor_path(rel: &str) -> bool {
    rel.starts_with("editor/") || rel.contains("/editor/")
}

/// First struct declaration in the file is the exported script type.
fn first_struct_name(source: &str) -> Option<String> {
    source
        .lines()
        .find_map(|line| parse_struct_name(line.trim()))
}

fn parse_struct_name(line: &str) -> Option<String> {
    let line = line.trim_start_matches("pub ").trim_start();
    if !line.starts_with("struct ") {
        return None;
    }
    let rest = line.trim_start_matches("struct ").trim_start();
    let mut name = String::new();
    for c in rest.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            name.push(c);
        } else {
            break;
        }
    }
    if name.is_empty() { None } else { Some(name) }
}

fn module_name_from_rel(rel: &str) -> String {
    let mut out = String::with_capacity(rel.len());
    for c in rel.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else {
            out.push('_');
        }
    }
    let trimmed = out.trim_matches('_');
    let mut name = if trimmed.is_empty() {
        "script".to_string()
    } else {
        trimmed.to_string()
    };
    if name.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_res(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "galgo-manifest-{tag}-{}-{:?}",
            std::process::id(),
            std::thread::current().id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn struct_name_parsing() {
        assert_eq!(parse_struct_name("pub struct Player {"), Some("Player".into()));
        assert_eq!(parse_struct_name("struct Enemy;"), Some("Enemy".into()));
        assert_eq!(parse_struct_name("pub struct Hud<T> {"), Some("Hud".into()));
        assert_eq!(parse_struct_name("impl Player {"), None);
    }

    #[test]
    fn module_names_are_valid_identifiers() {
        assert_eq!(module_name_from_rel("ai/player.rs"), "ai_player_rs");
        assert_eq!(module_name_from_rel("2d/thing.rs"), "_2d_thing_rs");
    }

    #[test]
    fn scan_discovers_types_and_editor_scripts() {
        let res = temp_res("scan");
        fs::create_dir_all(res.join("ai")).unwrap();
        fs::create_dir_all(res.join("editor")).unwrap();
        fs::write(res.join("ai/player.rs"), "pub struct Player {\n}\n").unwrap();
        fs::write(res.join("editor/rig.rs"), "pub struct CameraRig;\n").unwrap();
        fs::write(res.join("notes.txt"), "not a script").unwrap();

        let manifest = ScriptsManifest::scan(&res).unwrap();
        assert_eq!(manifest.entries.len(), 2);
        let player = manifest.entries.iter().find(|e| e.type_name == "Player").unwrap();
        assert!(player.available);
        let rig = manifest.entries.iter().find(|e| e.type_name == "CameraRig").unwrap();
        assert!(!rig.available);

        let mut registry = ReferenceRegistry::new();
        manifest.apply_known_types(&mut registry);
        assert_eq!(registry.type_availability("Player"), Some(true));
        assert_eq!(registry.type_availability("CameraRig"), Some(false));
    }

    #[test]
    fn duplicate_type_name_is_commented_out_but_still_imported() {
        let res = temp_res("dup");
        fs::write(res.join("a_player.rs"), "pub struct Player {}\n").unwrap();
        fs::write(res.join("z_player.rs"), "pub struct Player {}\n").unwrap();

        let manifest = ScriptsManifest::scan(&res).unwrap();
        let dup = manifest
            .entries
            .iter()
            .find(|e| e.duplicate_of.is_some())
            .unwrap();
        assert_eq!(dup.rel, "z_player.rs");
        assert_eq!(dup.duplicate_of.as_deref(), Some("a_player.rs"));

        let text = manifest.render();
        assert!(text.contains("#[path = \"scripts/a_player.rs\"]"));
        assert!(text.contains("pub mod a_player_rs;"));
        assert!(text.contains("pub mod z_player_rs;"), "duplicate file still processed");
        assert!(text.contains("(\"Player\", a_player_rs::galgo_create_script"));
        assert!(text.contains(
            "// (\"Player\", z_player_rs::galgo_create_script as ScriptConstructor), // WARNING: duplicate type name"
        ));
    }

    #[test]
    fn synced_imports_resolve_next_to_the_manifest() {
        let res = temp_res("sync");
        fs::create_dir_all(res.join("ai")).unwrap();
        fs::write(res.join("ai/player.rs"), "pub struct Player {}\n").unwrap();
        fs::create_dir_all(res.join("editor")).unwrap();
        fs::write(res.join("editor/rig.rs"), "pub struct CameraRig;\n").unwrap();
        let out = temp_res("sync-out");

        let manifest = ScriptsManifest::scan(&res).unwrap();
        let copied = manifest.sync_sources(&res, &out.join("scripts")).unwrap();
        assert_eq!(copied, 1, "editor scripts are not synced");

        // every emitted import must point at a file relative to the
        // manifest's own directory
        let text = manifest.render();
        let mut imports = 0;
        for line in text.lines().filter(|l| l.starts_with("#[path = \"")) {
            let rel = line.trim_start_matches("#[path = \"").trim_end_matches("\"]");
            assert!(out.join(rel).is_file(), "dangling import `{rel}`");
            imports += 1;
        }
        assert_eq!(imports, 1);
    }

    #[test]
    fn render_is_deterministic() {
        let res = temp_res("det");
        fs::write(res.join("b.rs"), "pub struct B;\n").unwrap();
        fs::write(res.join("a.rs"), "pub struct A;\n").unwrap();
        let first = ScriptsManifest::scan(&res).unwrap().render();
        let second = ScriptsManifest::scan(&res).unwrap().render();
        assert_eq!(first, second);
        let a = first.find("pub mod a_rs;").unwrap();
        let b = first.find("pub mod b_rs;").unwrap();
        assert!(a < b);
    }
}
