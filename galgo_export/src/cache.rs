use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::ExportError;

/// Produces one output artifact from one source file. Exporters are invoked
/// at most once per output path per build; the cache decides when a previous
/// build's artifact can be restored instead.
pub trait AssetExporter {
    fn export(&self, src: &Path, dst: &Path) -> io::Result<()>;
}

/// Plain byte-copy exporter. The default for textures, audio, fonts, clips
/// and sub-graph data artifacts.
pub struct CopyExporter;

impl AssetExporter for CopyExporter {
    fn export(&self, src: &Path, dst: &Path) -> io::Result<()> {
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(src, dst)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CacheEntry {
    fingerprint: String,
    size: u64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheStore {
    /// Keyed by absolute output path.
    entries: HashMap<String, CacheEntry>,
    /// Asset artifacts confirmed by the last successful build, keyed by
    /// program path. Consulted before an incremental whole-build skip.
    #[serde(default)]
    outputs: HashMap<String, Vec<String>>,
}

/// Content-fingerprint cache deciding re-export necessity. The store
/// persists across builds on disk; the exported-this-build set is
/// build-scoped and guarantees at-most-once export per output path.
pub struct AssetDependencyCache {
    store: CacheStore,
    store_path: PathBuf,
    exported_this_build: HashSet<PathBuf>,
    dirty: bool,
}

impl AssetDependencyCache {
    /// Load the persisted store. A missing or unreadable store is an empty
    /// cache, never an error: the worst case is a cold export.
    pub fn load(store_path: &Path) -> Self {
        let store = match fs::read_to_string(store_path) {
            Ok(raw) => match serde_json::from_str::<CacheStore>(&raw) {
                Ok(store) => store,
                Err(err) => {
                    log::warn!(
                        "export cache at {} is unreadable ({err}); starting cold",
                        store_path.display()
                    );
                    CacheStore::default()
                }
            },
            Err(_) => CacheStore::default(),
        };
        Self {
            store,
            store_path: store_path.to_path_buf(),
            exported_this_build: HashSet::new(),
            dirty: false,
        }
    }

    pub fn fingerprint_bytes(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        format!("{:x}", hasher.finalize())
    }

    pub fn fingerprint_file(path: &Path) -> io::Result<String> {
        Ok(Self::fingerprint_bytes(&fs::read(path)?))
    }

    /// Export `src` to `dst` unless a previous build already produced an
    /// identical artifact. Returns the output path and whether the exporter
    /// actually ran. Diamond-shaped references within one build hit the
    /// exported set and return immediately.
    pub fn get_or_export(
        &mut self,
        src: &Path,
        dst: &Path,
        min_plausible_bytes: u64,
        exporter: &dyn AssetExporter,
    ) -> io::Result<(PathBuf, bool)> {
        if self.exported_this_build.contains(dst) {
            return Ok((dst.to_path_buf(), false));
        }

        let fingerprint = Self::fingerprint_file(src)?;
        let key = dst.to_string_lossy().to_string();

        if let Some(entry) = self.store.entries.get(&key) {
            if entry.fingerprint == fingerprint {
                // Size check is a best-effort guard against partially
                // written files from an interrupted build.
                if let Ok(meta) = fs::metadata(dst) {
                    if meta.len() == entry.size && meta.len() >= min_plausible_bytes {
                        self.exported_this_build.insert(dst.to_path_buf());
                        return Ok((dst.to_path_buf(), false));
                    }
                }
            }
        }

        exporter.export(src, dst)?;
        let size = fs::metadata(dst).map(|m| m.len()).unwrap_or(0);
        self.store.entries.insert(key, CacheEntry { fingerprint, size });
        self.dirty = true;
        self.exported_this_build.insert(dst.to_path_buf());
        Ok((dst.to_path_buf(), true))
    }

    /// Fingerprint recorded for an output path by a previous build, if any.
    pub fn recorded_fingerprint(&self, output: &Path) -> Option<&str> {
        self.store
            .entries
            .get(&output.to_string_lossy().to_string())
            .map(|e| e.fingerprint.as_str())
    }

    /// Record a fingerprint for an output the orchestrator wrote itself
    /// (the generated program and manifest).
    pub fn record_output(&mut self, output: &Path, fingerprint: impl Into<String>) {
        let size = fs::metadata(output).map(|m| m.len()).unwrap_or(0);
        self.store.entries.insert(
            output.to_string_lossy().to_string(),
            CacheEntry {
                fingerprint: fingerprint.into(),
                size,
            },
        );
        self.dirty = true;
    }

    /// Remember which asset artifacts this build exported or confirmed, so
    /// the next build's incremental skip can verify they still exist.
    pub fn record_build_outputs(&mut self, program: &Path) {
        let mut outputs: Vec<String> = self
            .exported_this_build
            .iter()
            .map(|p| p.to_string_lossy().to_string())
            .collect();
        outputs.sort();
        self.store
            .outputs
            .insert(program.to_string_lossy().to_string(), outputs);
        self.dirty = true;
    }

    /// True when every artifact recorded for `program` still exists on
    /// disk. A store with no record is treated as intact; the worst case
    /// of a stale store is a cold export, never a wrong skip of a build
    /// whose artifacts were recorded.
    pub fn build_outputs_present(&self, program: &Path) -> bool {
        match self.store.outputs.get(&program.to_string_lossy().to_string()) {
            Some(outputs) => outputs.iter().all(|p| Path::new(p).is_file()),
            None => true,
        }
    }

    /// Drop a single entry. Used after a failed or cancelled build so the
    /// partial program on disk is never mistaken for a finished one.
    pub fn forget(&mut self, output: &Path) {
        let key = output.to_string_lossy().to_string();
        let dropped_entry = self.store.entries.remove(&key).is_some();
        let dropped_outputs = self.store.outputs.remove(&key).is_some();
        if dropped_entry || dropped_outputs {
            self.dirty = true;
        }
    }

    /// Wholesale invalidation, used after large project changes.
    pub fn clear(&mut self) {
        self.store.entries.clear();
        self.store.outputs.clear();
        self.dirty = true;
    }

    /// Persist the store. Called before a build reports success so a new
    /// build never observes half-written state.
    pub fn flush(&mut self) -> Result<(), ExportError> {
        if !self.dirty {
            return Ok(());
        }
        if let Some(parent) = self.store_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.store)
            .map_err(|err| ExportError::CacheStore(err.to_string()))?;
        fs::write(&self.store_path, json)?;
        self.dirty = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingExporter<'a> {
        runs: &'a AtomicUsize,
    }

    impl AssetExporter for CountingExporter<'_> {
        fn export(&self, src: &Path, dst: &Path) -> io::Result<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            CopyExporter.export(src, dst)
        }
    }

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "galgo-cache-{tag}-{}-{:?}",
            std::process::id(),
            std::thread::current().id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn unchanged_asset_is_not_reexported_across_builds() {
        let dir = temp_dir("unchanged");
        let src = dir.join("a.png");
        let dst = dir.join("out").join("a.png");
        fs::write(&src, b"pixels-and-more-pixels").unwrap();
        let runs = AtomicUsize::new(0);
        let exporter = CountingExporter { runs: &runs };
        let store_path = dir.join("cache.json");

        let mut cache = AssetDependencyCache::load(&store_path);
        let (_, exported) = cache.get_or_export(&src, &dst, 4, &exporter).unwrap();
        assert!(exported);
        cache.flush().unwrap();

        // new build, fresh build-scoped state, same persisted store
        let mut cache = AssetDependencyCache::load(&store_path);
        let (_, exported) = cache.get_or_export(&src, &dst, 4, &exporter).unwrap();
        assert!(!exported);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn changed_content_forces_reexport_and_updates_fingerprint() {
        let dir = temp_dir("changed");
        let src = dir.join("a.png");
        let dst = dir.join("out").join("a.png");
        fs::write(&src, b"original-bytes-here").unwrap();
        let store_path = dir.join("cache.json");

        let mut cache = AssetDependencyCache::load(&store_path);
        cache.get_or_export(&src, &dst, 4, &CopyExporter).unwrap();
        let first = cache.recorded_fingerprint(&dst).unwrap().to_string();
        cache.flush().unwrap();

        fs::write(&src, b"completely different bytes").unwrap();
        let mut cache = AssetDependencyCache::load(&store_path);
        let (_, exported) = cache.get_or_export(&src, &dst, 4, &CopyExporter).unwrap();
        assert!(exported);
        assert_ne!(cache.recorded_fingerprint(&dst).unwrap(), first);
    }

    #[test]
    fn diamond_reference_exports_once_per_build() {
        let dir = temp_dir("diamond");
        let src = dir.join("a.png");
        let dst = dir.join("out").join("a.png");
        fs::write(&src, b"shared-asset-bytes").unwrap();
        let runs = AtomicUsize::new(0);
        let exporter = CountingExporter { runs: &runs };

        let mut cache = AssetDependencyCache::load(&dir.join("cache.json"));
        let (_, first) = cache.get_or_export(&src, &dst, 4, &exporter).unwrap();
        let (_, second) = cache.get_or_export(&src, &dst, 4, &exporter).unwrap();
        assert!(first);
        assert!(!second);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn implausibly_small_artifact_is_rewritten() {
        let dir = temp_dir("small");
        let src = dir.join("a.bin");
        let dst = dir.join("out").join("a.bin");
        fs::write(&src, b"ok").unwrap();
        let store_path = dir.join("cache.json");

        let mut cache = AssetDependencyCache::load(&store_path);
        cache.get_or_export(&src, &dst, 0, &CopyExporter).unwrap();
        cache.flush().unwrap();

        // next build with a higher plausibility floor re-exports
        let mut cache = AssetDependencyCache::load(&store_path);
        let (_, exported) = cache.get_or_export(&src, &dst, 16, &CopyExporter).unwrap();
        assert!(exported);
    }

    #[test]
    fn clear_drops_all_entries() {
        let dir = temp_dir("clear");
        let src = dir.join("a.png");
        let dst = dir.join("out").join("a.png");
        fs::write(&src, b"pixels-pixels-pixels").unwrap();
        let store_path = dir.join("cache.json");

        let mut cache = AssetDependencyCache::load(&store_path);
        cache.get_or_export(&src, &dst, 4, &CopyExporter).unwrap();
        cache.clear();
        cache.flush().unwrap();

        let mut cache = AssetDependencyCache::load(&store_path);
        let (_, exported) = cache.get_or_export(&src, &dst, 4, &CopyExporter).unwrap();
        assert!(exported, "cleared cache must export cold");
    }

    #[test]
    fn build_outputs_tracked_per_program() {
        let dir = temp_dir("outputs");
        let src = dir.join("a.png");
        let dst = dir.join("out").join("a.png");
        fs::write(&src, b"pixels-for-tracking").unwrap();
        let program = dir.join("out").join("scene.gen.rs");

        let mut cache = AssetDependencyCache::load(&dir.join("cache.json"));
        cache.get_or_export(&src, &dst, 4, &CopyExporter).unwrap();
        cache.record_build_outputs(&program);
        assert!(cache.build_outputs_present(&program));

        fs::remove_file(&dst).unwrap();
        assert!(!cache.build_outputs_present(&program));

        cache.forget(&program);
        assert!(cache.build_outputs_present(&program), "no record means intact");
    }

    #[test]
    fn corrupt_store_starts_cold() {
        let dir = temp_dir("corrupt");
        let store_path = dir.join("cache.json");
        fs::write(&store_path, b"{ not json").unwrap();
        let cache = AssetDependencyCache::load(&store_path);
        assert!(cache.recorded_fingerprint(Path::new("/nope")).is_none());
    }
}
