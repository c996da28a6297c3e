//! Rule pack loading functionality.
//!
//! This module provides the [`RulePackLoader`] type, which resolves a tax year
//! to a parsed and validated [`TaxRulePack`] and memoizes the result.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::error::{EngineError, EngineResult};

use super::types::TaxRulePack;
use super::validator::validate_value;

/// Name of the rule pack directory inside a configuration root.
pub const RULES_DIR_NAME: &str = "tax-rules";

/// Environment variable that, when set, is probed before any other root.
pub const CONFIG_DIR_ENV: &str = "TAX_RULE_ENGINE_CONFIG_DIR";

/// File extensions recognised as rule packs, in lookup order.
const PACK_EXTENSIONS: [&str; 3] = ["json", "yaml", "yml"];

/// Loads yearly rule packs from disk and caches them by year.
///
/// # Directory Structure
///
/// ```text
/// config/
/// └── tax-rules/
///     ├── 2024.json
///     └── 2025.json
/// ```
///
/// Packs may also be written in YAML (`2026.yaml`). Each loaded pack stays
/// cached until [`RulePackLoader::clear_cache`] is called.
///
/// # Example
///
/// ```no_run
/// use tax_rule_engine::config::RulePackLoader;
///
/// let loader = RulePackLoader::discover()?;
/// let pack = loader.load_rule_pack(2024)?;
/// println!("Loaded rule pack {}", pack.version());
/// # Ok::<(), tax_rule_engine::error::EngineError>(())
/// ```
#[derive(Debug)]
pub struct RulePackLoader {
    rules_dir: PathBuf,
    cache: RwLock<HashMap<i32, Arc<TaxRulePack>>>,
}

impl RulePackLoader {
    /// Creates a loader reading from `<config_root>/tax-rules`.
    pub fn new<P: AsRef<Path>>(config_root: P) -> Self {
        Self {
            rules_dir: config_root.as_ref().join(RULES_DIR_NAME),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a loader from the first of [`RulePackLoader::candidate_roots`]
    /// that contains a rule pack directory.
    ///
    /// # Errors
    ///
    /// Returns `ConfigRootNotFound` listing every candidate when none match.
    pub fn discover() -> EngineResult<Self> {
        Self::from_candidates(&Self::candidate_roots())
    }

    /// Creates a loader from the first candidate root that contains a rule
    /// pack directory.
    pub fn from_candidates(candidates: &[PathBuf]) -> EngineResult<Self> {
        for candidate in candidates {
            if candidate.join(RULES_DIR_NAME).is_dir() {
                info!(root = %candidate.display(), "Resolved tax rule configuration root");
                return Ok(Self::new(candidate));
            }
        }

        let candidates: Vec<String> = candidates
            .iter()
            .map(|c| c.join(RULES_DIR_NAME).display().to_string())
            .collect();
        warn!(?candidates, "No tax rule directory found");
        Err(EngineError::ConfigRootNotFound { candidates })
    }

    /// Returns the configuration roots probed by [`RulePackLoader::discover`],
    /// in order.
    ///
    /// The list is: `$TAX_RULE_ENGINE_CONFIG_DIR`, `<cwd>/config`,
    /// `<cwd>/tax-rule-engine/config`, then `config` next to the running
    /// binary and up to two levels above it.
    pub fn candidate_roots() -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
            candidates.push(PathBuf::from(dir));
        }

        if let Ok(cwd) = std::env::current_dir() {
            candidates.push(cwd.join("config"));
            candidates.push(cwd.join("tax-rule-engine").join("config"));
        }

        if let Some(exe_dir) = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
        {
            candidates.push(exe_dir.join("config"));
            candidates.push(exe_dir.join("..").join("config"));
            candidates.push(exe_dir.join("..").join("..").join("config"));
        }

        candidates
    }

    /// Returns the directory the rule packs are read from.
    pub fn rules_dir(&self) -> &Path {
        &self.rules_dir
    }

    /// Returns the path of the pack file for `year`, if one exists.
    pub fn pack_path(&self, year: i32) -> Option<PathBuf> {
        PACK_EXTENSIONS
            .iter()
            .map(|ext| self.rules_dir.join(format!("{}.{}", year, ext)))
            .find(|path| path.is_file())
    }

    /// Loads the rule pack for `year`, returning the cached value if present.
    ///
    /// On a cache miss the file is read, parsed, validated, and checked to
    /// declare the same year it was requested under.
    ///
    /// # Errors
    ///
    /// - `RulePackMissing` if no file exists for the year
    /// - `RulePackIo` if the file cannot be read
    /// - `RulePackParse` if the file is not valid JSON/YAML
    /// - `SchemaViolation` if the pack fails validation
    /// - `RulePackYearMismatch` if the pack declares a different year
    pub fn load_rule_pack(&self, year: i32) -> EngineResult<Arc<TaxRulePack>> {
        if let Some(pack) = self.cache.read().get(&year) {
            debug!(year, "Rule pack cache hit");
            return Ok(Arc::clone(pack));
        }

        let pack = Arc::new(self.read_pack(year).inspect_err(|err| {
            warn!(year, error = %err, "Failed to load rule pack");
        })?);

        let mut cache = self.cache.write();
        let cached = cache.entry(year).or_insert(pack);
        Ok(Arc::clone(cached))
    }

    fn read_pack(&self, year: i32) -> EngineResult<TaxRulePack> {
        let path = self.pack_path(year).ok_or_else(|| EngineError::RulePackMissing {
            year,
            path: self
                .rules_dir
                .join(format!("{}.json", year))
                .display()
                .to_string(),
        })?;
        let path_str = path.display().to_string();

        let content = fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => EngineError::RulePackMissing {
                year,
                path: path_str.clone(),
            },
            _ => EngineError::RulePackIo {
                path: path_str.clone(),
                message: e.to_string(),
            },
        })?;

        let raw = parse_document(&path, &content)?;
        let pack = validate_value(raw, &path_str)?;

        if pack.year() != year {
            return Err(EngineError::RulePackYearMismatch {
                requested: year,
                found: pack.year(),
                path: path_str,
            });
        }

        info!(year, version = pack.version(), path = %path_str, "Loaded rule pack");
        Ok(pack)
    }

    /// Returns every year with a pack file in the rules directory, ascending.
    pub fn list_supported_years(&self) -> EngineResult<Vec<i32>> {
        let dir_str = self.rules_dir.display().to_string();

        let entries = fs::read_dir(&self.rules_dir).map_err(|e| EngineError::RulePackIo {
            path: dir_str.clone(),
            message: e.to_string(),
        })?;

        let mut years = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| EngineError::RulePackIo {
                path: dir_str.clone(),
                message: e.to_string(),
            })?;

            let path = entry.path();
            let is_pack = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| PACK_EXTENSIONS.contains(&ext));
            if !is_pack {
                continue;
            }

            if let Some(year) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.parse::<i32>().ok())
            {
                years.push(year);
            }
        }

        years.sort_unstable();
        years.dedup();
        Ok(years)
    }

    /// Returns the years currently held in the cache, ascending.
    pub fn cached_years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.cache.read().keys().copied().collect();
        years.sort_unstable();
        years
    }

    /// Drops every cached rule pack.
    pub fn clear_cache(&self) {
        self.cache.write().clear();
        debug!("Rule pack cache cleared");
    }
}

/// Parses a pack file by extension into a JSON value.
fn parse_document(path: &Path, content: &str) -> EngineResult<serde_json::Value> {
    let path_str = path.display().to_string();
    let is_yaml = path
        .extension()
        .is_some_and(|ext| ext == "yaml" || ext == "yml");

    if is_yaml {
        serde_yaml::from_str(content).map_err(|e| EngineError::RulePackParse {
            path: path_str,
            message: e.to_string(),
        })
    } else {
        serde_json::from_str(content).map_err(|e| EngineError::RulePackParse {
            path: path_str,
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PACK_2024: &str = include_str!("../../config/tax-rules/2024.json");

    fn repo_config() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config")
    }

    fn temp_root() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join(RULES_DIR_NAME)).unwrap();
        dir
    }

    fn write_pack(root: &TempDir, file_name: &str, content: &str) {
        fs::write(root.path().join(RULES_DIR_NAME).join(file_name), content).unwrap();
    }

    #[test]
    fn test_load_shipped_pack() {
        let loader = RulePackLoader::new(repo_config());

        let pack = loader.load_rule_pack(2024).unwrap();
        assert_eq!(pack.year(), 2024);
        assert_eq!(pack.version(), "2024.2");
    }

    #[test]
    fn test_list_supported_years_is_sorted() {
        let root = temp_root();
        write_pack(&root, "2025.json", "{}");
        write_pack(&root, "2023.yaml", "year: 2023");
        write_pack(&root, "2024.json", PACK_2024);
        write_pack(&root, "README.md", "not a pack");
        write_pack(&root, "draft.json", "{}");

        let loader = RulePackLoader::new(root.path());
        assert_eq!(loader.list_supported_years().unwrap(), vec![2023, 2024, 2025]);
    }

    #[test]
    fn test_cache_hit_returns_same_instance() {
        let loader = RulePackLoader::new(repo_config());

        let first = loader.load_rule_pack(2024).unwrap();
        let second = loader.load_rule_pack(2024).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loader.cached_years(), vec![2024]);
    }

    #[test]
    fn test_clear_cache_forces_reload() {
        let root = temp_root();
        write_pack(&root, "2024.json", PACK_2024);
        let loader = RulePackLoader::new(root.path());

        let first = loader.load_rule_pack(2024).unwrap();
        loader.clear_cache();
        assert!(loader.cached_years().is_empty());

        let second = loader.load_rule_pack(2024).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_year_returns_rule_pack_missing() {
        let root = temp_root();
        let loader = RulePackLoader::new(root.path());

        match loader.load_rule_pack(2019) {
            Err(EngineError::RulePackMissing { year, path }) => {
                assert_eq!(year, 2019);
                assert!(path.ends_with("2019.json"));
            }
            other => panic!("Expected RulePackMissing, got {:?}", other),
        }
    }

    #[test]
    fn test_year_mismatch_is_rejected() {
        let root = temp_root();
        write_pack(&root, "2026.json", PACK_2024);
        let loader = RulePackLoader::new(root.path());

        match loader.load_rule_pack(2026) {
            Err(EngineError::RulePackYearMismatch {
                requested, found, ..
            }) => {
                assert_eq!(requested, 2026);
                assert_eq!(found, 2024);
            }
            other => panic!("Expected RulePackYearMismatch, got {:?}", other),
        }
        assert!(loader.cached_years().is_empty());
    }

    #[test]
    fn test_unparsable_file_returns_parse_error() {
        let root = temp_root();
        write_pack(&root, "2024.json", "{ not json");
        let loader = RulePackLoader::new(root.path());

        assert!(matches!(
            loader.load_rule_pack(2024),
            Err(EngineError::RulePackParse { .. })
        ));
    }

    #[test]
    fn test_invalid_pack_returns_schema_violation() {
        let root = temp_root();
        let broken = PACK_2024.replace("\"min\": 20818", "\"min\": 20000");
        write_pack(&root, "2024.json", &broken);
        let loader = RulePackLoader::new(root.path());

        match loader.load_rule_pack(2024) {
            Err(EngineError::SchemaViolation { issues, .. }) => {
                assert!(issues.has_path("taxBrackets[2].min"));
            }
            other => panic!("Expected SchemaViolation, got {:?}", other),
        }
    }

    #[test]
    fn test_yaml_pack_is_loaded() {
        let root = temp_root();
        let value: serde_json::Value = serde_json::from_str(PACK_2024).unwrap();
        let yaml = serde_yaml::to_string(&value).unwrap();
        write_pack(&root, "2024.yaml", &yaml);
        let loader = RulePackLoader::new(root.path());

        let pack = loader.load_rule_pack(2024).unwrap();
        assert_eq!(pack.credits().church_tax_max.to_string(), "600");
    }

    #[test]
    fn test_discovery_picks_first_root_with_rules_dir() {
        let empty = TempDir::new().unwrap();
        let root = temp_root();

        let loader = RulePackLoader::from_candidates(&[
            empty.path().to_path_buf(),
            root.path().to_path_buf(),
        ])
        .unwrap();
        assert_eq!(loader.rules_dir(), root.path().join(RULES_DIR_NAME));
    }

    #[test]
    fn test_discovery_lists_every_candidate_on_failure() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();

        match RulePackLoader::from_candidates(&[a.path().to_path_buf(), b.path().to_path_buf()]) {
            Err(EngineError::ConfigRootNotFound { candidates }) => {
                assert_eq!(candidates.len(), 2);
                assert!(candidates[0].starts_with(&a.path().display().to_string()));
                assert!(candidates[1].starts_with(&b.path().display().to_string()));
            }
            other => panic!("Expected ConfigRootNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_candidate_roots_include_cwd_config() {
        let cwd = std::env::current_dir().unwrap();
        assert!(RulePackLoader::candidate_roots().contains(&cwd.join("config")));
    }
}
