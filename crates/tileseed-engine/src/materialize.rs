//! Working files for the seeding tool
//!
//! Three files are written before each run, always in the same order: the
//! proxy configuration snapshot, the coverage geometry, and the seed
//! specification that references both.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tileseed_core::config::MapproxyConfig;
use tileseed_core::validation::MAX_ZOOM_LEVEL;
use tileseed_core::{Geometry, NormalizedSeedTask, ProxyConfig, SeedMode, ValidationError};

use crate::error::{Result, SeedError};
use crate::reporter::{SeedEvent, SeedReporter, WorkingFile};

/// Spatial reference of every coverage
pub const COVERAGE_SRS: &str = "EPSG:4326";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Levels {
    pub from: u32,
    pub to: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeLimit {
    pub time: String,
}

/// One entry under `seeds` or `cleanups`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeedEntry {
    pub caches: Vec<String>,
    pub grids: Vec<String>,
    pub coverages: Vec<String>,
    pub levels: Levels,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_before: Option<TimeLimit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remove_before: Option<TimeLimit>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoverageEntry {
    pub datasource: String,
    pub srs: String,
}

/// The seed specification file
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SeedSpec {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub seeds: BTreeMap<String, SeedEntry>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub cleanups: BTreeMap<String, SeedEntry>,
    pub coverages: BTreeMap<String, CoverageEntry>,
}

impl SeedSpec {
    /// Build the specification for one sub-task
    pub fn build(task: &NormalizedSeedTask, coverage_path: &Path) -> Self {
        let coverage_name = format!("{}-coverage", task.layer_id);
        let limit = Some(TimeLimit {
            time: task.refresh_before.clone(),
        });

        let entry = SeedEntry {
            caches: vec![task.layer_id.clone()],
            grids: vec![task.grid.clone()],
            coverages: vec![coverage_name.clone()],
            levels: Levels {
                from: task.from_zoom_level,
                to: task.to_zoom_level,
            },
            refresh_before: if task.mode == SeedMode::Seed { limit.clone() } else { None },
            remove_before: if task.mode == SeedMode::Clean { limit } else { None },
        };

        let mut spec = Self::default();
        let name = format!("{}-{}", task.layer_id, task.mode);
        match task.mode {
            SeedMode::Seed => spec.seeds.insert(name, entry),
            SeedMode::Clean => spec.cleanups.insert(name, entry),
        };
        spec.coverages.insert(
            coverage_name,
            CoverageEntry {
                datasource: coverage_path.to_string_lossy().to_string(),
                srs: COVERAGE_SRS.to_string(),
            },
        );
        spec
    }

    /// Schema check of the generated document
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.seeds.is_empty() == self.cleanups.is_empty() {
            return Err(invalid("seeds", "exactly one of seeds or cleanups must be set"));
        }

        for (name, entry) in self.seeds.iter().chain(&self.cleanups) {
            for (field, values) in [
                ("caches", &entry.caches),
                ("grids", &entry.grids),
                ("coverages", &entry.coverages),
            ] {
                if values.is_empty() {
                    return Err(invalid(&format!("{}.{}", name, field), "must not be empty"));
                }
            }

            for coverage in &entry.coverages {
                if !self.coverages.contains_key(coverage) {
                    return Err(invalid(
                        &format!("{}.coverages", name),
                        &format!("unknown coverage {}", coverage),
                    ));
                }
            }

            for level in [entry.levels.from, entry.levels.to] {
                if level > MAX_ZOOM_LEVEL {
                    return Err(ValidationError::ZoomOutOfRange {
                        level,
                        max: MAX_ZOOM_LEVEL,
                    });
                }
            }
            if entry.levels.from > entry.levels.to {
                return Err(ValidationError::InvalidZoomRange {
                    from: entry.levels.from,
                    to: entry.levels.to,
                });
            }
        }

        for (name, entry) in &self.seeds {
            if entry.refresh_before.is_none() || entry.remove_before.is_some() {
                return Err(invalid(name, "a seed needs refresh_before only"));
            }
        }
        for (name, entry) in &self.cleanups {
            if entry.remove_before.is_none() || entry.refresh_before.is_some() {
                return Err(invalid(name, "a cleanup needs remove_before only"));
            }
        }

        Ok(())
    }

    pub fn to_yaml(&self) -> std::result::Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

fn invalid(field: &str, message: &str) -> ValidationError {
    ValidationError::InvalidSpec {
        field: field.to_string(),
        message: message.to_string(),
    }
}

/// Writes the working files to their configured paths
#[derive(Clone)]
pub struct ConfigMaterializer {
    paths: MapproxyConfig,
    reporter: Arc<dyn SeedReporter>,
}

impl ConfigMaterializer {
    pub fn new(paths: MapproxyConfig, reporter: Arc<dyn SeedReporter>) -> Self {
        Self { paths, reporter }
    }

    /// Write the proxy configuration exactly as fetched
    pub async fn write_proxy_config(&self, proxy: &ProxyConfig) -> Result<()> {
        write_file(&self.paths.config_path, proxy.raw())
            .await
            .map_err(|e| SeedError::file_write("Failed on generating mapproxy current yaml", e))?;
        self.written(WorkingFile::ProxyConfig, &self.paths.config_path, None);
        Ok(())
    }

    /// Write the coverage geometry. `buffer_meters` marks buffered coverage
    /// written by a bbox retry.
    pub async fn write_coverage(&self, geometry: &Geometry, buffer_meters: Option<f64>) -> Result<()> {
        let context = "Failed on generating geometry coverage file";
        let geojson = geometry
            .to_geojson()
            .map_err(|e| SeedError::file_write(context, e))?;
        write_file(&self.paths.coverage_path, &geojson)
            .await
            .map_err(|e| SeedError::file_write(context, e))?;
        self.written(WorkingFile::Coverage, &self.paths.coverage_path, buffer_meters);
        Ok(())
    }

    /// Generate, check and write the seed specification.
    ///
    /// The configuration snapshot and coverage must already be on disk.
    pub async fn write_seed_spec(&self, task: &NormalizedSeedTask) -> Result<()> {
        let context = "unable to create seed.yaml file";

        if !exists(&self.paths.config_path).await {
            return Err(SeedError::file_write(
                context,
                format!(
                    "Mapproxy yaml configuration file not exists: {}",
                    self.paths.config_path.display()
                ),
            ));
        }
        if !exists(&self.paths.coverage_path).await {
            return Err(SeedError::file_write(
                context,
                format!(
                    "Coverage geometry file not exists: {}",
                    self.paths.coverage_path.display()
                ),
            ));
        }

        let spec = SeedSpec::build(task, &self.paths.coverage_path);
        spec.validate()?;
        let yaml = spec
            .to_yaml()
            .map_err(|e| SeedError::file_write(context, e))?;

        write_file(&self.paths.seed_spec_path, &yaml)
            .await
            .map_err(|e| SeedError::file_write(context, e))?;
        self.written(WorkingFile::SeedSpec, &self.paths.seed_spec_path, None);
        Ok(())
    }

    fn written(&self, kind: WorkingFile, path: &Path, buffer_meters: Option<f64>) {
        self.reporter.report(&SeedEvent::FileWritten {
            kind,
            path: path.to_path_buf(),
            buffer_meters,
        });
    }
}

async fn write_file(path: &Path, contents: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, contents).await
}

async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::CollectingReporter;
    use tileseed_core::Position;

    fn task(mode: SeedMode) -> NormalizedSeedTask {
        NormalizedSeedTask {
            mode,
            grid: "WorldCRS84".to_string(),
            from_zoom_level: 0,
            to_zoom_level: 21,
            geometry: Geometry::Polygon {
                coordinates: vec![vec![
                    Position::new(34.8, 31.2),
                    Position::new(35.1, 31.2),
                    Position::new(35.1, 31.5),
                    Position::new(34.8, 31.2),
                ]],
            },
            skip_uncached: false,
            layer_id: "orthophoto".to_string(),
            refresh_before: "2026-01-16T16:14:22".to_string(),
        }
    }

    fn paths(dir: &Path) -> MapproxyConfig {
        MapproxyConfig {
            config_path: dir.join("mapproxy.yaml"),
            seed_spec_path: dir.join("seed.yaml"),
            coverage_path: dir.join("coverage.json"),
            ..Default::default()
        }
    }

    #[test]
    fn test_seed_spec_yaml() {
        let spec = SeedSpec::build(&task(SeedMode::Seed), Path::new("/mapproxy/coverage.json"));
        spec.validate().unwrap();

        let yaml = spec.to_yaml().unwrap();
        let doc: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
        let entry = &doc["seeds"]["orthophoto-seed"];
        assert_eq!(entry["caches"][0], "orthophoto");
        assert_eq!(entry["grids"][0], "WorldCRS84");
        assert_eq!(entry["coverages"][0], "orthophoto-coverage");
        assert_eq!(entry["levels"]["from"], 0);
        assert_eq!(entry["levels"]["to"], 21);
        assert_eq!(entry["refresh_before"]["time"], "2026-01-16T16:14:22");
        assert!(entry.get("remove_before").is_none());

        let coverage = &doc["coverages"]["orthophoto-coverage"];
        assert_eq!(coverage["datasource"], "/mapproxy/coverage.json");
        assert_eq!(coverage["srs"], "EPSG:4326");

        let order: Vec<usize> = ["seeds:", "caches:", "grids:", "levels:", "refresh_before:", "coverages:\n  orthophoto-coverage"]
            .iter()
            .map(|key| yaml.find(key).unwrap())
            .collect();
        assert!(order.windows(2).all(|w| w[0] < w[1]), "{}", yaml);
    }

    #[test]
    fn test_cleanup_spec_uses_remove_before() {
        let spec = SeedSpec::build(&task(SeedMode::Clean), Path::new("/c.json"));
        spec.validate().unwrap();

        let yaml = spec.to_yaml().unwrap();
        assert!(yaml.starts_with("cleanups:\n  orthophoto-clean:"));
        assert!(yaml.contains("remove_before:"));
        assert!(!yaml.contains("refresh_before"));
        assert!(!yaml.contains("seeds:"));
    }

    #[test]
    fn test_spec_generation_is_deterministic() {
        let first = SeedSpec::build(&task(SeedMode::Seed), Path::new("/c.json"));
        let second = SeedSpec::build(&task(SeedMode::Seed), Path::new("/c.json"));
        assert_eq!(first.to_yaml().unwrap(), second.to_yaml().unwrap());
    }

    #[test]
    fn test_spec_rejects_zoom_above_max() {
        let mut task = task(SeedMode::Seed);
        task.to_zoom_level = 24;
        let err = SeedSpec::build(&task, Path::new("/c.json")).validate().unwrap_err();
        assert_eq!(err, ValidationError::ZoomOutOfRange { level: 24, max: 23 });
    }

    #[test]
    fn test_spec_rejects_dangling_coverage() {
        let mut spec = SeedSpec::build(&task(SeedMode::Seed), Path::new("/c.json"));
        spec.coverages.clear();
        assert!(matches!(
            spec.validate(),
            Err(ValidationError::InvalidSpec { .. })
        ));
    }

    #[tokio::test]
    async fn test_writes_all_files_in_order() {
        let temp = tempfile::tempdir().unwrap();
        let reporter = Arc::new(CollectingReporter::default());
        let materializer = ConfigMaterializer::new(paths(temp.path()), reporter.clone());
        let proxy = ProxyConfig::parse("grids:\n  WorldCRS84: {}\n").unwrap();
        let task = task(SeedMode::Seed);

        materializer.write_proxy_config(&proxy).await.unwrap();
        materializer.write_coverage(&task.geometry, None).await.unwrap();
        materializer.write_seed_spec(&task).await.unwrap();

        assert_eq!(
            std::fs::read_to_string(temp.path().join("mapproxy.yaml")).unwrap(),
            "grids:\n  WorldCRS84: {}\n"
        );
        let coverage: Geometry =
            serde_json::from_str(&std::fs::read_to_string(temp.path().join("coverage.json")).unwrap())
                .unwrap();
        assert_eq!(coverage, task.geometry);
        assert!(std::fs::read_to_string(temp.path().join("seed.yaml"))
            .unwrap()
            .contains("orthophoto-seed"));

        let kinds: Vec<WorkingFile> = reporter
            .events()
            .into_iter()
            .filter_map(|e| match e {
                SeedEvent::FileWritten { kind, .. } => Some(kind),
                _ => None,
            })
            .collect();
        assert_eq!(
            kinds,
            vec![WorkingFile::ProxyConfig, WorkingFile::Coverage, WorkingFile::SeedSpec]
        );
    }

    #[tokio::test]
    async fn test_seed_spec_requires_config_snapshot() {
        let temp = tempfile::tempdir().unwrap();
        let reporter = Arc::new(CollectingReporter::default());
        let materializer = ConfigMaterializer::new(paths(temp.path()), reporter.clone());

        let err = materializer.write_seed_spec(&task(SeedMode::Seed)).await.unwrap_err();
        assert!(err
            .to_string()
            .starts_with("unable to create seed.yaml file: Mapproxy yaml configuration file not exists:"));
        assert_eq!(reporter.total_writes(), 0);
        assert!(!temp.path().join("seed.yaml").exists());
    }

    #[tokio::test]
    async fn test_unwritable_coverage_path() {
        let temp = tempfile::tempdir().unwrap();
        let blocker = temp.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();

        let mut paths = paths(temp.path());
        paths.coverage_path = blocker.join("coverage.json");
        let materializer = ConfigMaterializer::new(paths, Arc::new(CollectingReporter::default()));

        let err = materializer
            .write_coverage(&task(SeedMode::Seed).geometry, None)
            .await
            .unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Failed on generating geometry coverage file"));
    }
}
