use crate::domain::model::Service;
use crate::domain::ports::{DependencyReader, ServicePersistence};
use crate::utils::error::Result;
use std::fs;
use std::path::Path;

pub const SAPPERFILE: &str = "sapperfile.yaml";

/// Keeps the service record in `sapperfile.yaml` at the service root. Package
/// dependencies are not part of the record; they are read from the package manifest.
pub struct FileSystemServicePersistence<R: DependencyReader> {
    reader: R,
}

impl<R: DependencyReader> FileSystemServicePersistence<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: DependencyReader> ServicePersistence for FileSystemServicePersistence<R> {
    fn load(&self, path: &Path) -> Result<Service> {
        let raw = fs::read_to_string(path.join(SAPPERFILE))?;
        let mut service: Service = serde_yaml::from_str(&raw)?;
        service.path = path.to_path_buf();
        service.dependencies = self.reader.read_from_service(&service)?;
        Ok(service)
    }

    fn save(&self, service: &Service) -> Result<()> {
        let yaml = serde_yaml::to_string(service)?;
        fs::write(service.path.join(SAPPERFILE), yaml)?;
        tracing::debug!("Saved {}", service.path.join(SAPPERFILE).display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Brick, BrickDependency, PackageDependency};
    use crate::domain::ports::SectionPredicate;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    struct FixedReader(Vec<PackageDependency>);

    impl DependencyReader for FixedReader {
        fn read_from_service(&self, _service: &Service) -> Result<Vec<PackageDependency>> {
            Ok(self.0.clone())
        }

        fn read_from_brick(
            &self,
            _brick: &Brick,
            _predicate: SectionPredicate,
        ) -> Result<Vec<PackageDependency>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let fmt = PackageDependency {
            id: "fmt".to_string(),
            version: "8.0.1".to_string(),
        };
        let persistence = FileSystemServicePersistence::new(FixedReader(vec![fmt.clone()]));

        let mut parameters = BTreeMap::new();
        parameters.insert("NAME".to_string(), "orders".to_string());
        let service = Service {
            id: "orders".to_string(),
            path: dir.path().to_path_buf(),
            brick_ids: vec![BrickDependency {
                id: "service-base".to_string(),
                version: "1.0.0".to_string(),
            }],
            dependencies: Vec::new(),
            parameters,
        };
        persistence.save(&service).unwrap();

        let raw = fs::read_to_string(dir.path().join(SAPPERFILE)).unwrap();
        assert!(raw.contains("id: orders"));
        assert!(!raw.contains("fmt"));

        let loaded = persistence.load(dir.path()).unwrap();
        assert_eq!(loaded.id, "orders");
        assert_eq!(loaded.path, dir.path());
        assert_eq!(loaded.brick_ids, service.brick_ids);
        assert_eq!(loaded.parameters["NAME"], "orders");
        assert_eq!(loaded.dependencies, vec![fmt]);
    }

    #[test]
    fn test_load_without_sapperfile_fails() {
        let dir = TempDir::new().unwrap();
        let persistence = FileSystemServicePersistence::new(FixedReader(Vec::new()));
        assert!(persistence.load(dir.path()).is_err());
    }

    #[test]
    fn test_load_reads_recorded_bricks() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(SAPPERFILE),
            "id: svc\nbrickids:\n  - id: base\n    version: 1.0.0\nparameters:\n  NAME: svc\n",
        )
        .unwrap();
        let persistence = FileSystemServicePersistence::new(FixedReader(Vec::new()));

        let loaded = persistence.load(dir.path()).unwrap();
        assert!(loaded.has_brick("base"));
        assert_eq!(loaded.brick_ids[0].version, "1.0.0");

        persistence.save(&loaded).unwrap();
        let raw = fs::read_to_string(dir.path().join(SAPPERFILE)).unwrap();
        assert!(raw.contains("brickids:"));
        assert!(!raw.contains("brick_ids"));
    }

    #[test]
    fn test_load_accepts_minimal_record() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(SAPPERFILE), "id: legacy\n").unwrap();
        let persistence = FileSystemServicePersistence::new(FixedReader(Vec::new()));
        let loaded = persistence.load(dir.path()).unwrap();
        assert_eq!(loaded.id, "legacy");
        assert!(loaded.brick_ids.is_empty());
    }
}
