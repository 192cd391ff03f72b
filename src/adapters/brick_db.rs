use crate::config::Remote;
use crate::domain::model::{Brick, BrickKind};
use crate::domain::ports::BrickDb;
use crate::utils::error::{Result, SapperError};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

pub const MANIFEST_FILE: &str = "manifest.yaml";

/// Brick catalog backed by a directory tree. Every directory holding a `manifest.yaml` is a
/// brick; all other files below it belong to the brick.
#[derive(Debug, Default)]
pub struct FilesystemBrickDb {
    bricks: Vec<Brick>,
}

impl FilesystemBrickDb {
    pub fn new(root: &Path) -> Result<Self> {
        let mut bricks = Vec::new();
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() || entry.file_name() != MANIFEST_FILE {
                continue;
            }
            if let Some(dir) = entry.path().parent() {
                let brick = load_brick(dir)?;
                tracing::debug!("Found brick {} in {}", brick.id, dir.display());
                bricks.push(brick);
            }
        }
        Ok(Self { bricks })
    }

    pub fn len(&self) -> usize {
        self.bricks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bricks.is_empty()
    }
}

fn load_brick(dir: &Path) -> Result<Brick> {
    let raw = fs::read_to_string(dir.join(MANIFEST_FILE))?;
    let mut brick: Brick = serde_yaml::from_str(&raw)?;
    brick.base_path = dir.to_path_buf();

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() || entry.file_name() == MANIFEST_FILE {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(dir) {
            brick.files.push(relative.to_string_lossy().into_owned());
        }
    }
    Ok(brick)
}

impl BrickDb for FilesystemBrickDb {
    fn bricks(&self, kind: BrickKind) -> Vec<Brick> {
        self.bricks
            .iter()
            .filter(|b| b.kind == kind)
            .cloned()
            .collect()
    }

    fn brick(&self, id: &str) -> Result<Brick> {
        self.bricks
            .iter()
            .find(|b| b.id == id)
            .cloned()
            .ok_or_else(|| SapperError::BrickNotFound {
                brick_id: id.to_string(),
            })
    }
}

/// Searches several catalogs in order. The first catalog knowing a brick wins.
#[derive(Default)]
pub struct AggregateBrickDb {
    dbs: Vec<Box<dyn BrickDb>>,
}

impl AggregateBrickDb {
    pub fn new(dbs: Vec<Box<dyn BrickDb>>) -> Self {
        Self { dbs }
    }

    /// One filesystem catalog per remote. Remotes whose directory does not exist are skipped.
    pub fn from_remotes(remotes: &[Remote]) -> Result<Self> {
        let mut dbs: Vec<Box<dyn BrickDb>> = Vec::new();
        for remote in remotes {
            if !remote.path.is_dir() {
                tracing::warn!(
                    "Skipping remote {}: {} is not a directory",
                    remote.name,
                    remote.path.display()
                );
                continue;
            }
            let db = FilesystemBrickDb::new(&remote.path)?;
            tracing::debug!("Remote {} provides {} brick(s)", remote.name, db.len());
            dbs.push(Box::new(db));
        }
        Ok(Self::new(dbs))
    }
}

impl BrickDb for AggregateBrickDb {
    fn bricks(&self, kind: BrickKind) -> Vec<Brick> {
        let mut bricks: Vec<Brick> = Vec::new();
        for db in &self.dbs {
            for brick in db.bricks(kind) {
                if !bricks.iter().any(|b| b.id == brick.id) {
                    bricks.push(brick);
                }
            }
        }
        bricks
    }

    fn brick(&self, id: &str) -> Result<Brick> {
        self.dbs
            .iter()
            .find_map(|db| db.brick(id).ok())
            .ok_or_else(|| SapperError::BrickNotFound {
                brick_id: id.to_string(),
            })
    }
}
