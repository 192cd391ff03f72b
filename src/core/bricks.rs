use crate::domain::model::Brick;
use crate::domain::ports::BrickDb;
use crate::utils::error::{Result, SapperError};
use std::collections::HashSet;

/// Resolves `brick_id` and everything it transitively depends on, dependencies first.
pub fn resolve_bricks(brick_id: &str, db: &dyn BrickDb) -> Result<Vec<Brick>> {
    get_bricks_recursive(brick_id, db, &HashSet::new())
}

/// `ancestors` holds the ids on the current path only. Each recursive call gets its own copy,
/// so a brick reached through two independent branches (a diamond) is not taken for a cycle.
/// The result is deduplicated by id, first occurrence wins, and the brick itself comes last.
pub fn get_bricks_recursive(
    brick_id: &str,
    db: &dyn BrickDb,
    ancestors: &HashSet<String>,
) -> Result<Vec<Brick>> {
    if ancestors.contains(brick_id) {
        return Err(SapperError::CyclicBrickDependency {
            brick_id: brick_id.to_string(),
        });
    }

    let brick = db.brick(brick_id).map_err(|e| {
        tracing::debug!("Lookup of brick {} failed: {}", brick_id, e);
        SapperError::InvalidBrick {
            brick_id: brick_id.to_string(),
        }
    })?;

    let mut path = ancestors.clone();
    path.insert(brick.id.clone());

    let mut bricks: Vec<Brick> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    for dependency_id in &brick.dependencies {
        for dependency in get_bricks_recursive(dependency_id, db, &path)? {
            if seen.insert(dependency.id.clone()) {
                bricks.push(dependency);
            }
        }
    }

    if seen.insert(brick.id.clone()) {
        bricks.push(brick);
    }
    Ok(bricks)
}
