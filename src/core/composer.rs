use crate::core::merge::{merge_sections, replace_parameters};
use crate::core::section::{index_by_name, read_sections};
use crate::domain::model::{Brick, BrickDependency, BrickParameter, Service};
use crate::domain::ports::ParameterResolver;
use crate::utils::error::{Result, SapperError};
use std::collections::BTreeMap;
use std::fs;

/// Reserved parameter naming the service and its output directory.
pub const NAME_PARAMETER: &str = "NAME";

/// Never leaves a parameter unresolved: the default if there is one, else the parameter
/// name. Used for throw-away services.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderParameterResolver;

impl ParameterResolver for PlaceholderParameterResolver {
    fn resolve(&self, name: &str, default_value: &str) -> String {
        if default_value.is_empty() {
            name.to_string()
        } else {
            default_value.to_string()
        }
    }
}

pub fn resolve_parameters(
    parameters: &[BrickParameter],
    resolver: &dyn ParameterResolver,
) -> Result<BTreeMap<String, String>> {
    let mut values = BTreeMap::new();
    for p in parameters {
        let value = resolver.resolve(&p.name, &p.default);
        if value.is_empty() {
            return Err(SapperError::UnresolvedParameter {
                name: p.name.clone(),
            });
        }
        values.insert(p.name.clone(), value);
    }
    Ok(values)
}

/// Resolves the parameters of all bricks into one map. A later brick wins on a name clash.
pub fn resolve_parameter_slice(
    bricks: &[Brick],
    resolver: &dyn ParameterResolver,
) -> Result<BTreeMap<String, String>> {
    let mut combined = BTreeMap::new();
    for brick in bricks {
        combined.extend(resolve_parameters(&brick.parameters, resolver)?);
    }
    Ok(combined)
}

/// Copies every file of `brick` into the service. New files are written as they are after
/// parameter substitution; files that already exist get the brick's sections merged into
/// them. Stops at the first I/O or merge error without undoing earlier writes.
pub fn add_single_brick(
    service: &mut Service,
    brick: &Brick,
    parameters: &BTreeMap<String, String>,
) -> Result<()> {
    for file in &brick.files {
        let input_path = brick.base_path.join(file);
        let output_path = service.path.join(file);
        let bytes = fs::read(&input_path)?;

        let raw = match String::from_utf8(bytes) {
            Ok(raw) => raw,
            Err(e) => {
                // binary files are copied once and never merged
                if output_path.exists() {
                    tracing::debug!("Keeping existing binary file {}", output_path.display());
                } else {
                    if let Some(parent) = output_path.parent() {
                        fs::create_dir_all(parent)?;
                    }
                    fs::write(&output_path, e.into_bytes())?;
                }
                continue;
            }
        };
        let content = replace_parameters(&raw, parameters);

        if output_path.exists() {
            let incoming = index_by_name(read_sections(&content)?);
            let existing = fs::read_to_string(&output_path)?;
            let merged = merge_sections(&existing, &incoming)?;
            tracing::debug!(
                "Merged {} section(s) of {} into {}",
                incoming.len(),
                brick.id,
                output_path.display()
            );
            fs::write(&output_path, merged)?;
        } else {
            if let Some(parent) = output_path.parent() {
                fs::create_dir_all(parent)?;
            }
            tracing::debug!("Writing {}", output_path.display());
            fs::write(&output_path, content)?;
        }
    }

    if !service.has_brick(&brick.id) {
        service.brick_ids.push(BrickDependency {
            id: brick.id.clone(),
            version: brick.version.clone(),
        });
    }
    for (name, value) in parameters {
        service.parameters.insert(name.clone(), value.clone());
    }
    Ok(())
}

/// Drops every brick the service already records.
pub fn remove_present_bricks(bricks: Vec<Brick>, service: &Service) -> Vec<Brick> {
    bricks
        .into_iter()
        .filter(|b| !service.has_brick(&b.id))
        .collect()
}
