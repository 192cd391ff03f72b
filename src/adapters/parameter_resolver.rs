use crate::core::composer::NAME_PARAMETER;
use crate::domain::ports::ParameterResolver;
use crate::utils::error::{Result, SapperError};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static PARAMETER_EXP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*)=(.*)$").expect("parameter pattern is valid"));

/// Fixed name/value pairs. Falls back to the declared default.
#[derive(Debug, Clone, Default)]
pub struct MapParameterResolver {
    values: HashMap<String, String>,
}

impl MapParameterResolver {
    pub fn new(values: HashMap<String, String>) -> Self {
        Self { values }
    }
}

impl ParameterResolver for MapParameterResolver {
    fn resolve(&self, name: &str, default_value: &str) -> String {
        self.values
            .get(name)
            .cloned()
            .unwrap_or_else(|| default_value.to_string())
    }
}

/// Values given as `NAME=value` on the command line. Unknown names resolve to nothing so
/// that a compound resolver can ask the next source.
#[derive(Debug, Clone, Default)]
pub struct CliParameterResolver {
    values: HashMap<String, String>,
}

impl CliParameterResolver {
    pub fn parse<S: AsRef<str>>(parameters: &[S]) -> Result<Self> {
        let mut values = HashMap::new();
        for p in parameters {
            let p = p.as_ref();
            let caps = PARAMETER_EXP
                .captures(p)
                .ok_or_else(|| SapperError::InvalidParameterSyntax {
                    parameter: p.to_string(),
                })?;
            values.insert(caps[1].to_string(), caps[2].to_string());
        }
        Ok(Self { values })
    }
}

impl ParameterResolver for CliParameterResolver {
    fn resolve(&self, name: &str, _default_value: &str) -> String {
        self.values.get(name).cloned().unwrap_or_default()
    }
}

/// The declared default and nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultValueParameterResolver;

impl ParameterResolver for DefaultValueParameterResolver {
    fn resolve(&self, _name: &str, default_value: &str) -> String {
        default_value.to_string()
    }
}

/// Asks each resolver in order; the first non-empty answer wins.
#[derive(Default)]
pub struct CompoundParameterResolver {
    resolvers: Vec<Box<dyn ParameterResolver>>,
}

impl CompoundParameterResolver {
    pub fn new(resolvers: Vec<Box<dyn ParameterResolver>>) -> Self {
        Self { resolvers }
    }
}

impl ParameterResolver for CompoundParameterResolver {
    fn resolve(&self, name: &str, default_value: &str) -> String {
        self.resolvers
            .iter()
            .map(|r| r.resolve(name, default_value))
            .find(|v| !v.is_empty())
            .unwrap_or_default()
    }
}

/// Resolver chain of the command line: `-p` values, then the service name taken from the
/// target folder (if any), then declared defaults.
pub fn command_line_resolver<S: AsRef<str>>(
    parameters: &[S],
    service_name: Option<&str>,
) -> Result<CompoundParameterResolver> {
    let mut resolvers: Vec<Box<dyn ParameterResolver>> =
        vec![Box::new(CliParameterResolver::parse(parameters)?)];
    if let Some(name) = service_name.filter(|n| !n.is_empty()) {
        let mut values = HashMap::new();
        values.insert(NAME_PARAMETER.to_string(), name.to_string());
        resolvers.push(Box::new(MapParameterResolver::new(values)));
    }
    resolvers.push(Box::new(DefaultValueParameterResolver));
    Ok(CompoundParameterResolver::new(resolvers))
}
