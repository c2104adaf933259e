//! # Assemblage Registry
//!
//! Read-only catalog of environments and assemblage definitions.
//!
//! Registration happens once, through `RegistryBuilder` or one of the TOML
//! loaders. `build()` validates the data and freezes it; the resulting
//! `AssemblageRegistry` has no mutating methods and is shared behind an
//! `Arc` by the generator and the chunk manager.
//!
//! Lookups preserve registration order, which layout policies rely on for
//! determinism.

use std::collections::HashMap;

use serde::Deserialize;

use crate::assemblage::{AssemblageDefinition, EnvironmentDefinition};
use crate::error::{ProceduralError, ProceduralResult};

/// Assemblage data bundled with the crate.
const BUILTIN_ASSEMBLAGES: &str = include_str!("../data/assemblages.toml");

/// On-disk registry layout.
#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    environment: Vec<EnvironmentDefinition>,
    #[serde(default)]
    assemblage: Vec<AssemblageDefinition>,
}

/// Collects definitions before the registry is frozen.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    environments: Vec<EnvironmentDefinition>,
    assemblages: Vec<AssemblageDefinition>,
}

impl RegistryBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an environment.
    #[must_use]
    pub fn environment(mut self, environment: EnvironmentDefinition) -> Self {
        self.environments.push(environment);
        self
    }

    /// Adds an assemblage definition.
    #[must_use]
    pub fn assemblage(mut self, definition: AssemblageDefinition) -> Self {
        self.assemblages.push(definition);
        self
    }

    /// Adds everything from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRegistry` if the document does not parse.
    pub fn toml_str(mut self, source: &str) -> ProceduralResult<Self> {
        let file: RegistryFile =
            toml::from_str(source).map_err(|e| ProceduralError::InvalidRegistry(e.to_string()))?;
        self.environments.extend(file.environment);
        self.assemblages.extend(file.assemblage);
        Ok(self)
    }

    /// Validates and freezes the registry.
    ///
    /// # Errors
    ///
    /// Rejects duplicate environment ids, duplicate assemblage types,
    /// assemblages naming an unregistered environment, and non-empty spawn
    /// tables whose weights sum to zero.
    pub fn build(self) -> ProceduralResult<AssemblageRegistry> {
        let mut environments = HashMap::with_capacity(self.environments.len());
        for env in self.environments {
            if environments.contains_key(&env.id) {
                return Err(ProceduralError::DuplicateEnvironment(env.id));
            }
            environments.insert(env.id.clone(), env);
        }

        let mut by_type = HashMap::with_capacity(self.assemblages.len());
        let mut by_environment: HashMap<String, Vec<usize>> = HashMap::new();
        let mut by_tag: HashMap<String, Vec<usize>> = HashMap::new();

        for (index, def) in self.assemblages.iter().enumerate() {
            if by_type.contains_key(&def.type_name) {
                return Err(ProceduralError::DuplicateAssemblage(def.type_name.clone()));
            }
            if !environments.contains_key(&def.environment) {
                return Err(ProceduralError::UnknownEnvironment {
                    assemblage: def.type_name.clone(),
                    environment: def.environment.clone(),
                });
            }
            let tables = [def.enemy_table.as_ref(), def.loot_table.as_ref()];
            if tables
                .into_iter()
                .flatten()
                .any(|t| !t.entries.is_empty() && t.total_weight() == 0)
            {
                return Err(ProceduralError::EmptySpawnTable(def.type_name.clone()));
            }

            by_type.insert(def.type_name.clone(), index);
            by_environment
                .entry(def.environment.clone())
                .or_default()
                .push(index);
            for tag in &def.tags {
                by_tag.entry(tag.clone()).or_default().push(index);
            }
        }

        tracing::debug!(
            environments = environments.len(),
            assemblages = self.assemblages.len(),
            "assemblage registry built"
        );

        Ok(AssemblageRegistry {
            environments,
            definitions: self.assemblages,
            by_type,
            by_environment,
            by_tag,
        })
    }
}

/// Immutable lookup from environment and tag to assemblage definitions.
#[derive(Debug)]
pub struct AssemblageRegistry {
    environments: HashMap<String, EnvironmentDefinition>,
    definitions: Vec<AssemblageDefinition>,
    by_type: HashMap<String, usize>,
    by_environment: HashMap<String, Vec<usize>>,
    by_tag: HashMap<String, Vec<usize>>,
}

impl AssemblageRegistry {
    /// Starts a new registry.
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Parses and validates a TOML registry document.
    ///
    /// # Errors
    ///
    /// See `RegistryBuilder::toml_str` and `RegistryBuilder::build`.
    pub fn from_toml_str(source: &str) -> ProceduralResult<Self> {
        RegistryBuilder::new().toml_str(source)?.build()
    }

    /// The assemblages bundled with the crate.
    ///
    /// # Errors
    ///
    /// Only fails if the bundled data file is malformed.
    pub fn builtin() -> ProceduralResult<Self> {
        Self::from_toml_str(BUILTIN_ASSEMBLAGES)
    }

    /// Environment definition by id.
    #[must_use]
    pub fn environment(&self, id: &str) -> Option<&EnvironmentDefinition> {
        self.environments.get(id)
    }

    /// All registered environment ids, sorted.
    #[must_use]
    pub fn environment_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.environments.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Definition by type name.
    #[must_use]
    pub fn get(&self, type_name: &str) -> Option<&AssemblageDefinition> {
        self.by_type.get(type_name).map(|&i| &self.definitions[i])
    }

    /// Definitions of one environment, in registration order.
    #[must_use]
    pub fn for_environment(&self, environment: &str) -> Vec<&AssemblageDefinition> {
        self.indexed(self.by_environment.get(environment))
    }

    /// Definitions carrying `tag`, in registration order.
    #[must_use]
    pub fn with_tag(&self, tag: &str) -> Vec<&AssemblageDefinition> {
        self.indexed(self.by_tag.get(tag))
    }

    /// Number of registered definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    fn indexed(&self, indices: Option<&Vec<usize>>) -> Vec<&AssemblageDefinition> {
        indices
            .map(|list| list.iter().map(|&i| &self.definitions[i]).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemblage::LayoutKind;

    const SMALL: &str = r#"
        [[environment]]
        id = "test_env"
        layout = "surface"

        [[assemblage]]
        type = "base"
        environment = "test_env"
        tags = ["terrain"]

        [[assemblage]]
        type = "rock"
        environment = "test_env"
        tags = ["obstacle", "natural"]
    "#;

    #[test]
    fn test_builtin_registry_loads() {
        let registry = AssemblageRegistry::builtin().unwrap();
        assert_eq!(
            registry.environment_ids(),
            vec!["cave_tunnels", "station_interior", "surface_rocky"]
        );
        assert!(registry.get("terrain_flat").is_some());
        assert!(registry.get("rock_cluster").is_some());
        assert!(!registry.for_environment("station_interior").is_empty());
    }

    #[test]
    fn test_lookups_preserve_order() {
        let registry = AssemblageRegistry::from_toml_str(SMALL).unwrap();
        let names: Vec<_> = registry
            .for_environment("test_env")
            .iter()
            .map(|d| d.type_name.as_str())
            .collect();
        assert_eq!(names, vec!["base", "rock"]);
        assert_eq!(registry.with_tag("natural")[0].type_name, "rock");
        assert!(registry.with_tag("missing").is_empty());
        assert!(registry.for_environment("nowhere").is_empty());
        assert_eq!(
            registry.environment("test_env").map(|e| e.layout),
            Some(LayoutKind::Surface)
        );
    }

    #[test]
    fn test_rejects_duplicate_type() {
        let doc = format!(
            "{SMALL}\n[[assemblage]]\ntype = \"rock\"\nenvironment = \"test_env\"\n"
        );
        assert_eq!(
            AssemblageRegistry::from_toml_str(&doc).unwrap_err(),
            ProceduralError::DuplicateAssemblage("rock".into())
        );
    }

    #[test]
    fn test_rejects_unknown_environment() {
        let err = AssemblageRegistry::from_toml_str(
            "[[assemblage]]\ntype = \"stray\"\nenvironment = \"void\"\n",
        )
        .unwrap_err();
        assert!(matches!(err, ProceduralError::UnknownEnvironment { .. }));
    }

    #[test]
    fn test_rejects_zero_weight_table() {
        let doc = format!(
            "{SMALL}\n[[assemblage]]\ntype = \"nest\"\nenvironment = \"test_env\"\n\
             enemy_table = {{ entries = [{{ id = \"crawler\", weight = 0 }}] }}\n"
        );
        assert_eq!(
            AssemblageRegistry::from_toml_str(&doc).unwrap_err(),
            ProceduralError::EmptySpawnTable("nest".into())
        );
    }

    #[test]
    fn test_malformed_toml_is_reported() {
        let err = AssemblageRegistry::from_toml_str("[[assemblage]\n").unwrap_err();
        assert!(matches!(err, ProceduralError::InvalidRegistry(_)));
    }
}
