//! Customer Archetypes
//!
//! Loads and caches customer archetype definitions from TOML files. An
//! archetype fixes the shopper's look and how long they'll wait around.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// A customer archetype definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerArchetype {
    pub id: String,
    pub display_name: String,
    pub sprite: String,
    pub patience_ms: u64,
    /// Flavor line the presentation layer can show when this type enters
    #[serde(default)]
    pub tagline: String,
}

/// Registry for all customer archetypes
pub struct ArchetypeRegistry {
    archetypes: HashMap<String, CustomerArchetype>,
    /// Load-order id list for random draws
    ids: Vec<String>,
}

impl ArchetypeRegistry {
    pub fn new() -> Self {
        Self {
            archetypes: HashMap::new(),
            ids: Vec::new(),
        }
    }

    /// Load all archetype definitions from a directory
    pub fn load_from_directory(&mut self, path: &Path) -> Result<(), String> {
        if !path.exists() {
            warn!("Archetype directory does not exist: {:?}", path);
            return Ok(());
        }

        for entry in fs::read_dir(path).map_err(|e| e.to_string())? {
            let entry = entry.map_err(|e| e.to_string())?;
            let file_path = entry.path();

            if file_path.extension().and_then(|s| s.to_str()) == Some("toml") {
                let contents = fs::read_to_string(&file_path)
                    .map_err(|e| format!("Failed to read {:?}: {}", file_path, e))?;

                let archetype: CustomerArchetype = toml::from_str(&contents)
                    .map_err(|e| format!("Failed to parse {:?}: {}", file_path, e))?;

                if self.archetypes.contains_key(&archetype.id) {
                    warn!(
                        "Duplicate archetype ID '{}' in {:?}, overwriting",
                        archetype.id, file_path
                    );
                } else {
                    self.ids.push(archetype.id.clone());
                }

                self.archetypes.insert(archetype.id.clone(), archetype);
            }
        }

        info!("Loaded {} customer archetypes", self.archetypes.len());
        Ok(())
    }

    pub fn get(&self, archetype_id: &str) -> Option<&CustomerArchetype> {
        self.archetypes.get(archetype_id)
    }

    /// Draw one archetype uniformly at random
    pub fn random<R: Rng>(&self, rng: &mut R) -> Option<&CustomerArchetype> {
        self.ids.choose(rng).and_then(|id| self.archetypes.get(id))
    }

    pub fn len(&self) -> usize {
        self.archetypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archetypes.is_empty()
    }
}

#[cfg(test)]
impl ArchetypeRegistry {
    /// Build a registry directly from data; shared by module tests
    pub fn with_data(archetypes: Vec<CustomerArchetype>) -> Self {
        let mut registry = Self::new();
        for archetype in archetypes {
            registry.ids.push(archetype.id.clone());
            registry.archetypes.insert(archetype.id.clone(), archetype);
        }
        registry
    }
}

impl Default for ArchetypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_load_archetypes_from_directory() {
        let temp_dir = TempDir::new().unwrap();

        let toml_content = r#"
id = "art_student"
display_name = "Art Student"
sprite = "customer_student"
patience_ms = 12000
tagline = "Ooh, is this place new?"
"#;
        let mut file = std::fs::File::create(temp_dir.path().join("art_student.toml")).unwrap();
        file.write_all(toml_content.as_bytes()).unwrap();

        let mut registry = ArchetypeRegistry::new();
        registry.load_from_directory(temp_dir.path()).unwrap();

        assert_eq!(registry.len(), 1);
        let archetype = registry.get("art_student").unwrap();
        assert_eq!(archetype.patience_ms, 12000);
        assert_eq!(archetype.display_name, "Art Student");

        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(registry.random(&mut rng).unwrap().id, "art_student");
    }

    #[test]
    fn test_empty_registry() {
        let registry = ArchetypeRegistry::new();
        assert!(registry.is_empty());
        let mut rng = StdRng::seed_from_u64(1);
        assert!(registry.random(&mut rng).is_none());
    }
}
