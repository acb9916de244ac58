//! Catalog Registry
//!
//! Loads and caches product templates and the paint palette from TOML files.

use super::template::{PaintColor, PaletteFile, ProductTemplate};
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Registry for product templates and paint colors
pub struct CatalogRegistry {
    templates: HashMap<String, ProductTemplate>,
    /// Iteration-stable template id list for random draws
    template_ids: Vec<String>,
    colors: Vec<PaintColor>,
}

impl CatalogRegistry {
    /// Create a new empty catalog registry
    pub fn new() -> Self {
        Self {
            templates: HashMap::new(),
            template_ids: Vec::new(),
            colors: Vec::new(),
        }
    }

    /// Load all product templates from `<path>/templates` and the palette
    /// from `<path>/colors.toml`
    pub fn load_from_directory(&mut self, path: &Path) -> Result<(), String> {
        let templates_dir = path.join("templates");
        if !templates_dir.exists() {
            warn!("Template directory does not exist: {:?}", templates_dir);
        } else {
            for entry in fs::read_dir(&templates_dir).map_err(|e| e.to_string())? {
                let entry = entry.map_err(|e| e.to_string())?;
                let file_path = entry.path();

                if file_path.extension().and_then(|s| s.to_str()) == Some("toml") {
                    let contents = fs::read_to_string(&file_path)
                        .map_err(|e| format!("Failed to read {:?}: {}", file_path, e))?;

                    let template: ProductTemplate = toml::from_str(&contents)
                        .map_err(|e| format!("Failed to parse {:?}: {}", file_path, e))?;

                    if self.templates.contains_key(&template.id) {
                        warn!(
                            "Duplicate template ID '{}' in {:?}, overwriting",
                            template.id, file_path
                        );
                    } else {
                        self.template_ids.push(template.id.clone());
                    }

                    self.templates.insert(template.id.clone(), template);
                }
            }
        }

        let palette_path = path.join("colors.toml");
        if palette_path.exists() {
            let contents = fs::read_to_string(&palette_path)
                .map_err(|e| format!("Failed to read {:?}: {}", palette_path, e))?;
            let palette: PaletteFile = toml::from_str(&contents)
                .map_err(|e| format!("Failed to parse {:?}: {}", palette_path, e))?;
            self.colors = palette.colors;
        } else {
            warn!("Palette file does not exist: {:?}", palette_path);
        }

        info!(
            "Loaded {} product templates, {} paint colors",
            self.templates.len(),
            self.colors.len()
        );
        Ok(())
    }

    /// Get a product template by ID
    pub fn get(&self, template_id: &str) -> Option<&ProductTemplate> {
        self.templates.get(template_id)
    }

    /// Check if a template exists in the registry
    pub fn contains(&self, template_id: &str) -> bool {
        self.templates.contains_key(template_id)
    }

    /// Get an iterator over all template IDs, in load order
    pub fn ids(&self) -> impl Iterator<Item = &String> {
        self.template_ids.iter()
    }

    /// Get an iterator over all templates
    pub fn all(&self) -> impl Iterator<Item = &ProductTemplate> {
        self.template_ids.iter().filter_map(|id| self.templates.get(id))
    }

    /// Get the number of templates in the registry
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Check if the registry has no templates
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// The paint palette
    pub fn colors(&self) -> &[PaintColor] {
        &self.colors
    }

    /// Get a paint color by ID
    pub fn color(&self, color_id: &str) -> Option<&PaintColor> {
        self.colors.iter().find(|c| c.id == color_id)
    }

    /// Draw one template ID uniformly at random
    pub fn random_template_id<R: Rng>(&self, rng: &mut R) -> Option<String> {
        self.template_ids.choose(rng).cloned()
    }

    /// Draw up to `count` distinct color IDs uniformly at random
    pub fn random_color_ids<R: Rng>(&self, rng: &mut R, count: usize) -> Vec<String> {
        self.colors
            .choose_multiple(rng, count)
            .map(|c| c.id.clone())
            .collect()
    }
}

#[cfg(test)]
impl CatalogRegistry {
    /// Build a registry directly from data; shared by module tests
    pub fn with_data(templates: Vec<ProductTemplate>, colors: Vec<PaintColor>) -> Self {
        let mut registry = Self::new();
        for template in templates {
            registry.template_ids.push(template.id.clone());
            registry.templates.insert(template.id.clone(), template);
        }
        registry.colors = colors;
        registry
    }
}

impl Default for CatalogRegistry {
    fn default() -> Self {
        Self::new()
    }
}
