//! Product Template Structures
//!
//! Defines the immutable product templates artwork gets applied to, and the
//! paint colors the drawing layer exposes.

use serde::{Deserialize, Serialize};

/// Where artwork sits on a product, in template-local pixel space
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ArtAnchor {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub rotation: f32,
}

/// An immutable product template (mug, tote, shirt, poster)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductTemplate {
    pub id: String,
    pub display_name: String,
    pub base_price: i64,
    pub art_anchor: ArtAnchor,
}

/// A paint color from the drawing palette
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaintColor {
    pub id: String,
    pub display_name: String,
    pub hex: String,
}

/// Wrapper for the colors.toml palette file
#[derive(Debug, Clone, Deserialize)]
pub struct PaletteFile {
    pub colors: Vec<PaintColor>,
}
