//! Shadow Engine - a scene-graph renderer with directional-light shadow mapping
//!
//! The renderer draws a retained node hierarchy in two passes per frame: a
//! depth-only pass from a dedicated shadow camera into an offscreen depth
//! texture, then a forward color pass that samples that texture through a
//! comparison sampler for shadow testing.
//!
//! # Features
//! - Retained scene graph with explicit per-node components (camera, light, model)
//! - Per-entity GPU resource caching (buffers and bind groups created once)
//! - Lambert shading, selectable per-fragment or per-vertex
//! - Single directional light with an orthographic shadow volume

pub mod engine;
pub mod renderer;
pub mod resources;
pub mod scene;
pub mod window;

pub use engine::{Engine, EngineError, FrameTargets};
pub use renderer::{Renderer, RendererError};
pub use window::Window;

use std::sync::atomic::{AtomicU64, Ordering};

/// Stable identity of a scene entity (node, camera, light, material, mesh,
/// texture), used to key the GPU resource cache. Assigned at construction,
/// unique for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u64);

impl EntityId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Shading model for the forward pass, switchable at runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Shading {
    /// Lambert term and shadow test evaluated per fragment
    #[default]
    PerFragment,
    /// Lambert term and shadow test evaluated per vertex and interpolated
    PerVertex,
}

/// Configuration for initializing the renderer
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Window title
    pub title: String,
    /// Initial window width
    pub width: u32,
    /// Initial window height
    pub height: u32,
    /// Enable vsync
    pub vsync: bool,
    /// Side length of the square shadow depth texture, in texels
    pub shadow_map_size: u32,
    /// Initial shading model
    pub shading: Shading,
    /// Start with the shadow-map debug view enabled
    pub show_shadow_map: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            title: "Shadow Engine".to_string(),
            width: 1280,
            height: 720,
            vsync: true,
            shadow_map_size: 2048,
            shading: Shading::default(),
            show_shadow_map: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_ids_are_unique_and_monotonic() {
        let a = EntityId::next();
        let b = EntityId::next();
        let c = EntityId::next();
        assert!(a < b && b < c);
    }

    #[test]
    fn default_config_starts_with_the_shaded_scene() {
        let config = RendererConfig::default();
        assert!(!config.show_shadow_map);
        assert_eq!(config.shading, Shading::PerFragment);
    }
}
