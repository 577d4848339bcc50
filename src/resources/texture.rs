//! Texture and sampler descriptions

use crate::EntityId;
use image::GenericImageView;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TextureError {
    #[error("failed to decode image '{name}': {source}")]
    Decode {
        name: String,
        source: image::ImageError,
    },
}

/// Decoded RGBA8 texture data, uploaded to the GPU on first use
pub struct TextureData {
    id: EntityId,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub name: String,
}

impl TextureData {
    /// Decode texture data from an encoded image (PNG, JPEG, ...)
    pub fn from_bytes(bytes: &[u8], name: &str) -> Result<Self, TextureError> {
        let img = image::load_from_memory(bytes).map_err(|source| TextureError::Decode {
            name: name.to_string(),
            source,
        })?;
        let (width, height) = img.dimensions();
        let data = img.to_rgba8().into_raw();

        Ok(Self {
            id: EntityId::next(),
            width,
            height,
            data,
            name: name.to_string(),
        })
    }

    /// Create a 1x1 solid color texture
    pub fn solid_color(color: [u8; 4], name: &str) -> Self {
        Self {
            id: EntityId::next(),
            width: 1,
            height: 1,
            data: color.to_vec(),
            name: name.to_string(),
        }
    }

    /// Create a default white texture
    pub fn white() -> Self {
        Self::solid_color([255, 255, 255, 255], "white")
    }

    /// Create a checkerboard texture with 8x8 pixel cells
    pub fn checkerboard(size: u32, color1: [u8; 4], color2: [u8; 4]) -> Self {
        let mut data = Vec::with_capacity((size * size * 4) as usize);

        for y in 0..size {
            for x in 0..size {
                let is_even = ((x / 8) + (y / 8)) % 2 == 0;
                let color = if is_even { color1 } else { color2 };
                data.extend_from_slice(&color);
            }
        }

        Self {
            id: EntityId::next(),
            width: size,
            height: size,
            data,
            name: "checkerboard".to_string(),
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }
}

/// Texture filtering mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    Nearest,
    #[default]
    Linear,
}

/// Texture addressing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressMode {
    ClampToEdge,
    #[default]
    Repeat,
    MirrorRepeat,
}

/// Sampler description; value-keyed, so identical descriptors share one
/// GPU sampler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SamplerDesc {
    pub mag_filter: FilterMode,
    pub min_filter: FilterMode,
    pub address_mode_u: AddressMode,
    pub address_mode_v: AddressMode,
}

impl SamplerDesc {
    pub fn nearest() -> Self {
        Self {
            mag_filter: FilterMode::Nearest,
            min_filter: FilterMode::Nearest,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solid_color_is_one_pixel() {
        let tex = TextureData::solid_color([10, 20, 30, 255], "tint");
        assert_eq!((tex.width, tex.height), (1, 1));
        assert_eq!(tex.data, vec![10, 20, 30, 255]);
    }

    #[test]
    fn checkerboard_alternates_cells() {
        let tex = TextureData::checkerboard(16, [255, 255, 255, 255], [0, 0, 0, 255]);
        assert_eq!(tex.data.len(), 16 * 16 * 4);
        // first cell white, cell at (8, 0) black
        assert_eq!(&tex.data[0..4], &[255, 255, 255, 255]);
        assert_eq!(&tex.data[8 * 4..8 * 4 + 4], &[0, 0, 0, 255]);
    }

    #[test]
    fn equal_sampler_descs_share_a_key() {
        use std::collections::HashMap;
        let mut map: HashMap<SamplerDesc, u32> = HashMap::new();
        map.insert(SamplerDesc::default(), 1);
        map.insert(SamplerDesc::default(), 2);
        map.insert(SamplerDesc::nearest(), 3);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn textures_get_distinct_entity_ids() {
        assert_ne!(TextureData::white().id(), TextureData::white().id());
    }
}
