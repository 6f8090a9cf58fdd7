pub use burn::config::Config;

use crate::error::Error;
use lazy_static::lazy_static;
use std::{collections::HashMap, fmt, str};

/// Named ViT patch-encoder architectures.
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    Hash,
    PartialEq,
    burn::serde::Serialize,
    burn::serde::Deserialize,
)]
#[serde(crate = "burn::serde")]
pub enum ViTPreset {
    Tiny,
    Small,
    Base,
    Large,
}

/// Architecture hyperparameters of one [`ViTPreset`].
#[derive(Clone, Debug, PartialEq)]
pub struct ViTConfig {
    pub patch_size: usize,
    pub dim_embed: usize,
    pub num_layers: usize,
    pub num_heads: usize,

    /// Channel counts of the reassembled feature pyramid, fine to coarse.
    pub dims_encoder: Vec<usize>,
}

impl ViTConfig {
    /// Strides of the reassembled feature pyramid, fine to coarse.
    #[inline]
    pub fn strides(&self) -> Vec<usize> {
        vec![
            self.patch_size / 4,
            self.patch_size / 2,
            self.patch_size,
            self.patch_size * 2,
        ]
    }
}

lazy_static! {
    /// Preset table mapping each [`ViTPreset`] to its architecture.
    ///
    /// Read-only after initialization.
    pub static ref VIT_PRESETS: HashMap<ViTPreset, ViTConfig> = [
        (
            ViTPreset::Tiny,
            ViTConfig {
                patch_size: 16,
                dim_embed: 192,
                num_layers: 12,
                num_heads: 3,
                dims_encoder: vec![48, 96, 144, 192],
            },
        ),
        (
            ViTPreset::Small,
            ViTConfig {
                patch_size: 16,
                dim_embed: 384,
                num_layers: 12,
                num_heads: 6,
                dims_encoder: vec![48, 96, 192, 384],
            },
        ),
        (
            ViTPreset::Base,
            ViTConfig {
                patch_size: 16,
                dim_embed: 768,
                num_layers: 12,
                num_heads: 12,
                dims_encoder: vec![96, 192, 384, 768],
            },
        ),
        (
            ViTPreset::Large,
            ViTConfig {
                patch_size: 16,
                dim_embed: 1024,
                num_layers: 24,
                num_heads: 16,
                dims_encoder: vec![256, 512, 1024, 1024],
            },
        ),
    ]
    .into_iter()
    .collect();
}

impl Config for ViTPreset {}

impl ViTPreset {
    /// The preset's architecture from [`VIT_PRESETS`].
    #[inline]
    pub fn config(&self) -> &'static ViTConfig {
        &VIT_PRESETS[self]
    }
}

impl fmt::Display for ViTPreset {
    fn fmt(
        &self,
        f: &mut fmt::Formatter,
    ) -> fmt::Result {
        f.write_str(match self {
            Self::Tiny => "vit-tiny",
            Self::Small => "vit-small",
            Self::Base => "vit-base",
            Self::Large => "vit-large",
        })
    }
}

impl str::FromStr for ViTPreset {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "vit-tiny" => Ok(Self::Tiny),
            "vit-small" => Ok(Self::Small),
            "vit-base" => Ok(Self::Base),
            "vit-large" => Ok(Self::Large),
            _ => Err(Error::UnknownPreset(name.into())),
        }
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn preset_table() {
        use super::*;

        let config = ViTPreset::Small.config();
        assert_eq!(config.dim_embed, 384);
        assert_eq!(config.dims_encoder, vec![48, 96, 192, 384]);
        assert_eq!(config.strides(), vec![4, 8, 16, 32]);

        assert_eq!(VIT_PRESETS.len(), 4);
    }

    #[test]
    fn preset_from_name() {
        use super::*;

        let preset = "vit-base".parse::<ViTPreset>().unwrap();
        assert_eq!(preset, ViTPreset::Base);

        let error = "vit-giant".parse::<ViTPreset>().unwrap_err();
        assert!(error.to_string().contains("vit-giant"), "{error}");
    }
}
