pub use burn::{
    config::Config,
    module::Module,
    tensor::{backend::Backend, Tensor},
};

use crate::preset::ViTConfig;
use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        transformer::{
            TransformerEncoder, TransformerEncoderConfig,
            TransformerEncoderInput,
        },
        LayerNorm, LayerNormConfig,
    },
    tensor::{
        module::interpolate,
        ops::{InterpolateMode, InterpolateOptions},
    },
};

/// Number of pyramid levels reassembled from the transformer stages.
pub const LEVEL_COUNT: usize = 4;

#[derive(Config, Debug)]
pub struct ViTEncoderConfig {
    pub patch_size: usize,
    pub dim_embed: usize,
    pub num_layers: usize,
    pub num_heads: usize,
    pub dims_encoder: Vec<usize>,
}

/// ViT patch encoder reassembling token features into a multi-resolution
/// pyramid, fine to coarse.
#[derive(Debug, Module)]
pub struct ViTEncoder<B: Backend> {
    pub patch_embed: Conv2d<B>,
    pub stages: Vec<TransformerEncoder<B>>,
    pub norms: Vec<LayerNorm<B>>,
    pub projections: Vec<Conv2d<B>>,
    pub patch_size: usize,
    pub strides: Vec<usize>,
}

impl ViTEncoderConfig {
    pub fn from_preset(preset: &ViTConfig) -> Self {
        Self::new(
            preset.patch_size,
            preset.dim_embed,
            preset.num_layers,
            preset.num_heads,
            preset.dims_encoder.to_owned(),
        )
    }

    pub fn init<B: Backend>(
        &self,
        device: &B::Device,
    ) -> ViTEncoder<B> {
        let patch_embed = Conv2dConfig::new(
            [3, self.dim_embed],
            [self.patch_size, self.patch_size],
        )
        .with_stride([self.patch_size, self.patch_size])
        .init(device);

        let layers_per_stage = (self.num_layers / LEVEL_COUNT).max(1);
        let stages = (0..LEVEL_COUNT)
            .map(|_| {
                TransformerEncoderConfig::new(
                    self.dim_embed,
                    self.dim_embed * 4,
                    self.num_heads,
                    layers_per_stage,
                )
                .with_norm_first(true)
                .init(device)
            })
            .collect();
        let norms = (0..LEVEL_COUNT)
            .map(|_| LayerNormConfig::new(self.dim_embed).init(device))
            .collect();
        let projections = self
            .dims_encoder
            .iter()
            .map(|dim| {
                Conv2dConfig::new([self.dim_embed, *dim], [1, 1]).init(device)
            })
            .collect();

        ViTEncoder {
            patch_embed,
            stages,
            norms,
            projections,
            patch_size: self.patch_size,
            strides: vec![
                self.patch_size / 4,
                self.patch_size / 2,
                self.patch_size,
                self.patch_size * 2,
            ],
        }
    }
}

impl<B: Backend> ViTEncoder<B> {
    /// Encode an image into the feature pyramid, fine to coarse.
    ///
    /// * `images` - `[B, 3, H, W]` with `H` and `W` multiples of
    ///   `patch_size`.
    ///
    /// Level `i` has the shape
    /// `[B, dims_encoder[i], H / strides[i], W / strides[i]]`.
    pub fn forward(
        &self,
        images: Tensor<B, 4>,
    ) -> Vec<Tensor<B, 4>> {
        let [b, _, height, width] = images.dims();
        let (rows, cols) =
            (height / self.patch_size, width / self.patch_size);

        // [B, N, E]
        let mut tokens = self
            .patch_embed
            .forward(images)
            .flatten::<3>(2, 3)
            .swap_dims(1, 2);
        let dim_embed = tokens.dims()[2];

        self.stages
            .iter()
            .zip(&self.norms)
            .zip(&self.projections)
            .zip(&self.strides)
            .map(|(((stage, norm), projection), stride)| {
                tokens = stage
                    .forward(TransformerEncoderInput::new(tokens.to_owned()));

                // [B, E, rows, cols]
                let features = norm
                    .forward(tokens.to_owned())
                    .swap_dims(1, 2)
                    .reshape([b, dim_embed, rows, cols]);

                let features = projection.forward(features);
                let size = [height / stride, width / stride];

                interpolate(
                    features,
                    size,
                    InterpolateOptions::new(InterpolateMode::Bilinear),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use burn::backend::NdArray;

    #[test]
    fn encoder_pyramid_shapes() {
        use super::*;

        let device = Default::default();
        let encoder = ViTEncoderConfig::new(8, 32, 4, 2, vec![8, 16, 24, 32])
            .init::<NdArray>(&device);
        assert_eq!(encoder.strides, vec![2, 4, 8, 16]);

        let images = Tensor::zeros([2, 3, 16, 16], &device);
        let features = encoder.forward(images);

        assert_eq!(features.len(), LEVEL_COUNT);
        assert_eq!(features[0].dims(), [2, 8, 8, 8]);
        assert_eq!(features[1].dims(), [2, 16, 4, 4]);
        assert_eq!(features[2].dims(), [2, 24, 2, 2]);
        assert_eq!(features[3].dims(), [2, 32, 1, 1]);
    }
}
