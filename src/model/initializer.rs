pub use burn::{
    config::Config,
    module::{Module, Param},
    tensor::{backend::Backend, Tensor},
};

use super::params::InitializerParams;
use burn::{
    nn::Initializer,
    tensor::{
        module::interpolate,
        ops::{InterpolateMode, InterpolateOptions},
    },
};

/// Produces the per-layer seed depths at the initializer stride.
///
/// When a single depth layer feeds several seed layers, learned per-layer
/// log-scales (zero-initialized) separate the layers.
#[derive(Debug, Module)]
pub struct MultiLayerInitializer<B: Backend> {
    /// `[L]`
    pub log_scales: Param<Tensor<B, 1>>,

    pub stride: usize,
    pub num_layers: usize,
}

impl<B: Backend> MultiLayerInitializer<B> {
    /// Seed depths on the initializer grid.
    ///
    /// * `depths` - `[B, D, h, w]` with `D` either `num_layers` or `1`.
    /// * `image_size` - `[H, W]` of the input image.
    ///
    /// The shape is `[B, num_layers, H / stride, W / stride]`.
    pub fn forward(
        &self,
        depths: Tensor<B, 4>,
        image_size: [usize; 2],
    ) -> Tensor<B, 4> {
        let [height, width] = image_size;
        let layer_count = depths.dims()[1];
        debug_assert!(layer_count == self.num_layers || layer_count == 1);

        let seeds = interpolate(
            depths,
            [height / self.stride, width / self.stride],
            InterpolateOptions::new(InterpolateMode::Bilinear),
        );

        // [1, L, 1, 1], broadcast over a single input layer
        let scales = self
            .log_scales
            .val()
            .exp()
            .reshape([1, self.num_layers, 1, 1]);

        seeds.mul(scales)
    }
}

/// Create the seed initializer.
pub fn create_initializer<B: Backend>(
    params: &InitializerParams,
    device: &B::Device,
) -> MultiLayerInitializer<B> {
    MultiLayerInitializer {
        log_scales: Initializer::Zeros.init([params.num_layers], device),
        stride: params.stride,
        num_layers: params.num_layers,
    }
}
