pub use burn::{
    config::Config,
    module::Module,
    tensor::{backend::Backend, Tensor},
};

use super::composer::GAUSSIAN_PARAM_COUNT;
use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        PaddingConfig2d,
    },
    tensor::activation::gelu,
};

#[derive(Config, Debug)]
pub struct DirectPredictionHeadConfig {
    pub feature_dim: usize,
    pub num_layers: usize,
}

/// Direct projection from decoder features to raw Gaussian parameter
/// channels, [`GAUSSIAN_PARAM_COUNT`] per layer.
#[derive(Debug, Module)]
pub struct DirectPredictionHead<B: Backend> {
    pub conv_1: Conv2d<B>,
    pub conv_2: Conv2d<B>,
    pub num_layers: usize,
}

impl DirectPredictionHeadConfig {
    pub fn init<B: Backend>(
        &self,
        device: &B::Device,
    ) -> DirectPredictionHead<B> {
        DirectPredictionHead {
            conv_1: Conv2dConfig::new(
                [self.feature_dim, self.feature_dim],
                [3, 3],
            )
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init(device),
            conv_2: Conv2dConfig::new(
                [self.feature_dim, self.num_layers * GAUSSIAN_PARAM_COUNT],
                [1, 1],
            )
            .init(device),
            num_layers: self.num_layers,
        }
    }
}

impl<B: Backend> DirectPredictionHead<B> {
    /// `[B, C, h, w]` to raw parameters `[B, L * 14, h, w]`
    pub fn forward(
        &self,
        features: Tensor<B, 4>,
    ) -> Tensor<B, 4> {
        self.conv_2.forward(gelu(self.conv_1.forward(features)))
    }
}
