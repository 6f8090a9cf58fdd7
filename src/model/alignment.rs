pub use burn::{
    config::Config,
    module::Module,
    tensor::{backend::Backend, Tensor},
};

use super::params::DepthAlignmentParams;
use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        PaddingConfig2d,
    },
    tensor::{
        activation::{relu, softplus},
        module::interpolate,
        ops::{InterpolateMode, InterpolateOptions},
    },
};

/// Estimates a positive scale-correction map from the monodepth decoder
/// features, resolving the monocular depth scale ambiguity.
#[derive(Debug, Module)]
pub struct ScaleMapEstimator<B: Backend> {
    pub conv_1: Conv2d<B>,
    pub conv_2: Conv2d<B>,
}

impl<B: Backend> ScaleMapEstimator<B> {
    /// Positive scale map on the requested grid.
    ///
    /// The shape is `[B, 1, h, w]`.
    pub fn forward(
        &self,
        features: Tensor<B, 4>,
        grid_size: [usize; 2],
    ) -> Tensor<B, 4> {
        let scales = softplus(
            self.conv_2.forward(relu(self.conv_1.forward(features))),
            1.0,
        );

        interpolate(
            scales,
            grid_size,
            InterpolateOptions::new(InterpolateMode::Bilinear),
        )
    }
}

/// Create the depth-scale alignment estimator.
pub fn create_alignment<B: Backend>(
    params: &DepthAlignmentParams,
    depth_decoder_dim: usize,
    device: &B::Device,
) -> ScaleMapEstimator<B> {
    ScaleMapEstimator {
        conv_1: Conv2dConfig::new([depth_decoder_dim, params.dim_hidden], [3, 3])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init(device),
        conv_2: Conv2dConfig::new([params.dim_hidden, 1], [1, 1]).init(device),
    }
}

#[cfg(test)]
mod tests {
    use burn::backend::NdArray;

    #[test]
    fn scale_map_is_positive() {
        use super::*;

        let device = Default::default();
        let estimator = create_alignment::<NdArray>(
            &DepthAlignmentParams::new().with_dim_hidden(8),
            16,
            &device,
        );

        let features = Tensor::random(
            [1, 16, 8, 8],
            burn::tensor::Distribution::Normal(0.0, 5.0),
            &device,
        );
        let scales = estimator.forward(features, [4, 4]);

        assert_eq!(scales.dims(), [1, 1, 4, 4]);
        assert!(scales.min().into_scalar() > 0.0);
    }
}
