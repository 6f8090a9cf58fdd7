pub mod adaptor;

pub use adaptor::*;
pub use burn::{
    config::Config,
    module::Module,
    tensor::{backend::Backend, Tensor},
};

use super::{
    decoder::{create_monodepth_decoder, MultiresConvDecoder},
    encoder::{ViTEncoder, ViTEncoderConfig},
    params::MonodepthParams,
};
use crate::error::Error;
use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        PaddingConfig2d,
    },
    tensor::activation::{relu, softplus},
};

#[derive(Config, Debug)]
pub struct DepthHeadConfig {
    pub dim_in: usize,

    #[config(default = 128)]
    pub dim_hidden: usize,
}

/// Projection from fused decoder features to one positive depth layer.
#[derive(Debug, Module)]
pub struct DepthHead<B: Backend> {
    pub conv_1: Conv2d<B>,
    pub conv_2: Conv2d<B>,
}

/// Monocular depth estimation model: ViT patch encoder, multi-resolution
/// fusion decoder, and a depth prediction head.
#[derive(Debug, Module)]
pub struct MonodepthDensePredictionTransformer<B: Backend> {
    pub encoder: ViTEncoder<B>,
    pub decoder: MultiresConvDecoder<B>,
    pub head: DepthHead<B>,
}

impl DepthHeadConfig {
    pub fn init<B: Backend>(
        &self,
        device: &B::Device,
    ) -> DepthHead<B> {
        DepthHead {
            conv_1: Conv2dConfig::new([self.dim_in, self.dim_hidden], [3, 3])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .init(device),
            conv_2: Conv2dConfig::new([self.dim_hidden, 1], [1, 1])
                .init(device),
        }
    }
}

impl<B: Backend> DepthHead<B> {
    /// `[B, C, h, w]` to one positive depth layer `[B, 1, h, w]`
    pub fn forward(
        &self,
        features: Tensor<B, 4>,
    ) -> Tensor<B, 4> {
        softplus(self.conv_2.forward(relu(self.conv_1.forward(features))), 1.0)
    }
}

impl<B: Backend> MonodepthDensePredictionTransformer<B> {
    /// Fused multi-resolution depth features, fine to coarse.
    pub fn features(
        &self,
        images: Tensor<B, 4>,
    ) -> Vec<Tensor<B, 4>> {
        self.decoder.forward(self.encoder.forward(images))
    }

    /// Depth at the finest feature resolution.
    ///
    /// The shape is `[B, 1, H / strides[0], W / strides[0]]`.
    pub fn forward(
        &self,
        images: Tensor<B, 4>,
    ) -> Tensor<B, 4> {
        let mut features = self.features(images);

        self.head.forward(features.swap_remove(0))
    }
}

/// Create the monodepth model for the configured backbone preset.
pub fn create_monodepth_dpt<B: Backend>(
    params: &MonodepthParams,
    device: &B::Device,
) -> Result<MonodepthDensePredictionTransformer<B>, Error> {
    let encoder =
        ViTEncoderConfig::from_preset(params.preset.config()).init(device);
    let decoder = create_monodepth_decoder(
        params.preset,
        &params.dims_decoder,
        device,
    )?;
    let head = DepthHeadConfig::new(decoder.dim_out())
        .with_dim_hidden(params.dim_head_hidden)
        .init(device);

    Ok(MonodepthDensePredictionTransformer {
        encoder,
        decoder,
        head,
    })
}

#[cfg(test)]
mod tests {
    use burn::backend::NdArray;

    #[test]
    fn depth_is_positive() {
        use super::*;

        let device = Default::default();
        let head = DepthHeadConfig::new(8)
            .with_dim_hidden(8)
            .init::<NdArray>(&device);

        let features = Tensor::random(
            [1, 8, 4, 4],
            burn::tensor::Distribution::Normal(0.0, 10.0),
            &device,
        );
        let depths = head.forward(features);

        assert_eq!(depths.dims(), [1, 1, 4, 4]);
        assert!(depths.min().into_scalar() > 0.0);
    }
}
