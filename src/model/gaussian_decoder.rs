pub use burn::{
    config::Config,
    module::Module,
    tensor::{backend::Backend, Tensor},
};

use super::{
    decoder::{normalize_dims, MultiresConvDecoder, MultiresConvDecoderConfig},
    params::GaussianDecoderParams,
};
use crate::error::Error;

/// Dense-prediction decoder producing per-pixel Gaussian feature vectors
/// from the monodepth feature pyramid.
#[derive(Debug, Module)]
pub struct GaussianDensePredictionTransformer<B: Backend> {
    pub decoder: MultiresConvDecoder<B>,
    pub level: usize,
    pub stride: usize,
}

impl<B: Backend> GaussianDensePredictionTransformer<B> {
    /// Channel count of [`Self::forward`] outputs.
    #[inline]
    pub fn dim_out(&self) -> usize {
        self.decoder.dims_decoder[self.level]
    }

    /// Per-pixel Gaussian features at the configured stride.
    ///
    /// The shape is `[B, dim_out, H / stride, W / stride]`.
    pub fn forward(
        &self,
        features: Vec<Tensor<B, 4>>,
    ) -> Tensor<B, 4> {
        self.decoder.forward(features).swap_remove(self.level)
    }
}

/// Create the Gaussian feature decoder on top of the monodepth features.
///
/// `dims_depth_features` and `strides` come from the monodepth adaptor; the
/// configured stride has to be one of the pyramid strides.
pub fn create_gaussian_decoder<B: Backend>(
    params: &GaussianDecoderParams,
    dims_depth_features: Vec<usize>,
    strides: &[usize],
    device: &B::Device,
) -> Result<GaussianDensePredictionTransformer<B>, Error> {
    let level = strides
        .iter()
        .position(|stride| *stride == params.stride)
        .ok_or_else(|| {
            Error::Config(
                format!("gaussian_decoder.stride ({})", params.stride),
                format!("one of the feature pyramid strides ({strides:?})"),
            )
        })?;
    let dims_decoder =
        normalize_dims(&params.dims_decoder, dims_depth_features.len())?;

    Ok(GaussianDensePredictionTransformer {
        decoder: MultiresConvDecoderConfig::new(
            dims_depth_features,
            dims_decoder,
        )
        .init(device),
        level,
        stride: params.stride,
    })
}

#[cfg(test)]
mod tests {
    use burn::backend::NdArray;

    #[test]
    fn decoder_outputs_at_configured_stride() {
        use super::*;

        let device = Default::default();
        let params = GaussianDecoderParams::new()
            .with_stride(8)
            .with_dims_decoder(vec![24]);
        let decoder = create_gaussian_decoder::<NdArray>(
            &params,
            vec![8, 16, 24],
            &[4, 8, 16],
            &device,
        )
        .unwrap();
        assert_eq!(decoder.dim_out(), 24);

        let features = vec![
            Tensor::zeros([1, 8, 16, 16], &device),
            Tensor::zeros([1, 16, 8, 8], &device),
            Tensor::zeros([1, 24, 4, 4], &device),
        ];
        assert_eq!(decoder.forward(features).dims(), [1, 24, 8, 8]);
    }

    #[test]
    fn stride_outside_pyramid_is_rejected() {
        use super::*;

        let device = Default::default();
        let params = GaussianDecoderParams::new().with_stride(12);
        let error = create_gaussian_decoder::<NdArray>(
            &params,
            vec![8, 16, 24],
            &[4, 8, 16],
            &device,
        )
        .unwrap_err();

        assert!(matches!(error, Error::Config(..)), "{error}");
    }
}
