pub use super::{
    camera::Intrinsics,
    composer::{GaussianComposer, GaussianComposerConfig},
    gaussians::GaussianSplats,
    params::PredictorParams,
};
pub use burn::{
    module::{Ignored, Module},
    tensor::{backend::Backend, Tensor},
};

use super::{
    alignment::{create_alignment, ScaleMapEstimator},
    gaussian_decoder::{
        create_gaussian_decoder, GaussianDensePredictionTransformer,
    },
    heads::{DirectPredictionHead, DirectPredictionHeadConfig},
    initializer::{create_initializer, MultiLayerInitializer},
    monodepth::{
        create_monodepth_adaptor, create_monodepth_dpt,
        MonodepthWithEncodingAdaptor,
    },
};
use crate::error::Error;
use humansize::{format_size, BINARY};
use std::{fmt, mem::size_of};

/// Single-image Gaussian splat predictor.
#[derive(Module)]
pub struct RGBGaussianPredictor<B: Backend> {
    pub init_model: MultiLayerInitializer<B>,
    pub feature_model: GaussianDensePredictionTransformer<B>,
    pub prediction_head: DirectPredictionHead<B>,
    pub monodepth_model: MonodepthWithEncodingAdaptor<B>,
    pub gaussian_composer: Ignored<GaussianComposer>,
    pub scale_map_estimator: ScaleMapEstimator<B>,
}

#[derive(Clone, Debug)]
pub struct PredictorOutput<B: Backend> {
    pub gaussians: GaussianSplats<B>,

    /// `[B, D, h, w]`, predicted depth layers at the monodepth resolution.
    pub depths: Tensor<B, 4>,
}

impl<B: Backend> RGBGaussianPredictor<B> {
    /// Predict Gaussian primitives for a batch of RGB images.
    ///
    /// * `images` - `[B, 3, H, W]` with `H` and `W` multiples of the
    ///   backbone patch size.
    /// * `intrinsics` - pinhole intrinsics of the full-resolution images.
    pub fn forward(
        &self,
        images: Tensor<B, 4>,
        intrinsics: &Intrinsics,
    ) -> PredictorOutput<B> {
        log::debug!(target: "monosplat::predictor", "start");

        let device = images.device();
        let [_, _, height, width] = images.dims();

        let monodepth = self.monodepth_model.forward(images);

        // [B, L, H / s_init, W / s_init]
        let seeds = self
            .init_model
            .forward(monodepth.depths.to_owned(), [height, width]);

        // [B, C, h, w]
        let features = self.feature_model.forward(monodepth.features);
        let [_, _, rows, cols] = features.dims();

        // [B, L * 14, h, w]
        let raw_params = self.prediction_head.forward(features);

        // [B, 1, h, w]
        let scales_map = self
            .scale_map_estimator
            .forward(monodepth.decoder_features, [rows, cols]);

        // [1, 3, h, w]
        let rays = intrinsics.pixel_rays(
            [rows, cols],
            self.feature_model.stride,
            &device,
        );

        let gaussians = self
            .gaussian_composer
            .0
            .compose(raw_params, seeds, scales_map, rays);

        log::debug!(target: "monosplat::predictor", "{gaussians:?}");

        PredictorOutput {
            gaussians,
            depths: monodepth.depths,
        }
    }
}

impl<B: Backend> fmt::Debug for RGBGaussianPredictor<B> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter,
    ) -> fmt::Result {
        f.debug_struct("RGBGaussianPredictor")
            .field("num_params", &self.num_params())
            .field("monodepth_model", &self.monodepth_model)
            .field("gaussian_composer", &self.gaussian_composer.0)
            .finish()
    }
}

/// Validate the configuration and wire the predictor together.
///
/// Fails before any tensor computation on an invalid stride ordering, a
/// non-integral stride ratio, or an unsupported layer-count combination.
pub fn create_predictor<B: Backend>(
    params: &PredictorParams,
    device: &B::Device,
) -> Result<RGBGaussianPredictor<B>, Error> {
    let stride_decoder = params.gaussian_decoder.stride;
    let stride_init = params.initializer.stride;

    if stride_decoder < stride_init {
        return Err(Error::Config(
            format!("gaussian_decoder.stride ({stride_decoder})"),
            format!("no less than initializer.stride ({stride_init})"),
        ));
    }
    if stride_decoder % stride_init != 0 {
        return Err(Error::Config(
            format!("gaussian_decoder.stride ({stride_decoder})"),
            format!("an integer multiple of initializer.stride ({stride_init})"),
        ));
    }
    if params.num_monodepth_layers > 1 && params.initializer.num_layers != 2 {
        return Err(Error::Config(
            format!("initializer.num_layers ({})", params.initializer.num_layers),
            format!(
                "2 when num_monodepth_layers ({}) > 1",
                params.num_monodepth_layers
            ),
        ));
    }

    let scale_factor = stride_decoder / stride_init;
    let gaussian_composer = GaussianComposerConfig::new(scale_factor)
        .with_delta_factor(params.delta_factor)
        .with_min_scale(params.min_scale)
        .with_max_scale(params.max_scale)
        .with_color_activation(params.color_activation)
        .with_opacity_activation(params.opacity_activation)
        .with_color_space(params.color_space)
        .with_base_scale_on_predicted_mean(params.base_scale_on_predicted_mean)
        .init();

    let monodepth_model = create_monodepth_dpt(&params.monodepth, device)?;
    let mut monodepth_adaptor = create_monodepth_adaptor(
        monodepth_model,
        &params.monodepth_adaptor,
        params.sorting_monodepth,
        device,
    )?;
    if params.num_monodepth_layers == 2 {
        monodepth_adaptor
            .replicate_head(params.num_monodepth_layers, device);
    }

    let gaussian_decoder = create_gaussian_decoder(
        &params.gaussian_decoder,
        monodepth_adaptor.feature_dims(),
        &monodepth_adaptor.strides(),
        device,
    )?;
    let initializer = create_initializer(&params.initializer, device);
    let prediction_head = DirectPredictionHeadConfig::new(
        gaussian_decoder.dim_out(),
        initializer.num_layers,
    )
    .init(device);
    let scale_map_estimator = create_alignment(
        &params.depth_alignment,
        monodepth_adaptor.dim_decoder_out(),
        device,
    );

    let predictor = RGBGaussianPredictor {
        init_model: initializer,
        feature_model: gaussian_decoder,
        prediction_head,
        monodepth_model: monodepth_adaptor,
        gaussian_composer: Ignored(gaussian_composer),
        scale_map_estimator,
    };

    log::info!(
        target: "monosplat::predictor",
        "created: scale_factor {scale_factor}, {} of parameters",
        format_size(predictor.num_params() * size_of::<f32>(), BINARY),
    );

    Ok(predictor)
}

#[cfg(test)]
mod tests {
    use crate::{model::params::*, preset::ViTPreset};
    use burn::backend::NdArray;

    fn params() -> PredictorParams {
        PredictorParams::new(
            MonodepthParams::new(ViTPreset::Tiny)
                .with_dims_decoder(vec![16])
                .with_dim_head_hidden(16),
        )
        .with_monodepth_adaptor(
            MonodepthAdaptorParams::new().with_dim_encoding(8),
        )
        .with_gaussian_decoder(
            GaussianDecoderParams::new()
                .with_stride(16)
                .with_dims_decoder(vec![16]),
        )
        .with_depth_alignment(DepthAlignmentParams::new().with_dim_hidden(8))
    }

    #[test]
    fn strides_16_over_8_succeed() {
        use super::*;

        let device = Default::default();
        let params = params()
            .with_initializer(InitializerParams::new().with_stride(8));

        let predictor =
            create_predictor::<NdArray>(&params, &device).unwrap();
        assert_eq!(predictor.gaussian_composer.0.scale_factor, 2);
    }

    #[test]
    fn decoder_above_initializer_resolution_is_rejected() {
        use super::*;

        let device = Default::default();
        let params = params()
            .with_gaussian_decoder(GaussianDecoderParams::new().with_stride(8))
            .with_initializer(InitializerParams::new().with_stride(16));

        let error =
            create_predictor::<NdArray>(&params, &device).unwrap_err();
        assert!(matches!(error, Error::Config(..)), "{error}");
    }

    #[test]
    fn inexact_stride_ratio_is_rejected() {
        use super::*;

        let device = Default::default();
        let params = params()
            .with_initializer(InitializerParams::new().with_stride(6));

        let error =
            create_predictor::<NdArray>(&params, &device).unwrap_err();
        assert!(matches!(error, Error::Config(..)), "{error}");
    }

    #[test]
    fn multi_layer_monodepth_needs_two_seed_layers() {
        use super::*;

        let device = Default::default();
        let params = params()
            .with_num_monodepth_layers(2)
            .with_initializer(
                InitializerParams::new().with_stride(8).with_num_layers(1),
            );

        let error =
            create_predictor::<NdArray>(&params, &device).unwrap_err();
        assert!(matches!(error, Error::Config(..)), "{error}");
    }

    #[test]
    fn two_monodepth_layers_replicate_the_head() {
        use super::*;

        let device = Default::default();
        let params = params()
            .with_num_monodepth_layers(2)
            .with_initializer(
                InitializerParams::new().with_stride(8).with_num_layers(2),
            );

        let predictor =
            create_predictor::<NdArray>(&params, &device).unwrap();
        assert_eq!(predictor.monodepth_model.heads.len(), 2);
        assert_ne!(
            predictor.monodepth_model.heads[0].conv_1.weight.id,
            predictor.monodepth_model.heads[1].conv_1.weight.id,
        );
    }

    #[test]
    fn forward_composes_valid_gaussians() {
        use super::*;

        let device = Default::default();
        let params = params()
            .with_num_monodepth_layers(2)
            .with_sorting_monodepth(true)
            .with_initializer(
                InitializerParams::new().with_stride(8).with_num_layers(2),
            );

        let predictor =
            create_predictor::<NdArray>(&params, &device).unwrap();

        let images = Tensor::random(
            [1, 3, 64, 64],
            burn::tensor::Distribution::Uniform(0.0, 1.0),
            &device,
        );
        let intrinsics = Intrinsics {
            focals: [64.0, 64.0],
            principal_point: [32.0, 32.0],
        };
        let output = predictor.forward(images, &intrinsics);

        // 2 layers on the 4x4 decoder grid
        assert_eq!(output.gaussians.splat_count(), 2 * 4 * 4);
        assert_eq!(output.depths.dims(), [1, 2, 16, 16]);

        let min = output.gaussians.opacities.to_owned().min().into_scalar();
        let max = output.gaussians.opacities.max().into_scalar();
        assert!(min >= 0.0 && max <= 1.0, "opacities: [{min}, {max}]");

        let min = output.gaussians.scales.to_owned().min().into_scalar();
        let max = output.gaussians.scales.max().into_scalar();
        assert!(
            min >= params.min_scale as f32 && max <= params.max_scale as f32,
            "scales: [{min}, {max}]",
        );
    }
}
