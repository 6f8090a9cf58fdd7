pub use super::activation::{ColorSpace, ParamActivation};
pub use crate::preset::ViTPreset;
pub use burn::config::Config;

/// Monodepth dense-prediction-transformer architecture.
#[derive(Config, Debug)]
pub struct MonodepthParams {
    /// The preset patch encoder architecture.
    pub preset: ViTPreset,

    /// Fused decoder dims; a single entry is broadcast over all levels.
    #[config(default = "vec![256]")]
    pub dims_decoder: Vec<usize>,

    #[config(default = 128)]
    pub dim_head_hidden: usize,
}

/// Monodepth adaptor wrapping the model for the Gaussian stages.
#[derive(Config, Debug)]
pub struct MonodepthAdaptorParams {
    /// Channels of the depth encoding appended to the finest feature level.
    #[config(default = 32)]
    pub dim_encoding: usize,
}

/// Gaussian feature decoder conditioned on monodepth features.
#[derive(Config, Debug)]
pub struct GaussianDecoderParams {
    /// Output stride; has to be one of the feature pyramid strides.
    #[config(default = 16)]
    pub stride: usize,

    /// Fused decoder dims; a single entry is broadcast over all levels.
    #[config(default = "vec![128]")]
    pub dims_decoder: Vec<usize>,
}

/// Coarse per-layer seed parameterization.
#[derive(Config, Debug)]
pub struct InitializerParams {
    #[config(default = 8)]
    pub stride: usize,

    #[config(default = 1)]
    pub num_layers: usize,
}

/// Depth-scale alignment estimator.
#[derive(Config, Debug)]
pub struct DepthAlignmentParams {
    #[config(default = 64)]
    pub dim_hidden: usize,
}

/// Full predictor configuration.
///
/// Immutable once constructed; validated by
/// [`create_predictor`](super::predictor::create_predictor).
#[derive(Config, Debug)]
pub struct PredictorParams {
    pub monodepth: MonodepthParams,

    #[config(default = "MonodepthAdaptorParams::new()")]
    pub monodepth_adaptor: MonodepthAdaptorParams,

    #[config(default = "GaussianDecoderParams::new()")]
    pub gaussian_decoder: GaussianDecoderParams,

    #[config(default = "InitializerParams::new()")]
    pub initializer: InitializerParams,

    #[config(default = "DepthAlignmentParams::new()")]
    pub depth_alignment: DepthAlignmentParams,

    /// Weight of the raw position deltas added to the seed positions.
    #[config(default = 0.05)]
    pub delta_factor: f64,

    #[config(default = 1e-4)]
    pub min_scale: f64,

    #[config(default = 0.5)]
    pub max_scale: f64,

    #[config(default = "ParamActivation::Sigmoid")]
    pub color_activation: ParamActivation,

    #[config(default = "ParamActivation::Sigmoid")]
    pub opacity_activation: ParamActivation,

    #[config(default = "ColorSpace::Srgb")]
    pub color_space: ColorSpace,

    /// Base the Gaussian scale on the composed mean's depth instead of the
    /// aligned seed depth.
    #[config(default = false)]
    pub base_scale_on_predicted_mean: bool,

    /// Number of predicted depth layers; `2` replicates the monodepth
    /// prediction head.
    #[config(default = 1)]
    pub num_monodepth_layers: usize,

    /// Order the depth layers per pixel, nearest first.
    #[config(default = false)]
    pub sorting_monodepth: bool,
}
