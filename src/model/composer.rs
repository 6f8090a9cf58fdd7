pub use super::{
    activation::{ColorSpace, ParamActivation},
    gaussians::GaussianSplats,
};
pub use burn::{
    config::Config,
    tensor::{backend::Backend, Tensor},
};

/// Raw parameter channels per Gaussian:
/// 3 position deltas, 3 scales, 4 rotations, 3 colors, 1 opacity.
pub const GAUSSIAN_PARAM_COUNT: usize = 14;

#[derive(Config, Debug)]
pub struct GaussianComposerConfig {
    /// Resampling ratio between the initializer grid and the output grid.
    pub scale_factor: usize,

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
}

/// Pure mapping from raw network outputs to valid Gaussian primitives.
///
/// Holds no tensor state; every field is fixed at construction.
#[derive(Clone, Debug)]
pub struct GaussianComposer {
    pub scale_factor: usize,
    pub delta_factor: f64,
    pub min_scale: f64,
    pub max_scale: f64,
    pub color_activation: ParamActivation,
    pub opacity_activation: ParamActivation,
    pub color_space: ColorSpace,
    pub base_scale_on_predicted_mean: bool,
}

impl GaussianComposerConfig {
    pub fn init(&self) -> GaussianComposer {
        GaussianComposer {
            scale_factor: self.scale_factor,
            delta_factor: self.delta_factor,
            min_scale: self.min_scale,
            max_scale: self.max_scale,
            color_activation: self.color_activation,
            opacity_activation: self.opacity_activation,
            color_space: self.color_space,
            base_scale_on_predicted_mean: self.base_scale_on_predicted_mean,
        }
    }
}

impl GaussianComposer {
    /// Compose valid Gaussian primitives from raw head outputs.
    ///
    /// * `raw_params` - `[B, L * 14, h, w]`, raw head outputs, `L` layers of
    ///   [`GAUSSIAN_PARAM_COUNT`] channels each.
    /// * `seeds` - `[B, L, h * scale_factor, w * scale_factor]`, seed depths
    ///   on the initializer grid.
    /// * `scales_map` - `[B, 1, h, w]`, metric scale correction for the
    ///   monocular scale ambiguity.
    /// * `rays` - `[1 | B, 3, h, w]`, unnormalized pixel rays with `z = 1`.
    ///
    /// Deterministic and infallible for shape-consistent inputs.
    pub fn compose<B: Backend>(
        &self,
        raw_params: Tensor<B, 4>,
        seeds: Tensor<B, 4>,
        scales_map: Tensor<B, 4>,
        rays: Tensor<B, 4>,
    ) -> GaussianSplats<B> {
        let [b, c, h, w] = raw_params.dims();
        let l = c / GAUSSIAN_PARAM_COUNT;
        debug_assert_eq!(c % GAUSSIAN_PARAM_COUNT, 0);

        // [B, L, h, w], seeds resampled onto the output grid
        let seeds = if self.scale_factor > 1 {
            let kernel = [self.scale_factor, self.scale_factor];
            burn::tensor::module::avg_pool2d(seeds, kernel, kernel, [0, 0], true)
        } else {
            seeds
        };

        // [B, L, 14, h, w]
        let raw_params = raw_params.reshape([b, l, GAUSSIAN_PARAM_COUNT, h, w]);
        let raw_deltas = raw_params.to_owned().slice([0..b, 0..l, 0..3]);
        let raw_scales = raw_params.to_owned().slice([0..b, 0..l, 3..6]);
        let raw_rotations = raw_params.to_owned().slice([0..b, 0..l, 6..10]);
        let raw_colors = raw_params.to_owned().slice([0..b, 0..l, 10..13]);
        let raw_opacities = raw_params.slice([0..b, 0..l, 13..14]);

        // [B, L, 1, h, w]
        let seeds = seeds.unsqueeze_dim::<5>(2);
        // [1 | B, 1, 3, h, w]
        let rays = rays.unsqueeze_dim::<5>(1);
        // [B, 1, 1, h, w]
        let scales_map = scales_map.unsqueeze_dim::<5>(1);

        // [B, L, 3, h, w], predicted depth unprojected along the pixel rays,
        // displaced by the weighted deltas and corrected for metric scale
        let means = (rays.mul(seeds.to_owned())
            + raw_deltas.mul_scalar(self.delta_factor))
        .mul(scales_map.to_owned());

        // [B, L, 1, h, w]
        let depths = if self.base_scale_on_predicted_mean {
            means.to_owned().slice([0..b, 0..l, 2..3])
        } else {
            seeds.mul(scales_map)
        };

        // [B, L, 3, h, w]
        let scales = raw_scales
            .exp()
            .mul(depths)
            .clamp(self.min_scale, self.max_scale);

        // [B, L, 4, h, w]
        let norms = raw_rotations
            .to_owned()
            .powf_scalar(2.0)
            .sum_dim(2)
            .sqrt()
            .clamp_min(1e-12);
        let rotations = raw_rotations.div(norms);

        // [B, L, 3, h, w]
        let colors = self
            .color_space
            .transform(self.color_activation.apply(raw_colors));
        // [B, L, 1, h, w]
        let opacities = self.opacity_activation.apply(raw_opacities);

        GaussianSplats {
            means: Self::flatten(means),
            scales: Self::flatten(scales),
            rotations: Self::flatten(rotations),
            colors: Self::flatten(colors),
            opacities: Self::flatten(opacities),
        }
    }

    /// `[B, L, C, h, w]` to `[B, L * h * w, C]`
    fn flatten<B: Backend>(values: Tensor<B, 5>) -> Tensor<B, 3> {
        let [b, l, c, h, w] = values.dims();

        values.permute([0, 1, 3, 4, 2]).reshape([b, l * h * w, c])
    }
}
