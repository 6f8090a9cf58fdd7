pub use burn::config::Config;

use crate::error::Error;
use burn::tensor::{activation, backend::Backend, Tensor};
use std::str;

/// Named nonlinearities mapping raw logits into `[0.0, 1.0]`.
///
/// Selected by name at configuration time; dispatch is a fixed match, so an
/// unrecognized name fails before any tensor computation.
#[derive(Config, Copy, Debug, PartialEq)]
pub enum ParamActivation {
    Sigmoid,
    ClampedExp,
    ClampedLinear,
}

/// Output color encodings.
#[derive(Config, Copy, Debug, PartialEq)]
pub enum ColorSpace {
    Srgb,
    Linear,
}

impl ParamActivation {
    /// They range from `0.0` to `1.0`.
    pub fn apply<B: Backend, const D: usize>(
        &self,
        values: Tensor<B, D>,
    ) -> Tensor<B, D> {
        match self {
            Self::Sigmoid => activation::sigmoid(values),
            Self::ClampedExp => values.clamp_max(0.0).exp(),
            Self::ClampedLinear => values.clamp(0.0, 1.0),
        }
    }
}

impl ColorSpace {
    /// Transform activated sRGB values into the selected encoding.
    ///
    /// The input and output both range from `0.0` to `1.0`.
    pub fn transform<B: Backend, const D: usize>(
        &self,
        colors: Tensor<B, D>,
    ) -> Tensor<B, D> {
        match self {
            Self::Srgb => colors,
            Self::Linear => {
                let is_low = colors.to_owned().lower_elem(0.04045);
                let low = colors.to_owned().div_scalar(12.92);
                let high = colors
                    .add_scalar(0.055)
                    .div_scalar(1.055)
                    .powf_scalar(2.4);

                high.mask_where(is_low, low)
            },
        }
    }
}

impl str::FromStr for ParamActivation {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "sigmoid" => Ok(Self::Sigmoid),
            "clamped-exp" => Ok(Self::ClampedExp),
            "clamped-linear" => Ok(Self::ClampedLinear),
            _ => Err(Error::Config(
                format!("activation name {name:?}"),
                "one of \"sigmoid\", \"clamped-exp\", \"clamped-linear\""
                    .into(),
            )),
        }
    }
}

impl str::FromStr for ColorSpace {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "srgb" => Ok(Self::Srgb),
            "linear" => Ok(Self::Linear),
            _ => Err(Error::Config(
                format!("color space name {name:?}"),
                "one of \"srgb\", \"linear\"".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use burn::backend::NdArray;

    #[test]
    fn activations_range_from_zero_to_one() {
        use super::*;

        let device = Default::default();
        let logits = Tensor::<NdArray, 1>::from_floats(
            [-1e3, -2.5, -0.5, 0.0, 0.5, 2.5, 1e3],
            &device,
        );

        for activation in [
            ParamActivation::Sigmoid,
            ParamActivation::ClampedExp,
            ParamActivation::ClampedLinear,
        ] {
            let values = activation.apply(logits.to_owned());
            let min = values.to_owned().min().into_scalar();
            let max = values.max().into_scalar();
            assert!(min >= 0.0, "{activation:?}: {min}");
            assert!(max <= 1.0, "{activation:?}: {max}");
        }
    }

    #[test]
    fn srgb_to_linear() {
        use super::*;

        let device = Default::default();
        let colors =
            Tensor::<NdArray, 1>::from_floats([0.0, 0.02, 0.5, 1.0], &device);

        let linear = ColorSpace::Linear.transform(colors.to_owned());
        let values = linear.into_data().to_vec::<f32>().unwrap();

        assert!((values[0] - 0.0).abs() < 1e-6);
        assert!((values[1] - 0.02 / 12.92).abs() < 1e-6);
        assert!((values[2] - 0.21404114).abs() < 1e-5);
        assert!((values[3] - 1.0).abs() < 1e-6);

        let srgb = ColorSpace::Srgb.transform(colors.to_owned());
        assert!(srgb
            .equal(colors)
            .all()
            .into_scalar());
    }

    #[test]
    fn activation_from_name() {
        use super::*;

        assert_eq!(
            "sigmoid".parse::<ParamActivation>().unwrap(),
            ParamActivation::Sigmoid
        );
        assert_eq!("linear".parse::<ColorSpace>().unwrap(), ColorSpace::Linear);

        let error = "softmax".parse::<ParamActivation>().unwrap_err();
        assert!(error.to_string().contains("softmax"), "{error}");
    }
}
