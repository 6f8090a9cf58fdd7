pub use burn::{
    config::Config,
    module::Module,
    tensor::{backend::Backend, Tensor},
};

use crate::{error::Error, preset::ViTPreset};
use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        PaddingConfig2d,
    },
    tensor::{
        activation::relu,
        module::interpolate,
        ops::{InterpolateMode, InterpolateOptions},
    },
};

#[derive(Config, Debug)]
pub struct MultiresConvDecoderConfig {
    /// Channel counts of the input pyramid, fine to coarse.
    pub dims_encoder: Vec<usize>,

    /// Channel counts of the fused outputs, fine to coarse.
    pub dims_decoder: Vec<usize>,
}

/// Pre-activation residual block keeping the channel count.
#[derive(Debug, Module)]
pub struct ResidualConvUnit<B: Backend> {
    pub conv_1: Conv2d<B>,
    pub conv_2: Conv2d<B>,
}

/// Multi-resolution convolutional fusion decoder.
///
/// Projects each pyramid level and fuses coarse to fine with residual conv
/// units and 2x upsampling.
#[derive(Debug, Module)]
pub struct MultiresConvDecoder<B: Backend> {
    pub projections: Vec<Conv2d<B>>,
    pub adapters: Vec<Conv2d<B>>,
    pub fusions: Vec<ResidualConvUnit<B>>,
    pub dims_decoder: Vec<usize>,
}

fn conv3x3<B: Backend>(
    dim_in: usize,
    dim_out: usize,
    device: &B::Device,
) -> Conv2d<B> {
    Conv2dConfig::new([dim_in, dim_out], [3, 3])
        .with_padding(PaddingConfig2d::Explicit(1, 1))
        .init(device)
}

impl<B: Backend> ResidualConvUnit<B> {
    pub fn forward(
        &self,
        values: Tensor<B, 4>,
    ) -> Tensor<B, 4> {
        let residual = self.conv_2.forward(relu(
            self.conv_1.forward(relu(values.to_owned())),
        ));

        values + residual
    }
}

impl MultiresConvDecoderConfig {
    pub fn init<B: Backend>(
        &self,
        device: &B::Device,
    ) -> MultiresConvDecoder<B> {
        debug_assert_eq!(self.dims_encoder.len(), self.dims_decoder.len());

        let projections = self
            .dims_encoder
            .iter()
            .zip(&self.dims_decoder)
            .map(|(dim_in, dim_out)| conv3x3(*dim_in, *dim_out, device))
            .collect();
        let adapters = self
            .dims_decoder
            .windows(2)
            .map(|dims| {
                Conv2dConfig::new([dims[1], dims[0]], [1, 1]).init(device)
            })
            .collect();
        let fusions = self
            .dims_decoder
            .iter()
            .map(|dim| ResidualConvUnit {
                conv_1: conv3x3(*dim, *dim, device),
                conv_2: conv3x3(*dim, *dim, device),
            })
            .collect();

        MultiresConvDecoder {
            projections,
            adapters,
            fusions,
            dims_decoder: self.dims_decoder.to_owned(),
        }
    }
}

impl<B: Backend> MultiresConvDecoder<B> {
    /// Number of pyramid levels.
    #[inline]
    pub fn level_count(&self) -> usize {
        self.dims_decoder.len()
    }

    /// Channel count of the finest fused output.
    #[inline]
    pub fn dim_out(&self) -> usize {
        self.dims_decoder[0]
    }

    /// Fuse the feature pyramid coarse to fine.
    ///
    /// Input and output are both ordered fine to coarse; output level `i`
    /// keeps the input level's resolution with `dims_decoder[i]` channels.
    pub fn forward(
        &self,
        features: Vec<Tensor<B, 4>>,
    ) -> Vec<Tensor<B, 4>> {
        debug_assert_eq!(features.len(), self.level_count());

        let mut fused: Vec<Tensor<B, 4>> = Vec::with_capacity(features.len());

        for (level, features) in features.into_iter().enumerate().rev() {
            let projected = self.projections[level].forward(features);

            let values = match fused.last() {
                None => projected,
                Some(coarser) => {
                    let [_, _, height, width] = projected.dims();
                    let upsampled = interpolate(
                        self.adapters[level].forward(coarser.to_owned()),
                        [height, width],
                        InterpolateOptions::new(InterpolateMode::Bilinear),
                    );

                    projected + upsampled
                },
            };

            fused.push(self.fusions[level].forward(values));
        }

        fused.reverse();
        fused
    }
}

/// Create the monodepth fusion decoder for a named backbone preset.
///
/// A single decoder dim is normalized into a per-level list; an explicit list
/// has to match the preset's level count.
pub fn create_monodepth_decoder<B: Backend>(
    preset: ViTPreset,
    dims_decoder: &[usize],
    device: &B::Device,
) -> Result<MultiresConvDecoder<B>, Error> {
    let dims_encoder = preset.config().dims_encoder.to_owned();
    let dims_decoder = normalize_dims(dims_decoder, dims_encoder.len())?;

    Ok(MultiresConvDecoderConfig::new(dims_encoder, dims_decoder).init(device))
}

/// Normalize a scalar decoder dim into a per-level list.
pub fn normalize_dims(
    dims: &[usize],
    level_count: usize,
) -> Result<Vec<usize>, Error> {
    match dims.len() {
        1 => Ok(vec![dims[0]; level_count]),
        len if len == level_count => Ok(dims.to_vec()),
        len => Err(Error::Config(
            format!("dims_decoder length ({len})"),
            format!("1 or the level count ({level_count})"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use burn::backend::NdArray;

    #[test]
    fn decoder_fuses_to_input_resolutions() {
        use super::*;

        let device = Default::default();
        let decoder =
            MultiresConvDecoderConfig::new(vec![8, 16, 24], vec![12, 12, 12])
                .init::<NdArray>(&device);

        let features = vec![
            Tensor::zeros([1, 8, 16, 16], &device),
            Tensor::zeros([1, 16, 8, 8], &device),
            Tensor::zeros([1, 24, 4, 4], &device),
        ];
        let fused = decoder.forward(features);

        assert_eq!(fused.len(), 3);
        assert_eq!(fused[0].dims(), [1, 12, 16, 16]);
        assert_eq!(fused[1].dims(), [1, 12, 8, 8]);
        assert_eq!(fused[2].dims(), [1, 12, 4, 4]);
        assert_eq!(decoder.dim_out(), 12);
    }

    #[test]
    fn normalize_scalar_dims() {
        use super::*;

        assert_eq!(normalize_dims(&[64], 4).unwrap(), vec![64, 64, 64, 64]);
        assert_eq!(
            normalize_dims(&[32, 64, 96, 128], 4).unwrap(),
            vec![32, 64, 96, 128]
        );
        assert!(normalize_dims(&[32, 64], 4).is_err());
    }

    #[test]
    fn monodepth_decoder_from_preset() {
        use super::*;

        let device = Default::default();
        let decoder = create_monodepth_decoder::<NdArray>(
            ViTPreset::Tiny,
            &[32],
            &device,
        )
        .unwrap();

        assert_eq!(decoder.level_count(), 4);
        assert_eq!(decoder.dims_decoder, vec![32, 32, 32, 32]);
    }
}
