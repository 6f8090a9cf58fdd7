pub use super::{
    DepthHead, DepthHeadConfig, MonodepthDensePredictionTransformer,
};
pub use burn::{
    module::{Ignored, Module},
    tensor::{backend::Backend, Tensor},
};

use crate::{error::Error, model::params::MonodepthAdaptorParams};
use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        PaddingConfig2d,
    },
    tensor::activation::relu,
};
use std::fmt;

/// Monodepth model wrapped for the Gaussian prediction stages.
///
/// Owns the depth prediction heads (one per depth layer once replicated),
/// appends a learned encoding of the predicted depth to the finest feature
/// level, and reports the feature dims consumed downstream.
#[derive(Module)]
pub struct MonodepthWithEncodingAdaptor<B: Backend> {
    pub model: MonodepthDensePredictionTransformer<B>,

    /// Replicated prediction heads; empty means the model's own head.
    pub heads: Vec<DepthHead<B>>,

    pub encoding: Conv2d<B>,
    pub dim_encoding: usize,

    /// Order the depth layers per pixel, nearest first.
    pub sorting: bool,

    pub head_config: Ignored<DepthHeadConfig>,
}

/// One monodepth forward pass, shared by the downstream stages.
#[derive(Clone, Debug)]
pub struct MonodepthOutput<B: Backend> {
    /// Fused features, fine to coarse; the finest level carries the depth
    /// encoding.
    pub features: Vec<Tensor<B, 4>>,

    /// `[B, dim_out, h, w]`, finest fused features without the encoding.
    pub decoder_features: Tensor<B, 4>,

    /// `[B, D, h, w]`, one layer per prediction head.
    pub depths: Tensor<B, 4>,
}

impl<B: Backend> MonodepthWithEncodingAdaptor<B> {
    /// Channel counts of [`MonodepthOutput::features`], fine to coarse.
    pub fn feature_dims(&self) -> Vec<usize> {
        let mut dims = self.model.decoder.dims_decoder.to_owned();
        dims[0] += self.dim_encoding;

        dims
    }

    /// Strides of [`MonodepthOutput::features`], fine to coarse.
    #[inline]
    pub fn strides(&self) -> Vec<usize> {
        self.model.encoder.strides.to_owned()
    }

    /// Channel count of [`MonodepthOutput::decoder_features`].
    #[inline]
    pub fn dim_decoder_out(&self) -> usize {
        self.model.decoder.dim_out()
    }

    /// `D`
    #[inline]
    pub fn layer_count(&self) -> usize {
        self.heads.len().max(1)
    }

    /// Install `count` independent prediction heads, one per depth layer.
    ///
    /// The heads are freshly initialized, so no parameters are shared.
    pub fn replicate_head(
        &mut self,
        count: usize,
        device: &B::Device,
    ) {
        self.heads =
            (0..count).map(|_| self.head_config.0.init(device)).collect();
    }

    pub fn forward(
        &self,
        images: Tensor<B, 4>,
    ) -> MonodepthOutput<B> {
        let mut features = self.model.features(images);
        let decoder_features = features[0].to_owned();

        // [B, D, h, w]
        let mut depths = if self.heads.is_empty() {
            self.model.head.forward(decoder_features.to_owned())
        } else {
            Tensor::cat(
                self.heads
                    .iter()
                    .map(|head| head.forward(decoder_features.to_owned()))
                    .collect(),
                1,
            )
        };

        if self.sorting && self.layer_count() == 2 {
            let b = depths.dims()[0];
            let near = depths.to_owned().slice([0..b, 0..1]);
            let far = depths.slice([0..b, 1..2]);

            depths = Tensor::cat(
                vec![
                    near.to_owned().min_pair(far.to_owned()),
                    near.max_pair(far),
                ],
                1,
            );
        }

        // [B, E, h, w]
        let encoded =
            relu(self.encoding.forward(depths.to_owned().mean_dim(1)));
        features[0] = Tensor::cat(vec![decoder_features.to_owned(), encoded], 1);

        MonodepthOutput {
            features,
            decoder_features,
            depths,
        }
    }
}

impl<B: Backend> fmt::Debug for MonodepthWithEncodingAdaptor<B> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter,
    ) -> fmt::Result {
        f.debug_struct("MonodepthWithEncodingAdaptor")
            .field("heads.len()", &self.heads.len())
            .field("dim_encoding", &self.dim_encoding)
            .field("sorting", &self.sorting)
            .finish()
    }
}

/// Wrap a monodepth model for the Gaussian prediction stages.
pub fn create_monodepth_adaptor<B: Backend>(
    model: MonodepthDensePredictionTransformer<B>,
    params: &MonodepthAdaptorParams,
    sorting: bool,
    device: &B::Device,
) -> Result<MonodepthWithEncodingAdaptor<B>, Error> {
    let head_config = DepthHeadConfig::new(model.decoder.dim_out());
    let encoding = Conv2dConfig::new([1, params.dim_encoding], [3, 3])
        .with_padding(PaddingConfig2d::Explicit(1, 1))
        .init(device);

    Ok(MonodepthWithEncodingAdaptor {
        model,
        heads: vec![],
        encoding,
        dim_encoding: params.dim_encoding,
        sorting,
        head_config: Ignored(head_config),
    })
}
