pub mod activation;
pub mod alignment;
pub mod camera;
pub mod composer;
pub mod decoder;
pub mod encoder;
pub mod gaussian_decoder;
pub mod gaussians;
pub mod heads;
pub mod initializer;
pub mod monodepth;
pub mod params;
pub mod predictor;

pub use activation::{ColorSpace, ParamActivation};
pub use camera::Intrinsics;
pub use composer::{GaussianComposer, GaussianComposerConfig};
pub use gaussians::GaussianSplats;
pub use params::*;
pub use predictor::{create_predictor, PredictorOutput, RGBGaussianPredictor};
