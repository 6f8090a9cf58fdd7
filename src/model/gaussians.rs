pub use burn::tensor::{backend::Backend, Tensor};

use std::fmt;

/// A batch of composed 3D Gaussian primitives.
///
/// `P` is the number of primitives per batch item, one per output pixel and
/// depth layer. The set is produced once per forward pass and handed to an
/// external renderer; it is never mutated after composition.
#[derive(Clone)]
pub struct GaussianSplats<B: Backend> {
    /// `[B, P, 3]`
    pub means: Tensor<B, 3>,

    /// `[B, P, 3]`
    ///
    /// They range from `min_scale` to `max_scale` elementwise.
    pub scales: Tensor<B, 3>,

    /// `[B, P, 4]`
    ///
    /// They are represented as normalized Hamilton quaternions in scalar-last
    /// order, i.e., `[x, y, z, w]`.
    pub rotations: Tensor<B, 3>,

    /// `[B, P, 3]`
    ///
    /// They range from `0.0` to `1.0` in the selected color space.
    pub colors: Tensor<B, 3>,

    /// `[B, P, 1]`
    ///
    /// They range from `0.0` to `1.0`.
    pub opacities: Tensor<B, 3>,
}

impl<B: Backend> GaussianSplats<B> {
    /// `P`
    #[inline]
    pub fn splat_count(&self) -> usize {
        self.means.dims()[1]
    }
}

impl<B: Backend> fmt::Debug for GaussianSplats<B> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter,
    ) -> fmt::Result {
        f.debug_struct("GaussianSplats")
            .field("means.dims()", &self.means.dims())
            .field("scales.dims()", &self.scales.dims())
            .field("rotations.dims()", &self.rotations.dims())
            .field("colors.dims()", &self.colors.dims())
            .field("opacities.dims()", &self.opacities.dims())
            .finish()
    }
}
