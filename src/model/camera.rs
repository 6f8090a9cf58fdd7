pub use burn::tensor::{backend::Backend, Tensor};

use burn::tensor::Int;

/// Pinhole camera intrinsics in image pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct Intrinsics {
    /// `[f_x, f_y]`
    pub focals: [f64; 2],

    /// `[c_x, c_y]`
    pub principal_point: [f64; 2],
}

impl Intrinsics {
    /// Unnormalized pixel rays on a feature grid of the given stride.
    ///
    /// The ray of a grid cell passes through the cell center in image space
    /// and has `z = 1`, so a 3D mean is `ray * depth`.
    ///
    /// The shape is `[1, 3, h, w]`.
    pub fn pixel_rays<B: Backend>(
        &self,
        grid_size: [usize; 2],
        stride: usize,
        device: &B::Device,
    ) -> Tensor<B, 4> {
        let [h, w] = grid_size;
        let [f_x, f_y] = self.focals;
        let [c_x, c_y] = self.principal_point;

        // [w] and [h], cell centers in image pixels
        let xs = Tensor::<B, 1, Int>::arange(0..w as i64, device)
            .float()
            .add_scalar(0.5)
            .mul_scalar(stride as f64)
            .sub_scalar(c_x)
            .div_scalar(f_x);
        let ys = Tensor::<B, 1, Int>::arange(0..h as i64, device)
            .float()
            .add_scalar(0.5)
            .mul_scalar(stride as f64)
            .sub_scalar(c_y)
            .div_scalar(f_y);

        let xs = xs.reshape([1, 1, 1, w]).expand([1, 1, h, w]);
        let ys = ys.reshape([1, 1, h, 1]).expand([1, 1, h, w]);
        let zs = Tensor::ones([1, 1, h, w], device);

        Tensor::cat(vec![xs, ys, zs], 1)
    }
}

impl Default for Intrinsics {
    #[inline]
    fn default() -> Self {
        Self {
            focals: [500.0, 500.0],
            principal_point: [250.0, 250.0],
        }
    }
}
