use burn::config::Config;
use burn::tensor::{Tensor, backend::Backend};

use crate::StyleTransferError;
use crate::imaging::CHANNEL_MEANS_BGR;

/// Closed per-channel interval of valid pixel values in the preprocessing space.
///
/// Channels are in the same order as the canvas, which is BGR for the default
/// mean-centered space.
#[derive(Config, Debug, Copy, PartialEq)]
pub struct PixelBounds {
    /// Inclusive lower bound for each channel.
    pub lower: [f32; 3],
    /// Inclusive upper bound for each channel.
    pub upper: [f32; 3],
}

impl PixelBounds {
    /// Bounds of `[0, 255]` pixels after the channel means have been subtracted.
    pub fn mean_centered_bgr() -> Self {
        let [b, g, r] = CHANNEL_MEANS_BGR;

        Self::new([-b, -g, -r], [255.0 - b, 255.0 - g, 255.0 - r])
    }

    /// The same `[lower, upper]` interval for every channel.
    pub fn uniform(lower: f32, upper: f32) -> Self {
        Self::new([lower; 3], [upper; 3])
    }

    /// Check that every interval is non-empty and finite.
    pub fn validate(&self) -> Result<(), StyleTransferError> {
        for channel in 0..3 {
            let (lower, upper) = (self.lower[channel], self.upper[channel]);

            if !lower.is_finite() || !upper.is_finite() || lower > upper {
                return Err(StyleTransferError::config(format!(
                    "invalid pixel bounds for channel {channel}: [{lower}, {upper}]"
                )));
            }
        }

        Ok(())
    }

    /// Clamp every element of `image` into the bounds of its channel.
    ///
    /// Elementwise and idempotent.
    ///
    /// # Shapes
    ///
    /// - image: `[batch, 3, height, width]`
    /// - output: `[batch, 3, height, width]`
    pub fn project<B: Backend>(&self, image: Tensor<B, 4>) -> Tensor<B, 4> {
        let device = image.device();
        let dims = image.dims();

        let lower = Tensor::<B, 1>::from_floats(self.lower, &device)
            .reshape([1, 3, 1, 1])
            .expand(dims);
        let upper = Tensor::<B, 1>::from_floats(self.upper, &device)
            .reshape([1, 3, 1, 1])
            .expand(dims);

        image.max_pair(lower).min_pair(upper)
    }
}
