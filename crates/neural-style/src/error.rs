/// Errors produced while setting up or running a style transfer.
#[derive(thiserror::Error, Debug)]
pub enum StyleTransferError {
    /// The image does not have the shape the feature extractor expects.
    #[error("Shape mismatch: expected {expected}, got {actual:?}")]
    ShapeMismatch {
        /// Human readable description of the accepted shape.
        expected: String,
        /// The offending `[batch, channels, height, width]` shape.
        actual: [usize; 4],
    },

    /// The total loss or the updated canvas became NaN or infinite.
    #[error("Numeric divergence at iteration {iteration}: total loss is {loss}")]
    NumericDivergence {
        /// Iteration at which the non-finite value was observed.
        iteration: usize,
        /// The non-finite loss value, `NaN` when the loss was finite but the update
        /// produced non-finite pixels.
        loss: f64,
    },

    /// The run configuration was rejected before any computation.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Pretrained weights could not be loaded.
    #[error("Weights error: {0}")]
    Weights(String),

    /// Tensor data could not be converted.
    #[error("Tensor data error: {0}")]
    Data(String),

    /// Image decoding or encoding failed.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StyleTransferError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}
