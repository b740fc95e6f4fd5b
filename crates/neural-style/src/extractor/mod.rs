mod vgg19;

pub use vgg19::*;

use burn::tensor::{Tensor, backend::Backend};
use serde::{Deserialize, Serialize};

use crate::StyleTransferError;

/// A frozen network used as a perceptual measuring instrument.
///
/// Implementations must be deterministic for a fixed image and must never update their own
/// weights. Any pretrained network can be plugged in as long as it honors the
/// [selection](LayerSelection) it reports.
pub trait FeatureExtractor<B: Backend> {
    /// The layers whose activations [extract](FeatureExtractor::extract) returns.
    fn selection(&self) -> &LayerSelection;

    /// Validate an input shape before any computation.
    ///
    /// Returns [ShapeMismatch](StyleTransferError::ShapeMismatch) when the network cannot
    /// accept an image of the given `[batch, channels, height, width]` shape.
    fn check_input(&self, dims: [usize; 4]) -> Result<(), StyleTransferError>;

    /// Compute the activations of the selected layers: style layers first, then content
    /// layers, each group in selection order.
    fn extract(&self, image: Tensor<B, 4>) -> Result<Vec<Tensor<B, 4>>, StyleTransferError>;

    /// Run [extract](FeatureExtractor::extract) and split the output into its style and
    /// content groups.
    fn extract_groups(&self, image: Tensor<B, 4>) -> Result<Activations<B>, StyleTransferError> {
        let activations = self.extract(image)?;
        Activations::split(activations, self.selection())
    }
}

/// Names of the extractor layers feeding the style and content losses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSelection {
    /// Layers whose Gram matrices describe style.
    pub style: Vec<String>,
    /// Layers whose raw activations describe content.
    pub content: Vec<String>,
}

impl Default for LayerSelection {
    fn default() -> Self {
        Self::new(
            [
                "block1_conv1",
                "block2_conv1",
                "block3_conv1",
                "block4_conv1",
                "block5_conv1",
            ],
            ["block5_conv2"],
        )
    }
}

impl LayerSelection {
    /// Create a new selection from layer names.
    pub fn new<S, C>(style: S, content: C) -> Self
    where
        S: IntoIterator,
        S::Item: Into<String>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self {
            style: style.into_iter().map(Into::into).collect(),
            content: content.into_iter().map(Into::into).collect(),
        }
    }

    /// Number of style layers.
    pub fn num_style(&self) -> usize {
        self.style.len()
    }

    /// Number of content layers.
    pub fn num_content(&self) -> usize {
        self.content.len()
    }

    /// All layer names in extraction order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.style.iter().chain(self.content.iter()).map(String::as_str)
    }

    /// Both groups must contain at least one layer.
    pub fn validate(&self) -> Result<(), StyleTransferError> {
        if self.style.is_empty() {
            return Err(StyleTransferError::config("no style layer selected"));
        }
        if self.content.is_empty() {
            return Err(StyleTransferError::config("no content layer selected"));
        }

        Ok(())
    }
}

/// Activations of one image, split into style and content groups.
#[derive(Debug, Clone)]
pub struct Activations<B: Backend> {
    /// Activations of the style layers.
    pub style: Vec<Tensor<B, 4>>,
    /// Activations of the content layers.
    pub content: Vec<Tensor<B, 4>>,
}

impl<B: Backend> Activations<B> {
    /// Split an ordered extractor output into the style prefix and the content suffix.
    pub fn split(
        mut activations: Vec<Tensor<B, 4>>,
        selection: &LayerSelection,
    ) -> Result<Self, StyleTransferError> {
        let expected = selection.num_style() + selection.num_content();
        if activations.len() != expected {
            return Err(StyleTransferError::config(format!(
                "extractor returned {} activations for {expected} selected layers",
                activations.len()
            )));
        }

        let content = activations.split_off(selection.num_style());

        Ok(Self {
            style: activations,
            content,
        })
    }
}
