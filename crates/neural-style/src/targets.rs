use burn::tensor::{Tensor, backend::Backend};

use crate::StyleTransferError;
use crate::extractor::FeatureExtractor;
use crate::gram_matrix;

/// Immutable optimization targets, computed once per run.
#[derive(Debug, Clone)]
pub struct Targets<B: Backend> {
    /// Gram matrix of every style layer activation of the style image.
    pub style: Vec<Tensor<B, 3>>,
    /// Raw content layer activations of the content image.
    pub content: Vec<Tensor<B, 4>>,
}

impl<B: Backend> Targets<B> {
    /// Run the extractor once on each image and keep the groups the losses compare against.
    ///
    /// The returned tensors are detached from any autodiff graph.
    pub fn build<E: FeatureExtractor<B>>(
        extractor: &E,
        content_image: Tensor<B, 4>,
        style_image: Tensor<B, 4>,
    ) -> Result<Self, StyleTransferError> {
        let style = extractor
            .extract_groups(style_image.detach())?
            .style
            .into_iter()
            .map(|activation| gram_matrix(activation).detach())
            .collect();

        let content = extractor
            .extract_groups(content_image.detach())?
            .content
            .into_iter()
            .map(Tensor::detach)
            .collect();

        Ok(Self { style, content })
    }
}
