use burn::module::{Module, Param};
use burn::tensor::{
    Tensor,
    backend::{AutodiffBackend, Backend},
};

use crate::projector::PixelBounds;

/// The image being optimized, wrapped as a module so an optimizer can update it.
#[derive(Module, Debug)]
pub struct Canvas<B: Backend> {
    image: Param<Tensor<B, 4>>,
}

impl<B: Backend> Canvas<B> {
    /// Start from a copy of `image`, detached from any graph it belongs to.
    pub fn new(image: Tensor<B, 4>) -> Self {
        Self {
            image: Param::from_tensor(image.detach()),
        }
    }

    /// Current pixels.
    pub fn image(&self) -> Tensor<B, 4> {
        self.image.val()
    }

}

impl<B: AutodiffBackend> Canvas<B> {
    /// Clamp the pixels into `bounds`.
    ///
    /// The clamp runs on the inner backend so the result is a fresh leaf. The parameter
    /// keeps its id, so optimizer state attached to it carries over.
    pub fn project(self, bounds: &PixelBounds) -> Self {
        let id = self.image.id;
        let projected = bounds.project(self.image.val().inner());

        Self {
            image: Param::initialized(id, Tensor::from_inner(projected).require_grad()),
        }
    }

    /// Current pixels without autodiff tracking.
    pub fn snapshot(&self) -> Tensor<B::InnerBackend, 4> {
        self.image.val().inner()
    }
}
