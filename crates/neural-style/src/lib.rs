#![warn(missing_docs)]

//! Neural style transfer on top of Burn.
//!
//! The crate optimizes the pixels of a canvas image so that the activations of a frozen
//! feature extractor match the content of one image and the Gram statistics of another.
//!
//! ```ignore
//! use burn::backend::{Autodiff, NdArray};
//! use neural_style::{
//!     extractor::{LayerSelection, Vgg19Config},
//!     imaging::{load_image, save_image, Resize},
//!     LogObserver, StyleTransfer, TransferConfig,
//! };
//!
//! type B = Autodiff<NdArray>;
//!
//! let device = Default::default();
//! let content = load_image::<B>("content.jpg", Resize::MaxDimension(512), &device)?;
//! let style = load_image::<B>("style.jpg", Resize::MaxDimension(512), &device)?;
//! let vgg = Vgg19Config::new()
//!     .init::<B>(LayerSelection::default(), &device)?
//!     .load_pytorch_weights("vgg19.pth", &device)?;
//!
//! let mut transfer = StyleTransfer::new(TransferConfig::new(), vgg, content, style)?;
//! transfer.run(&mut LogObserver)?;
//!
//! if let Some(best) = transfer.into_best() {
//!     save_image(best.image, "output.png")?;
//! }
//! ```

/// Canvas module holding the optimized image.
pub mod canvas;
/// Run configuration.
pub mod config;
/// Feature extraction adapters.
pub mod extractor;
/// Image loading, preprocessing and saving.
pub mod imaging;
/// Loss composition.
pub mod loss;
/// Pixel range projection.
pub mod projector;
/// Style and content targets.
pub mod targets;

mod engine;
mod error;
mod gram;
mod progress;

pub use engine::*;
pub use error::*;
pub use gram::*;
pub use progress::*;

pub use config::TransferConfig;

/// Backend for test cases
#[cfg(test)]
pub(crate) type TestBackend = burn::backend::NdArray<f32>;

/// Backend for autodiff test cases
#[cfg(test)]
pub(crate) type TestAutodiffBackend = burn::backend::Autodiff<TestBackend>;
