//! Conversion between image files and the mean-centered BGR space the extractor works in.
//!
//! A preprocessed image is a `[1, 3, height, width]` tensor whose channels are ordered
//! blue, green, red, with [`CHANNEL_MEANS_BGR`] subtracted from the raw `[0, 255]` values.

use std::path::Path;

use burn::tensor::{Tensor, TensorData, backend::Backend};
use image::{DynamicImage, RgbImage, imageops::FilterType};

use crate::StyleTransferError;

/// Per-channel means of the ImageNet training set, in BGR order.
pub const CHANNEL_MEANS_BGR: [f32; 3] = [103.939, 116.779, 123.68];

/// How an image is resized before preprocessing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resize {
    /// Keep the aspect ratio and scale so the longest side equals the given size.
    MaxDimension(u32),
    /// Resize to exactly `width × height`.
    Exact {
        /// Target width in pixels.
        width: u32,
        /// Target height in pixels.
        height: u32,
    },
    /// Keep the decoded size.
    None,
}

impl Resize {
    fn apply(self, image: DynamicImage) -> DynamicImage {
        match self {
            Resize::MaxDimension(max_dim) => {
                let longest = image.width().max(image.height());
                let scale = max_dim as f64 / longest as f64;
                let width = ((image.width() as f64 * scale).round() as u32).max(1);
                let height = ((image.height() as f64 * scale).round() as u32).max(1);

                image.resize_exact(width, height, FilterType::Lanczos3)
            }
            Resize::Exact { width, height } => {
                image.resize_exact(width, height, FilterType::Lanczos3)
            }
            Resize::None => image,
        }
    }
}

/// Load an image file and preprocess it into a `[1, 3, height, width]` tensor.
pub fn load_image<B: Backend>(
    path: impl AsRef<Path>,
    resize: Resize,
    device: &B::Device,
) -> Result<Tensor<B, 4>, StyleTransferError> {
    let path = path.as_ref();
    let image = resize.apply(image::open(path)?).into_rgb8();
    log::info!(
        "Loaded {} as {}x{}",
        path.display(),
        image.width(),
        image.height()
    );

    let (width, height) = (image.width() as usize, image.height() as usize);
    let data = TensorData::new(image.into_raw(), [height, width, 3]).convert::<B::FloatElem>();

    Ok(preprocess(Tensor::<B, 3>::from_data(data, device)))
}

/// Undo the preprocessing of `image` and write it as an 8-bit RGB file.
///
/// The format is inferred from the file extension.
pub fn save_image<B: Backend>(
    image: Tensor<B, 4>,
    path: impl AsRef<Path>,
) -> Result<(), StyleTransferError> {
    let path = path.as_ref();
    let rgb = deprocess(image);
    let [height, width, _] = rgb.dims();

    let pixels = rgb
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|err| StyleTransferError::Data(format!("{err:?}")))?
        .into_iter()
        .map(|value| value.round() as u8)
        .collect::<Vec<_>>();

    let image = RgbImage::from_raw(width as u32, height as u32, pixels).ok_or_else(|| {
        StyleTransferError::Data(format!("{width}x{height} image buffer size mismatch"))
    })?;

    image.save(path)?;
    log::info!("Saved {}", path.display());

    Ok(())
}

/// Map a `[height, width, 3]` RGB image with values in `[0, 255]` into the extractor space.
///
/// # Shapes
///
/// - rgb: `[height, width, 3]`
/// - output: `[1, 3, height, width]`
pub fn preprocess<B: Backend>(rgb: Tensor<B, 3>) -> Tensor<B, 4> {
    let device = rgb.device();
    let [height, width, _] = rgb.dims();
    let means = Tensor::<B, 1>::from_floats(CHANNEL_MEANS_BGR, &device)
        .reshape([3, 1, 1])
        .expand([3, height, width]);

    let bgr = rgb.permute([2, 0, 1]).flip([0]);

    bgr.sub(means).unsqueeze::<4>()
}

/// Inverse of [`preprocess`], clamped to the displayable `[0, 255]` range.
///
/// # Shapes
///
/// - image: `[1, 3, height, width]`
/// - output: `[height, width, 3]`
pub fn deprocess<B: Backend>(image: Tensor<B, 4>) -> Tensor<B, 3> {
    let device = image.device();
    let [_, channels, height, width] = image.dims();
    let means = Tensor::<B, 1>::from_floats(CHANNEL_MEANS_BGR, &device)
        .reshape([3, 1, 1])
        .expand([channels, height, width]);

    let bgr = image.reshape([channels, height, width]).add(means);

    bgr.flip([0]).permute([1, 2, 0]).clamp(0.0, 255.0)
}
