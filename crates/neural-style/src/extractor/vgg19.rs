//! VGG19 feature extractor.
//!
//! Layers follow the Keras naming scheme, `block{b}_conv{c}`, and every activation is taken
//! after the ReLU that follows its convolution.

use core::fmt;
use core::str::FromStr;
use std::path::PathBuf;

use burn::config::Config;
use burn::module::{Ignored, Module};
use burn::nn::PaddingConfig2d;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::record::{FullPrecisionSettings, Recorder};
use burn::tensor::Tensor;
use burn::tensor::activation::relu;
use burn::tensor::backend::Backend;
use burn_import::pytorch::{LoadArgs, PyTorchFileRecorder};

use super::{FeatureExtractor, LayerSelection};
use crate::StyleTransferError;

/// Output channels of each block.
const BLOCK_CHANNELS: [usize; 5] = [64, 128, 256, 512, 512];
/// Number of convolutions in each block.
const BLOCK_DEPTHS: [usize; 5] = [2, 2, 4, 4, 4];

/// Configuration to create a [VGG19](Vgg19) feature extractor.
#[derive(Config, Debug)]
pub struct Vgg19Config {
    /// Fixed `[height, width]` the network accepts. Any size deep enough for the selected
    /// layers is accepted when unset.
    pub input_size: Option<[usize; 2]>,
}

impl Vgg19Config {
    /// Initialize a randomly weighted, frozen extractor for the given layers.
    ///
    /// Use [load_pytorch_weights](Vgg19::load_pytorch_weights) to get meaningful activations.
    pub fn init<B: Backend>(
        &self,
        selection: LayerSelection,
        device: &B::Device,
    ) -> Result<Vgg19<B>, StyleTransferError> {
        selection.validate()?;
        let layers = selection
            .names()
            .map(Vgg19Layer::from_str)
            .collect::<Result<Vec<_>, _>>()?;

        if let Some([height, width]) = self.input_size {
            if height == 0 || width == 0 {
                return Err(StyleTransferError::config(format!(
                    "input size must be positive, got {height}x{width}"
                )));
            }
        }

        let mut convs = Vec::with_capacity(BLOCK_DEPTHS.iter().sum());
        let mut channels_in = 3;
        for (channels_out, depth) in BLOCK_CHANNELS.into_iter().zip(BLOCK_DEPTHS) {
            for _ in 0..depth {
                let conv = Conv2dConfig::new([channels_in, channels_out], [3, 3])
                    .with_padding(PaddingConfig2d::Same)
                    .with_bias(true)
                    .init(device);
                convs.push(conv);
                channels_in = channels_out;
            }
        }

        let vgg = Vgg19 {
            convs,
            layers: Ignored(layers),
            selection: Ignored(selection),
            input_size: Ignored(self.input_size),
        };

        Ok(vgg.no_grad())
    }
}

/// VGG19 convolutional trunk returning the activations of selected layers.
///
/// Weights never receive gradients.
#[derive(Module, Debug)]
pub struct Vgg19<B: Backend> {
    convs: Vec<Conv2d<B>>,
    layers: Ignored<Vec<Vgg19Layer>>,
    selection: Ignored<LayerSelection>,
    input_size: Ignored<Option<[usize; 2]>>,
}

impl<B: Backend> Vgg19<B> {
    /// Load weights saved from a PyTorch `vgg19().features` module.
    ///
    /// The checkpoint must contain `features.{index}.weight` and `features.{index}.bias`
    /// entries for the 16 convolutions. Caffe-converted VGG19 weights expect the
    /// mean-centered BGR space produced by [preprocess](crate::imaging::preprocess).
    pub fn load_pytorch_weights(
        self,
        path: impl Into<PathBuf>,
        device: &B::Device,
    ) -> Result<Self, StyleTransferError> {
        let path = path.into();
        log::info!("Loading VGG19 weights from {}", path.display());

        let mut load_args = LoadArgs::new(path);
        for (pattern, replacement) in vgg19_key_remaps() {
            load_args = load_args.with_key_remap(&pattern, &replacement);
        }

        let record = PyTorchFileRecorder::<FullPrecisionSettings>::default()
            .load(load_args, device)
            .map_err(|err| StyleTransferError::Weights(format!("{err:?}")))?;

        Ok(self.load_record(record).no_grad())
    }

    /// Smallest height and width that still reach the deepest selected layer.
    pub fn min_input_size(&self) -> usize {
        let deepest_block = self.layers.0.iter().map(|layer| layer.block).max().unwrap_or(1);

        1 << (deepest_block - 1)
    }

    fn deepest_index(&self) -> usize {
        self.layers.0.iter().map(Vgg19Layer::index).max().unwrap_or(0)
    }
}

impl<B: Backend> FeatureExtractor<B> for Vgg19<B> {
    fn selection(&self) -> &LayerSelection {
        &self.selection.0
    }

    fn check_input(&self, dims: [usize; 4]) -> Result<(), StyleTransferError> {
        let [batch, channels, height, width] = dims;
        let mismatch = |expected: String| StyleTransferError::ShapeMismatch {
            expected,
            actual: dims,
        };

        if batch != 1 || channels != 3 {
            return Err(mismatch("a single 3 channel image".into()));
        }

        match self.input_size.0 {
            Some(size) if size != [height, width] => Err(mismatch(format!(
                "an input of {}x{} pixels",
                size[0], size[1]
            ))),
            _ => {
                let min = self.min_input_size();
                if height < min || width < min {
                    return Err(mismatch(format!("at least {min}x{min} pixels")));
                }
                Ok(())
            }
        }
    }

    fn extract(&self, image: Tensor<B, 4>) -> Result<Vec<Tensor<B, 4>>, StyleTransferError> {
        self.check_input(image.dims())?;

        let layers = &self.layers.0;
        let mut activations: Vec<Option<Tensor<B, 4>>> = vec![None; layers.len()];
        let mut x = image;

        for (index, conv) in self.convs.iter().enumerate().take(self.deepest_index() + 1) {
            if index > 0 && Vgg19Layer::starts_block(index) {
                x = max_pool2d(x);
            }
            x = relu(conv.forward(x));

            for (slot, layer) in layers.iter().enumerate() {
                if layer.index() == index {
                    activations[slot] = Some(x.clone());
                }
            }
        }

        Ok(activations.into_iter().flatten().collect())
    }
}

/// A convolution of the VGG19 trunk, addressed by 1-based block and convolution numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vgg19Layer {
    block: usize,
    conv: usize,
}

impl Vgg19Layer {
    /// Create a layer reference, checking it exists in VGG19.
    pub fn new(block: usize, conv: usize) -> Option<Self> {
        let depth = *BLOCK_DEPTHS.get(block.checked_sub(1)?)?;
        (1..=depth).contains(&conv).then_some(Self { block, conv })
    }

    /// Position of the convolution in the trunk, starting at zero.
    pub fn index(&self) -> usize {
        BLOCK_DEPTHS[..self.block - 1].iter().sum::<usize>() + self.conv - 1
    }

    /// Position of the convolution inside a PyTorch `vgg19().features` sequential, which
    /// interleaves ReLUs and a max pooling per block.
    pub fn torch_index(&self) -> usize {
        2 * self.index() + self.block - 1
    }

    fn starts_block(index: usize) -> bool {
        let mut start = 0;
        for depth in BLOCK_DEPTHS {
            if start == index {
                return true;
            }
            start += depth;
        }
        false
    }

    fn all() -> impl Iterator<Item = Self> {
        BLOCK_DEPTHS
            .into_iter()
            .enumerate()
            .flat_map(|(block, depth)| (1..=depth).map(move |conv| Self { block: block + 1, conv }))
    }
}

impl fmt::Display for Vgg19Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block{}_conv{}", self.block, self.conv)
    }
}

impl FromStr for Vgg19Layer {
    type Err = StyleTransferError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let unknown = || StyleTransferError::config(format!("unknown VGG19 layer '{name}'"));

        let (block, conv) = name
            .strip_prefix("block")
            .and_then(|rest| rest.split_once("_conv"))
            .ok_or_else(unknown)?;
        let block = block.parse().map_err(|_| unknown())?;
        let conv = conv.parse().map_err(|_| unknown())?;

        Self::new(block, conv).ok_or_else(unknown)
    }
}

/// Key remapping rules from PyTorch `features.{i}` names to [Vgg19] module names.
///
/// Use with `burn_import::pytorch::LoadArgs::with_key_remap()`.
pub fn vgg19_key_remaps() -> Vec<(String, String)> {
    Vgg19Layer::all()
        .map(|layer| {
            (
                format!("features\\.{}\\.(.*)", layer.torch_index()),
                format!("convs.{}.$1", layer.index()),
            )
        })
        .collect()
}

/// 2x2 max pooling with stride 2.
fn max_pool2d<B: Backend>(x: Tensor<B, 4>) -> Tensor<B, 4> {
    burn::tensor::module::max_pool2d(x, [2, 2], [2, 2], [0, 0], [1, 1], false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TestAutodiffBackend, TestBackend};

    #[test]
    fn layer_names_round_trip() {
        for layer in Vgg19Layer::all() {
            assert_eq!(layer.to_string().parse::<Vgg19Layer>().unwrap(), layer);
        }
        assert_eq!(Vgg19Layer::all().count(), 16);
    }

    #[test]
    fn unknown_layer_names_are_rejected() {
        for name in ["block0_conv1", "block1_conv3", "block6_conv1", "conv1_1", "block2_convx"] {
            assert!(name.parse::<Vgg19Layer>().is_err(), "{name}");
        }
    }

    #[test]
    fn torch_indices_skip_relus_and_pools() {
        let indices = Vgg19Layer::all()
            .map(|layer| layer.torch_index())
            .collect::<Vec<_>>();

        assert_eq!(
            indices,
            [0, 2, 5, 7, 10, 12, 14, 16, 19, 21, 23, 25, 28, 30, 32, 34]
        );
    }

    #[test]
    fn key_remaps_target_conv_list() {
        let remaps = vgg19_key_remaps();

        assert_eq!(remaps[2].0, "features\\.5\\.(.*)");
        assert_eq!(remaps[2].1, "convs.2.$1");
    }

    #[test]
    fn extract_returns_selected_layers_in_order() {
        let device = Default::default();
        let selection = LayerSelection::new(["block3_conv1", "block1_conv2"], ["block2_conv2"]);
        let vgg = Vgg19Config::new()
            .init::<TestBackend>(selection, &device)
            .unwrap();

        let activations = vgg
            .extract(Tensor::zeros([1, 3, 16, 12], &device))
            .unwrap();

        let shapes = activations.iter().map(Tensor::dims).collect::<Vec<_>>();
        assert_eq!(
            shapes,
            [[1, 256, 4, 3], [1, 64, 16, 12], [1, 128, 8, 6]]
        );
    }

    #[test]
    fn input_shape_is_checked() {
        let device = Default::default();
        let vgg = Vgg19Config::new()
            .init::<TestBackend>(LayerSelection::default(), &device)
            .unwrap();

        assert_eq!(vgg.min_input_size(), 16);
        for dims in [[1, 1, 32, 32], [2, 3, 32, 32], [1, 3, 8, 32]] {
            assert!(matches!(
                vgg.check_input(dims),
                Err(StyleTransferError::ShapeMismatch { .. })
            ));
        }
        assert!(vgg.check_input([1, 3, 16, 20]).is_ok());
    }

    #[test]
    fn fixed_input_size_is_enforced() {
        let device = Default::default();
        let vgg = Vgg19Config::new()
            .with_input_size(Some([32, 24]))
            .init::<TestBackend>(LayerSelection::new(["block1_conv1"], ["block1_conv2"]), &device)
            .unwrap();

        assert!(vgg.check_input([1, 3, 32, 24]).is_ok());
        assert!(vgg.check_input([1, 3, 24, 32]).is_err());
    }

    #[test]
    fn unknown_layer_fails_init() {
        let device = Default::default();
        let result = Vgg19Config::new().init::<TestBackend>(
            LayerSelection::new(["block9_conv9"], ["block5_conv2"]),
            &device,
        );

        assert!(matches!(result, Err(StyleTransferError::Configuration(_))));
    }

    #[test]
    fn weights_are_frozen() {
        let device = Default::default();
        let vgg = Vgg19Config::new()
            .init::<TestAutodiffBackend>(
                LayerSelection::new(["block1_conv1"], ["block1_conv2"]),
                &device,
            )
            .unwrap();

        let image = Tensor::<TestAutodiffBackend, 4>::ones([1, 3, 4, 4], &device).require_grad();
        let activations = vgg.extract(image.clone()).unwrap();
        let grads = activations[1].clone().sum().backward();

        assert!(image.grad(&grads).is_some());
        assert!(vgg.convs[0].weight.grad(&grads).is_none());
    }
}
