use burn::tensor::{ElementConversion, Tensor, backend::Backend};

use crate::StyleTransferError;
use crate::extractor::FeatureExtractor;
use crate::gram_matrix;
use crate::targets::Targets;

/// Relative importance of the style and content terms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LossWeights {
    /// Multiplier of the averaged style loss.
    pub style: f64,
    /// Multiplier of the averaged content loss.
    pub content: f64,
}

/// Weighted loss terms as scalar tensors of shape `[1]`.
#[derive(Debug, Clone)]
pub struct LossOutput<B: Backend> {
    /// Sum of the style and content scores.
    pub total: Tensor<B, 1>,
    /// Weighted style score.
    pub style: Tensor<B, 1>,
    /// Weighted content score.
    pub content: Tensor<B, 1>,
}

impl<B: Backend> LossOutput<B> {
    /// Combine both terms into their total.
    pub fn new(style: Tensor<B, 1>, content: Tensor<B, 1>) -> Self {
        Self {
            total: style.clone().add(content.clone()),
            style,
            content,
        }
    }

    /// Read the scalar values back from the device.
    pub fn breakdown(&self) -> LossBreakdown {
        LossBreakdown {
            total: scalar(&self.total),
            style: scalar(&self.style),
            content: scalar(&self.content),
        }
    }
}

/// Host copy of the loss terms of one iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LossBreakdown {
    /// Total loss.
    pub total: f64,
    /// Weighted style score.
    pub style: f64,
    /// Weighted content score.
    pub content: f64,
}

/// Computes the weighted style and content losses of a canvas against fixed targets.
pub struct LossComposer<B: Backend, E> {
    extractor: E,
    targets: Targets<B>,
    weights: LossWeights,
}

impl<B: Backend, E: FeatureExtractor<B>> LossComposer<B, E> {
    /// Create a new composer.
    pub fn new(extractor: E, targets: Targets<B>, weights: LossWeights) -> Self {
        Self {
            extractor,
            targets,
            weights,
        }
    }

    /// Extract the canvas activations and score them against the targets.
    pub fn compute(&self, canvas: Tensor<B, 4>) -> Result<LossOutput<B>, StyleTransferError> {
        let device = canvas.device();
        let activations = self.extractor.extract_groups(canvas)?;

        let style = style_loss(
            &activations.style,
            &self.targets.style,
            self.weights.style,
            &device,
        );
        let content = content_loss(
            &activations.content,
            &self.targets.content,
            self.weights.content,
            &device,
        );

        Ok(LossOutput::new(style, content))
    }

    /// The fixed targets.
    pub fn targets(&self) -> &Targets<B> {
        &self.targets
    }

    /// The loss weights.
    pub fn weights(&self) -> LossWeights {
        self.weights
    }

    /// The feature extractor.
    pub fn extractor(&self) -> &E {
        &self.extractor
    }
}

/// Weighted style score.
///
/// The mean squared difference between the Gram matrix of each activation and its target,
/// summed over layers and scaled by `weight / num_layers`. An empty group scores zero.
pub fn style_loss<B: Backend>(
    activations: &[Tensor<B, 4>],
    targets: &[Tensor<B, 3>],
    weight: f64,
    device: &B::Device,
) -> Tensor<B, 1> {
    let layers = activations
        .iter()
        .zip(targets)
        .map(|(activation, target)| {
            mean_squared_error(gram_matrix(activation.clone()), target.clone())
        });

    weighted_average(layers, activations.len(), weight, device)
}

/// Weighted content score.
///
/// The mean squared difference between each activation and its target, summed over layers
/// and scaled by `weight / num_layers`. An empty group scores zero.
pub fn content_loss<B: Backend>(
    activations: &[Tensor<B, 4>],
    targets: &[Tensor<B, 4>],
    weight: f64,
    device: &B::Device,
) -> Tensor<B, 1> {
    let layers = activations
        .iter()
        .zip(targets)
        .map(|(activation, target)| mean_squared_error(activation.clone(), target.clone()));

    weighted_average(layers, activations.len(), weight, device)
}

fn mean_squared_error<B: Backend, const D: usize>(
    input: Tensor<B, D>,
    target: Tensor<B, D>,
) -> Tensor<B, 1> {
    input.sub(target).powi_scalar(2).mean()
}

fn weighted_average<B: Backend>(
    layers: impl Iterator<Item = Tensor<B, 1>>,
    num_layers: usize,
    weight: f64,
    device: &B::Device,
) -> Tensor<B, 1> {
    match layers.reduce(|acc, layer| acc.add(layer)) {
        Some(sum) => sum.mul_scalar(weight / num_layers as f64),
        None => Tensor::zeros([1], device),
    }
}

fn scalar<B: Backend>(tensor: &Tensor<B, 1>) -> f64 {
    tensor.clone().into_scalar().elem::<f64>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ToyExtractor;
    use crate::{TestAutodiffBackend, TestBackend};
    use burn::tensor::{Distribution, TensorData, Tolerance, ops::FloatElem};

    type FT = FloatElem<TestBackend>;

    fn random(shape: [usize; 4]) -> Tensor<TestBackend, 4> {
        Tensor::random(shape, Distribution::Normal(0.0, 1.0), &Default::default())
    }

    #[test]
    fn matching_activations_give_zero_loss() {
        let device = Default::default();
        let style_activations = vec![random([1, 4, 3, 3]), random([1, 2, 5, 5])];
        let content_activations = vec![random([1, 4, 3, 3])];
        let style_targets = style_activations
            .iter()
            .map(|a| gram_matrix(a.clone()))
            .collect::<Vec<_>>();

        let style = style_loss(&style_activations, &style_targets, 1e-2, &device);
        let content = content_loss(&content_activations, &content_activations, 1e3, &device);
        let loss = LossOutput::new(style, content).breakdown();

        assert!(loss.total.abs() < 1e-6, "{loss:?}");
    }

    #[test]
    fn content_loss_is_scaled_mean_squared_error() {
        let device = Default::default();
        let activation = Tensor::<TestBackend, 4>::full([1, 1, 2, 2], 3.0, &device);
        let target = Tensor::<TestBackend, 4>::full([1, 1, 2, 2], 1.0, &device);

        let loss = content_loss(
            &[activation.clone(), activation],
            &[target.clone(), target],
            10.0,
            &device,
        );

        // Each layer contributes (3 - 1)^2 = 4, averaged over two layers then weighted.
        loss.into_data()
            .assert_approx_eq::<FT>(&TensorData::from([40.0]), Tolerance::default());
    }

    #[test]
    fn style_loss_compares_gram_matrices() {
        let device = Default::default();
        let activation = Tensor::<TestBackend, 4>::from_floats(
            [[[[1.0, 0.0], [1.0, 0.0]], [[0.0, 1.0], [0.0, 1.0]]]],
            &device,
        );
        // Gram is 0.5 * I: two of four entries differ by 0.5, so the MSE is 0.125.
        let target = Tensor::<TestBackend, 3>::zeros([1, 2, 2], &device);

        let loss = style_loss(&[activation], &[target], 2.0, &device);

        loss.into_data()
            .assert_approx_eq::<FT>(&TensorData::from([0.25]), Tolerance::default());
    }

    #[test]
    fn empty_groups_score_zero() {
        let device = Default::default();

        let style = style_loss::<TestBackend>(&[], &[], 1.0, &device);
        let content = content_loss::<TestBackend>(&[], &[], 1.0, &device);

        assert_eq!(style.into_scalar(), 0.0);
        assert_eq!(content.into_scalar(), 0.0);
    }

    #[test]
    fn terms_are_independent() {
        let device = Default::default();
        let style_activations = vec![random([1, 3, 4, 4])];
        let style_targets = vec![gram_matrix(random([1, 3, 4, 4]))];
        let content_targets = vec![random([1, 3, 4, 4])];
        let style_a = style_loss(&style_activations, &style_targets, 1.0, &device);
        let content_a = content_loss(&[random([1, 3, 4, 4])], &content_targets, 1.0, &device);
        let content_b = content_loss(&[random([1, 3, 4, 4])], &content_targets, 1.0, &device);

        let first = LossOutput::new(style_a.clone(), content_a).breakdown();
        let second = LossOutput::new(style_a, content_b).breakdown();

        assert_eq!(first.style, second.style);
        assert_ne!(first.content, second.content);
        assert!((first.total - first.style - first.content).abs() < 1e-3);
    }

    #[test]
    fn content_score_ignores_the_style_group() {
        let device = Default::default();
        let content_activations = vec![random([1, 3, 4, 4])];
        let content_targets = vec![random([1, 3, 4, 4])];
        let style_targets = vec![gram_matrix(random([1, 3, 4, 4]))];
        let content = content_loss(&content_activations, &content_targets, 1.0, &device);
        let style_a = style_loss(&[random([1, 3, 4, 4])], &style_targets, 1.0, &device);
        let style_b = style_loss(&[random([1, 3, 4, 4])], &style_targets, 1.0, &device);

        let first = LossOutput::new(style_a, content.clone()).breakdown();
        let second = LossOutput::new(style_b, content).breakdown();

        assert_eq!(first.content, second.content);
        assert_ne!(first.style, second.style);
        assert!((second.total - second.style - second.content).abs() < 1e-3);
    }

    #[test]
    fn zero_style_weight_reduces_to_content_loss() {
        let device = Default::default();
        let extractor = ToyExtractor::new();
        let content = Tensor::<TestAutodiffBackend, 4>::ones([1, 3, 4, 4], &device);
        let style =
            Tensor::<TestAutodiffBackend, 4>::random([1, 3, 4, 4], Distribution::Default, &device);
        let targets = Targets::build(&extractor, content, style).unwrap();
        let composer = LossComposer::new(
            extractor,
            targets,
            LossWeights {
                style: 0.0,
                content: 1.0,
            },
        );
        let canvas =
            Tensor::<TestAutodiffBackend, 4>::random([1, 3, 4, 4], Distribution::Default, &device)
                .require_grad();

        let loss = composer.compute(canvas.clone()).unwrap();
        let breakdown = loss.breakdown();
        assert_eq!(breakdown.style, 0.0);
        assert_eq!(breakdown.total, breakdown.content);

        let total_grad = canvas.grad(&loss.total.backward()).unwrap();
        let content_only = composer.compute(canvas.clone()).unwrap().content;
        let content_grad = canvas.grad(&content_only.backward()).unwrap();

        total_grad
            .into_data()
            .assert_approx_eq::<FT>(&content_grad.into_data(), Tolerance::default());
    }
}
