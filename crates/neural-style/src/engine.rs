use std::time::Instant;

use burn::optim::{Adam, GradientsParams, Optimizer, adaptor::OptimizerAdaptor};
use burn::tensor::{
    Tensor,
    backend::{AutodiffBackend, Backend},
    cast::ToElement,
};

use crate::canvas::Canvas;
use crate::config::TransferConfig;
use crate::extractor::FeatureExtractor;
use crate::loss::{LossComposer, LossWeights};
use crate::targets::Targets;
use crate::{Progress, ProgressObserver, StyleTransferError};

/// Lifecycle of a [style transfer](StyleTransfer) run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Targets are built, no iteration ran yet.
    Initialized,
    /// At least one iteration ran and the budget is not exhausted.
    Running,
    /// The iteration budget is exhausted.
    Converged,
    /// A non-finite loss stopped the run.
    Diverged,
}

/// The lowest-loss canvas observed so far.
#[derive(Debug, Clone)]
pub struct BestSnapshot<B: Backend> {
    /// Total loss that justified the update producing `image`.
    pub loss: f64,
    /// Iteration at which the snapshot was taken.
    pub iteration: usize,
    /// Copy of the canvas right after that iteration's update and projection.
    pub image: Tensor<B, 4>,
}

/// Optimizes the pixels of a canvas toward the content of one image and the style of another.
///
/// The engine owns the canvas, the optimizer state and the best snapshot. Each
/// [step](StyleTransfer::step) runs one forward and backward pass, one Adam update and one
/// projection into the valid pixel range.
pub struct StyleTransfer<B: AutodiffBackend, E: FeatureExtractor<B>> {
    config: TransferConfig,
    composer: LossComposer<B, E>,
    canvas: Canvas<B>,
    optim: OptimizerAdaptor<Adam, Canvas<B>, B>,
    best: Option<BestSnapshot<B::InnerBackend>>,
    iteration: usize,
    state: RunState,
    started: Option<Instant>,
}

impl<B: AutodiffBackend, E: FeatureExtractor<B>> StyleTransfer<B, E> {
    /// Validate the setup and build the targets.
    ///
    /// Fails before any optimization on an invalid configuration or an image shape the
    /// extractor does not accept. The canvas starts as a copy of `content`.
    pub fn new(
        config: TransferConfig,
        extractor: E,
        content: Tensor<B, 4>,
        style: Tensor<B, 4>,
    ) -> Result<Self, StyleTransferError> {
        config.validate()?;
        extractor.selection().validate()?;
        extractor.check_input(content.dims())?;
        extractor.check_input(style.dims())?;

        let targets = Targets::build(&extractor, content.clone(), style)?;
        let weights = LossWeights {
            style: config.style_weight,
            content: config.content_weight,
        };

        log::info!(
            "Style transfer on a {:?} canvas: {} iterations, {} style layers, {} content layers",
            content.dims(),
            config.num_iterations,
            targets.style.len(),
            targets.content.len(),
        );

        Ok(Self {
            composer: LossComposer::new(extractor, targets, weights),
            canvas: Canvas::new(content),
            optim: config.optimizer.init(),
            best: None,
            iteration: 0,
            state: RunState::Initialized,
            started: None,
            config,
        })
    }

    /// Run every remaining iteration, reporting every `log_interval` iterations to `observer`.
    ///
    /// Returns the best snapshot, or `None` when the iteration budget is zero. On numeric
    /// divergence the error is returned and the last valid snapshot stays available through
    /// [best](Self::best).
    pub fn run<O: ProgressObserver>(
        &mut self,
        observer: &mut O,
    ) -> Result<Option<&BestSnapshot<B::InnerBackend>>, StyleTransferError> {
        while let Some(progress) = self.step()? {
            if progress.iteration % self.config.log_interval == 0 {
                observer.observe(&progress);
            }
        }

        Ok(self.best.as_ref())
    }

    /// Run a single iteration.
    ///
    /// Returns `None` once the iteration budget is exhausted or after divergence. Callers
    /// wanting early cancellation can stop calling this between iterations.
    pub fn step(&mut self) -> Result<Option<Progress>, StyleTransferError> {
        match self.state {
            RunState::Diverged | RunState::Converged => return Ok(None),
            RunState::Initialized | RunState::Running => {}
        }

        if self.iteration >= self.config.num_iterations {
            self.state = RunState::Converged;
            return Ok(None);
        }

        self.state = RunState::Running;
        let started = *self.started.get_or_insert_with(Instant::now);

        let loss = self.composer.compute(self.canvas.image())?;
        let breakdown = loss.breakdown();

        if !breakdown.total.is_finite() {
            self.state = RunState::Diverged;
            log::error!(
                "Loss diverged at iteration {}: {}",
                self.iteration,
                breakdown.total
            );
            return Err(StyleTransferError::NumericDivergence {
                iteration: self.iteration,
                loss: breakdown.total,
            });
        }

        // Gradients for the current backward pass
        let grads = loss.total.backward();
        // Gradients linked to the canvas only; extractor weights and targets stay fixed.
        let grads = GradientsParams::from_grads(grads, &self.canvas);
        let canvas = self
            .optim
            .step(self.config.learning_rate, self.canvas.clone(), grads);
        self.canvas = canvas.project(&self.config.bounds);
        let image = self.canvas.snapshot();

        // A finite loss can still produce a non-finite gradient.
        if image.clone().contains_nan().any().into_scalar().to_bool() {
            self.state = RunState::Diverged;
            log::error!(
                "Canvas became non-finite after the update of iteration {}",
                self.iteration
            );
            return Err(StyleTransferError::NumericDivergence {
                iteration: self.iteration,
                loss: f64::NAN,
            });
        }

        if self
            .best
            .as_ref()
            .is_none_or(|best| breakdown.total < best.loss)
        {
            self.best = Some(BestSnapshot {
                loss: breakdown.total,
                iteration: self.iteration,
                image,
            });
        }

        let progress = Progress::new(self.iteration, breakdown, started.elapsed());
        self.iteration += 1;

        if self.iteration == self.config.num_iterations {
            self.state = RunState::Converged;
            log::info!(
                "Finished {} iterations, best loss {:.4e}",
                self.iteration,
                self.best.as_ref().map_or(f64::INFINITY, |best| best.loss),
            );
        }

        Ok(Some(progress))
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Number of completed iterations.
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// The run configuration.
    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// The fixed targets the canvas is scored against.
    pub fn targets(&self) -> &Targets<B> {
        self.composer.targets()
    }

    /// The live canvas, which may differ from the best snapshot.
    pub fn canvas(&self) -> Tensor<B::InnerBackend, 4> {
        self.canvas.snapshot()
    }

    /// Lowest-loss snapshot so far.
    pub fn best(&self) -> Option<&BestSnapshot<B::InnerBackend>> {
        self.best.as_ref()
    }

    /// Consume the engine, keeping the best snapshot.
    pub fn into_best(self) -> Option<BestSnapshot<B::InnerBackend>> {
        self.best
    }
}

/// Run a complete style transfer and return the best snapshot.
pub fn stylize<B, E, O>(
    config: TransferConfig,
    extractor: E,
    content: Tensor<B, 4>,
    style: Tensor<B, 4>,
    observer: &mut O,
) -> Result<Option<BestSnapshot<B::InnerBackend>>, StyleTransferError>
where
    B: AutodiffBackend,
    E: FeatureExtractor<B>,
    O: ProgressObserver,
{
    let mut transfer = StyleTransfer::new(config, extractor, content, style)?;
    transfer.run(observer)?;

    Ok(transfer.into_best())
}
