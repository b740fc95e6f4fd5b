use burn::config::Config;
use burn::tensor::backend::AutodiffBackend;
use neural_style::extractor::{LayerSelection, Vgg19Config};
use neural_style::imaging::{Resize, load_image, save_image};
use neural_style::{LogObserver, StyleTransfer, StyleTransferError, TransferConfig};

use crate::cli::Cli;

/// Merge the configuration file with the command line overrides.
pub fn transfer_config(cli: &Cli) -> Result<TransferConfig, StyleTransferError> {
    let mut config = match &cli.config {
        Some(path) => TransferConfig::load(path)
            .map_err(|err| StyleTransferError::Configuration(err.to_string()))?,
        None => TransferConfig::new(),
    };

    if let Some(iterations) = cli.iterations {
        config.num_iterations = iterations;
    }
    if let Some(weight) = cli.style_weight {
        config.style_weight = weight;
    }
    if let Some(weight) = cli.content_weight {
        config.content_weight = weight;
    }
    if let Some(learning_rate) = cli.learning_rate {
        config.learning_rate = learning_rate;
    }
    if let Some(interval) = cli.log_interval {
        config.log_interval = interval;
    }

    config.validate()?;

    Ok(config)
}

/// Load both images and the network, run the optimization and save the best canvas.
///
/// The best canvas is saved even when the run diverges; the divergence is still reported.
pub fn run<B: AutodiffBackend>(cli: Cli, device: B::Device) -> Result<(), StyleTransferError> {
    let config = transfer_config(&cli)?;
    if let Some(path) = &cli.save_config {
        config.save(path)?;
        log::info!("Saved the configuration to {}", path.display());
    }

    let resize = Resize::MaxDimension(cli.max_dim);
    let content = load_image::<B>(&cli.content, resize, &device)?;
    let style = load_image::<B>(&cli.style, resize, &device)?;

    let vgg = Vgg19Config::new().init::<B>(LayerSelection::default(), &device)?;
    let vgg = match &cli.weights {
        Some(path) => vgg.load_pytorch_weights(path.clone(), &device)?,
        None => {
            log::warn!("No weights given, the network is randomly initialized");
            vgg
        }
    };

    let mut transfer = StyleTransfer::new(config, vgg, content, style)?;
    let outcome = transfer.run(&mut LogObserver).map(|_| ());

    match transfer.into_best() {
        Some(best) => {
            log::info!(
                "Best loss {:.4e} at iteration {}",
                best.loss,
                best.iteration
            );
            save_image(best.image, &cli.output)?;
        }
        None => log::warn!("No iteration completed, nothing to save"),
    }

    outcome
}
