use burn::config::Config;
use burn::optim::AdamConfig;

use crate::StyleTransferError;
use crate::projector::PixelBounds;

/// Configuration of a single style transfer run.
#[derive(Config, Debug)]
pub struct TransferConfig {
    /// Number of optimization steps. The loop always runs exactly this many.
    #[config(default = 1000)]
    pub num_iterations: usize,
    /// Weight applied to the averaged style loss.
    #[config(default = 1e-2)]
    pub style_weight: f64,
    /// Weight applied to the averaged content loss.
    #[config(default = 1e3)]
    pub content_weight: f64,
    /// Learning rate of the optimizer, fixed for the whole run.
    #[config(default = 5.0)]
    pub learning_rate: f64,
    /// Emit a progress observation every `log_interval` iterations.
    #[config(default = 100)]
    pub log_interval: usize,
    /// [Adam](AdamConfig) hyper-parameters.
    #[config(default = "AdamConfig::new().with_beta_1(0.99).with_epsilon(1e-1)")]
    pub optimizer: AdamConfig,
    /// Valid pixel range of the preprocessing space.
    #[config(default = "PixelBounds::mean_centered_bgr()")]
    pub bounds: PixelBounds,
}

impl TransferConfig {
    /// Reject configurations that cannot produce a meaningful run.
    pub fn validate(&self) -> Result<(), StyleTransferError> {
        for (name, weight) in [
            ("style_weight", self.style_weight),
            ("content_weight", self.content_weight),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(StyleTransferError::config(format!(
                    "{name} must be a finite, non-negative number, got {weight}"
                )));
            }
        }

        if self.style_weight == 0.0 && self.content_weight == 0.0 {
            return Err(StyleTransferError::config(
                "style_weight and content_weight cannot both be zero",
            ));
        }

        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(StyleTransferError::config(format!(
                "learning_rate must be a finite, positive number, got {}",
                self.learning_rate
            )));
        }

        if self.log_interval == 0 {
            return Err(StyleTransferError::config("log_interval must be at least 1"));
        }

        self.bounds.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = TransferConfig::new();

        assert_eq!(config.num_iterations, 1000);
        assert_eq!(config.style_weight, 1e-2);
        assert_eq!(config.content_weight, 1e3);
        assert_eq!(config.learning_rate, 5.0);
        assert_eq!(config.log_interval, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_style_weight_is_accepted() {
        let config = TransferConfig::new()
            .with_style_weight(0.0)
            .with_content_weight(1.0);

        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_invalid_values() {
        let invalid = [
            TransferConfig::new().with_style_weight(-1.0),
            TransferConfig::new().with_content_weight(f64::NAN),
            TransferConfig::new()
                .with_style_weight(0.0)
                .with_content_weight(0.0),
            TransferConfig::new().with_learning_rate(0.0),
            TransferConfig::new().with_learning_rate(f64::INFINITY),
            TransferConfig::new().with_log_interval(0),
            TransferConfig::new().with_bounds(PixelBounds::uniform(1.0, -1.0)),
        ];

        for config in invalid {
            assert!(
                matches!(config.validate(), Err(StyleTransferError::Configuration(_))),
                "{config} should be rejected"
            );
        }
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = TransferConfig::new()
            .with_num_iterations(42)
            .with_learning_rate(0.5);
        let path = std::env::temp_dir().join("neural_style_transfer_config.json");

        config.save(&path).unwrap();
        let loaded = TransferConfig::load(&path).unwrap();

        assert_eq!(loaded.num_iterations, 42);
        assert_eq!(loaded.learning_rate, 0.5);
        assert_eq!(loaded.bounds, config.bounds);
    }
}
