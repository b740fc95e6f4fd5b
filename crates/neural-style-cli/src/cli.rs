use std::path::PathBuf;

use clap::Parser;

/// Paint the content of one image in the style of another.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Image whose content is kept
    #[arg(long, value_name = "PATH")]
    pub content: PathBuf,

    /// Image whose style is transferred
    #[arg(long, value_name = "PATH")]
    pub style: PathBuf,

    /// Where the stylized image is written, the format follows the extension
    #[arg(short, long, value_name = "PATH", default_value = "output.png")]
    pub output: PathBuf,

    /// PyTorch checkpoint of the VGG19 `features` module
    #[arg(long, value_name = "PATH")]
    pub weights: Option<PathBuf>,

    /// Run configuration saved as JSON, flags below override its values
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Write the effective configuration to this path before running
    #[arg(long, value_name = "PATH")]
    pub save_config: Option<PathBuf>,

    /// Number of optimization steps
    #[arg(short = 'n', long)]
    pub iterations: Option<usize>,

    /// Weight of the style loss
    #[arg(long)]
    pub style_weight: Option<f64>,

    /// Weight of the content loss
    #[arg(long)]
    pub content_weight: Option<f64>,

    /// Adam learning rate
    #[arg(short, long)]
    pub learning_rate: Option<f64>,

    /// Log the losses every N iterations
    #[arg(long, value_name = "N")]
    pub log_interval: Option<usize>,

    /// Longest side of both images after resizing
    #[arg(long, default_value_t = 512)]
    pub max_dim: u32,

    /// Also write the logs to this file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn every_flag_is_documented() {
        let command = Cli::command();

        for arg in command.get_arguments() {
            let id = arg.get_id().as_str();
            if id == "help" || id == "version" {
                continue;
            }
            assert!(arg.get_help().is_some(), "--{id} has no help text");
        }
    }

    #[test]
    fn loss_weights_appear_in_help() {
        let help = Cli::command().render_help().to_string();

        assert!(help.contains("Weight of the style loss"));
        assert!(help.contains("Weight of the content loss"));
    }
}
