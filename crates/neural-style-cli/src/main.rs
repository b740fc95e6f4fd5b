mod cli;
mod logger;
mod run;

use std::process::ExitCode;

use clap::Parser;

use crate::cli::Cli;

#[cfg(feature = "wgpu")]
mod backend {
    use burn::backend::{Autodiff, wgpu::Wgpu};

    pub type Backend = Autodiff<Wgpu>;
}

#[cfg(all(feature = "ndarray", not(feature = "wgpu")))]
mod backend {
    use burn::backend::{Autodiff, ndarray::NdArray};

    pub type Backend = Autodiff<NdArray>;
}

#[cfg(not(any(feature = "ndarray", feature = "wgpu")))]
compile_error!("enable a backend feature: `ndarray` or `wgpu`");

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = logger::install_logger(cli.log_file.as_deref()) {
        eprintln!("{err}");
        return ExitCode::FAILURE;
    }

    let device = Default::default();
    match run::run::<backend::Backend>(cli, device) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}
