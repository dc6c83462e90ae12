use std::process::ExitCode;

use clap::Parser;
use gpujoin_bench::batch::{finish, report, run_batch, BatchOutcome};
use gpujoin_bench::cli::CliArgs;
use gpujoin_bench::config::{BatchConfig, Command};
use gpujoin_bench::{logging, BenchError};
use gpujoin_runtime::HostDevice;
use tracing::{error, info};

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let command = match Command::from_args(args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let (log_path, verbose) = match &command {
        Command::Run(c) => (c.log_path.clone(), c.verbose),
        Command::Report(c) => (c.log_path.clone(), c.verbose),
    };
    if let Err(e) = logging::init(&log_path, verbose) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }
    info!("gpujoin {}", std::env::args().skip(1).collect::<Vec<_>>().join(" "));

    let result = match &command {
        Command::Run(config) => run(config),
        Command::Report(config) => report(config).map(|_| BatchOutcome::Clean),
    };

    match result {
        Ok(BatchOutcome::Clean) => ExitCode::SUCCESS,
        Ok(BatchOutcome::Mismatched) => ExitCode::FAILURE,
        Err(e) => {
            error!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(config: &BatchConfig) -> Result<BatchOutcome, BenchError> {
    #[cfg(feature = "opencl")]
    if !config.use_host {
        let device = gpu::open(config)?;
        let batch = run_batch(config, &device)?;
        return finish(config, &batch);
    }
    #[cfg(not(feature = "opencl"))]
    if !config.use_host {
        tracing::warn!("built without the `opencl` feature; joining on the host reference device");
    }

    let batch = run_batch(config, &HostDevice::new())?;
    finish(config, &batch)
}

#[cfg(feature = "opencl")]
mod gpu {
    use gpujoin_bench::config::BatchConfig;
    use gpujoin_bench::BenchError;
    use gpujoin_runtime::{KernelSource, LaunchGeometry, OpenClDevice};
    use tracing::{info, warn};

    /// Build the OpenCL device and dump the generated kernel source and
    /// program binary into the output directory.
    pub fn open(config: &BatchConfig) -> Result<OpenClDevice, BenchError> {
        let source = match &config.kernel_path {
            Some(path) => KernelSource::from_file(path)?,
            None => KernelSource::builtin(),
        };
        let geometry = LaunchGeometry::new(0, config.local_size);
        let generated = source.generate(&geometry);

        std::fs::create_dir_all(&config.output_dir)
            .map_err(|e| BenchError::io(&config.output_dir, e))?;
        let kernel_dump = config.kernel_dump_path();
        std::fs::write(&kernel_dump, &generated).map_err(|e| BenchError::io(&kernel_dump, e))?;

        let device = OpenClDevice::new(&config.platform, &generated, geometry.block_rows())?;
        info!("Kernel built from {}", kernel_dump.display());

        match device.program_binaries() {
            Ok(binaries) => {
                let binary_dump = config.binary_dump_path();
                let bytes: Vec<u8> = binaries.into_iter().flatten().collect();
                if let Err(e) = std::fs::write(&binary_dump, bytes) {
                    warn!("could not write {}: {}", binary_dump.display(), e);
                }
            }
            Err(e) => warn!("program binary unavailable: {}", e),
        }
        Ok(device)
    }
}
