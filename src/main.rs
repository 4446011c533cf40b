//! dicom_reader - print the elements of a DICOM file and export its image.

use std::io::{self, BufWriter, Write};
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dicom_reader::{export_image, AttributeDictionary, CommonResult, Config, DatasetReader};

fn main() -> ExitCode {
    let config = Config::parse();

    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(config: &Config) -> CommonResult<()> {
    let loaded;
    let dictionary = match &config.dictionary {
        Some(path) => {
            loaded = AttributeDictionary::load(path)?;
            info!(path = %path.display(), entries = loaded.len(), "dictionary loaded");
            &loaded
        }
        None => AttributeDictionary::standard(),
    };

    let dataset = DatasetReader::new(dictionary).read_file(&config.input)?;

    info!(
        elements = dataset.len(),
        transfer_syntax = dataset.transfer_syntax_uid().unwrap_or("-"),
        explicit_vr = dataset.explicit_vr,
        little_endian = dataset.little_endian,
        "decoded"
    );

    if !config.quiet {
        let stdout = io::stdout();
        let mut out = BufWriter::new(stdout.lock());
        dataset.dump(&mut out)?;
        out.flush()?;
    }

    // 生成图像数据
    if let Some(path) = &config.export {
        export_image(&dataset, path)?;
    }

    Ok(())
}

/// Initialize the tracing subscriber; `RUST_LOG` takes precedence.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "dicom_reader=debug"
    } else {
        "dicom_reader=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}
