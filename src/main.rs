use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser};
use wgpu_gallery::logging::{init_logging, LoggingConfig};
use wgpu_gallery::{DemoConfig, DemoError, DepthMode, ParticleDemo};

/// Image-spawned GPU particles with filtered shadows and reversed-Z depth.
#[derive(Debug, Parser)]
#[command(name = "wgpu-gallery", version, about)]
struct Cli {
    /// JSON config file; flags below override its values.
    #[arg(long, env = "WGPU_GALLERY_CONFIG")]
    config: Option<PathBuf>,

    /// Spawn image (PNG or JPEG). Defaults to a procedural ring.
    #[arg(long)]
    image: Option<PathBuf>,

    /// Number of particles.
    #[arg(long)]
    particles: Option<u32>,

    /// Depth range of the main camera.
    #[arg(long, value_enum)]
    depth: Option<DepthMode>,

    /// Upper bound for the spawn pyramid size (power of two).
    #[arg(long)]
    pyramid_size: Option<u32>,

    /// Seed for reproducible runs.
    #[arg(long)]
    seed: Option<u64>,

    /// Constant simulation step in seconds.
    #[arg(long)]
    fixed_delta: Option<f32>,

    /// More log output (-v debug, -vv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn into_config(self) -> Result<DemoConfig, DemoError> {
        let mut config = match &self.config {
            Some(path) => DemoConfig::load(path)?,
            None => DemoConfig::default(),
        };
        if let Some(image) = self.image {
            config.image = Some(image);
        }
        if let Some(count) = self.particles {
            config.particle_count = count;
        }
        if let Some(depth) = self.depth {
            config.depth_mode = depth;
        }
        if let Some(size) = self.pyramid_size {
            config.pyramid_size = size;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(delta) = self.fixed_delta {
            config.fixed_delta = Some(delta);
        }
        config.validate()?;
        Ok(config)
    }
}

fn run(cli: Cli) -> Result<(), DemoError> {
    let config = cli.into_config()?;
    ParticleDemo::from_config(config).run()
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(LoggingConfig::with_verbosity(cli.verbose));

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::parse_from([
            "wgpu-gallery",
            "--particles",
            "2048",
            "--depth",
            "standard",
            "--seed",
            "3",
        ]);
        let config = cli.into_config().unwrap();
        assert_eq!(config.particle_count, 2048);
        assert_eq!(config.depth_mode, DepthMode::Standard);
        assert_eq!(config.seed, Some(3));
        assert_eq!(config.pyramid_size, 512);
    }

    #[test]
    fn test_depth_and_verbosity_flags() {
        let cli = Cli::parse_from(["wgpu-gallery", "--depth", "reversed", "-vv"]);
        assert_eq!(cli.depth, Some(DepthMode::Reversed));
        assert_eq!(cli.verbose, 2);
        assert!(Cli::try_parse_from(["wgpu-gallery", "--depth", "sideways"]).is_err());
    }

    #[test]
    fn test_oversized_particle_count_is_rejected() {
        let cli = Cli::parse_from(["wgpu-gallery", "--particles", "5000000"]);
        assert!(matches!(cli.into_config(), Err(DemoError::Config(_))));
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let cli = Cli::parse_from(["wgpu-gallery", "--pyramid-size", "300"]);
        assert!(matches!(cli.into_config(), Err(DemoError::Config(_))));
    }
}
