use std::path::PathBuf;

use anyhow::Result;

use packwright::application::{
    BuildUseCase, Pipeline, PipelineInputs, PipelineSummary, ResolveUseCase,
};
use packwright::config::{with_env_overrides, Config};
use packwright::infrastructure::{
    CargoLockRepository, CargoToolchain, DiskContentStore, OciArchiveWriter, OriginRouter,
};

use crate::cli::BuildArgs;

type CargoPipeline =
    Pipeline<CargoLockRepository, OriginRouter, DiskContentStore, CargoToolchain, OciArchiveWriter>;

pub fn cmd_build_package(args: &BuildArgs, json: bool) -> Result<()> {
    let config = load_config(args)?;
    let build = config.build_options(args.profile.as_deref())?;
    let pipeline = pipeline(&config);

    let (lockfile, source_dir) = (config.lockfile_path(), config.source_dir());
    let inputs = PipelineInputs {
        lockfile: &lockfile,
        overrides: &config.lock.overrides,
        source_dir: &source_dir,
        out_dir: &args.out,
        build: &build,
    };
    let summary = pipeline.build_package(&inputs)?;
    report(&summary, json)
}

pub fn cmd_build_image(args: &BuildArgs, json: bool) -> Result<()> {
    let config = load_config(args)?;
    let build = config.build_options(args.profile.as_deref())?;
    // Validate the image declaration before spending time on the build
    let spec = config.image_spec()?;
    let pipeline = pipeline(&config);

    let (lockfile, source_dir) = (config.lockfile_path(), config.source_dir());
    let inputs = PipelineInputs {
        lockfile: &lockfile,
        overrides: &config.lock.overrides,
        source_dir: &source_dir,
        out_dir: &args.out,
        build: &build,
    };
    let summary = pipeline.build_image(&inputs, &spec)?;
    report(&summary, json)
}

fn load_config(args: &BuildArgs) -> Result<Config> {
    let (config, warnings) = Config::load_with_warnings(&args.config)?;
    for warning in &warnings {
        tracing::warn!("{warning}");
    }
    Ok(with_env_overrides(config)?)
}

fn pipeline(config: &Config) -> CargoPipeline {
    let cache_root = config
        .cache_root()
        .unwrap_or_else(DiskContentStore::default_root);
    tracing::debug!(cache = %cache_root.display(), "using content store");

    // A missing toolchain surfaces as a compile error, after resolution
    let toolchain = CargoToolchain::detect().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "cargo/rustc not found on PATH");
        CargoToolchain::new(PathBuf::from("cargo"), PathBuf::from("rustc"))
    });

    Pipeline::new(
        ResolveUseCase::new(
            CargoLockRepository::new(),
            OriginRouter::new(config.fetch_timeout()),
            DiskContentStore::new(cache_root),
            config.resolve_options(),
        ),
        BuildUseCase::new(toolchain),
        OciArchiveWriter::new(),
    )
}

fn report(summary: &PipelineSummary, json: bool) -> Result<()> {
    if json {
        crate::ui::json::emit(serde_json::to_value(summary)?)?;
        return Ok(());
    }

    println!(
        "Built {} ({}, {}) with {} verified dependencies",
        summary.binary, summary.profile, summary.target, summary.dependencies
    );
    println!("  artifact: {}", summary.artifact_digest);
    if let Some(image) = &summary.image {
        println!("  image:    {} ({})", image.reference, image.id);
        println!("  entrypoint: {}", image.entrypoint.join(" "));
    }
    println!("  output:   {}", summary.output.display());
    Ok(())
}
