use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Instant;

use addon_manifest::core::{BuildOptions, ExtraModule, ManifestBuilder, SYSTEM_PACKAGE};
use addon_manifest::formatters::{HarnessFormatter, JsonCompactFormatter};
use addon_manifest::logging::init_logging;
use addon_manifest::packages::{LegacyMapping, PackageLoader};

#[derive(Debug, Clone, Parser)]
#[command(
    name = "addon-manifest",
    version = "0.1.0",
    author = "addon-manifest developers",
    about = "Resolve module requirements and build a packaging manifest for an extension"
)]
struct Cli {
    /// Directory of the extension package (holds package.json)
    #[arg(short, long, value_name = "DIR")]
    package: PathBuf,

    /// Directories containing dependency packages, one package per subdirectory
    #[arg(long = "packages", value_name = "DIR")]
    package_dirs: Vec<PathBuf>,

    /// Comma-separated packages to include even if nothing depends on them
    #[arg(long, value_name = "NAMES", value_delimiter = ',')]
    extra_packages: Vec<String>,

    /// Extra module to force into the manifest, as PACKAGE:SECTION:MODULE:FILE
    #[arg(long = "extra-module", value_name = "SPEC")]
    extra_modules: Vec<String>,

    /// SDK root holding mapping.json for legacy module names [default: $ADDON_SDK_ROOT]
    #[arg(long, value_name = "DIR")]
    sdk_root: Option<PathBuf>,

    /// Legacy mapping file, overriding the one under the SDK root
    #[arg(long, value_name = "FILE")]
    mapping: Option<PathBuf>,

    /// Also discover and scan the package's test modules
    #[arg(long)]
    tests: bool,

    /// Only include tests whose name matches this regular expression
    #[arg(long, value_name = "REGEX", requires = "tests")]
    filter: Option<String>,

    /// Ship system package modules instead of relying on the runtime's copy
    #[arg(long)]
    bundle_sdk: bool,

    /// Output file path
    #[arg(short, long, value_name = "FILE", default_value = "manifest.json")]
    output: PathBuf,

    /// Output format: harness, json-compact
    #[arg(short, long, value_name = "FORMAT", value_enum, default_value_t = OutputFormat::Harness)]
    format: OutputFormat,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, value_name = "FILTER")]
    log_level: Option<String>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
#[value(rename_all = "kebab-case")]
enum OutputFormat {
    Harness,
    JsonCompact,
}

impl OutputFormat {
    fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Harness => "harness",
            OutputFormat::JsonCompact => "json-compact",
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());
    run(cli)
}

fn parse_extra_module(value: &str) -> Result<ExtraModule> {
    let parts: Vec<&str> = value.splitn(4, ':').collect();
    let [package, section, module, js] = parts.as_slice() else {
        anyhow::bail!("invalid extra module '{value}': expected PACKAGE:SECTION:MODULE:FILE");
    };
    Ok(ExtraModule::parse(*package, section, *module, *js)?)
}

fn run(cli: Cli) -> Result<()> {
    let Cli {
        package,
        package_dirs,
        mut extra_packages,
        extra_modules,
        sdk_root,
        mapping,
        tests,
        filter,
        bundle_sdk,
        output,
        format,
        log_level: _,
    } = cli;

    let start_time = Instant::now();

    let target = PackageLoader::load_descriptor(&package)
        .with_context(|| format!("loading package at {}", package.display()))?;
    let target_name = target.name.clone();
    tracing::info!(package = %target_name, format = format.as_str(), "building manifest");

    if tests && !extra_packages.iter().any(|name| name == SYSTEM_PACKAGE) {
        extra_packages.push(SYSTEM_PACKAGE.to_string());
    }
    let registry = PackageLoader::new(package_dirs)
        .registry_for(target, &extra_packages)
        .context("assembling package registry")?;
    tracing::debug!(packages = registry.len(), "package registry ready");

    let legacy = match (mapping, sdk_root) {
        (Some(path), _) => LegacyMapping::load(&path)?,
        (None, Some(root)) => LegacyMapping::under_root(&root)?,
        (None, None) => LegacyMapping::from_env()?,
    };

    let mut options = BuildOptions::new();
    if tests {
        options = options.with_tests(filter.as_deref())?;
    }
    for value in &extra_modules {
        options = options.with_extra_module(parse_extra_module(value)?);
    }

    let manifest = ManifestBuilder::new(&target_name, &registry, &legacy)?.build(&options)?;

    for cycle in manifest.cycles() {
        tracing::debug!(modules = ?cycle, "requirement cycle");
    }

    match format {
        OutputFormat::Harness => {
            HarnessFormatter::new()
                .with_bundled_sdk(bundle_sdk)
                .format_to_file(&manifest, &output)?;
        }
        OutputFormat::JsonCompact => {
            JsonCompactFormatter::new().format_to_file(&manifest, &output)?;
        }
    }

    tracing::info!(
        modules = manifest.len(),
        packages = manifest.used_packages().len(),
        tests = manifest.test_modules().len(),
        output = %output.display(),
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "manifest written"
    );

    Ok(())
}
