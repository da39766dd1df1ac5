use std::{
    io::Write as _,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "fxfuse", version)]
struct Cli {
    /// Log pipeline stages to stderr (overridden by RUST_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fuse an effect source file with the modules of a level.
    Fuse(FuseArgs),
    /// List the modules active at a level, in fusion order.
    Modules(ModulesArgs),
    /// List the configured level policies.
    Levels(ConfigArg),
}

#[derive(Parser, Debug)]
struct ConfigArg {
    /// Module catalog and level policy JSON (defaults to the built-in catalog).
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct FuseArgs {
    /// Input effect source.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Enhancement level.
    #[arg(long)]
    level: u8,

    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    creativity_boost: f64,

    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    performance_priority: f64,

    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    innovation_level: f64,

    #[command(flatten)]
    config: ConfigArg,

    /// Output path for the fused code (stdout when omitted).
    #[arg(long)]
    out: Option<PathBuf>,

    /// Write the transformation report as JSON.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Print the human-readable report to stderr.
    #[arg(long)]
    text_report: bool,
}

#[derive(Parser, Debug)]
struct ModulesArgs {
    #[arg(long)]
    level: u8,

    #[command(flatten)]
    config: ConfigArg,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Fuse(args) => cmd_fuse(args),
        Command::Modules(args) => cmd_modules(args),
        Command::Levels(args) => cmd_levels(args),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "fxfuse=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_orchestrator(arg: &ConfigArg) -> anyhow::Result<fxfuse::FusionOrchestrator> {
    let config = match &arg.config {
        Some(path) => fxfuse::FusionConfig::from_path(path)
            .with_context(|| format!("load config '{}'", path.display()))?,
        None => fxfuse::FusionConfig::builtin(),
    };
    Ok(fxfuse::FusionOrchestrator::from_config(config)?)
}

fn write_file(path: &Path, contents: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(path, contents).with_context(|| format!("write '{}'", path.display()))
}

fn cmd_fuse(args: FuseArgs) -> anyhow::Result<()> {
    let orch = load_orchestrator(&args.config)?;
    let source = std::fs::read_to_string(&args.in_path)
        .with_context(|| format!("read effect source '{}'", args.in_path.display()))?;

    let options = fxfuse::FusionOptions {
        creativity_boost: args.creativity_boost,
        performance_priority: args.performance_priority,
        innovation_level: args.innovation_level,
    };
    let artifact = orch.fuse(&source, args.level, &options)?;

    match &args.out {
        Some(path) => {
            write_file(path, artifact.code.as_bytes())?;
            eprintln!("wrote {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", artifact.code).context("write fused code to stdout")?;
        }
    }

    if let Some(path) = &args.report {
        let json = serde_json::to_vec_pretty(&artifact.transformation_report)
            .context("serialize transformation report")?;
        write_file(path, &json)?;
        eprintln!("wrote {}", path.display());
    }

    if args.text_report {
        eprint!("{}", artifact.transformation_report.render_text());
        eprintln!("{}", artifact.creative_evolution_summary.headline);
    }

    eprintln!("fusion id: {}", artifact.fusion_id);
    Ok(())
}

fn cmd_modules(args: ModulesArgs) -> anyhow::Result<()> {
    let orch = load_orchestrator(&args.config)?;
    let mut stdout = std::io::stdout().lock();
    for m in orch.select_modules(args.level)? {
        writeln!(
            stdout,
            "{:<24} level={} {:<13} creative={:.2} technical={:.2}{}",
            m.id,
            m.level,
            m.specialization.as_str(),
            m.creative_weight,
            m.technical_weight,
            if m.universal { " universal" } else { "" }
        )?;
    }
    Ok(())
}

fn cmd_levels(args: ConfigArg) -> anyhow::Result<()> {
    let orch = load_orchestrator(&args)?;
    let mut stdout = std::io::stdout().lock();
    for p in orch.policies().policies() {
        writeln!(
            stdout,
            "level {}: {} intensity={:.2} creativity={:.2} technical={:.2}",
            p.level,
            p.strategy.as_str(),
            p.fusion_intensity,
            p.creativity_factor,
            p.technical_focus
        )?;
    }
    Ok(())
}
