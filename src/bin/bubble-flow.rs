use anyhow::{Context, Result};
use bubble_flow::{
    AnalyzerConfig, FlowAnalyzer, MemoryRegistry, inject_credentials, json_output::LintJsonOutput,
    normalize, parser::source_hash,
};
use clap::{Args, Parser, Subcommand};
use std::{
    collections::BTreeMap,
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "bubble-flow", about = "Validate, extract and normalize BubbleFlow sources")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate flow files or directories of flows.
    Validate(ValidateArgs),
    /// Print the extracted bubble parameters of a flow as JSON.
    Extract(ExtractArgs),
    /// Rewrite braceless control-flow bodies into blocks.
    Normalize(NormalizeArgs),
    /// Print credential requirements, or inject credential handles into extracted parameters.
    Credentials(CredentialsArgs),
}

#[derive(Args, Debug)]
struct AnalyzerArgs {
    /// Bubble registry file (JSON, or TOML with the `toml` feature).
    #[arg(long = "registry")]
    registry: Option<PathBuf>,
    /// Analyzer config file.
    #[arg(long = "config")]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ValidateArgs {
    #[command(flatten)]
    analyzer: AnalyzerArgs,
    /// Emit one JSON object per flow instead of text.
    #[arg(long)]
    json: bool,
    #[arg(required = true)]
    targets: Vec<PathBuf>,
}

#[derive(Args, Debug)]
struct ExtractArgs {
    #[command(flatten)]
    analyzer: AnalyzerArgs,
    flow: PathBuf,
}

#[derive(Args, Debug)]
struct NormalizeArgs {
    /// Overwrite the file instead of printing the result.
    #[arg(long = "in-place")]
    in_place: bool,
    flow: PathBuf,
}

#[derive(Args, Debug)]
struct CredentialsArgs {
    #[command(flatten)]
    analyzer: AnalyzerArgs,
    /// Credential handle to inject, as KIND=HANDLE. Repeatable.
    #[arg(long = "value", value_parser = parse_credential_value)]
    values: Vec<(String, String)>,
    flow: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Validate(args) => handle_validate(args),
        Commands::Extract(args) => handle_extract(args),
        Commands::Normalize(args) => handle_normalize(args),
        Commands::Credentials(args) => handle_credentials(args),
    }
}

fn parse_credential_value(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((kind, handle)) if !kind.is_empty() => Ok((kind.to_string(), handle.to_string())),
        _ => Err(format!("expected KIND=HANDLE, got '{raw}'")),
    }
}

fn load_analyzer_inputs(args: &AnalyzerArgs) -> Result<(MemoryRegistry, AnalyzerConfig)> {
    let registry = match &args.registry {
        Some(path) => MemoryRegistry::load_from_file(path)?,
        None => MemoryRegistry::new(),
    };
    let config = match &args.config {
        Some(path) => AnalyzerConfig::load_from_file(path)?,
        None => AnalyzerConfig::default(),
    };
    tracing::debug!(bubbles = registry.len(), "analyzer inputs loaded");
    Ok((registry, config))
}

fn read_flow(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read flow {}", path.display()))
}

fn handle_validate(args: ValidateArgs) -> Result<()> {
    let (registry, config) = load_analyzer_inputs(&args.analyzer)?;
    let analyzer = FlowAnalyzer::with_config(&registry, config);

    let mut files = Vec::new();
    for target in &args.targets {
        collect_flow_files(target, &mut files)?;
    }

    let mut failures = 0usize;
    for path in files {
        let source = match read_flow(&path) {
            Ok(source) => source,
            Err(err) if args.json => {
                failures += 1;
                let output =
                    LintJsonOutput::error(format!("{err:#}"), Some(path.display().to_string()));
                println!("{}", output.into_string());
                continue;
            }
            Err(err) => return Err(err),
        };
        let result = analyzer.validate(&source);
        if !result.valid {
            failures += 1;
        }
        if args.json {
            let output = LintJsonOutput::from_validation(
                &result,
                Some(path.display().to_string()),
                Some(source_hash(&source)),
            );
            println!("{}", output.into_string());
        } else if result.valid {
            println!("OK  {}", path.display());
        } else {
            for diagnostic in &result.errors {
                match diagnostic.location {
                    Some(loc) => eprintln!(
                        "ERR {}:{}:{}: {}",
                        path.display(),
                        loc.line,
                        loc.column,
                        diagnostic.message
                    ),
                    None => eprintln!("ERR {}: {}", path.display(), diagnostic.message),
                }
            }
        }
    }

    if failures == 0 {
        if !args.json {
            println!("All flows valid");
        }
        Ok(())
    } else {
        Err(anyhow::anyhow!("{failures} flow(s) failed validation"))
    }
}

fn collect_flow_files(path: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    if path.is_file() {
        out.push(path.to_path_buf());
    } else if path.is_dir() {
        let mut entries = fs::read_dir(path)
            .with_context(|| format!("failed to read directory {}", path.display()))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .with_context(|| format!("failed to read directory entry in {}", path.display()))?;
        entries.sort_by_key(|entry| entry.path());
        for entry in entries {
            let child = entry.path();
            if child.is_dir() || child.extension() == Some(OsStr::new("ts")) {
                collect_flow_files(&child, out)?;
            }
        }
    } else {
        anyhow::bail!("no such flow file or directory: {}", path.display());
    }
    Ok(())
}

fn handle_extract(args: ExtractArgs) -> Result<()> {
    let (registry, config) = load_analyzer_inputs(&args.analyzer)?;
    let source = read_flow(&args.flow)?;
    let result = FlowAnalyzer::with_config(&registry, config).extract(&source);
    println!("{}", serde_json::to_string_pretty(&result)?);
    if result.valid {
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "{} failed validation with {} error(s)",
            args.flow.display(),
            result.errors.len()
        ))
    }
}

fn handle_normalize(args: NormalizeArgs) -> Result<()> {
    let source = read_flow(&args.flow)?;
    let normalized = normalize(&source);
    if args.in_place {
        if normalized != source {
            fs::write(&args.flow, &normalized)
                .with_context(|| format!("failed to write {}", args.flow.display()))?;
        }
    } else {
        print!("{normalized}");
    }
    Ok(())
}

fn handle_credentials(args: CredentialsArgs) -> Result<()> {
    let (registry, config) = load_analyzer_inputs(&args.analyzer)?;
    let source = read_flow(&args.flow)?;
    let analyzer = FlowAnalyzer::with_config(&registry, config);

    if args.values.is_empty() {
        let requirements = analyzer
            .required_credentials(&source)
            .with_context(|| format!("failed to analyse {}", args.flow.display()))?;
        println!("{}", serde_json::to_string_pretty(&requirements)?);
        return Ok(());
    }

    let result = analyzer.extract(&source);
    if !result.valid {
        let messages: Vec<_> = result.errors.iter().map(|d| d.message.as_str()).collect();
        anyhow::bail!(
            "{} failed validation: {}",
            args.flow.display(),
            messages.join("; ")
        );
    }
    let values: BTreeMap<String, String> = args.values.into_iter().collect();
    let injected = inject_credentials(&result.bubble_parameters, &result.required_credentials, &values);
    println!("{}", serde_json::to_string_pretty(&injected)?);
    Ok(())
}
