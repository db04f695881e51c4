use anyhow::{Context, Result};
use build_reports::cli::commands::{PlanCommand, SourceArgs, SyncCommand, SynthesisArgs, VersionsCommand};
use build_reports::cli::output::*;
use build_reports::cli::{Cli, Command};
use build_reports::core::{config::ReportConfig, group_minor_lines, PipelineAssembler, ReleaseVersion};
use build_reports::source::{ChannelSource, GitCloner};
use build_reports::store::{tekton::default_namespace, Pipeline, TektonClient};
use build_reports::sync::{PipelineSyncer, SyncConfig};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    let config = match &cli.config {
        Some(path) => ReportConfig::from_file(path)
            .with_context(|| format!("Failed to load report config {}", path))?,
        None => ReportConfig::default(),
    };

    // Execute command
    let result = match &cli.command {
        Command::Sync(cmd) => sync_pipeline(cmd, config).await,
        Command::Plan(cmd) => plan_pipeline(cmd, config).await,
        Command::Versions(cmd) => show_versions(cmd, config).await,
    };

    if let Err(e) = result {
        error!("{:#}", e);
        eprintln!("{} {}", CROSS, style("build-reports failed").red());
        std::process::exit(1);
    }

    Ok(())
}

/// Resolve configuration, fetch the channels and return the admitted versions in order
async fn gather_versions(
    source: &SourceArgs,
    synthesis: &SynthesisArgs,
    config: &mut ReportConfig,
) -> Result<Vec<ReleaseVersion>> {
    let needs_clone = source.apply(config);
    synthesis.apply(config);
    config.validate().context("Invalid report configuration")?;

    if needs_clone {
        info!("Cloning {}", config.repository_url);
        GitCloner::default()
            .clone_fresh(&config.repository_url, &config.clone_path)
            .await
            .context("Failed to clone graph data")?;
    }

    let versions = ChannelSource::new(config.channels_path())
        .collect_versions(&config.version_filter())
        .await
        .context("Failed to read channel versions")?;

    Ok(versions.into_iter().collect())
}

async fn sync_pipeline(cmd: &SyncCommand, mut config: ReportConfig) -> Result<()> {
    if let Some(name) = &cmd.pipeline_name {
        config.pipeline_name = name.clone();
    }

    let versions = gather_versions(&cmd.source, &cmd.synthesis, &mut config).await?;
    let spec = PipelineAssembler::from_config(&config)
        .assemble(&versions)
        .context("Failed to assemble pipeline")?;
    println!("{}", format_plan_summary(&spec, versions.len()));

    let cluster = cmd
        .cluster
        .to_cluster_config()
        .context("Failed to configure cluster access")?;
    let namespace = cmd
        .namespace
        .clone()
        .or_else(|| config.namespace.clone())
        .or_else(|| cluster.namespace.clone())
        .unwrap_or_else(default_namespace);
    let client = TektonClient::new(&cluster).context("Failed to create Tekton client")?;

    let syncer = PipelineSyncer::new(client, SyncConfig::from_report_config(&config, namespace));
    let outcome = syncer.sync(spec).await?;

    println!("{}", format_sync_outcome(&outcome));
    Ok(())
}

async fn plan_pipeline(cmd: &PlanCommand, mut config: ReportConfig) -> Result<()> {
    let versions = gather_versions(&cmd.source, &cmd.synthesis, &mut config).await?;
    let spec = PipelineAssembler::from_config(&config)
        .assemble(&versions)
        .context("Failed to assemble pipeline")?;

    let namespace = cmd
        .namespace
        .clone()
        .or_else(|| config.namespace.clone())
        .unwrap_or_else(default_namespace);
    let pipeline = Pipeline::new(&config.pipeline_name, &namespace, spec);

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&pipeline)?);
    } else {
        print!("{}", serde_yaml::to_string(&pipeline)?);
    }
    eprintln!("{}", format_plan_summary(&pipeline.spec, versions.len()));

    Ok(())
}

async fn show_versions(cmd: &VersionsCommand, mut config: ReportConfig) -> Result<()> {
    let versions = gather_versions(&cmd.source, &cmd.synthesis, &mut config).await?;
    let lines = group_minor_lines(&versions, config.max_versions_per_line);

    if cmd.json {
        let data = serde_json::json!({
            "versions": versions.iter().map(|v| v.as_str()).collect::<Vec<_>>(),
            "lines": lines.iter().map(|line| serde_json::json!({
                "line": format!("{}.{}", line.major, line.minor),
                "latest": line.versions.iter().map(|v| v.as_str()).collect::<Vec<_>>(),
            })).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    println!("{} {} versions admitted:", INFO, style(versions.len()).cyan());
    for version in &versions {
        println!("  {}", version);
    }

    println!("{} Latest patches per minor line:", INFO);
    for line in &lines {
        println!("{}", format_minor_line(line));
    }

    Ok(())
}
