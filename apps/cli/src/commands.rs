//! CLI command definitions, routing, and tracing setup.

use std::io::Write;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::Section;
use color_eyre::eyre::{Report, Result, eyre};
use tracing::{info, warn};

use docsets_content::{DirectorySource, DocumentSource, JsonSnapshotSource};
use docsets_core::manifest::{parse_llms_txt, unresolved_entries};
use docsets_core::navigation::known_ids;
use docsets_core::{ExportPolicy, Site, export_source};
use docsets_server::AppState;
use docsets_shared::{CONFIG_FILE_NAME, DocsetsError, SiteConfig, init_config, load_config, resolve_content_dir};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// docsets: documentation export and llms.txt manifests.
#[derive(Parser)]
#[command(
    name = "docsets",
    version,
    about = "Export a documentation collection and organize it into llms.txt documentation sets.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Path to the config file.
    #[arg(long, default_value = CONFIG_FILE_NAME, global = true)]
    pub config: PathBuf,

    /// Content directory (overrides `content.dir`).
    #[arg(long, global = true)]
    pub content: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Write the JSON export of the collection.
    Export {
        /// Output file (stdout when omitted).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Read a previously exported docs.json instead of the content directory.
        #[arg(long)]
        from_json: Option<PathBuf>,
    },

    /// Write docs.json and every llms.txt artifact.
    Build {
        /// Output directory.
        #[arg(short, long, default_value = "dist")]
        out: PathBuf,
    },

    /// Show how documents are organized into sets.
    Sets {
        /// Only show this set.
        #[arg(long)]
        set: Option<String>,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Validate and print the sidebar navigation.
    Nav {
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Validate configuration against the content collection.
    Check {
        /// Also verify the links of an existing llms.txt.
        #[arg(long)]
        llms: Option<PathBuf>,
    },

    /// Serve the export endpoint and llms.txt files over HTTP.
    Serve {
        /// Address to bind (overrides `server.bind`).
        #[arg(long)]
        bind: Option<SocketAddr>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "docsets=info",
        1 => "docsets=debug",
        _ => "docsets=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // Logs go to stderr so stdout stays clean for exports.
    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let workspace = Workspace {
        config_path: cli.config.clone(),
        content_override: cli.content.clone(),
    };

    let result = match cli.command {
        Command::Export { out, from_json } => cmd_export(&workspace, out.as_deref(), from_json),
        Command::Build { out } => cmd_build(&workspace, &out),
        Command::Sets { set, json } => cmd_sets(&workspace, set.as_deref(), json),
        Command::Nav { json } => cmd_nav(&workspace, json),
        Command::Check { llms } => cmd_check(&workspace, llms.as_deref()),
        Command::Serve { bind } => cmd_serve(&workspace, bind).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(&workspace),
            ConfigAction::Show => cmd_config_show(&workspace),
        },
    };

    result.map_err(|report| {
        if is_config_failure(&report) {
            let path = workspace.config_path.display().to_string();
            report.suggestion(format!("fix the declarations in {path}"))
        } else {
            report
        }
    })
}

/// Whether the failure comes from the config file rather than the content.
fn is_config_failure(report: &Report) -> bool {
    report
        .downcast_ref::<DocsetsError>()
        .is_some_and(DocsetsError::is_configuration_error)
}

/// Where the config and content live for this invocation.
struct Workspace {
    config_path: PathBuf,
    content_override: Option<PathBuf>,
}

impl Workspace {
    fn config(&self) -> Result<SiteConfig> {
        Ok(load_config(&self.config_path)?)
    }

    fn content_dir(&self, config: &SiteConfig) -> PathBuf {
        self.content_override
            .clone()
            .unwrap_or_else(|| resolve_content_dir(&self.config_path, config))
    }

    fn source(&self, config: &SiteConfig) -> DirectorySource {
        DirectorySource::from_config(self.content_dir(config), &config.content)
    }

    /// A site for offline commands; the export secret is irrelevant there.
    fn offline_site(&self) -> Result<(Site, DirectorySource)> {
        let config = self.config()?;
        let source = self.source(&config);
        Ok((Site::with_policy(config, ExportPolicy::open())?, source))
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_export(workspace: &Workspace, out: Option<&Path>, from_json: Option<PathBuf>) -> Result<()> {
    let bytes = match from_json {
        Some(path) => export_source(&JsonSnapshotSource::new(path))?,
        None => {
            let config = workspace.config()?;
            export_source(&workspace.source(&config))?
        }
    };

    match out {
        Some(path) => {
            std::fs::write(path, &bytes)
                .map_err(|e| eyre!("cannot write {}: {e}", path.display()))?;
            info!(path = %path.display(), bytes = bytes.len(), "export written");
        }
        None => std::io::stdout().lock().write_all(&bytes)?,
    }

    Ok(())
}

fn cmd_build(workspace: &Workspace, out: &Path) -> Result<()> {
    let (site, source) = workspace.offline_site()?;
    let result = docsets_core::build(&site, &source, out)?;

    println!();
    println!("  Build complete!");
    println!("  Documents: {}", result.document_count);
    println!("  Sets:      {}", result.set_count);
    println!("  Artifacts: {}", result.report.artifacts.len());
    println!("  Path:      {}", result.out_dir.display());
    println!("  Time:      {:.1}s", result.elapsed.as_secs_f64());
    println!();

    Ok(())
}

fn cmd_sets(workspace: &Workspace, label: Option<&str>, json: bool) -> Result<()> {
    let (site, source) = workspace.offline_site()?;
    let documents = source.list_documents()?;
    let manifest = site.manifest(&documents);

    let sets = match label {
        Some(label) => vec![manifest.set(label)?],
        None => manifest.sets.iter().collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&sets)?);
        return Ok(());
    }

    for set in sets {
        println!("{} ({} documents) -> _llms-txt/{}.txt", set.label, set.members.len(), set.slug);
        for member in &set.members {
            println!("  {:<40} {}", member.id, member.title);
        }
    }

    Ok(())
}

fn cmd_nav(workspace: &Workspace, json: bool) -> Result<()> {
    let (site, source) = workspace.offline_site()?;
    let documents = source.list_documents()?;
    let tree = site.navigation(&documents)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tree)?);
    } else {
        print!("{}", tree.render_text());
    }

    Ok(())
}

fn cmd_check(workspace: &Workspace, llms: Option<&Path>) -> Result<()> {
    let (site, source) = workspace.offline_site()?;
    let documents = source.list_documents()?;
    let tree = site.navigation(&documents)?;
    let manifest = site.manifest(&documents);

    println!("  Documents:  {}", documents.len());
    println!("  Sets:       {}", manifest.sets.len());
    println!("  Nav links:  {}", tree.document_ids().len());

    for set in manifest.sets.iter().filter(|s| s.members.is_empty()) {
        warn!(label = %set.label, "set matches no documents");
    }

    let Some(path) = llms else {
        println!("  OK");
        return Ok(());
    };

    let content =
        std::fs::read_to_string(path).map_err(|e| eyre!("cannot read {}: {e}", path.display()))?;
    let parsed = parse_llms_txt(&content)?;
    let base = manifest.project.base_url.as_str();
    let unresolved = unresolved_entries(&parsed, base, &known_ids(&documents));

    if unresolved.is_empty() {
        println!("  {}: all links resolve", path.display());
        return Ok(());
    }

    for entry in &unresolved {
        println!("  [{}] {} -> {}", entry.section, entry.name, entry.url);
    }
    Err(eyre!(
        "{} link(s) in {} do not resolve to a document",
        unresolved.len(),
        path.display()
    ))
}

async fn cmd_serve(workspace: &Workspace, bind: Option<SocketAddr>) -> Result<()> {
    let config = workspace.config()?;
    let addr = match bind {
        Some(addr) => addr,
        None => config
            .server
            .bind
            .parse()
            .map_err(|e| eyre!("invalid server.bind '{}': {e}", config.server.bind))?,
    };

    let source: Arc<dyn DocumentSource> = Arc::new(workspace.source(&config));
    let site = Site::new(config)?;
    if site.policy().is_open() {
        warn!(
            secret_env = %site.config().export.secret_env,
            "export endpoint is open; set the secret env var to restrict it"
        );
    }

    let state = AppState::new(site, source);
    let count = state.preflight()?;
    info!(documents = count, "content validated");

    docsets_server::serve(addr, state).await?;
    Ok(())
}

fn cmd_config_init(workspace: &Workspace) -> Result<()> {
    let path = init_config(&workspace.config_path)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(workspace: &Workspace) -> Result<()> {
    let config = workspace.config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "docsets",
            "sets",
            "--set",
            "Guides",
            "--config",
            "site/docsets.toml",
            "-vv",
        ])
        .unwrap();

        assert_eq!(cli.config, PathBuf::from("site/docsets.toml"));
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Sets { set, json } => {
                assert_eq!(set.as_deref(), Some("Guides"));
                assert!(!json);
            }
            _ => panic!("expected sets command"),
        }
    }

    #[test]
    fn defaults_apply() {
        let cli = Cli::try_parse_from(["docsets", "build"]).unwrap();
        assert_eq!(cli.config, PathBuf::from(CONFIG_FILE_NAME));
        assert!(matches!(cli.command, Command::Build { ref out } if out == Path::new("dist")));
    }

    #[test]
    fn serve_rejects_bad_bind() {
        assert!(Cli::try_parse_from(["docsets", "serve", "--bind", "not-an-addr"]).is_err());
    }

    #[test]
    fn workspace_resolves_fixture_content() {
        let config_path =
            Path::new(env!("CARGO_MANIFEST_DIR")).join("../../fixtures/docsets.toml");
        let workspace = Workspace {
            config_path,
            content_override: None,
        };
        let (site, source) = workspace.offline_site().unwrap();
        let documents = source.list_documents().unwrap();
        assert_eq!(documents.len(), 17);
        assert!(site.navigation(&documents).is_ok());
    }

    #[test]
    fn config_failures_are_distinguished_from_content_failures() {
        let unknown: Report = DocsetsError::UnknownSetReference {
            label: "Guides".into(),
        }
        .into();
        assert!(is_config_failure(&unknown));

        let missing: Report = DocsetsError::source_unavailable("content", "gone").into();
        assert!(!is_config_failure(&missing));
        assert!(!is_config_failure(&eyre!("cannot write out.json")));
    }
}
