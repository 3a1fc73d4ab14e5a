use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use miette::{Context, IntoDiagnostic, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lookout_core::{LookoutConfig, OutputFormat};
use lookout_difflens::position::map_positions;
use lookout_review::github::{parse_pr_reference, GitHubClient};
use lookout_review::llm::{ChatCompletion, ChatModel, LlmClient};
use lookout_review::pipeline::run_review;

#[derive(Parser)]
#[command(
    name = "lookout",
    version,
    about = "AI pull request reviewer for CI",
    long_about = "lookout reviews a GitHub pull request with an OpenAI-compatible model and\n\
                   publishes the result: a summary comment, inline comments anchored to the\n\
                   diff, and optionally an approval.\n\n\
                   Examples:\n  \
                     lookout                          Review $PR_NUMBER in $GITHUB_REPOSITORY\n  \
                     lookout review --pr 42 --dry-run Show what would be posted\n  \
                     lookout review --pr acme/app#42  Review a PR in another repository\n  \
                     git diff -- src/lib.rs | lookout positions\n  \
                                                      Print diff positions of added lines\n  \
                     lookout init                     Write a default .lookout.toml"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (default: .lookout.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Review a pull request and publish the result (the default)
    #[command(long_about = "Review a pull request and publish the result.\n\n\
        Reads GITHUB_REPOSITORY, GITHUB_TOKEN, OPENAI_API_KEY and PR_NUMBER from the\n\
        environment, as set in a GitHub Actions workflow. Flags override them.\n\n\
        Examples:\n  lookout review\n  lookout review --pr 42 --approve\n  lookout review --pr acme/app#42 --dry-run")]
    Review(ReviewArgs),
    /// Print the diff position of every added line of a patch
    #[command(long_about = "Print the diff position of every added line of a patch.\n\n\
        Reads the patch text of one file from stdin or --file and prints the\n\
        new-file line number and diff position of each added line.\n\n\
        Examples:\n  git diff -- src/lib.rs | lookout positions\n  lookout positions --file change.patch --format json")]
    Positions {
        /// Read the patch from a file instead of stdin
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Create a default .lookout.toml in the current directory
    Init,
}

#[derive(clap::Args, Default)]
struct ReviewArgs {
    /// Pull request number, or owner/repo#number (default: $PR_NUMBER)
    #[arg(long)]
    pr: Option<String>,
    /// Repository in owner/name form (default: $GITHUB_REPOSITORY)
    #[arg(long)]
    repo: Option<String>,
    /// Log every write instead of calling the API
    #[arg(long)]
    dry_run: bool,
    /// Approve the pull request when the model approves
    #[arg(long)]
    approve: bool,
    /// Do not post inline comments
    #[arg(long)]
    no_inline: bool,
}

const DEFAULT_CONFIG: &str = r#"# lookout configuration
#
# Environment variables override this file: GITHUB_REPOSITORY, GITHUB_TOKEN,
# GITHUB_API_URL, OPENAI_API_KEY, OPENAI_BASE_URL, LOOKOUT_MODEL.
# Keep tokens in CI secrets, not here.

[github]
# repository = "owner/name"
# api_url = "https://api.github.com"

[llm]
# model = "gpt-4o"
# base_url = "https://api.openai.com/v1"
# temperature = 0.2
# max_diff_chars = 60000
# timeout_secs = 120

[review]
# auto_approve = false
# inline_comments = true
# delete_stale = true
# dry_run = false
# max_inline_comments = 20
# skip_patterns = ["docs/**", "*.snap"]
"#;

const CONFIG_FILE: &str = ".lookout.toml";

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .into_diagnostic()?;
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        None => review(cli.config.as_deref(), cli.format, ReviewArgs::default()).await,
        Some(Command::Review(args)) => review(cli.config.as_deref(), cli.format, args).await,
        Some(Command::Positions { file }) => positions(file.as_deref(), cli.format),
        Some(Command::Init) => init(),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "info,lookout=debug,lookout_review=debug,lookout_difflens=debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn load_config(path: Option<&Path>) -> Result<LookoutConfig> {
    let config = match path {
        Some(path) => LookoutConfig::from_file(path)?,
        None => {
            let default_path = Path::new(CONFIG_FILE);
            if default_path.exists() {
                LookoutConfig::from_file(default_path)?
            } else {
                LookoutConfig::default()
            }
        }
    };
    Ok(config)
}

async fn review(config_path: Option<&Path>, format: OutputFormat, args: ReviewArgs) -> Result<()> {
    let mut config = load_config(config_path)?;
    config.apply_process_env();

    let raw_pr = args
        .pr
        .or_else(|| std::env::var("PR_NUMBER").ok())
        .filter(|v| !v.trim().is_empty());
    let Some(raw_pr) = raw_pr else {
        miette::bail!(miette::miette!(
            help = "Set PR_NUMBER (e.g. PR_NUMBER: ${{ github.event.pull_request.number }}) or pass --pr",
            "no pull request number given"
        ));
    };
    let reference = parse_pr_reference(&raw_pr)?;

    if let Some(repo) = args.repo.or(reference.repository) {
        config.github.repository = Some(repo);
    }
    if args.dry_run {
        config.review.dry_run = true;
    }
    if args.approve {
        config.review.auto_approve = true;
    }
    if args.no_inline {
        config.review.inline_comments = false;
    }

    if config.github.token.is_none() {
        warn!("GITHUB_TOKEN is not set, hosting API calls will be unauthenticated");
    }
    if config.llm.api_key.is_none() && config.llm.base_url.is_none() {
        warn!("OPENAI_API_KEY is not set, the model call will likely be rejected");
    }

    let github = GitHubClient::new(&config.github)?;
    let llm = LlmClient::new(&config.llm)?;
    let model = SpinnerModel { inner: &llm };

    info!(
        repository = %github.repository().unwrap_or_default(),
        pr = reference.number,
        model = %config.llm.model,
        dry_run = config.review.dry_run,
        "starting review"
    );
    let report = run_review(&github, &model, &config, reference.number).await;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
        }
        OutputFormat::Text => println!("{report}"),
    }
    Ok(())
}

/// Shows a spinner on stderr while the model is thinking.
struct SpinnerModel<'a> {
    inner: &'a LlmClient,
}

#[async_trait]
impl<'a> ChatModel for SpinnerModel<'a> {
    fn model(&self) -> &str {
        self.inner.model()
    }

    async fn complete(&self, prompt: &str) -> lookout_core::Result<ChatCompletion> {
        let spinner = if std::io::stderr().is_terminal() {
            let pb = indicatif::ProgressBar::new_spinner();
            if let Ok(style) =
                indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})")
            {
                pb.set_style(style);
            }
            pb.set_message(format!("Waiting for {}...", self.inner.model()));
            pb.enable_steady_tick(Duration::from_millis(120));
            Some(pb)
        } else {
            None
        };

        let result = self.inner.complete(prompt).await;

        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }
        result
    }
}

fn positions(file: Option<&Path>, format: OutputFormat) -> Result<()> {
    let patch = match file {
        Some(path) => std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to read {}", path.display()))?,
        None => {
            if std::io::stdin().is_terminal() {
                miette::bail!(miette::miette!(
                    help = "Pipe a patch in, e.g.: git diff -- src/lib.rs | lookout positions\n       Or use --file <path>",
                    "no patch on stdin"
                ));
            }
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).into_diagnostic()?;
            buf
        }
    };

    let mapped = map_positions(&patch);
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&mapped).into_diagnostic()?);
        }
        OutputFormat::Text => {
            if mapped.is_empty() {
                println!("no added lines");
            }
            for (line, position) in mapped.iter() {
                println!("line {line} -> position {position}");
            }
        }
    }
    Ok(())
}

fn init() -> Result<()> {
    let path = Path::new(CONFIG_FILE);
    if path.exists() {
        miette::bail!(miette::miette!(
            help = "Edit the existing file or remove it first",
            "{CONFIG_FILE} already exists"
        ));
    }
    std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
    println!("Created {CONFIG_FILE} with default configuration");
    Ok(())
}
