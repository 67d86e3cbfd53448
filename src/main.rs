use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use hal_vcs::config::{self, VcsConfig};
use hal_vcs::vcs::errors::ErrorMark;
use hal_vcs::vcs::resolver::resolve_ref_type;
use hal_vcs::vcs::types::{ProviderConfig, PullRequestFilter, PullRequestState};
use hal_vcs::vcs::{VcsClient, VcsFactory};

#[derive(Parser)]
#[command(name = "hal-vcs")]
#[command(version, about = "Resolve references and query version control providers")]
struct Cli {
    /// Provider type: github or github_enterprise
    #[arg(long, global = true, default_value = "github")]
    provider: String,

    /// API token for the provider
    #[arg(long, global = true, env = "HAL_VCS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// GitHub Enterprise host, e.g. https://git.example.com
    #[arg(long, global = true)]
    url: Option<String>,

    /// JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Default log filter when HAL_VCS_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify a reference without calling the provider
    RefType { reference: String },
    /// Resolve a reference to a commit
    Resolve {
        owner: String,
        repo: String,
        reference: String,
    },
    /// Web URL of a repository, or of a reference within it
    Url {
        owner: String,
        repo: String,
        reference: Option<String>,
    },
    Branches { owner: String, repo: String },
    Tags { owner: String, repo: String },
    Pulls {
        owner: String,
        repo: String,
        #[arg(long, value_enum)]
        state: Option<StateArg>,
        #[arg(long)]
        head: Option<String>,
        #[arg(long)]
        base: Option<String>,
    },
    Pull {
        owner: String,
        repo: String,
        number: u64,
    },
    Repo { owner: String, repo: String },
    /// Compare two commits
    Diff {
        owner: String,
        repo: String,
        base: String,
        head: String,
    },
    /// Download the source archive of a reference
    Download {
        owner: String,
        repo: String,
        reference: String,
        output: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum StateArg {
    Open,
    Closed,
    All,
}

impl From<StateArg> for PullRequestState {
    fn from(state: StateArg) -> Self {
        match state {
            StateArg::Open => PullRequestState::Open,
            StateArg::Closed => PullRequestState::Closed,
            StateArg::All => PullRequestState::All,
        }
    }
}

impl Cli {
    fn provider_config(&self) -> ProviderConfig {
        let mut config = ProviderConfig::new("cli", self.provider.as_str()).with_name("cli");
        if let Some(token) = &self.token {
            config = config.with_parameter("token", token.as_str());
        }
        if let Some(url) = &self.url {
            config = config.with_parameter("url", url.as_str());
        }
        config
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn authenticate(
    factory: &VcsFactory,
    provider: &ProviderConfig,
) -> anyhow::Result<Arc<dyn VcsClient>> {
    match factory.authenticate(provider) {
        Some(client) => Ok(client),
        None => bail!(factory.errors().join("\n")),
    }
}

/// Fails with the errors the client recorded since `mark` when an operation came back empty
fn ensure_found<T>(
    client: &dyn VcsClient,
    mark: ErrorMark,
    value: Option<T>,
    what: &str,
) -> anyhow::Result<T> {
    match value {
        Some(value) => Ok(value),
        None => {
            let errors = client.errors_since(mark);
            if errors.is_empty() {
                bail!("{} not found", what)
            }
            bail!("{} not found: {}", what, errors.join("; "))
        }
    }
}

async fn run(cli: Cli, factory: VcsFactory) -> anyhow::Result<()> {
    let provider = cli.provider_config();
    let client = || authenticate(&factory, &provider);

    match &cli.command {
        Command::RefType { reference } => print_json(&resolve_ref_type(reference)),
        Command::Resolve {
            owner,
            repo,
            reference,
        } => {
            let client = client()?;
            let mark = client.error_mark();
            let resolved = client.resolve_ref(owner, repo, reference).await;
            print_json(&ensure_found(client.as_ref(), mark, resolved, reference)?)
        }
        Command::Url {
            owner,
            repo,
            reference,
        } => {
            let client = client()?;
            let mark = client.error_mark();
            let url = match reference {
                Some(reference) => client.url_for_reference(owner, repo, reference).await,
                None => client.url_for_repository(owner, repo).await,
            };
            let url = Some(url).filter(|url| !url.is_empty());
            print_json(&ensure_found(client.as_ref(), mark, url, "URL")?)
        }
        Command::Branches { owner, repo } => print_json(&client()?.branches(owner, repo).await),
        Command::Tags { owner, repo } => print_json(&client()?.tags(owner, repo).await),
        Command::Pulls {
            owner,
            repo,
            state,
            head,
            base,
        } => {
            let filter = PullRequestFilter {
                state: state.map(Into::into),
                head: head.clone(),
                base: base.clone(),
            };
            print_json(&client()?.pull_requests(owner, repo, &filter).await)
        }
        Command::Pull {
            owner,
            repo,
            number,
        } => {
            let client = client()?;
            let mark = client.error_mark();
            let pull = client.pull_request(owner, repo, *number).await;
            print_json(&ensure_found(client.as_ref(), mark, pull, &format!("pull/{number}"))?)
        }
        Command::Repo { owner, repo } => {
            let client = client()?;
            let mark = client.error_mark();
            let repository = client.repository(owner, repo).await;
            print_json(&ensure_found(client.as_ref(), mark, repository, &format!("{owner}/{repo}"))?)
        }
        Command::Diff {
            owner,
            repo,
            base,
            head,
        } => {
            let client = client()?;
            let mark = client.error_mark();
            let diff = client.diff(owner, repo, base, head).await;
            print_json(&ensure_found(client.as_ref(), mark, diff, &format!("{base}...{head}"))?)
        }
        Command::Download {
            owner,
            repo,
            reference,
            output,
        } => {
            let Some(downloader) = factory.downloader(&provider) else {
                bail!(factory.errors().join("\n"));
            };
            let written = downloader
                .download(owner, repo, reference, output)
                .await
                .with_context(|| format!("Failed to download {owner}/{repo}@{reference}"))?;
            print_json(&serde_json::json!({ "path": output, "bytes": written }))
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let _guard = hal_vcs::logging::init(&config::log_path(), &cli.log_level)
        .context("Failed to initialize logging")?;

    let vcs_config = match &cli.config {
        Some(path) => VcsConfig::load(path)?,
        None => VcsConfig::default(),
    };
    let factory = config::build_factory(&vcs_config)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli, factory))
}
