//! Command-line surface of the `jobwatch` binary.

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use crate::api::ApiClient;
use crate::api::accounts::DEFAULT_IMPORT_LIMIT;
use crate::auth::{SessionToken, StaticToken, TokenProvider};
use crate::config::AppConfig;
use crate::jobs::{
    JobMonitor, JobQuery, MonitorOptions, SortField, SortOrder, StatusFilter, project,
};
use crate::models::RegisterRequest;
use crate::render;
use crate::views::{EmailQuery, project_emails};

#[derive(Debug, Parser)]
#[command(name = "jobwatch")]
#[command(about = "Monitor background jobs and manage mail accounts of the dashboard API", version)]
pub struct Cli {
    /// Dashboard API base URL (overrides JOBWATCH_API_BASE_URL)
    #[arg(long, global = true)]
    pub api_base_url: Option<String>,

    /// Bearer token (overrides JOBWATCH_ACCESS_TOKEN)
    #[arg(long, global = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in and print the access token
    Login {
        /// Username or primary email
        #[arg(long)]
        username: String,

        #[arg(long)]
        password: String,
    },

    /// Create a user account
    Register {
        #[arg(long)]
        username: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,

        /// Display name
        #[arg(long)]
        name: Option<String>,
    },

    /// Background job monitoring
    Jobs {
        #[command(subcommand)]
        action: JobsCommand,
    },

    /// Connected mail accounts
    Accounts {
        #[command(subcommand)]
        action: AccountsCommand,
    },

    /// Fetched emails
    Emails {
        #[command(subcommand)]
        action: EmailsCommand,
    },
}

#[derive(Debug, Clone, Args)]
pub struct JobFilterArgs {
    /// Keep only jobs with this status ("all" disables the filter)
    #[arg(long, default_value = "all")]
    pub status: String,

    /// Keep only jobs of this type
    #[arg(long = "type")]
    pub job_type: Option<String>,

    /// Case-insensitive match on job type and error payload
    #[arg(long, default_value = "")]
    pub search: String,

    /// Column to sort on: created_at, id or job_type
    #[arg(long, default_value = "created_at")]
    pub sort: SortField,

    /// Sort direction: asc or desc
    #[arg(long, default_value = "desc")]
    pub order: SortOrder,
}

impl JobFilterArgs {
    pub fn to_query(&self) -> JobQuery {
        JobQuery {
            status: StatusFilter::parse(&self.status),
            job_type: self
                .job_type
                .clone()
                .filter(|job_type| !job_type.trim().is_empty()),
            search: self.search.clone(),
            field: self.sort,
            order: self.order,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum JobsCommand {
    /// Fetch and print the job list once
    List {
        #[command(flatten)]
        filters: JobFilterArgs,
    },

    /// Print one job with its payloads
    Show { id: i64 },

    /// Poll the job list and print it after every refresh
    Watch {
        #[command(flatten)]
        filters: JobFilterArgs,

        /// Stop after this many refreshes (default: until Ctrl-C)
        #[arg(long)]
        ticks: Option<u64>,
    },

    /// Ask the server to synchronize jobs
    Sync,
}

#[derive(Debug, Subcommand)]
pub enum AccountsCommand {
    List,

    /// Connect a new mailbox
    Add {
        #[arg(long)]
        provider: String,

        #[arg(long)]
        email: String,
    },

    /// Disconnect a mailbox
    Remove { id: i64 },

    /// Print the provider consent URL
    Authorize { id: i64 },

    /// Pull the latest messages of a mailbox
    Import {
        id: i64,

        #[arg(long, default_value_t = DEFAULT_IMPORT_LIMIT)]
        limit: u32,
    },
}

#[derive(Debug, Subcommand)]
pub enum EmailsCommand {
    List {
        /// Case-insensitive match on subject and provider
        #[arg(long, default_value = "")]
        search: String,

        /// Sort on received_at: asc or desc
        #[arg(long, default_value = "desc")]
        order: SortOrder,
    },
}

impl Cli {
    /// Apply command-line overrides on top of the loaded configuration.
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(base) = &self.api_base_url {
            config.api_base_url = base.trim().trim_end_matches('/').to_string();
        }
        if let Some(token) = &self.token {
            config.access_token = Some(token.trim().to_string()).filter(|t| !t.is_empty());
        }
    }
}

/// Run one command against the configured API.
pub async fn execute(cli: Cli, config: AppConfig) -> Result<()> {
    let session = SessionToken::new();
    let tokens: Arc<dyn TokenProvider> = match &config.access_token {
        Some(token) => Arc::new(StaticToken::new(Some(token.clone()))),
        None => session.clone(),
    };
    let client = ApiClient::from_config(&config, tokens).context("building API client")?;

    match cli.command {
        Command::Login { username, password } => {
            let response = client
                .login(&username, &password)
                .await
                .context("logging in")?;
            session.establish(response.access_token.clone());
            if let Some(user) = &response.user {
                info!(user_id = user.id, "logged in");
            }
            println!("{}", response.access_token);
        }
        Command::Register {
            username,
            email,
            password,
            name,
        } => {
            let request = RegisterRequest {
                name,
                username,
                primary_email: email,
                password,
            };
            let user = client.register(&request).await.context("registering")?;
            println!("Registered {} (id {})", user.username, user.id);
        }
        Command::Jobs { action } => run_jobs(client, &config, action).await?,
        Command::Accounts { action } => run_accounts(&client, action).await?,
        Command::Emails {
            action: EmailsCommand::List { search, order },
        } => {
            let emails = client.list_emails().await.context("listing emails")?;
            let display = project_emails(&emails, &EmailQuery { search, order });
            print!("{}", render::emails_table(&display));
        }
    }

    Ok(())
}

async fn run_jobs(client: ApiClient, config: &AppConfig, action: JobsCommand) -> Result<()> {
    match action {
        JobsCommand::List { filters } => {
            let jobs = client.list_jobs().await.context("listing jobs")?;
            print!("{}", render::jobs_table(&project(&jobs, &filters.to_query())));
        }
        JobsCommand::Show { id } => {
            let job = client
                .get_job(id)
                .await
                .with_context(|| format!("fetching job {id}"))?;
            print!("{}", render::job_detail(&job));
        }
        JobsCommand::Sync => {
            client.sync_jobs().await.context("triggering job sync")?;
            println!("Job synchronization triggered.");
        }
        JobsCommand::Watch { filters, ticks } => {
            let options = MonitorOptions::from_config(config).with_query(filters.to_query());
            watch(Arc::new(client), options, ticks).await?;
        }
    }
    Ok(())
}

async fn watch(client: Arc<ApiClient>, options: MonitorOptions, ticks: Option<u64>) -> Result<()> {
    let monitor = JobMonitor::mount(client, options);
    let mut updates = monitor.subscribe();
    let mut frames = 0u64;

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("listening for Ctrl-C")?;
                info!("interrupted; stopping watch");
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                print!("{}", render::monitor_frame(&monitor.snapshot()));
                frames += 1;
                if ticks.is_some_and(|limit| frames >= limit) {
                    break;
                }
            }
        }
    }

    monitor.unmount().await;
    Ok(())
}

async fn run_accounts(client: &ApiClient, action: AccountsCommand) -> Result<()> {
    match action {
        AccountsCommand::List => {
            let accounts = client.list_accounts().await.context("listing accounts")?;
            print!("{}", render::accounts_table(&accounts));
        }
        AccountsCommand::Add { provider, email } => {
            let account = client
                .create_account(&provider, &email)
                .await
                .context("connecting account")?;
            println!("Connected {} account {} (id {})", account.provider, account.email, account.id);
        }
        AccountsCommand::Remove { id } => {
            client
                .delete_account(id)
                .await
                .with_context(|| format!("removing account {id}"))?;
            println!("Removed account {id}");
        }
        AccountsCommand::Authorize { id } => {
            let accounts = client.list_accounts().await.context("listing accounts")?;
            let account = accounts
                .iter()
                .find(|account| account.id == id)
                .ok_or_else(|| anyhow!("no connected account with id {id}"))?;
            match client.authorize_account(account).await {
                Ok(link) => println!("{}", link.authorization_url),
                Err(err) => return Err(anyhow!(err.notice_message())),
            }
        }
        AccountsCommand::Import { id, limit } => {
            let result = client
                .import_account(id, limit)
                .await
                .with_context(|| format!("importing emails for account {id}"))?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_watch_filters() {
        let cli = Cli::try_parse_from([
            "jobwatch", "jobs", "watch", "--status", "FAILED", "--type", "run_email_fetch",
            "--sort", "job_type", "--order", "asc", "--ticks", "2",
        ])
        .unwrap();

        match cli.command {
            Command::Jobs {
                action: JobsCommand::Watch { filters, ticks },
            } => {
                let query = filters.to_query();
                assert_eq!(query.status, StatusFilter::Only("FAILED".to_string()));
                assert_eq!(query.job_type.as_deref(), Some("run_email_fetch"));
                assert_eq!(query.field, SortField::JobType);
                assert_eq!(query.order, SortOrder::Asc);
                assert_eq!(ticks, Some(2));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn sort_column_defaults_to_created_at() {
        let cli = Cli::try_parse_from(["jobwatch", "jobs", "list"]).unwrap();
        match cli.command {
            Command::Jobs {
                action: JobsCommand::List { filters },
            } => assert_eq!(filters.to_query(), JobQuery::default()),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_order() {
        assert!(Cli::try_parse_from(["jobwatch", "jobs", "list", "--order", "up"]).is_err());
        assert!(Cli::try_parse_from(["jobwatch", "jobs", "list", "--sort", "status"]).is_err());
    }

    #[test]
    fn overrides_replace_loaded_values() {
        let cli = Cli::try_parse_from([
            "jobwatch", "--api-base-url", "https://dash.example.com/", "--token", "abc",
            "accounts", "list",
        ])
        .unwrap();
        let mut config = AppConfig::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config.api_base_url, "https://dash.example.com");
        assert_eq!(config.access_token.as_deref(), Some("abc"));
    }

    #[test]
    fn import_limit_defaults() {
        let cli = Cli::try_parse_from(["jobwatch", "accounts", "import", "4"]).unwrap();
        match cli.command {
            Command::Accounts {
                action: AccountsCommand::Import { id, limit },
            } => {
                assert_eq!(id, 4);
                assert_eq!(limit, DEFAULT_IMPORT_LIMIT);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
