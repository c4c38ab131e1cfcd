//! Layered arguments for each subcommand and the validated configs they
//! resolve into.

use std::time::Duration;

use camino::Utf8PathBuf;
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use racefeed_core::PageSize;
use racefeed_data::{DEFAULT_INTERVAL, RemoteConfig, RemoteCredentials};
use serde::{Deserialize, Serialize};

use crate::CliError;

pub(crate) const ARG_DATABASE: &str = "database";
pub(crate) const ARG_LOGIN: &str = "login";
pub(crate) const ARG_PASSWORD: &str = "password";
pub(crate) const ARG_CLIENT_ID: &str = "client-id";
pub(crate) const ARG_EVENT_ID: &str = "event-id";
pub(crate) const ARG_BASE_URL: &str = "base-url";
pub(crate) const ARG_PAGE_SIZE: &str = "page-size";
pub(crate) const ARG_MAX_CONCURRENT_PAGES: &str = "max-concurrent-pages";
pub(crate) const ARG_TIMEOUT_SECS: &str = "timeout-secs";
pub(crate) const ARG_INTERVAL_SECS: &str = "interval-secs";
pub(crate) const ARG_BIB: &str = "bib";

/// Database used when none is configured.
pub(crate) const DEFAULT_DATABASE: &str = "racefeed.db";

/// Environment variable that supplies `field` for `command`.
pub(crate) fn env_var(command: &str, field: &str) -> String {
    format!(
        "RACEFEED_CMDS_{}_{}",
        command.to_ascii_uppercase(),
        field.replace('-', "_").to_ascii_uppercase()
    )
}

fn required<T>(
    value: Option<T>,
    command: &'static str,
    field: &'static str,
) -> Result<T, CliError> {
    value.ok_or_else(|| CliError::MissingArgument {
        field,
        env: env_var(command, field),
    })
}

fn database(value: Option<Utf8PathBuf>) -> Utf8PathBuf {
    value.unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_DATABASE))
}

/// Remote options shared by every command that talks to the API.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct RemoteFields {
    pub(crate) login: Option<String>,
    pub(crate) password: Option<String>,
    pub(crate) client_id: Option<String>,
    pub(crate) event_id: Option<String>,
    pub(crate) base_url: Option<String>,
    pub(crate) page_size: Option<u32>,
    pub(crate) max_concurrent_pages: Option<usize>,
    pub(crate) timeout_secs: Option<u64>,
}

impl RemoteFields {
    /// Resolve into a [`RemoteConfig`], naming `command` in missing-option
    /// errors.
    pub(crate) fn resolve(self, command: &'static str) -> Result<RemoteConfig, CliError> {
        let credentials = RemoteCredentials {
            login: required(self.login, command, ARG_LOGIN)?,
            password: required(self.password, command, ARG_PASSWORD)?,
            client_id: required(self.client_id, command, ARG_CLIENT_ID)?,
            event_id: required(self.event_id, command, ARG_EVENT_ID)?,
        };
        let mut config = RemoteConfig::new(credentials)?;
        if let Some(base_url) = self.base_url {
            config = config.with_base_url(&base_url)?;
        }
        if let Some(size) = self.page_size {
            let size = PageSize::new(size).map_err(|err| CliError::InvalidArgument {
                field: ARG_PAGE_SIZE,
                reason: err.to_string(),
            })?;
            config = config.with_page_size(size);
        }
        if let Some(limit) = self.max_concurrent_pages {
            config = config.with_max_concurrent_pages(limit)?;
        }
        if let Some(secs) = self.timeout_secs {
            if secs == 0 {
                return Err(CliError::InvalidArgument {
                    field: ARG_TIMEOUT_SECS,
                    reason: "timeout must be greater than zero".to_owned(),
                });
            }
            config = config.with_timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }
}

/// CLI arguments for the `sync` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Fetch results from the timing provider into the local \
                 database. A full sync requests every page; a partial sync \
                 resumes from the number of records already stored.",
    about = "Pull results into the local database"
)]
#[ortho_config(prefix = "RACEFEED")]
pub(crate) struct SyncArgs {
    /// Only fetch pages beyond the records already stored.
    #[arg(long)]
    #[serde(default)]
    pub(crate) partial: bool,
    /// Path to the SQLite results database.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// API login.
    #[arg(long = ARG_LOGIN, value_name = "login")]
    #[serde(default)]
    pub(crate) login: Option<String>,
    /// API password.
    #[arg(long = ARG_PASSWORD, value_name = "password")]
    #[serde(default)]
    pub(crate) password: Option<String>,
    /// Client id issued by the provider.
    #[arg(long = ARG_CLIENT_ID, value_name = "id")]
    #[serde(default)]
    pub(crate) client_id: Option<String>,
    /// Event to pull results for.
    #[arg(long = ARG_EVENT_ID, value_name = "id")]
    #[serde(default)]
    pub(crate) event_id: Option<String>,
    /// Override the API base URL.
    #[arg(long = ARG_BASE_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) base_url: Option<String>,
    /// Rows requested per page.
    #[arg(long = ARG_PAGE_SIZE, value_name = "rows")]
    #[serde(default)]
    pub(crate) page_size: Option<u32>,
    /// Maximum pages fetched at once.
    #[arg(long = ARG_MAX_CONCURRENT_PAGES, value_name = "count")]
    #[serde(default)]
    pub(crate) max_concurrent_pages: Option<usize>,
    /// Per-request timeout in seconds.
    #[arg(long = ARG_TIMEOUT_SECS, value_name = "secs")]
    #[serde(default)]
    pub(crate) timeout_secs: Option<u64>,
}

impl SyncArgs {
    pub(crate) fn into_config(self) -> Result<SyncConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        SyncConfig::try_from(merged)
    }
}

/// Resolved `sync` command configuration.
#[derive(Debug, Clone)]
pub(crate) struct SyncConfig {
    pub(crate) partial: bool,
    pub(crate) database: Utf8PathBuf,
    pub(crate) remote: RemoteConfig,
}

impl TryFrom<SyncArgs> for SyncConfig {
    type Error = CliError;

    fn try_from(args: SyncArgs) -> Result<Self, Self::Error> {
        let remote = RemoteFields {
            login: args.login,
            password: args.password,
            client_id: args.client_id,
            event_id: args.event_id,
            base_url: args.base_url,
            page_size: args.page_size,
            max_concurrent_pages: args.max_concurrent_pages,
            timeout_secs: args.timeout_secs,
        }
        .resolve("sync")?;
        Ok(Self {
            partial: args.partial,
            database: database(args.database),
            remote,
        })
    }
}

/// CLI arguments for the `check` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(about = "Validate credentials and event against the API")]
#[ortho_config(prefix = "RACEFEED")]
pub(crate) struct CheckArgs {
    /// API login.
    #[arg(long = ARG_LOGIN, value_name = "login")]
    #[serde(default)]
    pub(crate) login: Option<String>,
    /// API password.
    #[arg(long = ARG_PASSWORD, value_name = "password")]
    #[serde(default)]
    pub(crate) password: Option<String>,
    /// Client id issued by the provider.
    #[arg(long = ARG_CLIENT_ID, value_name = "id")]
    #[serde(default)]
    pub(crate) client_id: Option<String>,
    /// Event to validate.
    #[arg(long = ARG_EVENT_ID, value_name = "id")]
    #[serde(default)]
    pub(crate) event_id: Option<String>,
    /// Override the API base URL.
    #[arg(long = ARG_BASE_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) base_url: Option<String>,
    /// Per-request timeout in seconds.
    #[arg(long = ARG_TIMEOUT_SECS, value_name = "secs")]
    #[serde(default)]
    pub(crate) timeout_secs: Option<u64>,
}

impl CheckArgs {
    pub(crate) fn into_config(self) -> Result<RemoteConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        RemoteConfig::try_from(merged)
    }
}

impl TryFrom<CheckArgs> for RemoteConfig {
    type Error = CliError;

    fn try_from(args: CheckArgs) -> Result<Self, Self::Error> {
        RemoteFields {
            login: args.login,
            password: args.password,
            client_id: args.client_id,
            event_id: args.event_id,
            base_url: args.base_url,
            timeout_secs: args.timeout_secs,
            ..RemoteFields::default()
        }
        .resolve("check")
    }
}

/// CLI arguments for the `watch` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Run a partial sync every interval until interrupted. The \
                 first run happens one interval after start.",
    about = "Keep the local database up to date"
)]
#[ortho_config(prefix = "RACEFEED")]
pub(crate) struct WatchArgs {
    /// Seconds between partial syncs.
    #[arg(long = ARG_INTERVAL_SECS, value_name = "secs")]
    #[serde(default)]
    pub(crate) interval_secs: Option<u64>,
    /// Path to the SQLite results database.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// API login.
    #[arg(long = ARG_LOGIN, value_name = "login")]
    #[serde(default)]
    pub(crate) login: Option<String>,
    /// API password.
    #[arg(long = ARG_PASSWORD, value_name = "password")]
    #[serde(default)]
    pub(crate) password: Option<String>,
    /// Client id issued by the provider.
    #[arg(long = ARG_CLIENT_ID, value_name = "id")]
    #[serde(default)]
    pub(crate) client_id: Option<String>,
    /// Event to pull results for.
    #[arg(long = ARG_EVENT_ID, value_name = "id")]
    #[serde(default)]
    pub(crate) event_id: Option<String>,
    /// Override the API base URL.
    #[arg(long = ARG_BASE_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) base_url: Option<String>,
    /// Rows requested per page.
    #[arg(long = ARG_PAGE_SIZE, value_name = "rows")]
    #[serde(default)]
    pub(crate) page_size: Option<u32>,
    /// Maximum pages fetched at once.
    #[arg(long = ARG_MAX_CONCURRENT_PAGES, value_name = "count")]
    #[serde(default)]
    pub(crate) max_concurrent_pages: Option<usize>,
    /// Per-request timeout in seconds.
    #[arg(long = ARG_TIMEOUT_SECS, value_name = "secs")]
    #[serde(default)]
    pub(crate) timeout_secs: Option<u64>,
}

impl WatchArgs {
    pub(crate) fn into_config(self) -> Result<WatchConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        WatchConfig::try_from(merged)
    }
}

/// Resolved `watch` command configuration.
#[derive(Debug, Clone)]
pub(crate) struct WatchConfig {
    pub(crate) interval: Duration,
    pub(crate) database: Utf8PathBuf,
    pub(crate) remote: RemoteConfig,
}

impl TryFrom<WatchArgs> for WatchConfig {
    type Error = CliError;

    fn try_from(args: WatchArgs) -> Result<Self, Self::Error> {
        let interval = match args.interval_secs {
            None => DEFAULT_INTERVAL,
            Some(0) => {
                return Err(CliError::InvalidArgument {
                    field: ARG_INTERVAL_SECS,
                    reason: "interval must be greater than zero".to_owned(),
                });
            }
            Some(secs) => Duration::from_secs(secs),
        };
        let remote = RemoteFields {
            login: args.login,
            password: args.password,
            client_id: args.client_id,
            event_id: args.event_id,
            base_url: args.base_url,
            page_size: args.page_size,
            max_concurrent_pages: args.max_concurrent_pages,
            timeout_secs: args.timeout_secs,
        }
        .resolve("watch")?;
        Ok(Self {
            interval,
            database: database(args.database),
            remote,
        })
    }
}

/// CLI arguments for the `lookup` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(about = "Show the stored result for a bib and record the lookup")]
#[ortho_config(prefix = "RACEFEED")]
pub(crate) struct LookupArgs {
    /// Bib number to look up.
    #[arg(value_name = "bib")]
    #[serde(default)]
    pub(crate) bib: Option<String>,
    /// Path to the SQLite results database.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
}

impl LookupArgs {
    pub(crate) fn into_config(self) -> Result<LookupConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        LookupConfig::try_from(merged)
    }
}

/// Resolved `lookup` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LookupConfig {
    pub(crate) bib: String,
    pub(crate) database: Utf8PathBuf,
}

impl TryFrom<LookupArgs> for LookupConfig {
    type Error = CliError;

    fn try_from(args: LookupArgs) -> Result<Self, Self::Error> {
        let bib = required(args.bib, "lookup", ARG_BIB)?.trim().to_owned();
        if bib.is_empty() {
            return Err(CliError::InvalidArgument {
                field: ARG_BIB,
                reason: "bib must not be blank".to_owned(),
            });
        }
        Ok(Self {
            bib,
            database: database(args.database),
        })
    }
}

/// CLI arguments for the `history` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(about = "List or clear the lookup history")]
#[ortho_config(prefix = "RACEFEED")]
pub(crate) struct HistoryArgs {
    /// Remove every history entry instead of listing them.
    #[arg(long, conflicts_with = "latest")]
    #[serde(default)]
    pub(crate) clear: bool,
    /// Only show the most recent lookup.
    #[arg(long)]
    #[serde(default)]
    pub(crate) latest: bool,
    /// Path to the SQLite results database.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
}

impl HistoryArgs {
    pub(crate) fn into_config(self) -> Result<HistoryConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        Ok(HistoryConfig::from(merged))
    }
}

/// What the `history` command does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HistoryAction {
    List,
    Latest,
    Clear,
}

/// Resolved `history` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct HistoryConfig {
    pub(crate) action: HistoryAction,
    pub(crate) database: Utf8PathBuf,
}

impl From<HistoryArgs> for HistoryConfig {
    fn from(args: HistoryArgs) -> Self {
        let action = if args.clear {
            HistoryAction::Clear
        } else if args.latest {
            HistoryAction::Latest
        } else {
            HistoryAction::List
        };
        Self {
            action,
            database: database(args.database),
        }
    }
}

/// CLI arguments for the `reset` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(about = "Delete every stored record and history entry")]
#[ortho_config(prefix = "RACEFEED")]
pub(crate) struct ResetArgs {
    /// Path to the SQLite results database.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
}

impl ResetArgs {
    pub(crate) fn into_database(self) -> Result<Utf8PathBuf, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        Ok(database(merged.database))
    }
}
