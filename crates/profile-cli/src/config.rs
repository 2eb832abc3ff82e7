//! Runtime configuration for the `profile-log` binary.

use clap::{Args, ValueEnum};
use common::ActorId;
use profile::EngineConfig;

/// Where the profile log lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    Postgres { url: String },
    /// Process-local store; everything is lost on exit.
    InMemory,
}

impl Backend {
    /// Picks PostgreSQL when a non-empty URL is given.
    pub fn from_url(database_url: Option<String>) -> Self {
        match database_url {
            Some(url) if !url.trim().is_empty() => Backend::Postgres { url },
            _ => Backend::InMemory,
        }
    }
}

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Flags shared by every subcommand.
///
/// Each flag falls back to an environment variable:
/// - `DATABASE_URL`: PostgreSQL connection string (in-memory store if unset)
/// - `PROFILE_ACTOR_ID`: actor recorded as `changed_by` (default: system)
/// - `PROFILE_LOG_FORMAT`: `pretty` or `json` (default: `pretty`)
///
/// The log filter itself comes from `RUST_LOG` (default: `info`).
#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", global = true, hide_env_values = true)]
    pub database_url: Option<String>,

    /// Actor ID recorded on every written event
    #[arg(long, env = "PROFILE_ACTOR_ID", global = true)]
    pub actor: Option<ActorId>,

    /// Log output format
    #[arg(long, env = "PROFILE_LOG_FORMAT", value_enum, default_value_t, global = true)]
    pub log_format: LogFormat,

    /// Print the collected metrics in Prometheus text format on exit
    #[arg(long, global = true)]
    pub metrics: bool,
}

/// Resolved configuration for one invocation.
#[derive(Debug, Clone)]
pub struct Config {
    pub backend: Backend,
    pub actor: ActorId,
    pub log_format: LogFormat,
    pub metrics: bool,
    pub engine: EngineConfig,
}

impl Config {
    /// Combines command-line flags with the engine tunables from the
    /// environment.
    pub fn from_args(args: GlobalArgs) -> Self {
        Self {
            backend: Backend::from_url(args.database_url),
            actor: args.actor.unwrap_or_else(ActorId::system),
            log_format: args.log_format,
            metrics: args.metrics,
            engine: EngineConfig::from_env(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::InMemory,
            actor: ActorId::system(),
            log_format: LogFormat::default(),
            metrics: false,
            engine: EngineConfig::default(),
        }
    }
}
