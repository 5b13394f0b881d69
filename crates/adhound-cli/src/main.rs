//! adhound command-line interface.
//!
//! Resolves Active Directory access-control edges from either a legacy
//! Neo4j BloodHound database or a BloodHound CE instance.
//!
//! # Usage
//!
//! ```bash
//! # ACEs held by a principal (and its group closure)
//! adhound acl -u daenerys.targaryen
//!
//! # Cross-domain ACEs out of a domain, skipping a noisy trust
//! adhound acl -d essos.local --blacklist-domains sevenkingdoms.local
//!
//! # Listings against a CE instance
//! ADHOUND_CE__SECRET=... adhound --edition ce user -d essos.local --admin-count
//! ```

mod config;
mod output;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use adhound_domain::resolver::PropertyFilters;
use adhound_domain::{AceEngine, DirectoryGraph, EntityQuery, Kind};
use adhound_store::{CeStore, Neo4jStore};

use crate::config::CliConfig;

/// adhound - Active Directory ACE resolution from BloodHound data
#[derive(Parser, Debug)]
#[command(name = "adhound")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Backend edition: legacy (Neo4j) or ce (BloodHound CE)
    #[arg(long, global = true)]
    edition: Option<String>,

    /// Backend URL override (Neo4j HTTP endpoint or CE API base)
    #[arg(long, global = true)]
    url: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve access-control edges for a principal or a whole domain
    Acl {
        /// Principal to resolve (expands its group membership closure)
        #[arg(short, long, conflicts_with = "domain")]
        user: Option<String>,

        /// Source domain for a cross-domain sweep
        #[arg(short, long)]
        domain: Option<String>,

        /// Target domains to exclude from domain sweeps
        #[arg(long, value_delimiter = ',')]
        blacklist_domains: Vec<String>,

        /// Only report edges onto high-value targets
        #[arg(long)]
        high_value: bool,
    },

    /// List user accounts in a domain
    User {
        #[arg(short, long)]
        domain: String,

        /// Only accounts with admincount set (or in an admin group)
        #[arg(long)]
        admin_count: bool,

        /// Only high-value / admin-tier accounts
        #[arg(long)]
        high_value: bool,

        /// Only accounts that do not require a password
        #[arg(long)]
        password_not_required: bool,

        /// Only accounts whose password never expires
        #[arg(long)]
        password_never_expires: bool,

        /// Restrict to an OU by distinguished name
        #[arg(long)]
        ou_dn: Option<String>,

        /// Also write the names to a file, one per line
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List computers in a domain
    Computer {
        #[arg(short, long)]
        domain: String,

        /// Filter by LAPS deployment status
        #[arg(long)]
        laps: Option<bool>,

        /// Also write the names to a file, one per line
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the groups a principal transitively belongs to
    Group {
        #[arg(short, long)]
        user: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut config = match &args.config {
        Some(path) => CliConfig::load(path)?,
        None => CliConfig::from_env()?,
    };
    if let Some(edition) = &args.edition {
        config.backend.edition = edition.clone();
        config.validate()?;
    }
    if let Some(url) = &args.url {
        config.neo4j.uri = url.clone();
        config.ce.url = url.clone();
    }

    debug!(edition = %config.backend.edition, "configuration loaded");

    match config.backend.edition.as_str() {
        "legacy" => {
            info!("using legacy Neo4j backend");
            let store = Arc::new(Neo4jStore::new(config.neo4j_config())?);
            run(store, args.command).await
        }
        "ce" => {
            info!("using BloodHound CE backend");
            let store = Arc::new(CeStore::new(config.ce_config())?);
            run(store, args.command).await
        }
        other => anyhow::bail!("unknown backend edition: {other}"),
    }
}

fn init_logging(verbose: bool) {
    let default_directive = if verbose {
        "adhound=debug,adhound_cli=debug,adhound_domain=debug,adhound_store=debug"
    } else {
        "adhound=info,adhound_cli=info,adhound_domain=info,adhound_store=info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Dispatch a subcommand against one backend.
async fn run<S>(store: Arc<S>, command: Command) -> anyhow::Result<()>
where
    S: DirectoryGraph + 'static,
{
    let engine = AceEngine::new(store);

    match command {
        Command::Acl {
            user: Some(user),
            high_value,
            ..
        } => {
            let aces = engine.resolve_aces_for_principal(&user, high_value).await?;
            let rendered = output::render_aces(&format!("ACEs for principal: {user}"), &aces);
            print!("{rendered}");
        }
        Command::Acl {
            user: None,
            domain: Some(domain),
            blacklist_domains,
            high_value,
        } => {
            let aces = engine
                .resolve_aces_for_domain(&domain, &blacklist_domains, high_value)
                .await?;
            let rendered =
                output::render_aces(&format!("Cross-domain ACEs from: {domain}"), &aces);
            print!("{rendered}");
        }
        Command::Acl { .. } => {
            anyhow::bail!("acl requires either --user or --domain");
        }
        Command::User {
            domain,
            admin_count,
            high_value,
            password_not_required,
            password_never_expires,
            ou_dn,
            output: out_path,
        } => {
            let query = EntityQuery::new(domain.clone(), Kind::User).with_filters(
                PropertyFilters {
                    admin_count,
                    high_value,
                    password_not_required,
                    password_never_expires,
                    has_laps: None,
                    ou_dn,
                },
            );
            let names = engine.resolve_entities(&query).await?;
            let rendered = output::render_lines(&format!("Users in {domain}"), &names);
            output::emit(&rendered, &names, out_path.as_deref())?;
        }
        Command::Computer {
            domain,
            laps,
            output: out_path,
        } => {
            let query = EntityQuery::new(domain.clone(), Kind::Computer).with_filters(
                PropertyFilters {
                    has_laps: laps,
                    ..PropertyFilters::default()
                },
            );
            let names = engine.resolve_entities(&query).await?;
            let rendered = output::render_lines(&format!("Computers in {domain}"), &names);
            output::emit(&rendered, &names, out_path.as_deref())?;
        }
        Command::Group { user } => {
            let groups = engine.resolve_group_memberships(&user).await?;
            let rendered = output::render_lines(&format!("Groups for {user}"), &groups);
            print!("{rendered}");
        }
    }

    Ok(())
}
