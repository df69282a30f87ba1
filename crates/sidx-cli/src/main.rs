use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "sidx")]
#[command(about = "Rule index synchronization CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile configured rule sources against the database
    Sync {
        /// Layered config paths in merge order
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,

        /// Classify and report without writing
        #[arg(long, default_value_t = false)]
        dry_run: bool,

        /// Fail instead of warn on config keys nothing reads
        #[arg(long, default_value_t = false)]
        strict_config: bool,

        /// Print the report as JSON instead of key=value lines
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Database commands
    Db {
        /// Optional layered config; only database.url_env is read
        #[arg(long = "config")]
        config_paths: Vec<String>,

        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,

    /// Apply SQL migrations
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Sync {
            config_paths,
            dry_run,
            strict_config,
            json,
        } => {
            commands::sync::run(commands::sync::SyncArgs {
                config_paths,
                dry_run,
                strict_config,
                json,
            })
            .await?;
        }

        Commands::Db { config_paths, cmd } => {
            let pool = commands::connect_db(&config_paths).await?;
            match cmd {
                DbCmd::Status => {
                    let s = sidx_db::status(&pool).await?;
                    println!(
                        "db_ok={} has_rule_table={} rules_total={} rules_active={}",
                        s.ok, s.has_rule_table, s.rules_total, s.rules_active
                    );
                }
                DbCmd::Migrate => {
                    sidx_db::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }
            }
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = sidx_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout stays parseable.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
