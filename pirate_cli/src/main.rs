use clap::{Parser, Subcommand};
use pirate_core::{generate_server_seed, Ledger};
use pirate_server::{store, SqliteLedger};
use sqlx::SqlitePool;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pirate-cli", about = "Admin CLI for the pirate slot server")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Database URL, default sqlite://pirate_slot.db
    #[arg(long, value_parser, env = "DATABASE_URL")]
    database_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Rotate server seed to a new secret (random if omitted) and reveal the
    /// retired one
    RotateSeed { new_seed: Option<String> },
    /// View last N spins
    ViewLogs {
        #[arg(default_value_t = 20)]
        n: i64,
    },
    /// Export spins to CSV path
    ExportCsv { path: String },
    /// Show the top N accounts by points
    Top {
        #[arg(default_value_t = 10)]
        n: u32,
    },
    /// Add (or with a negative amount, remove) points
    Grant {
        account: String,
        #[arg(allow_hyphen_values = true)]
        amount: i64,
    },
}

async fn get_pool(url: Option<String>) -> anyhow::Result<SqlitePool> {
    let url = url.unwrap_or_else(|| "sqlite://pirate_slot.db".into());
    let pool = store::connect(&url, 5).await?;
    store::init_db(&pool).await?;
    Ok(pool)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();
    let cli = Cli::parse();
    let pool = get_pool(cli.database_url).await?;

    match cli.command {
        Commands::RotateSeed { new_seed } => {
            let new_seed = new_seed.unwrap_or_else(generate_server_seed);
            let (old_seed, hash) = store::rotate_seed(&pool, &new_seed).await?;
            println!("Rotated server seed. Retired seed: {}", old_seed);
            println!("New hash: {}", hash);
        }
        Commands::ViewLogs { n } => {
            for s in store::recent_spins(&pool, n).await? {
                println!(
                    "#{:>6} {} account={} seed={} nonce={} hash={} wager={} win={} balance={}",
                    s.id,
                    s.ts.to_rfc3339(),
                    s.account_id,
                    s.client_seed,
                    s.nonce,
                    s.server_seed_hash,
                    s.wager,
                    s.total_win,
                    s.balance_after
                );
            }
        }
        Commands::ExportCsv { path } => {
            let mut wtr = csv::Writer::from_path(&path)?;
            wtr.write_record([
                "id",
                "ts",
                "account_id",
                "client_seed",
                "nonce",
                "server_seed_hash",
                "wager",
                "grid",
                "total_win",
                "balance_after",
            ])?;
            let rows = store::all_spins(&pool).await?;
            let total = rows.len();
            for s in &rows {
                let grid: Vec<String> = s.grid.iter().map(|row| row.join("")).collect();
                wtr.write_record(&[
                    s.id.to_string(),
                    s.ts.to_rfc3339(),
                    s.account_id.clone(),
                    s.client_seed.clone(),
                    s.nonce.to_string(),
                    s.server_seed_hash.clone(),
                    s.wager.to_string(),
                    grid.join("/"),
                    s.total_win.to_string(),
                    s.balance_after.to_string(),
                ])?;
            }
            wtr.flush()?;
            println!("Exported {} rows to {}", total, path);
        }
        Commands::Top { n } => {
            let entries = store::leaderboard(&pool, n).await?;
            if entries.is_empty() {
                println!("No players yet");
            }
            for e in entries {
                println!("{:>3}. {}: {} PIR", e.rank, e.account_id, e.points);
            }
        }
        Commands::Grant { account, amount } => {
            let ledger = SqliteLedger::new(pool, 0);
            let balance = ledger.apply_net_change(&account, amount).await?;
            println!("{} now has {} PIR", account, balance);
        }
    }

    Ok(())
}
