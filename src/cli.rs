use clap::{Parser, Subcommand};
use sqlx::PgPool;

use crate::config::{mask_password, Config};
use crate::liqpay::signature::sign;
use crate::ports::AcquirerRepository;

#[derive(Parser)]
#[command(name = "liqpay-acquirer")]
#[command(about = "LiqPay acquirer - checkout signing and payment callback processing", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Database management commands
    #[command(subcommand)]
    Db(DbCommands),

    /// Configuration validation
    Config,

    /// Print base64(sha1(concatenation of PARTS)), e.g. `sign KEY DATA KEY`
    Sign {
        #[arg(value_name = "PARTS", required = true)]
        parts: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum DbCommands {
    /// Run database migrations
    Migrate,
}

pub async fn handle_db_migrate(config: &Config) -> anyhow::Result<()> {
    let pool = crate::db::create_pool(config).await?;

    tracing::info!("Running database migrations...");
    crate::db::run_migrations(&pool, crate::db::MIGRATIONS_DIR).await?;

    println!("✓ Database migrations completed");
    Ok(())
}

pub fn handle_config_validate(config: &Config) -> anyhow::Result<()> {
    tracing::info!("Validating configuration...");

    println!("Configuration:");
    println!("  Server Port: {}", config.server_port);
    println!("  Database URL: {}", mask_password(&config.database_url));
    println!("  Log Format: {:?}", config.log_format);
    match &config.liqpay {
        Some(liqpay) => {
            println!("  LiqPay Public Key: {}", liqpay.public_key);
            println!("  LiqPay Base URL: {}", liqpay.base_url);
            println!("  LiqPay Checkout URL: {}", liqpay.checkout_url);
            println!("  LiqPay API URL: {}", liqpay.api_url);
            println!("  LiqPay Environment: {}", liqpay.environment.as_str());
        }
        None => println!("  LiqPay: not configured (acquirer must already exist in the database)"),
    }

    tracing::info!("Configuration is valid");
    println!("✓ Configuration is valid");

    Ok(())
}

pub fn handle_sign(parts: &[String]) -> String {
    sign(parts)
}

/// Write the configured acquirer to the database so callbacks can find it.
pub async fn sync_acquirer(config: &Config, pool: &PgPool) -> anyhow::Result<()> {
    let Some(liqpay) = &config.liqpay else {
        tracing::info!("LIQPAY_PUBLIC_KEY not set, keeping stored acquirer configuration");
        return Ok(());
    };

    let repository = crate::adapters::PostgresAcquirerRepository::new(pool.clone());
    let acquirer = repository.upsert(&liqpay.to_acquirer()).await?;
    tracing::info!(
        acquirer_id = %acquirer.id,
        environment = acquirer.environment.as_str(),
        "LiqPay acquirer synced"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_command_output() {
        let parts = vec!["s1".to_string(), "s2".to_string(), "s3".to_string()];
        assert_eq!(handle_sign(&parts), "TBTmgscUGvwjIW+lIEkXjOejKcc=");
    }

    #[test]
    fn test_cli_parses_sign_parts() {
        let cli = Cli::try_parse_from(["liqpay-acquirer", "sign", "a", "b", "a"]).unwrap();
        match cli.command {
            Some(Commands::Sign { parts }) => assert_eq!(parts, vec!["a", "b", "a"]),
            _ => panic!("expected sign command"),
        }
    }

    #[test]
    fn test_cli_defaults_to_no_command() {
        let cli = Cli::try_parse_from(["liqpay-acquirer"]).unwrap();
        assert!(cli.command.is_none());
    }
}
