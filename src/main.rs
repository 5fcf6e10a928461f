use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use twisp_harness::adapters::docker::DockerCli;
use twisp_harness::config::cli::{CliArgs, CliCommand};
use twisp_harness::core::health::HealthCheck;
use twisp_harness::utils::error::ErrorCategory;
use twisp_harness::utils::{logger, validation::validate_url};
use twisp_harness::{start_with, CallContext, HarnessError, StartOption};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    // 初始化日誌
    if args.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(args.verbose);
    }

    if let Err(e) = run(args.command).await {
        tracing::error!("❌ {} (Category: {:?})", e, e.category());
        eprintln!("❌ {}", e);

        let exit_code = match e.category() {
            ErrorCategory::Configuration => 2,
            ErrorCategory::Startup | ErrorCategory::Cancellation => 3,
            _ => 1,
        };
        std::process::exit(exit_code);
    }
}

async fn run(command: CliCommand) -> Result<(), HarnessError> {
    let ctx = CallContext::background();

    match command {
        CliCommand::Up {
            config,
            keep_alive,
            no_logs,
        } => {
            let config = CliArgs::load_config(config.as_ref())?;

            let mut options = Vec::new();
            if keep_alive {
                options.push(StartOption::KeepAlive(true));
            }
            if !no_logs {
                options.push(StartOption::log_to_tracing());
            }

            let instance = start_with(Arc::new(DockerCli::new()), config, &ctx, options).await?;
            println!("✅ Twisp is healthy");
            println!("🔗 GraphQL endpoint: {}", instance.endpoint());
            println!("Press Ctrl-C to stop");

            tokio::signal::ctrl_c().await?;
            tracing::info!("🛑 Shutting down");
            instance
                .cleanup(&ctx.with_timeout(Duration::from_secs(30)))
                .await;
        }
        CliCommand::Health { url, timeout } => {
            let url = validate_url("url", &url)?;
            HealthCheck::new(url.clone(), Duration::from_secs(timeout), Duration::from_millis(500))
                .wait(&ctx)
                .await?;
            println!("✅ {} is healthy", url);
        }
    }

    Ok(())
}
