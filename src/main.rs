//! Main entry point for gatekey CLI

use clap::Parser;
use gatekey::cli::output::OutputFormatter;
use gatekey::cli::Args;
use gatekey::{Pipeline, ResolveRequest};
use std::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(&args)?;
    debug!("Starting gatekey with args: {:?}", args);

    let mut formatter = OutputFormatter::new(args.verbosity_level());

    let mut pipeline = Pipeline::new()
        .with_timeout(args.timeout_duration())
        .with_user_agent(args.user_agent())
        .with_insecure_tls(args.ssl_bypass)
        .with_endpoints(args.endpoints())
        .with_cooldown(args.cooldown());

    if let Some(proxy) = &args.proxy {
        pipeline = pipeline.with_proxy(proxy);
    }

    if args.ssl_bypass {
        formatter.warning("TLS certificate verification disabled");
    }

    let request = ResolveRequest {
        url: args.url.clone(),
    };

    let start_time = Instant::now();
    if !args.json {
        formatter.start_spinner("Resolving key...");
    }
    let report = pipeline.handle(&request).await;
    formatter.finish_spinner();
    info!("Pipeline finished in {:?}", start_time.elapsed());

    if args.json {
        formatter.print_json(&report)?;
    } else {
        formatter.print_report(&report, start_time.elapsed());
    }

    if !report.success {
        std::process::exit(1);
    }
    Ok(())
}

/// Initialize logging system; everything goes to stderr so stdout stays parseable
fn init_logging(args: &Args) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(args.log_filter()));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .try_init()?;

    Ok(())
}
