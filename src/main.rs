use clap::{Parser, Subcommand};
use eventhub_typed_headers::menu::Operation;
use eventhub_typed_headers::transport::{Connector, InMemoryHub, KafkaConnector};
use eventhub_typed_headers::{Config, Console, Result};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "eventhub-typed-headers")]
#[command(about = "Read events from an Event Hub or write test events with typed headers", long_about = None)]
struct Args {
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    config: PathBuf,

    #[arg(short, long, help = "Enable JSON output for logs")]
    json_logs: bool,

    #[arg(short, long, help = "Verbose logging")]
    verbose: bool,

    #[arg(long, help = "Print decoded header properties of received events")]
    show_headers: bool,

    #[arg(long, help = "Use an in-memory hub instead of the configured one")]
    dry_run: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read events from the earliest position
    Read,
    /// Write test events with typed headers
    Write {
        #[arg(short = 'n', long)]
        count: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.json_logs, args.verbose);

    if args.dry_run {
        info!("Dry run: using an in-memory hub");
        let console = Console::new(InMemoryHub::new()).show_headers(args.show_headers);
        return run(console, args.command).await;
    }

    // Failures are reported, never turned into a non-zero exit status.
    let config = match load_config(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            println!("Error: {}", e);
            return Ok(());
        }
    };

    let console = Console::new(KafkaConnector::new(config)).show_headers(args.show_headers);
    run(console, args.command).await
}

async fn run<C: Connector>(console: Console<C>, command: Option<Command>) -> Result<()> {
    let shutdown = async {
        if tokio::signal::ctrl_c().await.is_err() {
            futures::future::pending::<()>().await;
        }
    };
    let mut stdout = io::stdout();

    match command {
        Some(Command::Read) => console.execute(Operation::Read, &mut stdout, shutdown).await,
        Some(Command::Write { count }) => {
            console
                .execute(Operation::Write { count }, &mut stdout, shutdown)
                .await
        }
        None => {
            let mut stdin = io::stdin().lock();
            console.interactive(&mut stdin, &mut stdout, shutdown).await
        }
    }
}

fn load_config(path: &Path) -> Result<Config> {
    info!("Loading configuration from {:?}", path);

    let config = Config::from_file(path)?;

    info!(
        hub_name = %config.hub.hub_name,
        consumer_group = %config.hub.consumer_group,
        bootstrap_servers = ?config.hub.bootstrap_servers,
        max_batch_bytes = config.producer.max_batch_bytes,
        "Configuration summary"
    );

    Ok(config)
}

fn init_logging(json: bool, verbose: bool) {
    let env_filter = if verbose {
        EnvFilter::new("eventhub_typed_headers=debug,info")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("eventhub_typed_headers=info,warn"))
    };

    let fmt_layer = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .with_span_list(false)
            .with_writer(io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_writer(io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
