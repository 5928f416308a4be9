mod args;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::{Map, Value};
use tracing_subscriber::EnvFilter;

use couchbench::{Client, CouchConfig, CouchDBClient, Record, Status};

use crate::args::{projection, record, Args, Command};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let runtime = configure_runtime(&args)?;
    let config = CouchConfig::from_properties(&args.property_map())?;

    runtime.block_on(run(&args, config))
}

fn configure_runtime(args: &Args) -> Result<tokio::runtime::Runtime> {
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.worker_threads(args.worker_threads.max(1) as usize);

    if let Some(stack_size) = args.thread_stack_size {
        builder.thread_stack_size(stack_size);
    }

    if let Some(max_threads) = args.max_blocking_threads {
        builder.max_blocking_threads(max_threads);
    }

    builder
        .enable_all()
        .build()
        .context("failed to build tokio runtime")
}

async fn run(args: &Args, config: CouchConfig) -> Result<()> {
    let mut client = CouchDBClient::connect(&config)
        .await
        .with_context(|| format!("failed to connect to {}", config.base_url()))?;

    let outcome = execute(&mut client, &args.table, &args.command).await;
    // Runs even when the operation failed so nothing stays buffered.
    let drained = client.cleanup().await;

    outcome?;
    drained.context("failed to flush pending inserts")?;
    Ok(())
}

async fn execute<C: Client>(client: &mut C, table: &str, command: &Command) -> Result<()> {
    match command {
        Command::Read { key, fields } => {
            match client.read(table, key, projection(fields).as_ref()).await? {
                Some(found) => println!("{}", render(&found)),
                None => println!("NOT_FOUND"),
            }
        }
        Command::Scan {
            start_key,
            count,
            fields,
        } => {
            let found = client
                .scan(table, start_key, *count, projection(fields).as_ref())
                .await?;
            for rec in &found {
                println!("{}", render(rec));
            }
            eprintln!("{} records", found.len());
        }
        Command::Insert { key, values } => {
            client.insert(table, key, &record(values)).await?;
            println!("OK");
        }
        Command::Update { key, values } => match client.update(table, key, &record(values)).await? {
            Status::Ok => println!("OK"),
            Status::NotFound => println!("NOT_FOUND"),
        },
        Command::Delete { key } => {
            client.delete(table, key).await?;
            println!("OK");
        }
    }
    Ok(())
}

fn render(rec: &Record) -> Value {
    let object: Map<String, Value> = rec
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(String::from_utf8_lossy(v).into_owned())))
        .collect();
    Value::Object(object)
}
