/*!
 * Fila - Command Line Entry Point
 *
 * Small shell over the configured storage backend:
 * - ls, cat, stat for inspection
 * - write, append, mkdir, rm for mutation
 * - watch to stream change events until interrupted
 * - stores to list persisted Keyva stores
 *
 * Backend selection comes from FILA_BACKEND, FILA_CWD, FILA_TEMP,
 * FILA_KEYVA_DIR and FILA_TRACE_JSON.
 */

use anyhow::{anyhow, bail, Context, Result};
use tracing::{info, Instrument};

use fila::fila::{init_storage, Fila, Registry, WriteOptions};
use fila::keyva::{Keyva, MemoryEngine};
use fila::monitoring::{init_tracing, OperationSpan};
use fila::StorageConfig;

const USAGE: &str = "usage: fila <ls|cat|stat|write|append|mkdir|rm|watch> <path> [text]\n       fila stores";

#[tokio::main]
async fn main() -> Result<()> {
    let config = StorageConfig::from_env().map_err(|e| anyhow!("invalid configuration: {e}"))?;
    init_tracing(config.trace_json);

    let registry = init_storage(&config).context("failed to initialize storage")?;
    Registry::install(registry).context("failed to install registry")?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (command, rest) = match args.split_first() {
        Some((command, rest)) => (command.as_str(), rest),
        None => bail!(USAGE),
    };
    if command == "stores" {
        return stores(&config).await;
    }

    let target = match rest.first() {
        Some(path) => Fila::parse(path)?,
        None => Fila::parse(".")?,
    };

    let span = OperationSpan::new(command, &target.path());
    let outcome = run(command, &target, rest.get(1).map(String::as_str))
        .instrument(span.span().clone())
        .await;
    match &outcome {
        Ok(()) => span.record_success(),
        Err(e) => span.record_error(e),
    }
    outcome
}

async fn run(command: &str, target: &Fila, text: Option<&str>) -> Result<()> {
    match command {
        "ls" => {
            for child in target.read_directory().await? {
                let marker = if child.is_directory().await { "/" } else { "" };
                println!("{}{}", child.name(), marker);
            }
        }
        "cat" => print!("{}", target.read_text().await?),
        "stat" => {
            let stat = target
                .stat()
                .await?
                .ok_or_else(|| anyhow!("{target}: no such file or directory"))?;
            println!("{}", serde_json::to_string_pretty(&stat)?);
        }
        "write" | "append" => {
            let text = text.ok_or_else(|| anyhow!(USAGE))?;
            let options = if command == "append" {
                WriteOptions::append()
            } else {
                WriteOptions::default()
            };
            target.write_text(text, options).await?;
        }
        "mkdir" => target.write_directory().await?,
        "rm" => target.delete().await?,
        "watch" => watch(target).await?,
        other => bail!("unknown command '{other}'\n{USAGE}"),
    }
    Ok(())
}

/// List the Keyva stores persisted in the configured snapshot directory
async fn stores(config: &StorageConfig) -> Result<()> {
    let dir = config
        .keyva_dir
        .as_ref()
        .ok_or_else(|| anyhow!("FILA_KEYVA_DIR is not set"))?;
    let engine = MemoryEngine::persistent(dir);
    for name in Keyva::stores(&engine).await? {
        println!("{name}");
    }
    Ok(())
}

async fn watch(target: &Fila) -> Result<()> {
    let subscription = target.watch(true, |event| {
        match event.secondary() {
            Some(from) => println!("{} {} (from {})", event.kind(), event.path(), from),
            None => println!("{} {}", event.kind(), event.path()),
        }
    });
    subscription
        .ready()
        .await
        .with_context(|| format!("failed to watch {target}"))?;
    info!(path = %target, "watching, press ctrl-c to stop");

    tokio::signal::ctrl_c().await?;
    subscription.dispose().await?;
    Ok(())
}
