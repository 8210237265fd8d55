//! invemu command-line driver

use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use invemu_core::settings::DEFAULT_SETTINGS_FILE;
use invemu_core::{Document, InventoryStore, PersistReport, Settings};
use invemu_value::{Codec, Navigate, TaggedCodec, ValuePath};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod render;

fn file_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help(help)
}

fn cli() -> Command {
    Command::new("invemu")
        .version(invemu_core::VERSION)
        .about("Inventory store for emulated game sessions")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .default_value(DEFAULT_SETTINGS_FILE)
                .value_parser(value_parser!(PathBuf))
                .help("Settings file"),
        )
        .arg(
            Arg::new("data-dir")
                .long("data-dir")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Override the inventory directory"),
        )
        .subcommand(
            Command::new("init")
                .about("Adopt a bootstrap inventory on first run")
                .arg(file_arg("bootstrap", "Encoded inventory snapshot")),
        )
        .subcommand(
            Command::new("apply")
                .about("Apply an encoded update request")
                .arg(file_arg("request", "Encoded update request"))
                .arg(
                    Arg::new("out")
                        .long("out")
                        .value_parser(value_parser!(PathBuf))
                        .help("Write the encoded response envelope here"),
                ),
        )
        .subcommand(
            Command::new("sync")
                .about("Copy level and experience from an authoritative inventory")
                .arg(file_arg("source", "Encoded authoritative inventory")),
        )
        .subcommand(
            Command::new("migrate")
                .about("Replace the inventory with a regenerated one, keeping user state")
                .arg(file_arg("new", "Encoded regenerated inventory")),
        )
        .subcommand(Command::new("reset-level").about("Reset level and experience to zero"))
        .subcommand(Command::new("randomize").about("Mint a fresh session identity"))
        .subcommand(
            Command::new("show").about("Print the working inventory").arg(
                Arg::new("json")
                    .long("json")
                    .action(ArgAction::SetTrue)
                    .help("Output the full document as JSON"),
            ),
        )
}

fn path_arg<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a PathBuf> {
    args.get_one::<PathBuf>(name)
        .with_context(|| format!("missing argument <{name}>"))
}

async fn read(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))
}

async fn decode(codec: &dyn Codec, path: &Path) -> Result<Document> {
    let bytes = read(path).await?;
    Document::decode(codec, &bytes).with_context(|| format!("decoding {}", path.display()))
}

fn report_persist(report: Option<&PersistReport>) {
    match report {
        Some(report) if !report.is_durable() => {
            warn!("change applied in memory only, see earlier warnings");
        }
        Some(report) => info!(bytes = report.len(), "inventory saved"),
        None => info!("nothing to save"),
    }
}

/// Answer an encoded update request the way the transport does
///
/// Returns the number of changed records in the response envelope.
async fn apply_request(store: &InventoryStore, bytes: &[u8], out: Option<&Path>) -> Result<usize> {
    let response = store.handle_update_request(bytes).await?;
    let envelope = store
        .codec()
        .decode(&response.body)
        .context("decoding response envelope")?;
    let changed = envelope
        .resolve_sequence(&ValuePath::keys(&["body", "response", "current_items"]))?
        .len();

    if let Some(out) = out {
        tokio::fs::write(out, &*response.body)
            .await
            .with_context(|| format!("writing {}", out.display()))?;
    }
    Ok(changed)
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();

    let config_path = path_arg(&matches, "config")?.clone();
    let mut settings = Settings::load_or_init(&config_path).await;
    settings.apply_env_overrides();
    if let Some(dir) = matches.get_one::<PathBuf>("data-dir") {
        settings.storage.data_dir.clone_from(dir);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(settings.log_filter())),
        )
        .init();

    let codec: Arc<dyn Codec> = Arc::new(TaggedCodec::new());
    let Some((command, args)) = matches.subcommand() else {
        bail!("no command given");
    };

    let bootstrap = if command == "init" {
        Some(read(path_arg(args, "bootstrap")?).await?)
    } else {
        None
    };
    let store = InventoryStore::open(settings.store_config(), Arc::clone(&codec), bootstrap)
        .await
        .context("opening inventory store")?;

    match command {
        "init" => {
            if settings.general.first_boot {
                settings
                    .complete_first_boot(&config_path)
                    .await
                    .context("saving settings")?;
            }
            let records = store.with_document(Document::len).await;
            println!(
                "inventory ready: {records} records at {}",
                store.persistence().primary_path().display()
            );
        }
        "apply" => {
            let bytes = read(path_arg(args, "request")?).await?;
            let out = args.get_one::<PathBuf>("out").map(PathBuf::as_path);
            let changed = apply_request(&store, &bytes, out).await?;
            println!("{changed} records changed");
        }
        "sync" => {
            let source = decode(codec.as_ref(), path_arg(args, "source")?).await?;
            let outcome = store.sync_from(&source).await?;
            report_persist(outcome.persist.as_ref());
            println!("{:?}", outcome.value);
        }
        "migrate" => {
            let new = decode(codec.as_ref(), path_arg(args, "new")?).await?;
            let outcome = store.regenerate(new).await;
            report_persist(outcome.persist.as_ref());
            let report = outcome.value;
            println!(
                "favorites carried: {}, slots carried: {}, slots skipped: {}",
                report.favorites_carried, report.slots_carried, report.slots_skipped
            );
        }
        "reset-level" => {
            let outcome = store.reset_progression().await?;
            report_persist(outcome.persist.as_ref());
            println!("{:?}", outcome.value);
        }
        "randomize" => {
            let outcome = store.start_session().await;
            report_persist(outcome.persist.as_ref());
            println!("account id: {}", store.identity().account_id());
        }
        "show" => {
            let text = if args.get_flag("json") {
                let json = store.with_document(|doc| render::to_json(doc.root())).await;
                serde_json::to_string_pretty(&json)?
            } else {
                store.with_document(render::summary).await
            };
            println!("{text}");
        }
        other => bail!("unknown command {other}"),
    }
    Ok(())
}
