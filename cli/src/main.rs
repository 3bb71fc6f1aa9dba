//! Versa CLI: command-line interface for an on-disk Versa store
//!
//! Opens the store in `--data` directly; there is no server.

use clap::{Parser, Subcommand};
use comfy_table::{ContentArrangement, Table};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use versa::rdf::{NamespaceManager, RdfFormat, RdfParser, RdfSerializer, UpdateWriter};
use versa::versioning::{Diff, Operation, Version, VersionResult, VersionedStore};
use versa::StoreConfig;

#[derive(Parser)]
#[command(name = "versa-cli", version, about = "Versa versioned quad store CLI")]
struct Cli {
    /// Store data directory
    #[arg(long, default_value = "./versa-data", global = true, env = "VERSA_DATA")]
    data: PathBuf,

    /// Optional YAML store configuration; `--data` overrides its data path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, clap::ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Commit the quads of an RDF file as one new version
    Import {
        file: PathBuf,

        /// trig, nq or nt (default: from the file extension)
        #[arg(long)]
        format: Option<RdfFormat>,

        /// Commit message
        #[arg(short, long)]
        message: Option<String>,
    },
    /// Print the content of a version
    Export {
        /// Version reference (number, tag, HEAD, HEAD~N)
        #[arg(long, default_value = "HEAD")]
        at: String,

        #[arg(long, default_value = "trig")]
        format: RdfFormat,
    },
    /// List versions
    Log {
        #[arg(long)]
        oldest_first: bool,

        #[arg(long)]
        limit: Option<usize>,

        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Tag a version
    Tag {
        name: String,

        #[arg(long, default_value = "HEAD")]
        at: String,

        /// Move the tag if it already exists
        #[arg(long)]
        force: bool,
    },
    /// Delete a tag
    Untag { name: String },
    /// List tags
    Tags,
    /// Print the changes between two versions as SPARQL Update
    Diff {
        from: String,
        to: String,

        /// Print the changes that take `to` back to `from` (either order)
        #[arg(long)]
        reverse: bool,
    },
    /// Restore head content to an earlier version by committing the inverse changes
    Revert {
        target: String,

        #[arg(short, long)]
        message: Option<String>,
    },
    /// Show one version and its changes
    Show { reference: String },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => StoreConfig::from_yaml_file(path)?,
        None => StoreConfig::default(),
    };
    config.data_path = Some(cli.data.clone());
    let store = VersionedStore::open(config)?;

    match cli.command {
        Commands::Import {
            file,
            format,
            message,
        } => run_import(&store, &file, format, message.as_deref()),
        Commands::Export { at, format } => run_export(&store, &at, format),
        Commands::Log {
            oldest_first,
            limit,
            format,
        } => run_log(&store, oldest_first, limit, &format),
        Commands::Tag { name, at, force } => run_tag(&store, &name, &at, force),
        Commands::Untag { name } => {
            let id = store.delete_tag(&name)?;
            println!("Deleted tag '{}' (was version {})", name, id);
            Ok(())
        }
        Commands::Tags => run_tags(&store),
        Commands::Diff { from, to, reverse } => run_diff(&store, &from, &to, reverse),
        Commands::Revert { target, message } => {
            let target = store.resolve_ref(&target)?;
            let version = store.revert_to(target.id(), message.as_deref())?;
            println!(
                "Created version {}: {}",
                version.id(),
                version.message().unwrap_or_default()
            );
            Ok(())
        }
        Commands::Show { reference } => run_show(&store, &reference),
    }
}

fn run_import(
    store: &VersionedStore,
    file: &Path,
    format: Option<RdfFormat>,
    message: Option<&str>,
) -> anyhow::Result<()> {
    let format = match format.or_else(|| RdfFormat::from_path(file)) {
        Some(format) => format,
        None => anyhow::bail!("cannot guess the RDF format of {:?}; pass --format", file),
    };
    let quads = RdfParser::parse_file(file, format)?;
    let count = quads.len();

    let version = store.commit(vec![Operation::add(quads)], message)?;
    println!(
        "Created version {}: {} quads read, {} added",
        version.id(),
        count,
        version.changes().added_count()
    );
    Ok(())
}

fn run_export(store: &VersionedStore, at: &str, format: RdfFormat) -> anyhow::Result<()> {
    let version = store.resolve_ref(at)?;
    let snapshot = store.snapshot_at(version.id())?;
    print!("{}", RdfSerializer::serialize_snapshot(&snapshot, format)?);
    Ok(())
}

fn run_log(
    store: &VersionedStore,
    oldest_first: bool,
    limit: Option<usize>,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let mut query = store.versions();
    if oldest_first {
        query = query.oldest_first();
    }
    if let Some(n) = limit {
        query = query.limit(n);
    }
    let versions: Vec<Arc<Version>> = query.into_iter().collect();

    match format {
        OutputFormat::Json => {
            let rows: Vec<serde_json::Value> = versions
                .iter()
                .map(|v| {
                    serde_json::json!({
                        "id": v.id().as_u64(),
                        "parent": v.parent().map(|p| p.as_u64()),
                        "created_at": v.created_at().to_rfc3339(),
                        "message": v.message(),
                        "added": v.changes().added_count(),
                        "removed": v.changes().removed_count(),
                        "tags": store.tags_of(v.id()),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        OutputFormat::Table => {
            if versions.is_empty() {
                println!("(no versions)");
                return Ok(());
            }

            let mut table = Table::new();
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec!["Version", "Created", "+", "-", "Tags", "Message"]);

            for v in &versions {
                table.add_row(vec![
                    v.id().to_string(),
                    v.created_at().format("%Y-%m-%d %H:%M:%S").to_string(),
                    v.changes().added_count().to_string(),
                    v.changes().removed_count().to_string(),
                    store.tags_of(v.id()).join(", "),
                    v.message().unwrap_or("").to_string(),
                ]);
            }

            println!("{}", table);
            println!("{} version(s)", versions.len());
        }
    }

    Ok(())
}

fn run_tag(store: &VersionedStore, name: &str, at: &str, force: bool) -> anyhow::Result<()> {
    let version = store.resolve_ref(at)?;
    if force {
        let previous = store.move_tag(name, version.id())?;
        println!(
            "Moved tag '{}' from version {} to {}",
            name,
            previous,
            version.id()
        );
    } else {
        store.create_tag(name, version.id())?;
        println!("Tagged version {} as '{}'", version.id(), name);
    }
    Ok(())
}

fn run_tags(store: &VersionedStore) -> anyhow::Result<()> {
    let tags = store.tags();
    if tags.is_empty() {
        println!("(no tags)");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Tag", "Version"]);
    for (name, id) in tags {
        table.add_row(vec![name, id.to_string()]);
    }
    println!("{}", table);
    Ok(())
}

fn run_diff(store: &VersionedStore, from: &str, to: &str, reverse: bool) -> anyhow::Result<()> {
    let diff = select_diff(store, from, to, reverse)?;
    if diff.is_empty() {
        eprintln!("(no changes)");
        return Ok(());
    }
    print!("{}", UpdateWriter::new(NamespaceManager::new()).write(&diff));
    Ok(())
}

/// Forward diff `from..to`, or with `reverse` the changes from `to` back to `from`
fn select_diff(store: &VersionedStore, from: &str, to: &str, reverse: bool) -> VersionResult<Diff> {
    let from = store.resolve_ref(from)?.id();
    let to = store.resolve_ref(to)?.id();
    if reverse {
        store.diff_reverse(to, from)
    } else {
        store.diff(from, to)
    }
}

fn run_show(store: &VersionedStore, reference: &str) -> anyhow::Result<()> {
    let version = store.resolve_ref(reference)?;

    println!("Version: {}", version.id());
    if let Some(parent) = version.parent() {
        println!("Parent:  {}", parent);
    }
    println!("Created: {}", version.created_at().to_rfc3339());
    let tags = store.tags_of(version.id());
    if !tags.is_empty() {
        println!("Tags:    {}", tags.join(", "));
    }
    println!("Message: {}", version.message().unwrap_or("(none)"));
    println!();

    for quad in version.changes().removed() {
        println!("- {}", quad);
    }
    for quad in version.changes().added() {
        println!("+ {}", quad);
    }
    Ok(())
}
