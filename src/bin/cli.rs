//! declgraph CLI - build and inspect declaration-graph snapshots.

use clap::{Parser, Subcommand};
use declgraph::{
    DeclExplorer, ExplorerConfig, GlobExplorer, NamespaceRoot, PackageEnumerator, SnapshotCache,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "declgraph")]
#[command(about = "Incremental declaration-graph explorer", long_about = None)]
struct Cli {
    /// Project directory (default: current directory)
    #[arg(short, long, default_value = ".")]
    project: PathBuf,

    /// Config file relative to the project directory
    #[arg(long, default_value = "declgraph.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild the snapshot incrementally and persist it
    Build,

    /// List all declarations in the cached snapshot
    List {
        /// Include synthetic placeholder entries
        #[arg(long)]
        synthetic: bool,
    },

    /// Show everything that depends on a declaration
    Dependents {
        /// Fully-qualified declaration name
        name: String,
    },

    /// Show snapshot statistics
    Stats,

    /// Derive declaration names from file layout, without parsing
    Glob {
        /// Dotted namespace prefix to enumerate under
        namespace: String,

        /// Only the namespace directory itself, no nested namespaces
        #[arg(long)]
        flat: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = ExplorerConfig::load(&cli.project.join(&cli.config));
    let cache = SnapshotCache::new(config.resolve_snapshot_path(&cli.project));

    match cli.command {
        Commands::Build => {
            let previous = cache.load()?;
            let mut explorer = DeclExplorer::with_enumerator(
                config.resolve_root(&cli.project),
                Box::new(PackageEnumerator::new(
                    config.resolve_manifest(&cli.project),
                    config.resolve_vendor_dir(&cli.project),
                )),
            )
            .with_snapshot(previous);

            let stats = explorer.refresh()?;
            cache.save(explorer.snapshot())?;

            println!(
                "{} files seen, {} parsed, {} declarations dropped, {} added",
                stats.files_seen,
                stats.files_parsed,
                stats.declarations_dropped,
                stats.declarations_added
            );
            for diagnostic in explorer.diagnostics() {
                println!("warning: {}", diagnostic);
            }
        }

        Commands::List { synthetic } => {
            let snapshot = cache.load()?;
            for declaration in snapshot.declarations() {
                if declaration.synthetic && !synthetic {
                    continue;
                }
                match &declaration.kind {
                    Some(kind) => println!("{} {}", kind, declaration.name),
                    None => println!("external {}", declaration.name),
                }
            }
        }

        Commands::Dependents { name } => {
            let snapshot = cache.load()?;
            let dependents = snapshot.dependents_of(&name);
            if dependents.is_empty() {
                println!("No dependents of '{}'.", name);
            } else {
                println!("Dependents of '{}' ({}):", name, dependents.len());
                for dependent in dependents {
                    println!("  - {}", dependent);
                }
            }
        }

        Commands::Stats => {
            let snapshot = cache.load()?;
            let stats = snapshot.stats();
            println!("Snapshot: {}", cache.path().display());
            println!("Files:        {}", stats.files);
            println!("Declarations: {}", stats.declarations);
            println!("Synthetic:    {}", stats.synthetic);
            println!("Edges:        {}", stats.edges);
        }

        Commands::Glob { namespace, flat } => {
            let enumerator = PackageEnumerator::new(
                config.resolve_manifest(&cli.project),
                config.resolve_vendor_dir(&cli.project),
            );
            let roots = enumerator
                .sources()?
                .directories
                .into_iter()
                .map(|dir| NamespaceRoot {
                    prefix: String::new(),
                    dir,
                })
                .collect();
            let mut explorer = GlobExplorer::new(namespace, roots);
            if flat {
                explorer = explorer.non_recursive();
            }
            for name in explorer.names() {
                println!("{}", name);
            }
        }
    }

    Ok(())
}
