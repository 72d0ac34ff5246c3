//! bytegraph CLI - inspect class hierarchies and apply mappings to workspace manifests

use bytegraph::config::{self, BytegraphConfig};
use bytegraph::graph::InheritanceGraph;
use bytegraph::manifest::WorkspaceManifest;
use bytegraph::mapping::{format, HierarchyMappings, MappingApplier, Mappings};
use bytegraph::ui::{self, Icons, ProgressManager, Spinner};
use bytegraph::Workspace;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "bytegraph")]
#[command(version)]
#[command(about = "Class hierarchy queries and parallel remapping over workspace manifests")]
#[command(long_about = r#"
bytegraph loads a workspace manifest (one primary resource plus libraries)
and answers hierarchy questions or applies rename mappings to it.

Example usage:
  bytegraph stats --workspace app.json
  bytegraph family --workspace app.json --class com/example/Dog
  bytegraph apply --workspace app.json --mappings renames.txt --output renamed.json
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file (defaults to ./bytegraph.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Simple,
    Json,
}

impl FormatArg {
    fn name(self) -> &'static str {
        match self {
            FormatArg::Simple => "simple",
            FormatArg::Json => "json",
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// Show resource, bundle and class counts
    Stats {
        #[arg(short, long)]
        workspace: PathBuf,
    },

    /// List the family (connected hierarchy) of a class
    Family {
        #[arg(short, long)]
        workspace: PathBuf,

        /// Internal class name, e.g. com/example/Dog
        #[arg(long)]
        class: String,

        /// Leave the root type out
        #[arg(long)]
        no_root: bool,
    },

    /// List every ancestor of a class, nearest first
    Ancestors {
        #[arg(short, long)]
        workspace: PathBuf,

        #[arg(long)]
        class: String,
    },

    /// List every descendant of a class, nearest first
    Descendants {
        #[arg(short, long)]
        workspace: PathBuf,

        #[arg(long)]
        class: String,
    },

    /// Most specific common ancestor of two classes
    Common {
        #[arg(short, long)]
        workspace: PathBuf,

        first: String,

        second: String,
    },

    /// Apply mappings to the primary resource
    Apply {
        #[arg(short, long)]
        workspace: PathBuf,

        /// Mapping file
        #[arg(short, long)]
        mappings: PathBuf,

        #[arg(short, long, value_enum, default_value = "simple")]
        format: FormatArg,

        /// Write the mapped workspace manifest here
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Compute and report without committing
        #[arg(long)]
        dry_run: bool,

        /// Look members up on their exact owner only
        #[arg(long)]
        no_hierarchy: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = config::load_config(cli.config.as_deref())?.unwrap_or_default();

    match cli.command {
        Commands::Init { force } => {
            let path = cli.config.unwrap_or_else(config::default_config_path);
            let defaults = BytegraphConfig {
                workers: Some(config.worker_count()),
                root_type: Some(config.root_type().to_string()),
                hierarchy_lookup: Some(config.hierarchy_lookup()),
            };
            config::write_config(&path, &defaults, force)?;
            ui::success(&format!("Wrote {}", path.display()));
        }

        Commands::Stats { workspace } => {
            let workspace = load_workspace(&workspace)?;
            print_stats(&workspace);
        }

        Commands::Family {
            workspace,
            class,
            no_root,
        } => {
            let graph = load_graph(&workspace, &config)?;
            let mut family: Vec<_> = graph.family(&class, !no_root).into_iter().collect();
            if family.is_empty() {
                anyhow::bail!("class {} not found", class);
            }
            family.sort_by(|a, b| a.name().cmp(b.name()));

            ui::section(&format!(" {} family of {} ", Icons::LINK, class));
            for vertex in family {
                let icon = if vertex.is_primary() {
                    Icons::PACKAGE
                } else {
                    Icons::LIBRARY
                };
                ui::class_line(icon, vertex.name(), vertex.is_primary());
            }
        }

        Commands::Ancestors { workspace, class } => {
            let graph = load_graph(&workspace, &config)?;
            let Some(vertex) = graph.vertex(&class) else {
                anyhow::bail!("class {} not found", class);
            };
            ui::section(&format!(" {} ancestors of {} ", Icons::UP, class));
            for parent in vertex.all_parents() {
                ui::class_line(Icons::UP, parent.name(), parent.is_primary());
            }
            if vertex.is_library_definition() {
                ui::warn("Extends library types: inherited members must keep their names");
            }
        }

        Commands::Descendants { workspace, class } => {
            let graph = load_graph(&workspace, &config)?;
            let Some(vertex) = graph.vertex(&class) else {
                anyhow::bail!("class {} not found", class);
            };
            ui::section(&format!(" {} descendants of {} ", Icons::DOWN, class));
            for child in vertex.all_children() {
                ui::class_line(Icons::DOWN, child.name(), child.is_primary());
            }
        }

        Commands::Common {
            workspace,
            first,
            second,
        } => {
            let graph = load_graph(&workspace, &config)?;
            let common = graph.common_ancestor(&first, &second);
            ui::info(&format!("Common ancestor of {} and {}", first, second), &common);
        }

        Commands::Apply {
            workspace,
            mappings,
            format,
            output,
            dry_run,
            no_hierarchy,
        } => {
            run_apply(ApplyArgs {
                workspace: &workspace,
                mappings: &mappings,
                format,
                output: output.as_deref(),
                dry_run,
                hierarchy: config.hierarchy_lookup() && !no_hierarchy,
                config: &config,
            })?;
        }
    }

    Ok(())
}

fn load_workspace(path: &Path) -> anyhow::Result<Arc<Workspace>> {
    let spinner = Spinner::new(&format!("Loading {}", path.display()));
    let manifest = WorkspaceManifest::load(path)?;
    spinner.set_message(&format!(
        "Populating {} classes",
        manifest.primary.class_count()
    ));
    let workspace = Arc::new(manifest.into_workspace());
    spinner.finish_with_message("Loaded");
    Ok(workspace)
}

fn load_graph(path: &Path, config: &BytegraphConfig) -> anyhow::Result<Arc<InheritanceGraph>> {
    let workspace = load_workspace(path)?;
    Ok(Arc::new(InheritanceGraph::with_root_type(
        workspace,
        config.root_type(),
    )))
}

fn print_stats(workspace: &Workspace) {
    let primary = workspace.primary();
    let libraries = workspace.supporting();
    let nested: usize = primary.resources_recursive().len() - 1;
    let library_classes: usize = libraries.iter().map(|l| l.class_count()).sum();

    ui::header(&format!("Workspace {}", primary.name()));
    let table = ui::stats_table(&[
        ("Primary classes", primary.class_count().to_string()),
        ("Primary files", primary.files().len().to_string()),
        ("Versioned bundles", primary.versioned_classes().len().to_string()),
        ("Embedded resources", nested.to_string()),
        ("Libraries", libraries.len().to_string()),
        ("Library classes", library_classes.to_string()),
    ]);
    println!("{}", table);
}

struct ApplyArgs<'a> {
    workspace: &'a Path,
    mappings: &'a Path,
    format: FormatArg,
    output: Option<&'a Path>,
    dry_run: bool,
    hierarchy: bool,
    config: &'a BytegraphConfig,
}

fn run_apply(args: ApplyArgs<'_>) -> anyhow::Result<()> {
    let start = Instant::now();
    let graph = load_graph(args.workspace, args.config)?;
    let workspace = graph.workspace().clone();

    let Some(reader) = format::by_name(args.format.name()) else {
        anyhow::bail!("unknown mapping format {}", args.format.name());
    };
    let text = std::fs::read_to_string(args.mappings)?;
    let parsed = reader.parse(&text)?;
    tracing::info!("Loaded {} mappings from {}", parsed.len(), args.mappings.display());

    let mappings: Box<dyn Mappings> = if args.hierarchy {
        Box::new(HierarchyMappings::new(parsed, graph.clone()))
    } else {
        Box::new(parsed)
    };

    let (progress, tx) = ProgressManager::new();
    let applier = MappingApplier::from_config(args.config)?.with_progress(tx);
    let primary = workspace.primary().clone();
    let classes = primary.class_count();

    let results = applier.compute(mappings.as_ref(), &primary)?;
    let mapped = results.mapped_classes();
    let renamed = if args.dry_run {
        results.renamed_classes()
    } else {
        applier.commit(&results)?
    };
    progress.finish_with_summary(start.elapsed(), classes, renamed.len());

    let table = ui::rename_table(&mapped);
    if !table.is_empty() {
        println!("{}", table);
    }
    if !results.failures().is_empty() {
        ui::section(" Failures ");
        for failure in results.failures() {
            ui::failure(failure);
        }
    }

    if args.dry_run {
        ui::info("Dry run", "nothing committed");
    } else if let Some(output) = args.output {
        WorkspaceManifest::from_workspace(&workspace).save(output)?;
        ui::success(&format!("Wrote {}", output.display()));
    }
    Ok(())
}
