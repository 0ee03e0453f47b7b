use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use prismerd::files;
use prismerd::ir::{Cardinality, Diagram};
use prismerd::mutator::{self, Connection, JunctionOrder, NullableSides, RelationMode, RelationRequest};
use prismerd::parse;
use prismerd::serializer::serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "prismerd", version, about = "Prisma schema to ER diagram engine")]
struct Cli {
    /// Output file (default: stdout)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Log debug details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the parsed document model as JSON
    Parse { input: PathBuf },
    /// Print diagram nodes and edges as JSON
    Diagram { input: PathBuf },
    /// Print the schema in canonical formatting
    Format { input: PathBuf },
    /// Add a relation between two fields
    Relate {
        input: PathBuf,
        /// Source endpoint, as Entity.field
        #[arg(long)]
        from: String,
        /// Target endpoint, as Entity.field
        #[arg(long)]
        to: String,
        /// 1-1, 1-M or M-M
        #[arg(short, long)]
        cardinality: Cardinality,
        /// implicit or explicit (many-to-many only)
        #[arg(short, long, default_value = "implicit")]
        mode: RelationMode,
        /// AonB or BonA: junction model name order
        #[arg(long, default_value = "AonB")]
        order: JunctionOrder,
        #[arg(long)]
        nullable_source: bool,
        #[arg(long)]
        nullable_target: bool,
        /// Rewrite the input file instead of printing
        #[arg(long, conflicts_with = "output")]
        in_place: bool,
    },
    /// Split a merged schema into its files
    Split {
        input: PathBuf,
        /// Directory to write the files into
        #[arg(long)]
        out: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "prismerd=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let output = cli.output.as_deref();

    match cli.command {
        Command::Parse { input } => {
            let doc = parse(&read(&input)?);
            emit(output, &serde_json::to_string_pretty(&doc)?)
        }
        Command::Diagram { input } => {
            let diagram = Diagram::from_document(&parse(&read(&input)?));
            emit(output, &serde_json::to_string_pretty(&diagram)?)
        }
        Command::Format { input } => emit(output, &serialize(&parse(&read(&input)?))),
        Command::Relate {
            input,
            from,
            to,
            cardinality,
            mode,
            order,
            nullable_source,
            nullable_target,
            in_place,
        } => {
            let source = read(&input)?;
            let connection = Connection::from_endpoints(&from, &to)?;
            let request = RelationRequest {
                cardinality,
                mode,
                junction_name_order: order,
                nullable_sides: NullableSides {
                    source: nullable_source,
                    target: nullable_target,
                },
            };
            let updated = mutator::add_relation(&source, &connection, &request);
            if updated == source {
                tracing::warn!("schema unchanged; check that both models exist");
            }
            let target = if in_place { Some(input.as_path()) } else { output };
            emit(target, &updated)
        }
        Command::Split { input, out } => {
            let schema_files = files::split(&read(&input)?);
            files::check_names(&schema_files)?;
            fs::create_dir_all(&out)
                .with_context(|| format!("Failed to create {}", out.display()))?;
            for file in schema_files {
                let path = out.join(&file.name);
                fs::write(&path, &file.content)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                tracing::info!(path = %path.display(), "wrote schema file");
            }
            Ok(())
        }
    }
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn emit(path: Option<&Path>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), "wrote output");
        }
        None => print!("{}", content),
    }
    Ok(())
}
