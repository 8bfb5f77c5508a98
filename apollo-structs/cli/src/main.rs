use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use apollo_compiler::Name;
use apollo_compiler::ast::Type;
use apollo_structs::StructConfig;
use apollo_structs::ValidStructSchema;
use apollo_structs::coercion::coerce_input;
use apollo_structs::selection::Variables;
use apollo_structs::selection::merge_struct_selections;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// CLI arguments. See <https://docs.rs/clap/latest/clap/_derive/index.html>
#[derive(Parser)]
struct Args {
    /// Log filter, in `RUST_LOG` syntax. `RUST_LOG` takes precedence when set.
    #[arg(long = "log", default_value = "warn")]
    log_level: String,

    /// A JSON file with validation settings
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Validates the struct and struct union types of a schema
    Validate {
        /// The path to the schema file, or `-` for stdin
        schema: PathBuf,
    },
    /// Validates a query and prints the merged selection of every struct-typed field
    Merge {
        /// The path to the schema file, or `-` for stdin
        schema: PathBuf,
        /// The path to the query file, or `-` for stdin
        query: PathBuf,
        /// A JSON file with the operation variables
        #[arg(long)]
        variables: Option<PathBuf>,
    },
    /// Coerces a JSON input value against a struct or struct union type
    Coerce {
        /// The path to the schema file, or `-` for stdin
        schema: PathBuf,
        /// The name of the struct or struct union
        type_name: String,
        /// The path to the JSON input, or `-` for stdin
        input: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => {
            EnvFilter::try_new(&args.log_level).context("could not parse log configuration")?
        }
    };
    tracing_subscriber::fmt::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let config = match &args.config {
        Some(path) => serde_json::from_str(&read_input(path)?)
            .with_context(|| format!("invalid configuration in {}", path.display()))?,
        None => StructConfig::default(),
    };

    match args.command {
        Command::Validate { schema } => validate(&schema),
        Command::Merge {
            schema,
            query,
            variables,
        } => merge(&schema, &query, variables.as_deref(), config),
        Command::Coerce {
            schema,
            type_name,
            input,
        } => coerce(&schema, &type_name, &input, config),
    }
}

fn read_input(input_path: &Path) -> anyhow::Result<String> {
    if input_path == Path::new("-") {
        io::read_to_string(io::stdin()).context("could not read stdin")
    } else {
        fs::read_to_string(input_path)
            .with_context(|| format!("could not read {}", input_path.display()))
    }
}

fn load_schema(path: &Path) -> anyhow::Result<ValidStructSchema> {
    let source = read_input(path)?;
    tracing::debug!(path = %path.display(), bytes = source.len(), "read schema");
    ValidStructSchema::parse_and_validate(&source)
        .map_err(|err| anyhow::anyhow!("invalid schema {}:\n{}", path.display(), err.messages()))
}

fn validate(schema_path: &Path) -> anyhow::Result<()> {
    let schema = load_schema(schema_path)?;
    println!(
        "{} structs and {} struct unions are valid",
        schema.structs().count(),
        schema.struct_unions().count()
    );
    Ok(())
}

fn merge(
    schema_path: &Path,
    query_path: &Path,
    variables_path: Option<&Path>,
    config: StructConfig,
) -> anyhow::Result<()> {
    let schema = load_schema(schema_path)?;
    let query = read_input(query_path)?;
    let variables: Variables = match variables_path {
        Some(path) => serde_json::from_str(&read_input(path)?)
            .with_context(|| format!("invalid variables in {}", path.display()))?,
        None => Variables::new(),
    };
    let operations = merge_struct_selections(&schema, &query, variables, config)
        .map_err(|err| {
            anyhow::anyhow!(
                "invalid query {}:\n{}",
                query_path.display(),
                err.messages()
            )
        })?;
    for operation in operations {
        print!("{}", operation);
    }
    Ok(())
}

fn coerce(
    schema_path: &Path,
    type_name: &str,
    input_path: &Path,
    config: StructConfig,
) -> anyhow::Result<()> {
    let schema = load_schema(schema_path)?;
    let type_name = Name::new(type_name).context("invalid type name")?;
    let input: serde_json_bytes::Value = serde_json::from_str(&read_input(input_path)?)
        .with_context(|| format!("invalid JSON in {}", input_path.display()))?;
    let coerced = coerce_input(&schema, "input", &Type::NonNullNamed(type_name), &input, config)
        .map_err(|err| anyhow::anyhow!("invalid input:\n{}", err.messages()))?;
    println!("{}", serde_json::to_string_pretty(&coerced.to_json())?);
    Ok(())
}
