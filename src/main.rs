//! CLI entry point for `solrfacade`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};

use solrfacade::config::{self, Config};
use solrfacade::error::SearchError;
use solrfacade::index::{IndexClient, SolrHttpClient, StaticIndex};
use solrfacade::mapping::{EntityMapping, MappingContext};
use solrfacade::model::{EntityType, Visibility};
use solrfacade::query::QueryService;
use solrfacade::search::{CancellationToken, SearchRequest, SearchService};

#[derive(Parser)]
#[command(
    name = "solrfacade",
    version,
    about = "Compile filter expressions and run searches against a Solr index"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (overrides $SOLRFACADE_CONFIG)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a filter expression into a Solr filter clause
    Compile {
        /// Entity type: data or document
        #[arg(short, long, value_parser = parse_entity, default_value = "document")]
        entity: EntityType,
        /// Filter expression, e.g. 'language:(en OR de)'
        expression: String,
    },
    /// List the fields of a mapping table
    Fields {
        #[arg(short, long, value_parser = parse_entity, default_value = "document")]
        entity: EntityType,
        /// Mapping context: filter, aggregation, sort, document
        #[arg(short, long, value_parser = parse_context, default_value = "filter")]
        context: MappingContext,
        #[arg(long)]
        json: bool,
    },
    /// Print the Solr parameters a search request would send
    Request {
        #[arg(short, long, value_parser = parse_entity, default_value = "document")]
        entity: EntityType,
        #[arg(long, value_parser = parse_visibility, default_value = "public")]
        visibility: Visibility,
        /// JSON search request
        #[arg(short, long, value_name = "FILE")]
        request: PathBuf,
    },
    /// Run a search and print the shaped result
    Search {
        #[arg(short, long, value_parser = parse_entity, default_value = "document")]
        entity: EntityType,
        #[arg(long, value_parser = parse_visibility, default_value = "public")]
        visibility: Visibility,
        /// JSON search request
        #[arg(short, long, value_name = "FILE")]
        request: PathBuf,
        /// Answer from a saved Solr select response instead of the server
        #[arg(long, value_name = "FILE")]
        response: Option<PathBuf>,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn parse_entity(s: &str) -> Result<EntityType, String> {
    EntityType::from_name(s).ok_or_else(|| format!("unknown entity type '{s}' (data, document)"))
}

fn parse_visibility(s: &str) -> Result<Visibility, String> {
    Visibility::from_name(s).ok_or_else(|| format!("unknown visibility '{s}' (public, private)"))
}

fn parse_context(s: &str) -> Result<MappingContext, String> {
    MappingContext::from_name(s)
        .ok_or_else(|| format!("unknown context '{s}' (filter, aggregation, sort, document)"))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match &cli.config {
        Some(path) => config::load_config_from(path)?,
        None => config::load_config(),
    };

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Compile { entity, expression } => cmd_compile(entity, &expression),
        Commands::Fields {
            entity,
            context,
            json,
        } => cmd_fields(entity, context, json),
        Commands::Request {
            entity,
            visibility,
            request,
        } => cmd_request(config, entity, visibility, &request),
        Commands::Search {
            entity,
            visibility,
            request,
            response,
        } => cmd_search(config, entity, visibility, &request, response.as_deref()),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    // Try to set up file logging
    let log_dir = config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "solrfacade.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        // Fall back to stderr only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Print the structured error body a controller would return, then fail.
fn report(err: SearchError) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&err.to_response())?);
    Err(err.into())
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_request(path: &Path) -> anyhow::Result<SearchRequest> {
    let body = std::fs::read_to_string(path).map_err(|e| SearchError::io(path, e))?;
    Ok(SearchRequest::from_json(&body)?)
}

fn cmd_compile(entity: EntityType, expression: &str) -> anyhow::Result<()> {
    let mapping = EntityMapping::for_entity(entity).context(MappingContext::Filter);
    match QueryService::global().filter_query(expression, mapping) {
        Ok(clause) => {
            println!("{clause}");
            Ok(())
        }
        Err(e) => report(e),
    }
}

fn cmd_fields(entity: EntityType, context: MappingContext, json: bool) -> anyhow::Result<()> {
    let mapping = EntityMapping::for_entity(entity).context(context);

    if json {
        let fields: Vec<serde_json::Value> = mapping
            .iter()
            .map(|(logical, field)| {
                serde_json::json!({
                    "field": logical,
                    "physical": field.physical,
                    "kind": field.kind,
                })
            })
            .collect();
        return print_json(&serde_json::json!({
            "entity": entity,
            "context": context.as_str(),
            "fields": fields,
        }));
    }

    println!();
    println!("  {entity} / {context} ({} fields)", mapping.len());
    println!();
    println!("  {:<28} {:<36} {:<10}", "Field", "Index field", "Kind");
    println!("  {}", "-".repeat(74));
    for (logical, field) in mapping.iter() {
        println!(
            "  {:<28} {:<36} {:<10}",
            logical,
            field.physical,
            format!("{:?}", field.kind)
        );
    }
    println!();
    Ok(())
}

fn cmd_request(
    config: Config,
    entity: EntityType,
    visibility: Visibility,
    request: &Path,
) -> anyhow::Result<()> {
    let request = read_request(request)?;
    let service = SearchService::new(config, Arc::new(StaticIndex::default()));
    let prepared = match service.prepare(entity, visibility, &request) {
        Ok(prepared) => prepared,
        Err(e) => return report(e),
    };
    print_json(&serde_json::json!({
        "core": prepared.query.core,
        "params": prepared.query.to_params(),
    }))
}

fn cmd_search(
    config: Config,
    entity: EntityType,
    visibility: Visibility,
    request: &Path,
    response: Option<&Path>,
) -> anyhow::Result<()> {
    let request = read_request(request)?;
    let index: Arc<dyn IndexClient> = match response {
        Some(path) => Arc::new(StaticIndex::from_file(path)?),
        None => Arc::new(SolrHttpClient::new(&config.solr)?),
    };
    let service = SearchService::new(config, index);
    let cancel = CancellationToken::new();

    let printed = match entity {
        EntityType::Data => service
            .search_data(visibility, &request, &cancel)
            .map(|result| print_json(&result)),
        EntityType::DocumentDescriptor => service
            .search_documents(visibility, &request, &cancel)
            .map(|result| print_json(&result)),
    };
    match printed {
        Ok(printed) => printed,
        Err(e) if e.is_client_error() => report(e),
        Err(e) => Err(e.into()),
    }
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "solrfacade", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}
