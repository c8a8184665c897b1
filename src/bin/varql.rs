//! varql: evaluate variable queries from the command line
//!
//! # Usage
//!
//! ```bash
//! # Query a JSON file registered as `state`
//! varql "SELECT title FROM state.movies WHERE rating > 4.0" --source state=state.json
//!
//! # Load database tables under `db`
//! varql "FROM db.movies WHERE status == active" --database-url sqlite://movies.db --table movies
//!
//! # Fill a prompt template
//! varql render prompt.txt --source state=state.json
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use colored::*;
use tracing_subscriber::EnvFilter;
use varql::config::load_source_file;
use varql::prelude::*;

#[derive(Parser)]
#[command(name = "varql")]
#[command(version)]
#[command(about = "Evaluate SELECT/FROM/WHERE expressions over runtime data", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
#[command(after_help = "EXAMPLES:
    varql 'FROM state.movies WHERE status == active' --source state=state.json
    varql 'FROM state.user.firstname + state.user.lastname' --format json
    varql explain 'SELECT title FROM state.movies WHERE rating > 4.0'")]
struct Cli {
    /// Queries to evaluate
    queries: Vec<String>,

    #[command(flatten)]
    sources: SourceArgs,

    /// Output format
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Args, Clone)]
struct SourceArgs {
    /// Register a data file as a source (name=path, .json or .toml)
    #[arg(short, long = "source", value_parser = parse_source_arg)]
    source: Vec<(String, PathBuf)>,

    /// Config file (defaults to <config dir>/varql/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Database connection URL
    #[arg(long, env = "VARQL_DATABASE_URL")]
    database_url: Option<String>,

    /// Tables to load from the database
    #[arg(short, long, value_delimiter = ',')]
    table: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and explain a query
    Explain {
        /// The query to explain
        query: String,
    },
    /// Show the operator reference
    Symbols,
    /// Render a prompt template, replacing expression placeholders
    Render {
        /// Template file
        file: PathBuf,

        #[command(flatten)]
        sources: SourceArgs,
    },
}

fn parse_source_arg(arg: &str) -> Result<(String, PathBuf), String> {
    match arg.split_once('=') {
        Some((name, path)) if !name.is_empty() && !path.is_empty() => {
            Ok((name.to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("expected name=path, got '{}'", arg)),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match &cli.command {
        Some(Commands::Explain { query }) => explain_query(query),
        Some(Commands::Symbols) => {
            show_symbols();
            Ok(())
        }
        Some(Commands::Render { file, sources }) => render_template(file, sources).await,
        None if cli.queries.is_empty() => {
            println!("{}", "varql".cyan().bold());
            println!();
            println!("Usage: varql <QUERY>... [OPTIONS]");
            println!();
            println!("Try: varql --help");
            Ok(())
        }
        None => run_queries(&cli).await,
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("varql=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Build the context from the config file, `--source` files and database
/// tables. Later registrations win.
async fn build_context(args: &SourceArgs) -> anyhow::Result<(Context, Config)> {
    let config = Config::load(args.config.as_deref())?;
    let mut builder = config.context_builder()?;

    for (name, path) in &args.source {
        let value = load_source_file(path)
            .with_context(|| format!("loading source '{}' from {}", name, path.display()))?;
        builder = builder.source(name.clone(), value);
    }

    let database_url = args.database_url.as_ref().or(config.database_url.as_ref());
    let tables = if args.table.is_empty() {
        &config.tables
    } else {
        &args.table
    };
    if let Some(url) = database_url {
        if tables.is_empty() {
            tracing::warn!("database URL given without tables; nothing loaded");
        } else {
            let loader = SqlLoader::connect(url).await?;
            let loaded = loader.load_tables(tables).await?;
            builder = builder.source(config.db_source.clone(), loaded);
        }
    }

    Ok((builder.build(), config))
}

async fn run_queries(cli: &Cli) -> anyhow::Result<()> {
    let (ctx, config) = build_context(&cli.sources).await?;
    let format = cli.format.or(config.format).unwrap_or_default();

    if cli.verbose {
        let names: Vec<&str> = ctx.names().collect();
        eprintln!("{} {}", "Sources:".dimmed(), names.join(", ").yellow());
    }

    let mut results = BTreeMap::new();
    for query in &cli.queries {
        let value = ctx.query(query)?;
        match format {
            OutputFormat::Table => {
                if cli.queries.len() > 1 {
                    println!("{}", query.yellow().bold());
                }
                format_table(&value);
            }
            OutputFormat::Json => {
                results.insert(query.clone(), value.to_json());
            }
        }
    }

    if format == OutputFormat::Json {
        let output = match results.len() {
            1 => results.into_values().next().unwrap_or_default(),
            _ => serde_json::Value::Object(results.into_iter().collect()),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    }
    Ok(())
}

fn format_table(value: &Value) {
    let Value::List(rows) = value else {
        println!("{}", value);
        return;
    };
    if rows.is_empty() {
        println!("{}", "(no results)".dimmed());
        return;
    }
    if rows.iter().any(|row| row.as_record().is_none()) {
        for row in rows {
            println!("{}", row);
        }
        println!();
        println!("{} item(s) returned", rows.len().to_string().cyan());
        return;
    }

    // Columns in order of first appearance
    let mut columns: Vec<String> = Vec::new();
    for row in rows {
        if let Some(record) = row.as_record() {
            for name in record.field_names() {
                if !columns.iter().any(|c| c == name) {
                    columns.push(name.to_string());
                }
            }
        }
    }

    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|c| {
                    row.as_record()
                        .and_then(|record| record.field(c))
                        .map(Value::to_text)
                        .unwrap_or_default()
                })
                .collect()
        })
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            cells
                .iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(c.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let header: Vec<String> = columns
        .iter()
        .zip(&widths)
        .map(|(c, w)| format!("{:width$}", c, width = *w))
        .collect();
    println!("{}", header.join(" │ ").white().bold());

    let sep: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
    println!("{}", sep.join("─┼─").dimmed());

    for row in &cells {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, w)| format!("{:width$}", cell, width = *w))
            .collect();
        println!("{}", line.join(" │ "));
    }

    println!();
    println!("{} row(s) returned", rows.len().to_string().cyan());
}

fn explain_query(query: &str) -> anyhow::Result<()> {
    println!("{}", "varql Query Explanation".cyan().bold());
    println!();
    println!("{} {}", "Query:".dimmed(), query.yellow());
    println!();

    let expr = varql::parse(query)?;

    println!("{}", "Parsed Structure:".green().bold());
    if expr.is_wildcard() {
        println!("  {} {}", "Fields:".dimmed(), "*".cyan());
    } else {
        println!("  {}", "Fields:".dimmed());
        for field in &expr.fields {
            println!("    • {}", field.to_string().white());
        }
    }

    println!("  {}", "Sources:".dimmed());
    for (i, source) in expr.sources.operands().iter().enumerate() {
        println!("    [{}] {}", i, source.to_string().white());
    }
    for link in expr.sources.links() {
        println!("    {} [{}] {} [{}]", "→".dimmed(), link.left, link.op.to_string().cyan(), link.right);
    }

    if let Some(conditions) = &expr.conditions {
        println!("  {}", "Conditions:".dimmed());
        for (i, cond) in conditions.operands().iter().enumerate() {
            println!(
                "    [{}] {} {} {}",
                i,
                cond.attribute.to_string().white(),
                cond.op.to_string().cyan(),
                cond.value.to_string().yellow()
            );
        }
        for link in conditions.links() {
            println!("    {} [{}] {} [{}]", "→".dimmed(), link.left, link.op.to_string().cyan(), link.right);
        }
    }

    println!();
    println!("{}", "Canonical Form:".green().bold());
    println!("  {}", expr.to_string().white());
    Ok(())
}

fn show_symbols() {
    println!("{}", "varql Operator Reference".cyan().bold());
    println!("{}", "Earlier rows win when several symbols occur in one token.".dimmed());
    println!();

    println!(
        "{:14} {:8} {}",
        "Symbol".white().bold(),
        "Clause".white().bold(),
        "Function".white().bold()
    );
    println!("{}", "─".repeat(60).dimmed());

    let rows = Combination::ORDER
        .iter()
        .map(|op| (op.symbol(), "FROM", describe_combination(*op)))
        .chain(
            Comparison::ORDER
                .iter()
                .map(|op| (op.symbol(), "WHERE", describe_comparison(*op))),
        )
        .chain(
            Logical::ORDER
                .iter()
                .map(|op| (op.symbol(), "WHERE", describe_logical(*op))),
        );

    for (symbol, clause, function) in rows {
        println!(
            "{:14} {:8} {}",
            symbol.cyan().bold(),
            clause.yellow(),
            function.white()
        );
    }
}

fn describe_combination(op: Combination) -> &'static str {
    match op {
        Combination::Add => "Add numbers, concatenate lists, join text",
        Combination::Sub => "Subtract",
        Combination::Mul => "Multiply",
        Combination::Div => "Divide (always a float)",
    }
}

fn describe_comparison(op: Comparison) -> &'static str {
    match op {
        Comparison::Eq => "Equal",
        Comparison::Ne => "Not equal",
        Comparison::Gt => "Greater than",
        Comparison::Lt => "Less than",
        Comparison::Gte => "Greater or equal",
        Comparison::Lte => "Less or equal",
        Comparison::Contains => "Substring or element, case-insensitive",
        Comparison::NotContains => "Negated CONTAINS",
    }
}

fn describe_logical(op: Logical) -> &'static str {
    match op {
        Logical::And => "Both masks",
        Logical::Or => "Either mask",
    }
}

async fn render_template(file: &Path, sources: &SourceArgs) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("reading template {}", file.display()))?;
    let template = Template::parse(&text)?;
    let (ctx, _) = build_context(sources).await?;
    print!("{}", template.render(&ctx)?);
    Ok(())
}
