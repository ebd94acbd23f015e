//! Tempora CLI
//!
//! Compiles geo-queries, normalizes entity locations, converts geometries
//! and writes rows through the batched insert path.

use std::io;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use tempora_kernel::Backend;
use tempora_kernel::config::{Config, parse_byte_size};
use tempora_kernel::db;
use tempora_kernel::geo::wkb::{ByteOrder, to_wkb_with_order};
use tempora_kernel::geo::wkt::{from_wkt, to_wkt_with_srid};
use tempora_kernel::geo::{Entity, GeoJson, GeoQuery, normalize_location};
use tempora_kernel::insert::{EntityWriter, Row, TableCache, row_size, to_insert_batches};

#[derive(Debug, Parser)]
#[command(name = "tempora", version, about = "Tempora kernel tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the SQL predicate for a geo-query.
    GeoQuery {
        /// Spatial relation, e.g. `intersects` or `near;maxDistance:1000`.
        #[arg(long)]
        georel: String,
        /// Shape type: point, line, polygon or box.
        #[arg(long)]
        geometry: String,
        /// Shape coordinates, `lat,lon` pairs separated by `;`.
        #[arg(long)]
        coords: String,
        /// Dialect to compile for; defaults to the configured backend.
        #[arg(long, value_enum)]
        backend: Option<Backend>,
        /// Print nothing instead of failing on malformed parameters.
        #[arg(long)]
        lenient: bool,
    },
    /// Read an entity from stdin and print it with a normalized location.
    Normalize,
    /// Read a geometry from stdin and print it in another encoding.
    Wkt {
        /// Input is WKT; print GeoJSON instead.
        #[arg(long)]
        reverse: bool,
        /// Print WKB hex instead of WKT.
        #[arg(long, conflicts_with = "reverse")]
        wkb: bool,
        /// With `--wkb`, use little-endian byte order.
        #[arg(long, requires = "wkb")]
        little_endian: bool,
        /// Prefix the WKT with `SRID=<n>;`.
        #[arg(long)]
        srid: Option<u32>,
        /// Round coordinates to this many decimals.
        #[arg(long)]
        decimals: Option<usize>,
    },
    /// Show how a JSON array of rows read from stdin would be batched.
    Batches {
        /// Maximum batch size, e.g. `10MB`; defaults to `INSERT_MAX_SIZE`.
        #[arg(long)]
        max_size: Option<String>,
    },
    /// Insert a JSON array of rows read from stdin.
    Insert {
        /// Target table.
        #[arg(long)]
        table: String,
        /// Column as `name:type`, in row order. Repeat for each column.
        #[arg(long = "column", required = true)]
        columns: Vec<String>,
        /// Tenant whose backend receives the rows.
        #[arg(long)]
        tenant: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing();

    let config = Config::from_env().context("failed to load configuration")?;
    let cli = Cli::parse();

    match cli.command {
        Command::GeoQuery {
            georel,
            geometry,
            coords,
            backend,
            lenient,
        } => {
            let params = (Some(georel.as_str()), Some(geometry.as_str()), Some(coords.as_str()));
            let query = if lenient {
                GeoQuery::parse_lenient(params.0, params.1, params.2)?
            } else {
                GeoQuery::parse(params.0, params.1, params.2)?
            };
            if let Some(query) = query {
                let backend = backend.unwrap_or_else(|| config.default_backend());
                println!("{}", backend.dialect().compile(&query));
            }
        }
        Command::Normalize => {
            let mut entity: Entity =
                serde_json::from_str(&read_stdin()?).context("stdin must hold a JSON object")?;
            normalize_location(Some(&mut entity));
            println!("{}", serde_json::to_string_pretty(&entity)?);
        }
        Command::Wkt {
            reverse,
            wkb,
            little_endian,
            srid,
            decimals,
        } => {
            let input = read_stdin()?;
            if reverse {
                let geometry = from_wkt(&input)?;
                println!("{}", geometry.to_value());
                return Ok(());
            }
            let doc: Value = serde_json::from_str(&input).context("stdin must hold GeoJSON")?;
            let geometry = GeoJson::from_value(&doc)?;
            if wkb {
                let order = if little_endian {
                    ByteOrder::LittleEndian
                } else {
                    ByteOrder::BigEndian
                };
                println!("{}", hex::encode_upper(to_wkb_with_order(&geometry, order)));
            } else {
                println!("{}", to_wkt_with_srid(&geometry, decimals, srid));
            }
        }
        Command::Batches { max_size } => {
            let max_size = match max_size {
                Some(raw) => match parse_byte_size(&raw) {
                    Some(size) => Some(size),
                    None => bail!("invalid size: {raw}"),
                },
                None => config.insert_max_size,
            };
            let rows = read_rows()?;
            let batches = to_insert_batches(rows, max_size);
            for (i, batch) in batches.iter().enumerate() {
                let bytes: u64 = batch.iter().map(row_size).sum();
                println!("batch {i}: {} rows, {bytes} bytes", batch.len());
            }
        }
        Command::Insert {
            table,
            columns,
            tenant,
        } => {
            let columns = columns
                .iter()
                .map(|spec| {
                    spec.split_once(':')
                        .with_context(|| format!("column must be name:type, got {spec}"))
                })
                .collect::<Result<Vec<_>>>()?;
            let rows = read_rows()?;

            let backend = config.backend_for(tenant.as_deref());
            let pool = db::create_pool(&config).await?;
            if !db::check_health(&pool).await {
                bail!("database is not answering queries");
            }
            info!(%backend, table = %table, "database connection established");

            let writer = EntityWriter::new(pool, backend, TableCache::new(), config.insert_max_size);
            let inserted = writer.insert(&table, &columns, rows).await?;
            println!("{inserted} rows inserted into {table}");
        }
    }

    Ok(())
}

fn read_stdin() -> Result<String> {
    io::read_to_string(io::stdin()).context("failed to read stdin")
}

fn read_rows() -> Result<Vec<Row>> {
    serde_json::from_str(&read_stdin()?).context("stdin must hold a JSON array of row arrays")
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}
