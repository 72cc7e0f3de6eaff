mod catalog;
mod config;
mod controller;
mod error;
mod record;
mod routes;
mod storage;
mod utils;


#[macro_use]
extern crate tracing;

#[macro_use]
extern crate serde_json;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use clap::Parser;
use mimalloc::MiMalloc;
use poem::listener::TcpListener;
use poem::Server;
use tracing_subscriber::EnvFilter;

use crate::catalog::json_file::JsonFileStore;
use crate::controller::CatalogService;

pub use crate::storage::StorageBackend;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Debug, Parser)]
#[clap(author, version, about)]
pub struct ServerConfig {
    #[clap(long, env, default_value = "127.0.0.1")]
    /// The binding host address of the server.
    host: String,

    #[clap(long, env, default_value_t = 3000)]
    /// The port to bind the server to.
    port: u16,

    #[clap(long, env)]
    /// The external URL that would be used to access the server if applicable.
    ///
    /// This only affects the documentation.
    external_host: Option<String>,

    #[clap(long, env)]
    /// The path to serve the API documentation at, e.g. `/docs`.
    ///
    /// The documentation is disabled if this is not given.
    docs_url: Option<String>,

    #[clap(long, env, default_value_t = LogLevel::Info, arg_enum)]
    /// The log level filter, `RUST_LOG` takes priority if set.
    log_level: LogLevel,

    #[clap(long, env)]
    /// The YAML config file, the default config is used if not given.
    config_file: Option<PathBuf>,
}

#[derive(Debug, Copy, Clone, clap::ArgEnum, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: ServerConfig = ServerConfig::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},poem=info", args.log_level)));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    config::init(args.config_file.as_deref()).await?;
    let cfg = config::config();

    let storage = cfg.backend.connect().await?;

    let records = JsonFileStore::new(cfg.catalog.path.clone());
    info!("Images data: {:?}", records.path());
    records
        .ensure_seeded(cfg.catalog.seed_records(storage.as_ref()))
        .await?;

    let catalog = Arc::new(CatalogService::new(Arc::new(records), storage));

    let bind: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let server_url = args
        .external_host
        .clone()
        .unwrap_or_else(|| format!("http://{}", bind));

    let app = routes::build_app(
        catalog,
        cfg.backend.serving_root(),
        cfg.backend.public_prefix(),
        &server_url,
        args.docs_url.as_deref(),
    );

    info!("Server running on http://{}", bind);
    info!("Uploads directory: {:?}", cfg.backend.serving_root());

    Server::new(TcpListener::bind(bind))
        .run(app)
        .await?;

    Ok(())
}
