use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;
use log::{info, LevelFilter};
use schemadoc::errors::DbError;
use schemadoc::models::{connections::ConnectionConfig, dump::SchemaDump};
use schemadoc::output::{write_document, write_split};

#[derive(clap::Parser)]
#[command(author, version, about = "Render database schema documentation as reStructuredText")]
struct Args {
    /// YAML connection configuration
    config: Option<PathBuf>,

    /// Write the document to a file instead of stdout
    #[arg(short, long, conflicts_with = "split")]
    output: Option<PathBuf>,

    /// Write index.rst plus one document per table into this directory
    #[arg(long)]
    split: Option<PathBuf>,

    /// Also save the schema dump as YAML
    #[arg(long)]
    dump: Option<PathBuf>,

    /// Render a previously saved dump instead of connecting
    #[arg(long, conflicts_with = "config")]
    from_dump: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "RUST_LOG")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    env_logger::Builder::new()
        .filter_level(
            args.log_level
                .as_deref()
                .and_then(|l| LevelFilter::from_str(l).ok())
                .unwrap_or(LevelFilter::Warn),
        )
        .init();

    let dump = match (&args.from_dump, &args.config) {
        (Some(path), _) => SchemaDump::from_yaml(&fs::read_to_string(path)?)?,
        (None, Some(path)) => {
            let config = ConnectionConfig::load(path)?.with_env_override()?;
            schemadoc::dump_database(&config).await?
        }
        (None, None) => {
            let message = "a config file or --from-dump is required".to_string();
            return Err(DbError::Config(message).into());
        }
    };

    if let Some(path) = &args.dump {
        fs::write(path, dump.to_yaml()?)?;
        info!("saved dump to {}", path.display());
    }

    match (&args.split, &args.output) {
        (Some(dir), _) => write_split(&dump, dir)?,
        (None, Some(path)) => write_document(&dump, BufWriter::new(File::create(path)?))?,
        (None, None) => write_document(&dump, io::stdout().lock())?,
    }

    Ok(())
}
