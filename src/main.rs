//! Swagger Gen - command-line tool for generating OpenAPI documents.
//!
//! # Usage
//!
//! ```bash
//! swagger-gen [OPTIONS] <MANIFEST>
//! ```
//!
//! # Examples
//!
//! Generate YAML for the first document in the manifest:
//! ```bash
//! swagger-gen routes.yaml --types ./src/models -o openapi.yaml
//! ```
//!
//! Generate JSON for a named document:
//! ```bash
//! swagger-gen routes.yaml --types ./src/models -d v2 -f json -o v2.json
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use swagger_gen::cli;

fn main() -> Result<()> {
    let args = cli::CliArgs::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("Swagger Gen starting...");

    let args = cli::parse_args_from_parsed(args)?;
    cli::run(args)?;

    info!("OpenAPI document generation completed successfully");

    Ok(())
}
