use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::Arc;

/// Swagger Gen - Generate OpenAPI documents from a route manifest and Rust type declarations
#[derive(Parser, Debug)]
#[command(name = "swagger-gen")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Route manifest (YAML, or JSON with a .json extension)
    #[arg(value_name = "MANIFEST")]
    pub manifest_path: PathBuf,

    /// Directory of Rust sources declaring the types the routes mention
    #[arg(short = 't', long = "types", value_name = "DIR")]
    pub types_path: Option<PathBuf>,

    /// Document to generate (defaults to the first one in the manifest)
    #[arg(short = 'd', long = "document", value_name = "NAME")]
    pub document: Option<String>,

    /// Output format (yaml or json)
    #[arg(short = 'f', long = "format", value_enum, default_value = "yaml")]
    pub output_format: OutputFormat,

    /// Output file path (if not specified, outputs to stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// YAML format
    Yaml,
    /// JSON format
    Json,
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.manifest_path.is_file() {
        anyhow::bail!("Manifest file does not exist: {}", args.manifest_path.display());
    }

    if let Some(types_path) = &args.types_path {
        if !types_path.is_dir() {
            anyhow::bail!("Types path is not a directory: {}", types_path.display());
        }
    }

    info!("Manifest: {}", args.manifest_path.display());
    info!("Output format: {:?}", args.output_format);
    match &args.output_path {
        Some(output) => info!("Output file: {}", output.display()),
        None => info!("Output: stdout"),
    }

    Ok(args)
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    use crate::contract::ContractCatalog;
    use crate::manifest::Manifest;
    use crate::parser::{AstParser, ParsedFile};
    use crate::scanner::FileScanner;
    use crate::serializer::{serialize_json, serialize_yaml, write_to_file};
    use crate::type_resolver::TypeResolver;

    // Step 1: Load the route manifest
    info!("Loading manifest...");
    let manifest = Manifest::load(&args.manifest_path)
        .with_context(|| format!("Failed to load manifest: {}", args.manifest_path.display()))?;

    // Step 2: Build type contracts from source declarations
    let mut files_scanned = 0;
    let catalog = match &args.types_path {
        Some(types_path) => {
            info!("Scanning type declarations in {}...", types_path.display());
            let scan_result = FileScanner::new(types_path.clone()).scan()?;
            files_scanned = scan_result.rust_files.len();
            for warning in &scan_result.warnings {
                warn!("{}", warning);
            }

            let parsed_files: Vec<ParsedFile> = AstParser::parse_files(&scan_result.rust_files)
                .into_iter()
                .filter_map(|r| match r {
                    Ok(parsed) => Some(parsed),
                    Err(e) => {
                        debug!("Skipping file due to parse error: {}", e);
                        None
                    }
                })
                .collect();
            info!("Parsed {} of {} files", parsed_files.len(), files_scanned);

            TypeResolver::new(parsed_files).build_catalog()
        }
        None => {
            info!("No types directory given, declared types will be described as objects");
            ContractCatalog::new()
        }
    };
    info!("Resolved {} type declarations", catalog.len());

    // Step 3: Pick the document
    let document_name = match args.document.as_deref().or(manifest.default_document()) {
        Some(name) => name.to_string(),
        None => anyhow::bail!("The manifest declares no documents"),
    };

    // Step 4: Generate
    info!("Generating document {}...", document_name);
    let document = manifest
        .generate(Arc::new(catalog), &document_name)
        .with_context(|| format!("Failed to generate document {}", document_name))?;

    // Step 5: Serialize to requested format
    info!("Serializing to {:?} format...", args.output_format);
    let content = match args.output_format {
        OutputFormat::Yaml => serialize_yaml(&document)?,
        OutputFormat::Json => serialize_json(&document)?,
    };

    // Step 6: Output to file or stdout
    if let Some(output_path) = &args.output_path {
        info!("Writing output to: {}", output_path.display());
        write_to_file(&content, output_path)?;
    } else {
        println!("{}", content);
    }

    info!("Generation complete!");
    info!("Summary:");
    info!("  - Files scanned: {}", files_scanned);
    info!("  - Routes in manifest: {}", manifest.routes.len());
    info!("  - Paths generated: {}", document.paths.len());
    info!(
        "  - Schemas generated: {}",
        document.components.as_ref().map_or(0, |c| c.schemas.len())
    );

    Ok(())
}
