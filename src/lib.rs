//! Swagger Gen - OpenAPI 3 documents from route descriptors and type contracts.
//!
//! The generator turns a set of route descriptors into one OpenAPI document:
//! routes are filtered and ordered, grouped by normalized path, and turned into
//! operations. Every type a route mentions is converted to a JSON schema by a
//! [`schema_registry::SchemaRegistry`], which places shared definitions in
//! `components.schemas` and hands out `$ref` nodes, handling self- and
//! mutually-referencing types.
//!
//! # Architecture
//!
//! 1. [`contract`] - Type identities and their serialization contracts
//! 2. [`schema_registry`] - Contracts to schemas, with the shared definitions table
//! 3. [`operation_builder`] - One route to one operation
//! 4. [`generator`] - Routes to a complete document
//! 5. [`annotations`] - Operation filters driven by route annotations
//! 6. [`type_resolver`] - Contracts discovered from Rust type declarations
//! 7. [`manifest`] - Routes and options loaded from YAML or JSON
//! 8. [`serializer`] - Document to YAML or JSON text
//!
//! # Example Usage
//!
//! ```no_run
//! use swagger_gen::{
//!     manifest::Manifest,
//!     parser::AstParser,
//!     scanner::FileScanner,
//!     serializer::serialize_yaml,
//!     type_resolver::TypeResolver,
//! };
//! use std::path::{Path, PathBuf};
//! use std::sync::Arc;
//!
//! let scan_result = FileScanner::new(PathBuf::from("./src/models")).scan().unwrap();
//! let parsed_files: Vec<_> = AstParser::parse_files(&scan_result.rust_files)
//!     .into_iter()
//!     .filter_map(Result::ok)
//!     .collect();
//! let catalog = TypeResolver::new(parsed_files).build_catalog();
//!
//! let manifest = Manifest::load(Path::new("routes.yaml")).unwrap();
//! let document = manifest.generate(Arc::new(catalog), "v1").unwrap();
//! println!("{}", serialize_yaml(&document).unwrap());
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module.

pub mod annotations;
pub mod api_description;
pub mod cli;
pub mod contract;
pub mod error;
pub mod generator;
pub mod manifest;
pub mod openapi;
pub mod operation_builder;
pub mod parser;
pub mod scanner;
pub mod schema;
pub mod schema_id;
pub mod schema_registry;
pub mod serializer;
pub mod type_resolver;
