//! Route manifest: documents, route descriptors and generator options in one
//! YAML or JSON file.
//!
//! ```yaml
//! documents:
//!   v1: { title: Shop API, version: "1.0" }
//! routes:
//!   - httpMethod: GET
//!     relativePath: "carts/{id:int}"
//!     controllerName: Carts
//!     actionName: Get
//!     parameterDescriptions:
//!       - { name: id, source: path, type: i32 }
//!     supportedResponseTypes:
//!       - { statusCode: 200, type: Cart, mediaTypes: [application/json] }
//! options:
//!   describeAllEnumsAsStrings: true
//! ```

use crate::annotations::{
    AnnotationsOperationFilter, ResponseAnnotationsFilter, SecurityRequirementsOperationFilter,
    DEFAULT_SECURITY_SCHEME,
};
use crate::api_description::ApiDescription;
use crate::contract::{ContractResolver, StringEnumConverter};
use crate::error::{Error, Result};
use crate::generator::{SortKeySelector, SwaggerGenerator, SwaggerGeneratorSettings};
use crate::openapi::{Document, Info, SecurityRequirement, SecurityScheme};
use crate::operation_builder::OperationFilter;
use crate::schema_registry::{SchemaRegistrySettings, SerializerSettings};
use indexmap::IndexMap;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Everything needed to generate documents without a running host
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Document name -> info block, in declaration order
    pub documents: IndexMap<String, Info>,
    #[serde(default)]
    pub routes: Vec<ApiDescription>,
    #[serde(default)]
    pub options: ManifestOptions,
}

/// Route ordering applied before grouping by path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    RelativePath,
    ControllerName,
    /// `Controller.Action`
    DisplayName,
}

/// Generator options recognized in a manifest
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ManifestOptions {
    pub describe_all_enums_as_strings: bool,
    pub describe_string_enums_in_camel_case: bool,
    pub use_referenced_definitions_for_enums: bool,
    pub describe_all_parameters_in_camel_case: bool,
    /// Write every enum by name, as a global string converter would
    pub serialize_enums_as_strings: bool,
    pub ignore_obsolete_actions: bool,
    pub ignore_obsolete_properties: bool,
    pub sort_key: Option<SortKey>,
    /// Keep the first of several routes sharing method and path
    pub resolve_conflicts_with_first: bool,
    pub security_definitions: IndexMap<String, SecurityScheme>,
    pub security_requirements: Vec<SecurityRequirement>,
    /// Scheme named in the requirements added to authorized routes
    pub security_scheme: Option<String>,
    pub schemes: Option<Vec<String>>,
    pub host: Option<String>,
    pub base_path: Option<String>,
}

impl Manifest {
    /// Load a manifest; `.json` files are read as JSON, anything else as YAML
    pub fn load(path: &Path) -> Result<Manifest> {
        debug!("Loading manifest: {}", path.display());
        let content = fs::read_to_string(path)?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let manifest = if is_json {
            Self::from_json(&content)
        } else {
            Self::from_yaml(&content)
        }
        .map_err(|e| Error::Parse {
            file: path.to_path_buf(),
            message: e.to_string(),
        })?;

        info!(
            "Loaded manifest with {} documents and {} routes",
            manifest.documents.len(),
            manifest.routes.len()
        );
        Ok(manifest)
    }

    pub fn from_yaml(content: &str) -> Result<Manifest> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn from_json(content: &str) -> Result<Manifest> {
        Ok(serde_json::from_str(content)?)
    }

    /// The first declared document
    pub fn default_document(&self) -> Option<&str> {
        self.documents.keys().next().map(String::as_str)
    }

    pub fn serializer_settings(&self) -> SerializerSettings {
        SerializerSettings {
            string_enum_converter: self
                .options
                .serialize_enums_as_strings
                .then(StringEnumConverter::default),
        }
    }

    pub fn schema_registry_settings(&self) -> SchemaRegistrySettings {
        SchemaRegistrySettings {
            describe_all_enums_as_strings: self.options.describe_all_enums_as_strings,
            describe_string_enums_in_camel_case: self.options.describe_string_enums_in_camel_case,
            use_referenced_definitions_for_enums: self.options.use_referenced_definitions_for_enums,
            ignore_obsolete_properties: self.options.ignore_obsolete_properties,
            ..Default::default()
        }
    }

    /// Generator settings with the annotation filters installed
    pub fn generator_settings(&self) -> SwaggerGeneratorSettings {
        let options = &self.options;
        let mut settings = SwaggerGeneratorSettings {
            swagger_docs: self.documents.clone(),
            ignore_obsolete_actions: options.ignore_obsolete_actions,
            describe_all_parameters_in_camel_case: options.describe_all_parameters_in_camel_case,
            security_definitions: options.security_definitions.clone(),
            security_requirements: options.security_requirements.clone(),
            ..Default::default()
        };

        settings.sort_key_selector = options.sort_key.map(|key| -> SortKeySelector {
            Arc::new(move |api: &ApiDescription| match key {
                SortKey::RelativePath => api.relative_path.clone(),
                SortKey::ControllerName => api.controller_name.clone(),
                SortKey::DisplayName => api.display_name(),
            })
        });
        if options.resolve_conflicts_with_first {
            settings.conflicting_actions_resolver =
                Some(Arc::new(|apis: &[&ApiDescription]| apis[0].clone()));
        }

        let scheme = options
            .security_scheme
            .clone()
            .unwrap_or_else(|| DEFAULT_SECURITY_SCHEME.to_string());
        let annotations: Arc<dyn OperationFilter> = Arc::new(AnnotationsOperationFilter::new());
        let responses: Arc<dyn OperationFilter> = Arc::new(ResponseAnnotationsFilter);
        let security: Arc<dyn OperationFilter> = Arc::new(SecurityRequirementsOperationFilter::new(scheme));
        settings.operation_filters = vec![annotations, responses, security];

        settings
    }

    /// A generator over this manifest's routes
    pub fn generator(
        &self,
        contract_resolver: Arc<dyn ContractResolver>,
    ) -> SwaggerGenerator<Vec<ApiDescription>> {
        SwaggerGenerator::new(
            self.routes.clone(),
            contract_resolver,
            self.serializer_settings(),
            self.schema_registry_settings(),
            self.generator_settings(),
        )
    }

    /// Generate the named document using the manifest's host, base path and schemes
    pub fn generate(&self, contract_resolver: Arc<dyn ContractResolver>, document_name: &str) -> Result<Document> {
        self.generator(contract_resolver).get_swagger(
            document_name,
            self.options.host.as_deref(),
            self.options.base_path.as_deref(),
            self.options.schemes.as_deref(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_description::{Annotation, BindingSource};
    use crate::contract::{ContractCatalog, TypeRef};
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::TempDir;

    const MANIFEST: &str = r#"
documents:
  v1:
    title: Shop API
    version: "1.0"
routes:
  - httpMethod: get
    relativePath: "carts/{id:int}"
    controllerName: Carts
    actionName: Get
    parameterDescriptions:
      - name: id
        source: path
        type: i32
    supportedResponseTypes:
      - statusCode: 200
        type: Option<Cart>
        mediaTypes: [application/json]
    actionAnnotations:
      - kind: authorize
        policy: readCarts
options:
  describeAllEnumsAsStrings: true
  sortKey: relativePath
  schemes: [https]
  host: shop.example.com
  basePath: /api
"#;

    #[test]
    fn test_parse_yaml_manifest() {
        let manifest = Manifest::from_yaml(MANIFEST).unwrap();

        assert_eq!(manifest.default_document(), Some("v1"));
        assert_eq!(manifest.documents["v1"].title, "Shop API");

        let route = &manifest.routes[0];
        assert_eq!(route.http_method.as_deref(), Some("get"));
        assert_eq!(route.parameter_descriptions[0].source, BindingSource::Path);
        assert_eq!(route.parameter_descriptions[0].type_ref, Some(TypeRef::new("i32")));
        assert_eq!(
            route.supported_response_types[0].type_ref,
            Some(TypeRef::option(TypeRef::new("Cart")))
        );
        assert_eq!(
            route.action_annotations,
            vec![Annotation::Authorize {
                policy: Some("readCarts".to_string())
            }]
        );
        assert!(manifest.options.describe_all_enums_as_strings);
        assert_eq!(manifest.options.sort_key, Some(SortKey::RelativePath));
    }

    #[test]
    fn test_invalid_type_expression_is_rejected() {
        let manifest = r#"
documents: {}
routes:
  - relativePath: items
    parameterDescriptions:
      - name: filter
        type: "Vec<"
"#;
        let err = Manifest::from_yaml(manifest).unwrap_err();
        assert!(err.to_string().contains("Vec<"));
    }

    #[test]
    fn test_load_json_by_extension() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("routes.json");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(
            br#"{"documents": {"v2": {"title": "T", "version": "2"}}, "routes": [{"relativePath": "ping", "httpMethod": "GET"}]}"#,
        )
        .unwrap();

        let manifest = Manifest::load(&path).unwrap();
        assert_eq!(manifest.default_document(), Some("v2"));
        assert_eq!(manifest.routes.len(), 1);
    }

    #[test]
    fn test_load_reports_file_on_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.yaml");
        fs::write(&path, "documents: [not, a, map]").unwrap();

        let err = Manifest::load(&path).unwrap_err();
        assert!(matches!(err, Error::Parse { ref file, .. } if *file == path));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Manifest::load(Path::new("/nonexistent/manifest.yaml")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_generate_uses_manifest_options() {
        let manifest = Manifest::from_yaml(MANIFEST).unwrap();
        let catalog = ContractCatalog::new();

        let document = manifest.generate(Arc::new(catalog), "v1").unwrap();

        assert_eq!(document.servers[0].url, "https://shop.example.com/api");
        let operation = document.paths["/carts/{id}"].get.as_ref().unwrap();
        assert_eq!(operation.operation_id.as_deref(), Some("CartsByIdGet"));
        let codes: Vec<_> = operation.responses.keys().cloned().collect();
        assert_eq!(codes, vec!["200", "401", "403"]);
        assert_eq!(
            operation.security.as_ref().unwrap()[0]["oauth2"],
            vec!["readCarts".to_string()]
        );
    }

    #[test]
    fn test_conflict_resolution_option() {
        let mut manifest = Manifest::from_yaml(MANIFEST).unwrap();
        let mut duplicate = manifest.routes[0].clone();
        duplicate.action_name = "GetAgain".to_string();
        manifest.routes.push(duplicate);

        let catalog: Arc<dyn ContractResolver> = Arc::new(ContractCatalog::new());
        let err = manifest.generate(Arc::clone(&catalog), "v1").unwrap_err();
        assert!(matches!(err, Error::ConflictingActions { .. }));

        manifest.options.resolve_conflicts_with_first = true;
        let document = manifest.generate(catalog, "v1").unwrap();
        assert_eq!(document.paths.len(), 1);
    }
}
