//! Document assembly: route descriptors in, one OpenAPI document out.

use crate::api_description::{ApiDescription, ApiDescriptionsProvider};
use crate::contract::ContractResolver;
use crate::error::{Error, Result};
use crate::openapi::{
    Components, Document, HttpMethod, Info, PathItem, SecurityRequirement, SecurityScheme, Server,
    OPENAPI_VERSION,
};
use crate::operation_builder::{create_operation, normalize_path, OperationFilter};
use crate::schema_registry::{SchemaRegistry, SchemaRegistrySettings, SerializerSettings};
use indexmap::IndexMap;
use log::{debug, info, warn};
use std::collections::HashSet;
use std::sync::Arc;

/// Decides whether a route belongs to the named document
pub type DocInclusionPredicate = Arc<dyn Fn(&str, &ApiDescription) -> bool + Send + Sync>;

/// Key used to order routes before grouping
pub type SortKeySelector = Arc<dyn Fn(&ApiDescription) -> String + Send + Sync>;

/// Picks (or synthesizes) one route out of a set sharing method and path
pub type ConflictingActionsResolver = Arc<dyn Fn(&[&ApiDescription]) -> ApiDescription + Send + Sync>;

/// Tag assigned to a route's operation
pub type TagSelector = Arc<dyn Fn(&ApiDescription) -> String + Send + Sync>;

/// Post-processing hook applied to the assembled document
pub trait DocumentFilter: Send + Sync {
    fn apply(&self, document: &mut Document, context: &mut DocumentFilterContext<'_>) -> Result<()>;
}

/// What a [`DocumentFilter`] sees besides the document itself
pub struct DocumentFilterContext<'a> {
    /// Routes included in this document, in sorted order
    pub api_descriptions: &'a [&'a ApiDescription],
    pub schema_registry: &'a mut SchemaRegistry,
}

/// Document-level generation options
#[derive(Clone)]
pub struct SwaggerGeneratorSettings {
    /// Document name -> info block
    pub swagger_docs: IndexMap<String, Info>,
    pub doc_inclusion_predicate: DocInclusionPredicate,
    pub ignore_obsolete_actions: bool,
    /// `None` keeps the provider's order
    pub sort_key_selector: Option<SortKeySelector>,
    pub conflicting_actions_resolver: Option<ConflictingActionsResolver>,
    pub tag_selector: TagSelector,
    pub describe_all_parameters_in_camel_case: bool,
    pub security_definitions: IndexMap<String, SecurityScheme>,
    pub security_requirements: Vec<SecurityRequirement>,
    pub operation_filters: Vec<Arc<dyn OperationFilter>>,
    pub document_filters: Vec<Arc<dyn DocumentFilter>>,
}

impl Default for SwaggerGeneratorSettings {
    fn default() -> Self {
        Self {
            swagger_docs: IndexMap::new(),
            doc_inclusion_predicate: Arc::new(|document_name: &str, api_description: &ApiDescription| {
                api_description
                    .group_name
                    .as_deref()
                    .map_or(true, |group| group == document_name)
            }),
            ignore_obsolete_actions: false,
            sort_key_selector: None,
            conflicting_actions_resolver: None,
            tag_selector: Arc::new(|api_description: &ApiDescription| {
                api_description.controller_name.clone()
            }),
            describe_all_parameters_in_camel_case: false,
            security_definitions: IndexMap::new(),
            security_requirements: Vec::new(),
            operation_filters: Vec::new(),
            document_filters: Vec::new(),
        }
    }
}

/// Swagger generator - produces one document per call
pub struct SwaggerGenerator<P> {
    api_descriptions_provider: P,
    contract_resolver: Arc<dyn ContractResolver>,
    serializer_settings: SerializerSettings,
    schema_registry_settings: Arc<SchemaRegistrySettings>,
    settings: SwaggerGeneratorSettings,
}

impl<P: ApiDescriptionsProvider> SwaggerGenerator<P> {
    pub fn new(
        api_descriptions_provider: P,
        contract_resolver: Arc<dyn ContractResolver>,
        serializer_settings: SerializerSettings,
        schema_registry_settings: SchemaRegistrySettings,
        settings: SwaggerGeneratorSettings,
    ) -> Self {
        debug!("Initializing SwaggerGenerator");
        Self {
            api_descriptions_provider,
            contract_resolver,
            serializer_settings,
            schema_registry_settings: Arc::new(schema_registry_settings),
            settings,
        }
    }

    pub fn settings(&self) -> &SwaggerGeneratorSettings {
        &self.settings
    }

    /// Generate the named document.
    ///
    /// Servers are only produced when `schemes` is given. Each call uses a
    /// fresh schema registry, so nothing is shared between documents.
    pub fn get_swagger(
        &self,
        document_name: &str,
        host: Option<&str>,
        base_path: Option<&str>,
        schemes: Option<&[String]>,
    ) -> Result<Document> {
        let info = self
            .settings
            .swagger_docs
            .get(document_name)
            .ok_or_else(|| Error::UnknownDocument(document_name.to_string()))?;

        info!("Generating document: {}", document_name);

        let mut schema_registry = SchemaRegistry::new(
            Arc::clone(&self.contract_resolver),
            self.serializer_settings.clone(),
            Arc::clone(&self.schema_registry_settings),
        );

        let mut api_descriptions: Vec<&ApiDescription> = self
            .api_descriptions_provider
            .api_descriptions()
            .iter()
            .filter(|&api| (self.settings.doc_inclusion_predicate)(document_name, api))
            .filter(|&api| !self.settings.ignore_obsolete_actions || !api.is_obsolete())
            .collect();
        if let Some(sort_key) = &self.settings.sort_key_selector {
            api_descriptions.sort_by_cached_key(|api| sort_key(*api));
        }
        debug!("{} routes included in {}", api_descriptions.len(), document_name);

        let mut groups: IndexMap<String, Vec<&ApiDescription>> = IndexMap::new();
        for &api in &api_descriptions {
            groups
                .entry(normalize_path(&api.relative_path))
                .or_default()
                .push(api);
        }

        let mut paths = IndexMap::new();
        for (path, group) in groups {
            let path_item = self.create_path_item(&group, &mut schema_registry)?;
            paths.insert(path, path_item);
        }

        let security_schemes = if self.settings.security_definitions.is_empty() {
            None
        } else {
            Some(self.settings.security_definitions.clone())
        };
        let components = Components {
            schemas: schema_registry.definitions(),
            security_schemes,
        };

        let mut document = Document {
            openapi: OPENAPI_VERSION.to_string(),
            info: info.clone(),
            servers: schemes
                .map(|schemes| Server::for_schemes(schemes, host, base_path))
                .unwrap_or_default(),
            paths,
            components: if components.is_empty() { None } else { Some(components) },
            security: if self.settings.security_requirements.is_empty() {
                None
            } else {
                Some(self.settings.security_requirements.clone())
            },
            extensions: IndexMap::new(),
        };

        let registered_before_filters: HashSet<String> =
            schema_registry.definitions().into_keys().collect();
        for filter in &self.settings.document_filters {
            let mut context = DocumentFilterContext {
                api_descriptions: &api_descriptions,
                schema_registry: &mut schema_registry,
            };
            filter.apply(&mut document, &mut context)?;
        }
        merge_late_definitions(&mut document, &schema_registry, &registered_before_filters);

        for id in document.dangling_references() {
            warn!("Schema reference {} has no entry in components.schemas", id);
        }

        info!("Generated {} paths for {}", document.paths.len(), document_name);
        Ok(document)
    }

    fn create_path_item(
        &self,
        group: &[&ApiDescription],
        schema_registry: &mut SchemaRegistry,
    ) -> Result<PathItem> {
        let mut by_method: IndexMap<Option<String>, Vec<&ApiDescription>> = IndexMap::new();
        for &api in group {
            by_method
                .entry(api.http_method.as_ref().map(|m| m.to_uppercase()))
                .or_default()
                .push(api);
        }

        let mut path_item = PathItem::default();
        for (http_method, apis) in by_method {
            let Some(http_method) = http_method else {
                return Err(Error::AmbiguousHttpMethod {
                    action: apis[0].display_name(),
                });
            };

            let resolved;
            let api = match (apis.as_slice(), &self.settings.conflicting_actions_resolver) {
                ([single], _) => *single,
                (conflicting, Some(resolver)) => {
                    debug!("Resolving {} actions for {} {}", conflicting.len(), http_method, apis[0].relative_path);
                    resolved = resolver(conflicting);
                    &resolved
                }
                (conflicting, None) => {
                    return Err(Error::ConflictingActions {
                        method: http_method,
                        path: conflicting[0].relative_path_sans_query_string().to_string(),
                        actions: conflicting.iter().map(|a| a.display_name()).collect(),
                    });
                }
            };

            let Some(method) = HttpMethod::parse(&http_method) else {
                warn!("Skipping {} with unsupported HTTP method {}", api.display_name(), http_method);
                continue;
            };
            let operation = create_operation(api, schema_registry, &self.settings)?;
            path_item.set_operation(method, operation);
        }

        Ok(path_item)
    }
}

/// Add definitions that document filters registered after the components snapshot
fn merge_late_definitions(
    document: &mut Document,
    schema_registry: &SchemaRegistry,
    registered_before_filters: &HashSet<String>,
) {
    let late: Vec<_> = schema_registry
        .definitions()
        .into_iter()
        .filter(|(id, _)| !registered_before_filters.contains(id))
        .collect();
    if late.is_empty() {
        return;
    }

    debug!("Adding {} definitions registered by document filters", late.len());
    let components = document.components.get_or_insert_with(Components::default);
    for (id, schema) in late {
        components.schemas.entry(id).or_insert(schema);
    }
}
