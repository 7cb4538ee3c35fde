//! Operation filters driven by route annotations.

use crate::api_description::{is_void_type, Annotation};
use crate::error::{Error, Result};
use crate::openapi::{MediaType, Operation, Response, SecurityRequirement, Server};
use crate::operation_builder::{description_for_status, OperationFilter, OperationFilterContext};
use indexmap::IndexMap;
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;

/// Applies `Operation` annotations and runs filters named by `OperationFilter` annotations
#[derive(Default)]
pub struct AnnotationsOperationFilter {
    named_filters: HashMap<String, Arc<dyn OperationFilter>>,
}

impl AnnotationsOperationFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a filter that `OperationFilter { name }` annotations can refer to
    pub fn with_filter(mut self, name: impl Into<String>, filter: Arc<dyn OperationFilter>) -> Self {
        self.named_filters.insert(name.into(), filter);
        self
    }

    fn apply_operation_annotation(operation: &mut Operation, context: &OperationFilterContext<'_>) {
        let Some((operation_id, tags, schemes)) =
            context.api_description.action_annotations.iter().find_map(|a| match a {
                Annotation::Operation {
                    operation_id,
                    tags,
                    schemes,
                } => Some((operation_id, tags, schemes)),
                _ => None,
            })
        else {
            return;
        };

        if let Some(operation_id) = operation_id {
            operation.operation_id = Some(operation_id.clone());
        }
        if let Some(tags) = tags {
            operation.tags = tags.clone();
        }
        if let Some(schemes) = schemes {
            operation.servers = Some(Server::for_schemes(schemes, None, None));
        }
    }
}

impl OperationFilter for AnnotationsOperationFilter {
    fn apply(&self, operation: &mut Operation, context: &mut OperationFilterContext<'_>) -> Result<()> {
        Self::apply_operation_annotation(operation, context);

        let api_description = context.api_description;
        let names: Vec<&str> = api_description
            .annotations()
            .filter_map(|a| match a {
                Annotation::OperationFilter { name } => Some(name.as_str()),
                _ => None,
            })
            .collect();

        for name in names {
            let filter = self
                .named_filters
                .get(name)
                .ok_or_else(|| Error::Filter(format!("Unknown operation filter - {}", name)))?;
            debug!("Applying annotated operation filter {}", name);
            filter.apply(operation, context)?;
        }

        Ok(())
    }
}

/// Creates or updates responses from `Response` annotations
#[derive(Debug, Default)]
pub struct ResponseAnnotationsFilter;

impl OperationFilter for ResponseAnnotationsFilter {
    fn apply(&self, operation: &mut Operation, context: &mut OperationFilterContext<'_>) -> Result<()> {
        let api_description = context.api_description;

        for annotation in api_description.annotations() {
            let Annotation::Response {
                status_code,
                description,
                type_ref,
            } = annotation
            else {
                continue;
            };

            let key = status_code.to_string();
            let response = operation
                .responses
                .entry(key.clone())
                .or_insert_with(|| Response::new(description_for_status(&key)));

            if let Some(description) = description {
                response.description = description.clone();
            }

            let Some(ty) = type_ref.as_ref().filter(|ty| !is_void_type(ty)) else {
                continue;
            };
            let schema = context.schema_registry.get_or_register(ty)?;

            match &mut response.content {
                Some(content) => {
                    for media_type in content.values_mut() {
                        media_type.schema = Some(schema.clone());
                    }
                }
                None => {
                    let content: IndexMap<String, MediaType> = api_description
                        .response_media_types()
                        .into_iter()
                        .map(|media_type| {
                            (
                                media_type.to_string(),
                                MediaType {
                                    schema: Some(schema.clone()),
                                },
                            )
                        })
                        .collect();
                    if !content.is_empty() {
                        response.content = Some(content);
                    }
                }
            }
        }

        Ok(())
    }
}

/// Security scheme used when none is configured
pub const DEFAULT_SECURITY_SCHEME: &str = "oauth2";

/// Adds 401/403 responses and a security requirement to authorized routes.
///
/// Policy names from `Authorize` annotations become the requirement's scopes.
#[derive(Debug, Clone)]
pub struct SecurityRequirementsOperationFilter {
    scheme_name: String,
}

impl SecurityRequirementsOperationFilter {
    pub fn new(scheme_name: impl Into<String>) -> Self {
        Self {
            scheme_name: scheme_name.into(),
        }
    }
}

impl Default for SecurityRequirementsOperationFilter {
    fn default() -> Self {
        Self::new(DEFAULT_SECURITY_SCHEME)
    }
}

impl OperationFilter for SecurityRequirementsOperationFilter {
    fn apply(&self, operation: &mut Operation, context: &mut OperationFilterContext<'_>) -> Result<()> {
        let mut authorized = false;
        let mut scopes: Vec<String> = Vec::new();
        for annotation in context.api_description.annotations() {
            if let Annotation::Authorize { policy } = annotation {
                authorized = true;
                if let Some(policy) = policy {
                    if !scopes.contains(policy) {
                        scopes.push(policy.clone());
                    }
                }
            }
        }

        if !authorized {
            return Ok(());
        }

        operation
            .responses
            .entry("401".to_string())
            .or_insert_with(|| Response::new("Unauthorized"));
        operation
            .responses
            .entry("403".to_string())
            .or_insert_with(|| Response::new("Forbidden"));

        let mut requirement = SecurityRequirement::new();
        requirement.insert(self.scheme_name.clone(), scopes);
        operation.security = Some(vec![requirement]);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_description::{ApiDescription, ApiResponseType};
    use crate::contract::{ContractCatalog, JsonContract, ObjectContract, TypeRef};
    use crate::schema::Schema;
    use crate::schema_registry::{SchemaRegistry, SchemaRegistrySettings, SerializerSettings};
    use pretty_assertions::assert_eq;

    fn registry() -> SchemaRegistry {
        let mut catalog = ContractCatalog::new();
        catalog.declare(
            TypeRef::new("ProblemDetails"),
            JsonContract::Object(ObjectContract::default()),
        );
        SchemaRegistry::new(
            Arc::new(catalog),
            SerializerSettings::default(),
            Arc::new(SchemaRegistrySettings::default()),
        )
    }

    fn apply(filter: &dyn OperationFilter, api: &ApiDescription, operation: &mut Operation) -> Result<SchemaRegistry> {
        let mut registry = registry();
        let mut context = OperationFilterContext {
            api_description: api,
            schema_registry: &mut registry,
        };
        filter.apply(operation, &mut context)?;
        Ok(registry)
    }

    #[test]
    fn test_operation_annotation_overrides() {
        let mut api = ApiDescription::new("GET", "items");
        api.action_annotations.push(Annotation::Operation {
            operation_id: Some("ListItems".to_string()),
            tags: Some(vec!["catalog".to_string(), "items".to_string()]),
            schemes: Some(vec!["https".to_string()]),
        });
        let mut operation = Operation {
            operation_id: Some("ItemsGet".to_string()),
            tags: vec!["Items".to_string()],
            ..Default::default()
        };

        apply(&AnnotationsOperationFilter::new(), &api, &mut operation).unwrap();

        assert_eq!(operation.operation_id.as_deref(), Some("ListItems"));
        assert_eq!(operation.tags, vec!["catalog", "items"]);
        assert_eq!(operation.servers.unwrap()[0].url, "https://example.org/");
    }

    struct MarkFilter;

    impl OperationFilter for MarkFilter {
        fn apply(&self, operation: &mut Operation, _context: &mut OperationFilterContext<'_>) -> Result<()> {
            operation
                .extensions
                .insert("x-marked".to_string(), serde_json::Value::Bool(true));
            Ok(())
        }
    }

    #[test]
    fn test_named_operation_filters_run() {
        let mut api = ApiDescription::new("GET", "items");
        api.controller_annotations.push(Annotation::OperationFilter {
            name: "mark".to_string(),
        });
        let filter = AnnotationsOperationFilter::new().with_filter("mark", Arc::new(MarkFilter));
        let mut operation = Operation::default();

        apply(&filter, &api, &mut operation).unwrap();

        assert_eq!(operation.extensions["x-marked"], true);
    }

    #[test]
    fn test_unknown_named_filter_is_an_error() {
        let mut api = ApiDescription::new("GET", "items");
        api.action_annotations.push(Annotation::OperationFilter {
            name: "missing".to_string(),
        });

        let err = apply(&AnnotationsOperationFilter::new(), &api, &mut Operation::default()).err().unwrap();
        assert!(matches!(err, Error::Filter(message) if message.contains("missing")));
    }

    #[test]
    fn test_response_annotation_creates_response_with_content() {
        let mut api = ApiDescription::new("GET", "items");
        api.supported_response_types = vec![ApiResponseType::new(
            200,
            None,
            vec!["application/json".to_string()],
        )];
        api.action_annotations.push(Annotation::Response {
            status_code: 404,
            description: None,
            type_ref: Some(TypeRef::new("ProblemDetails")),
        });
        let mut operation = Operation::default();

        let registry = apply(&ResponseAnnotationsFilter, &api, &mut operation).unwrap();

        let not_found = &operation.responses["404"];
        assert_eq!(not_found.description, "Not Found");
        assert_eq!(
            not_found.content.as_ref().unwrap()["application/json"].schema,
            Some(Schema::reference_to("ProblemDetails"))
        );
        assert!(registry.contains_definition("ProblemDetails"));
    }

    #[test]
    fn test_response_annotation_updates_existing_response() {
        let mut api = ApiDescription::new("GET", "items");
        api.controller_annotations.push(Annotation::Response {
            status_code: 200,
            description: Some("The items".to_string()),
            type_ref: Some(TypeRef::vec(TypeRef::new("String"))),
        });
        let mut content = IndexMap::new();
        content.insert("text/csv".to_string(), MediaType::default());
        let mut operation = Operation::default();
        operation.responses.insert(
            "200".to_string(),
            Response {
                description: "Success".to_string(),
                content: Some(content),
            },
        );

        apply(&ResponseAnnotationsFilter, &api, &mut operation).unwrap();

        let ok = &operation.responses["200"];
        assert_eq!(ok.description, "The items");
        assert_eq!(
            ok.content.as_ref().unwrap()["text/csv"].schema,
            Some(Schema::array(Schema::string()))
        );
    }

    #[test]
    fn test_security_requirements_for_authorized_route() {
        let mut api = ApiDescription::new("DELETE", "items/{id}");
        api.controller_annotations.push(Annotation::Authorize {
            policy: Some("readAccess".to_string()),
        });
        api.action_annotations.push(Annotation::Authorize {
            policy: Some("writeAccess".to_string()),
        });
        api.action_annotations.push(Annotation::Authorize {
            policy: Some("readAccess".to_string()),
        });
        let mut operation = Operation::default();
        operation
            .responses
            .insert("200".to_string(), Response::new("Success"));

        apply(&SecurityRequirementsOperationFilter::default(), &api, &mut operation).unwrap();

        let codes: Vec<_> = operation.responses.keys().cloned().collect();
        assert_eq!(codes, vec!["200", "401", "403"]);
        assert_eq!(operation.responses["403"].description, "Forbidden");

        let security = operation.security.unwrap();
        assert_eq!(
            security[0]["oauth2"],
            vec!["readAccess".to_string(), "writeAccess".to_string()]
        );
    }

    #[test]
    fn test_no_security_without_authorize() {
        let api = ApiDescription::new("GET", "public");
        let mut operation = Operation::default();

        apply(&SecurityRequirementsOperationFilter::new("bearer"), &api, &mut operation).unwrap();

        assert!(operation.responses.is_empty());
        assert!(operation.security.is_none());
    }
}
