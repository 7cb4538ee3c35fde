//! Route descriptors consumed by the generator.
//!
//! An [`ApiDescription`] is one action bound to one HTTP method and path
//! template, with its parameters, response types and annotations. Descriptors
//! are read-only input; nothing in this crate mutates them.

use crate::contract::TypeRef;
use serde::{Deserialize, Serialize};

/// Where a parameter's value is bound from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BindingSource {
    Path,
    Query,
    Header,
    Cookie,
    Body,
    Form,
    /// Bound by a custom model binder; documented as a query parameter
    #[default]
    ModelBinding,
    /// Injected by the host, never part of the request
    Services,
}

impl BindingSource {
    pub fn is_from_request(&self) -> bool {
        !matches!(self, BindingSource::Services)
    }
}

/// One bound parameter of an action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiParameterDescription {
    pub name: String,
    #[serde(default)]
    pub source: BindingSource,
    /// Runtime type of the parameter, if known
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_ref: Option<TypeRef>,
    /// Marked required by binding or validation metadata
    #[serde(default)]
    pub is_required: bool,
    #[serde(default = "default_true")]
    pub binding_allowed: bool,
    /// Cancellation tokens are plumbing, not input
    #[serde(default)]
    pub is_cancellation_token: bool,
}

impl ApiParameterDescription {
    pub fn new(name: impl Into<String>, source: BindingSource, type_ref: Option<TypeRef>) -> Self {
        Self {
            name: name.into(),
            source,
            type_ref,
            is_required: false,
            binding_allowed: true,
            is_cancellation_token: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }
}

/// One possible response of an action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponseType {
    pub status_code: u16,
    /// `None` (or `()`) for responses without a body
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_ref: Option<TypeRef>,
    #[serde(default)]
    pub media_types: Vec<String>,
}

impl ApiResponseType {
    pub fn new(status_code: u16, type_ref: Option<TypeRef>, media_types: Vec<String>) -> Self {
        Self {
            status_code,
            type_ref,
            media_types,
        }
    }

    pub fn is_void(&self) -> bool {
        self.type_ref.as_ref().map_or(true, is_void_type)
    }
}

/// Returns true for the unit type, which describes an empty body
pub fn is_void_type(ty: &TypeRef) -> bool {
    ty.name == "()" && ty.generic_args.is_empty()
}

/// Metadata attached to an action or its controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Annotation {
    /// Overrides for the generated operation
    #[serde(rename_all = "camelCase")]
    Operation {
        #[serde(default)]
        operation_id: Option<String>,
        #[serde(default)]
        tags: Option<Vec<String>>,
        /// Protocol schemes; each becomes a per-operation server
        #[serde(default)]
        schemes: Option<Vec<String>>,
    },
    /// Runs the operation filter registered under this name
    OperationFilter { name: String },
    /// Creates or updates one response entry
    #[serde(rename_all = "camelCase")]
    Response {
        status_code: u16,
        #[serde(default)]
        description: Option<String>,
        #[serde(rename = "type", default)]
        type_ref: Option<TypeRef>,
    },
    /// Requires authorization, optionally under a named policy
    Authorize {
        #[serde(default)]
        policy: Option<String>,
    },
    Obsolete,
    /// Concrete type of the request body
    RequestBodyType {
        #[serde(rename = "type")]
        type_ref: TypeRef,
    },
}

/// Everything known about one routed action
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDescription {
    /// Upper-case HTTP method; `None` when the action accepts any method
    #[serde(default)]
    pub http_method: Option<String>,
    /// Path template without a leading slash, e.g. `carts/{id:int}/items`
    pub relative_path: String,
    /// Document this action is assigned to, if any
    #[serde(default)]
    pub group_name: Option<String>,
    #[serde(default)]
    pub controller_name: String,
    #[serde(default)]
    pub action_name: String,
    #[serde(default)]
    pub parameter_descriptions: Vec<ApiParameterDescription>,
    #[serde(default)]
    pub supported_request_media_types: Vec<String>,
    #[serde(default)]
    pub supported_response_types: Vec<ApiResponseType>,
    #[serde(default)]
    pub action_annotations: Vec<Annotation>,
    #[serde(default)]
    pub controller_annotations: Vec<Annotation>,
}

impl ApiDescription {
    pub fn new(http_method: &str, relative_path: impl Into<String>) -> Self {
        Self {
            http_method: Some(http_method.to_uppercase()),
            relative_path: relative_path.into(),
            ..Default::default()
        }
    }

    /// `Controller.Action`, used in error messages
    pub fn display_name(&self) -> String {
        format!("{}.{}", self.controller_name, self.action_name)
    }

    pub fn is_obsolete(&self) -> bool {
        self.action_annotations
            .iter()
            .any(|a| matches!(a, Annotation::Obsolete))
    }

    pub fn relative_path_sans_query_string(&self) -> &str {
        self.relative_path
            .split('?')
            .next()
            .unwrap_or(&self.relative_path)
    }

    /// Distinct request media types in declaration order
    pub fn request_media_types(&self) -> Vec<&str> {
        distinct(self.supported_request_media_types.iter().map(String::as_str))
    }

    /// Distinct media types across every response type
    pub fn response_media_types(&self) -> Vec<&str> {
        distinct(
            self.supported_response_types
                .iter()
                .flat_map(|r| r.media_types.iter().map(String::as_str)),
        )
    }

    /// Controller annotations followed by action annotations
    pub fn annotations(&self) -> impl Iterator<Item = &Annotation> {
        self.controller_annotations
            .iter()
            .chain(self.action_annotations.iter())
    }

    /// The body parameter, if the action binds one
    pub fn body_parameter(&self) -> Option<&ApiParameterDescription> {
        self.parameter_descriptions
            .iter()
            .find(|p| p.source == BindingSource::Body)
    }

    /// Declared request body type: the annotation wins over the body parameter
    pub fn request_body_type(&self) -> Option<&TypeRef> {
        self.action_annotations
            .iter()
            .find_map(|a| match a {
                Annotation::RequestBodyType { type_ref } => Some(type_ref),
                _ => None,
            })
            .or_else(|| self.body_parameter().and_then(|p| p.type_ref.as_ref()))
    }
}

/// Source of route descriptors for the generator
pub trait ApiDescriptionsProvider {
    fn api_descriptions(&self) -> &[ApiDescription];
}

impl ApiDescriptionsProvider for Vec<ApiDescription> {
    fn api_descriptions(&self) -> &[ApiDescription] {
        self
    }
}

fn default_true() -> bool {
    true
}

fn distinct<'a>(items: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = Vec::new();
    for item in items {
        if !seen.contains(&item) {
            seen.push(item);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_relative_path_sans_query_string() {
        let api = ApiDescription::new("get", "products?filter={filter}");

        assert_eq!(api.http_method.as_deref(), Some("GET"));
        assert_eq!(api.relative_path_sans_query_string(), "products");
    }

    #[test]
    fn test_request_body_type_prefers_annotation() {
        let mut api = ApiDescription::new("POST", "orders");
        api.parameter_descriptions.push(ApiParameterDescription::new(
            "order",
            BindingSource::Body,
            Some(TypeRef::new("OrderInput")),
        ));
        assert_eq!(api.request_body_type(), Some(&TypeRef::new("OrderInput")));

        api.action_annotations.push(Annotation::RequestBodyType {
            type_ref: TypeRef::new("Order"),
        });
        assert_eq!(api.request_body_type(), Some(&TypeRef::new("Order")));
    }

    #[test]
    fn test_response_media_types_are_distinct() {
        let mut api = ApiDescription::new("GET", "orders");
        api.supported_response_types = vec![
            ApiResponseType::new(200, None, vec!["application/json".to_string()]),
            ApiResponseType::new(
                404,
                None,
                vec!["application/json".to_string(), "text/plain".to_string()],
            ),
        ];

        assert_eq!(api.response_media_types(), vec!["application/json", "text/plain"]);
    }

    #[test]
    fn test_unit_response_is_void() {
        assert!(ApiResponseType::new(204, None, vec![]).is_void());
        assert!(ApiResponseType::new(200, Some(TypeRef::new("()")), vec![]).is_void());
        assert!(!ApiResponseType::new(200, Some(TypeRef::new("User")), vec![]).is_void());
    }

    #[test]
    fn test_deserialize_annotations() {
        let yaml = r#"
- kind: operation
  operationId: ListOrders
  tags: [orders]
- kind: response
  statusCode: 404
  type: ProblemDetails
- kind: authorize
  policy: readAccess
- kind: obsolete
"#;
        let annotations: Vec<Annotation> = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(
            annotations,
            vec![
                Annotation::Operation {
                    operation_id: Some("ListOrders".to_string()),
                    tags: Some(vec!["orders".to_string()]),
                    schemes: None,
                },
                Annotation::Response {
                    status_code: 404,
                    description: None,
                    type_ref: Some(TypeRef::new("ProblemDetails")),
                },
                Annotation::Authorize {
                    policy: Some("readAccess".to_string()),
                },
                Annotation::Obsolete,
            ]
        );
    }
}
