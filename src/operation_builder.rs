//! Builds one OpenAPI operation from one route descriptor.

use crate::api_description::{ApiDescription, ApiParameterDescription, ApiResponseType, BindingSource};
use crate::contract::lower_first_char;
use crate::error::Result;
use crate::generator::SwaggerGeneratorSettings;
use crate::openapi::{
    MediaType, Operation, Parameter, ParameterLocation, ParameterStyle, RequestBody, Response,
};
use crate::schema::Schema;
use crate::schema_registry::SchemaRegistry;
use heck::ToUpperCamelCase;
use indexmap::IndexMap;
use log::debug;

/// Post-processing hook applied to every generated operation
pub trait OperationFilter: Send + Sync {
    fn apply(&self, operation: &mut Operation, context: &mut OperationFilterContext<'_>) -> Result<()>;
}

/// What an [`OperationFilter`] sees besides the operation itself
pub struct OperationFilterContext<'a> {
    pub api_description: &'a ApiDescription,
    pub schema_registry: &'a mut SchemaRegistry,
}

/// Status-code pattern -> description. `x` matches any digit; first match wins.
const RESPONSE_DESCRIPTIONS: &[(&str, &str)] = &[
    ("1xx", "Information"),
    ("2xx", "Success"),
    ("3xx", "Redirect"),
    ("400", "Bad Request"),
    ("401", "Unauthorized"),
    ("403", "Forbidden"),
    ("404", "Not Found"),
    ("405", "Method Not Allowed"),
    ("406", "Not Acceptable"),
    ("408", "Request Timeout"),
    ("409", "Conflict"),
    ("4xx", "Client Error"),
    ("5xx", "Server Error"),
];

const UNKNOWN_STATUS_DESCRIPTION: &str = "Unknown Status";

/// Description for a status code key such as `"200"` or `"4XX"`
pub fn description_for_status(status_code: &str) -> &'static str {
    RESPONSE_DESCRIPTIONS
        .iter()
        .find(|(pattern, _)| status_matches(pattern, status_code))
        .map(|(_, description)| *description)
        .unwrap_or(UNKNOWN_STATUS_DESCRIPTION)
}

fn status_matches(pattern: &str, status_code: &str) -> bool {
    pattern.len() == status_code.len()
        && pattern.chars().zip(status_code.chars()).all(|(p, c)| {
            if p == 'x' {
                c.is_ascii_digit() || c.eq_ignore_ascii_case(&'x')
            } else {
                p == c
            }
        })
}

/// Name of a path parameter with catch-all, constraint, default and optional
/// markers removed: `{*rest}`, `{id:int}`, `{page=1}`, `{id?}` -> `rest`, `id`, `page`, `id`
fn parameter_name(raw: &str) -> &str {
    let raw = raw.trim_start_matches('*');
    raw.split(|c| matches!(c, ':' | '=' | '?'))
        .next()
        .unwrap_or(raw)
}

/// Path key for a route: leading `/`, no query string, plain `{name}` parameters.
pub fn normalize_path(relative_path: &str) -> String {
    let path = relative_path.split('?').next().unwrap_or_default();
    let mut normalized = String::with_capacity(path.len() + 1);
    normalized.push('/');

    let mut rest = path.trim_start_matches('/');
    while let Some(start) = rest.find('{') {
        normalized.push_str(&rest[..=start]);
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end) => {
                normalized.push_str(parameter_name(&after[..end]));
                normalized.push('}');
                rest = &after[end + 1..];
            }
            None => {
                normalized.push_str(after);
                rest = "";
            }
        }
    }
    normalized.push_str(rest);
    normalized
}

/// Deterministic operation id from method and path template.
///
/// `GET carts/{cartId}/items/{id:int}` -> `CartsByCartIdItemsByIdGet`
pub fn friendly_operation_id(http_method: &str, relative_path: &str) -> String {
    let path = relative_path.split('?').next().unwrap_or_default();
    let method = http_method.to_lowercase();

    let mut id = String::new();
    for segment in path.split('/').chain(std::iter::once(method.as_str())) {
        if segment.is_empty() {
            continue;
        }
        if let Some(inner) = segment.strip_prefix('{') {
            let inner = inner.strip_suffix('}').unwrap_or(inner);
            id.push_str("By");
            id.push_str(&parameter_name(inner).to_upper_camel_case());
        } else {
            id.push_str(&segment.to_upper_camel_case());
        }
    }
    id
}

/// Build the operation for one route and run the operation filters over it.
pub(crate) fn create_operation(
    api_description: &ApiDescription,
    schema_registry: &mut SchemaRegistry,
    settings: &SwaggerGeneratorSettings,
) -> Result<Operation> {
    debug!(
        "Creating operation for {} {}",
        api_description.http_method.as_deref().unwrap_or("?"),
        api_description.relative_path
    );

    let mut parameters = Vec::new();
    for param in api_description.parameter_descriptions.iter().filter(|p| {
        p.source.is_from_request() && p.binding_allowed && !p.is_cancellation_token
    }) {
        if let Some(parameter) = create_parameter(param, schema_registry, settings)? {
            parameters.push(parameter);
        }
    }

    let request_body = create_request_body(api_description, schema_registry)?;

    let mut responses = IndexMap::new();
    if api_description.supported_response_types.is_empty() {
        responses.insert("200".to_string(), Response::new(description_for_status("200")));
    } else {
        for response_type in &api_description.supported_response_types {
            responses.insert(
                response_type.status_code.to_string(),
                create_response(response_type, schema_registry)?,
            );
        }
    }

    let mut operation = Operation {
        tags: vec![(settings.tag_selector)(api_description)],
        operation_id: Some(friendly_operation_id(
            api_description.http_method.as_deref().unwrap_or_default(),
            &api_description.relative_path,
        )),
        parameters: if parameters.is_empty() { None } else { Some(parameters) },
        request_body,
        responses,
        deprecated: api_description.is_obsolete(),
        ..Default::default()
    };

    for filter in &settings.operation_filters {
        let mut context = OperationFilterContext {
            api_description,
            schema_registry: &mut *schema_registry,
        };
        filter.apply(&mut operation, &mut context)?;
    }

    Ok(operation)
}

/// `None` for body and form parameters, which belong to the request body
fn create_parameter(
    param: &ApiParameterDescription,
    schema_registry: &mut SchemaRegistry,
    settings: &SwaggerGeneratorSettings,
) -> Result<Option<Parameter>> {
    let location = match param.source {
        BindingSource::Body | BindingSource::Form => return Ok(None),
        BindingSource::Path => ParameterLocation::Path,
        BindingSource::Header => ParameterLocation::Header,
        BindingSource::Cookie => ParameterLocation::Cookie,
        // Complex bound objects arrive already flattened into simple parameters
        BindingSource::Query | BindingSource::ModelBinding | BindingSource::Services => {
            ParameterLocation::Query
        }
    };

    let name = if settings.describe_all_parameters_in_camel_case {
        camel_case_parameter_name(&param.name)
    } else {
        param.name.clone()
    };

    let schema = match &param.type_ref {
        Some(ty) => schema_registry.get_or_register(ty)?,
        None => Schema::string(),
    };

    // A reference may point at a registered collection
    let is_array = match schema.reference_id() {
        Some(id) => schema_registry.definition(id).is_some_and(Schema::is_array),
        None => schema.is_array(),
    };

    Ok(Some(Parameter {
        name,
        location,
        description: None,
        required: location == ParameterLocation::Path || param.is_required,
        style: if is_array { Some(ParameterStyle::DeepObject) } else { None },
        schema: Some(schema),
        extensions: IndexMap::new(),
    }))
}

/// Lowercases the first character of each `.`-separated part, so flattened
/// names like `Filter.MinPrice` keep their separators and inner casing.
fn camel_case_parameter_name(name: &str) -> String {
    name.split('.').map(lower_first_char).collect::<Vec<_>>().join(".")
}

fn create_request_body(
    api_description: &ApiDescription,
    schema_registry: &mut SchemaRegistry,
) -> Result<Option<RequestBody>> {
    let media_types = api_description.request_media_types();
    if media_types.is_empty() {
        return Ok(None);
    }

    let schema = match api_description.request_body_type() {
        Some(ty) => Some(schema_registry.get_or_register(ty)?),
        None => None,
    };

    let content = media_types
        .into_iter()
        .map(|media_type| {
            (
                media_type.to_string(),
                MediaType {
                    schema: schema.clone(),
                },
            )
        })
        .collect();

    Ok(Some(RequestBody {
        description: None,
        content,
        required: api_description.body_parameter().is_some_and(|p| p.is_required),
    }))
}

fn create_response(
    response_type: &ApiResponseType,
    schema_registry: &mut SchemaRegistry,
) -> Result<Response> {
    let description = description_for_status(&response_type.status_code.to_string());

    let content = match &response_type.type_ref {
        Some(ty) if !response_type.is_void() && !response_type.media_types.is_empty() => {
            let schema = schema_registry.get_or_register(ty)?;
            Some(
                response_type
                    .media_types
                    .iter()
                    .map(|media_type| {
                        (
                            media_type.clone(),
                            MediaType {
                                schema: Some(schema.clone()),
                            },
                        )
                    })
                    .collect(),
            )
        }
        _ => None,
    };

    Ok(Response {
        description: description.to_string(),
        content,
    })
}
