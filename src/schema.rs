//! JSON Schema fragments used for parameters, bodies, responses and definitions.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Prefix of every `$ref` pointing into `components.schemas`
pub const SCHEMA_REF_PREFIX: &str = "#/components/schemas/";

/// Vendor extension bag (`x-*` keys)
pub type Extensions = IndexMap<String, serde_json::Value>;

/// OpenAPI Schema definition
///
/// A reference schema carries only `$ref`; every other field stays empty so the
/// node is a pointer into the definitions table rather than an owner of content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Reference to a shared definition
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// The type of the schema (string, integer, object, array, etc.)
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
    /// Format for primitive types (e.g., "int32", "date-time", "uuid")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Properties for object types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, Schema>>,
    /// Required property names; absent rather than empty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    /// Items schema for array types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    /// Value schema for open maps and extension-data slots
    #[serde(rename = "additionalProperties", skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<Box<Schema>>,
    /// Enum literals for string enums
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(rename = "exclusiveMinimum", skip_serializing_if = "Option::is_none")]
    pub exclusive_minimum: Option<bool>,
    #[serde(rename = "exclusiveMaximum", skip_serializing_if = "Option::is_none")]
    pub exclusive_maximum: Option<bool>,
    #[serde(rename = "minLength", skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(rename = "maxLength", skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Vendor extensions
    #[serde(flatten, skip_serializing_if = "IndexMap::is_empty")]
    pub extensions: Extensions,
}

impl Schema {
    /// Create a schema of the given JSON type
    pub fn of_type(schema_type: &str) -> Self {
        Self {
            schema_type: Some(schema_type.to_string()),
            ..Default::default()
        }
    }

    /// Create a schema of the given JSON type and format
    pub fn with_format(schema_type: &str, format: &str) -> Self {
        Self {
            schema_type: Some(schema_type.to_string()),
            format: Some(format.to_string()),
            ..Default::default()
        }
    }

    pub fn string() -> Self {
        Self::of_type("string")
    }

    /// Abstract "object" with no declared shape
    pub fn object() -> Self {
        Self::of_type("object")
    }

    pub fn array(items: Schema) -> Self {
        Self {
            schema_type: Some("array".to_string()),
            items: Some(Box::new(items)),
            ..Default::default()
        }
    }

    /// Create a reference to the definition registered under `schema_id`
    pub fn reference_to(schema_id: &str) -> Self {
        Self {
            reference: Some(format!("{}{}", SCHEMA_REF_PREFIX, schema_id)),
            ..Default::default()
        }
    }

    /// The definition id this schema points at, if it is a reference
    pub fn reference_id(&self) -> Option<&str> {
        self.reference
            .as_deref()
            .and_then(|r| r.strip_prefix(SCHEMA_REF_PREFIX))
    }

    pub fn is_reference(&self) -> bool {
        self.reference.is_some()
    }

    pub fn is_array(&self) -> bool {
        self.schema_type.as_deref() == Some("array")
    }

    /// Collect the ids of every reference reachable from this node.
    pub fn collect_references(&self, out: &mut Vec<String>) {
        if let Some(id) = self.reference_id() {
            out.push(id.to_string());
        }
        if let Some(properties) = &self.properties {
            for property in properties.values() {
                property.collect_references(out);
            }
        }
        if let Some(items) = &self.items {
            items.collect_references(out);
        }
        if let Some(additional) = &self.additional_properties {
            additional.collect_references(out);
        }
    }
}
