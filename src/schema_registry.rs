use crate::contract::{
    lower_first_char, ArrayContract, ContractResolver, DictionaryContract, EnumContract,
    JsonContract, ObjectContract, PrimitiveKind, PropertyValidation, StringEnumConverter, TypeRef,
};
use crate::error::Result;
use crate::schema::Schema;
use crate::schema_id::{default_schema_id, SchemaIdManager, SchemaIdSelector};
use indexmap::IndexMap;
use log::debug;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

/// Produces the schema for a type with an explicit override
pub type CustomTypeMapping = Arc<dyn Fn() -> Schema + Send + Sync>;

/// Post-processing hook applied to every schema the registry builds
pub trait SchemaFilter: Send + Sync {
    fn apply(&self, schema: &mut Schema, context: &mut SchemaFilterContext<'_>) -> Result<()>;
}

/// What a [`SchemaFilter`] sees besides the schema itself
pub struct SchemaFilterContext<'a> {
    /// The type the schema was built for
    pub type_ref: &'a TypeRef,
    pub contract: &'a JsonContract,
    /// The registry that built the schema; filters may register further types
    pub schema_registry: &'a mut SchemaRegistry,
}

/// Serializer-wide settings that influence schema shape
#[derive(Debug, Clone, Default)]
pub struct SerializerSettings {
    /// Converter applied to every enum type
    pub string_enum_converter: Option<StringEnumConverter>,
}

/// Options for schema generation
#[derive(Clone)]
pub struct SchemaRegistrySettings {
    /// Types that are always inlined via their override function
    pub custom_type_mappings: HashMap<TypeRef, CustomTypeMapping>,
    pub describe_all_enums_as_strings: bool,
    pub describe_string_enums_in_camel_case: bool,
    /// Register enums as shared definitions instead of inlining them
    pub use_referenced_definitions_for_enums: bool,
    pub schema_id_selector: SchemaIdSelector,
    pub ignore_obsolete_properties: bool,
    /// Applied in registration order
    pub schema_filters: Vec<Arc<dyn SchemaFilter>>,
}

impl Default for SchemaRegistrySettings {
    fn default() -> Self {
        Self {
            custom_type_mappings: HashMap::new(),
            describe_all_enums_as_strings: false,
            describe_string_enums_in_camel_case: false,
            use_referenced_definitions_for_enums: false,
            schema_id_selector: Arc::new(default_schema_id),
            ignore_obsolete_properties: false,
            schema_filters: Vec::new(),
        }
    }
}

/// State of one definitions-table key. A missing key means "absent".
#[derive(Debug, Clone)]
enum Definition {
    /// Claimed by a type whose schema is still being built
    Reserved,
    Complete(Schema),
}

/// Schema registry - converts types to schemas and owns the shared definitions table
pub struct SchemaRegistry {
    contract_resolver: Arc<dyn ContractResolver>,
    serializer_settings: SerializerSettings,
    settings: Arc<SchemaRegistrySettings>,
    schema_ids: SchemaIdManager,
    definitions: IndexMap<String, Definition>,
}

impl SchemaRegistry {
    pub fn new(
        contract_resolver: Arc<dyn ContractResolver>,
        serializer_settings: SerializerSettings,
        settings: Arc<SchemaRegistrySettings>,
    ) -> Self {
        debug!("Initializing SchemaRegistry");
        let schema_ids = SchemaIdManager::new(Arc::clone(&settings.schema_id_selector));
        Self {
            contract_resolver,
            serializer_settings,
            settings,
            schema_ids,
            definitions: IndexMap::new(),
        }
    }

    /// Schema usable inline for `ty`.
    ///
    /// Object contracts, self-referencing collections and (when opted in) enums
    /// come back as references; their full schemas are placed in the definitions
    /// table before this returns.
    pub fn get_or_register(&mut self, ty: &TypeRef) -> Result<Schema> {
        debug!("Generating schema for type: {}", ty);

        let mut referenced_types = VecDeque::new();
        let schema = self.create_schema(ty, &mut referenced_types)?;

        while let Some(referenced_type) = referenced_types.pop_front() {
            let schema_id = self.schema_ids.id_for(&referenced_type)?;
            if self.definitions.contains_key(&schema_id) {
                continue;
            }

            // Reserve the key before building: a type that reaches itself while
            // its schema is built is then skipped instead of rebuilt.
            self.definitions.insert(schema_id.clone(), Definition::Reserved);
            match self.create_inline_schema(&referenced_type, &mut referenced_types) {
                Ok(definition) => {
                    self.definitions.insert(schema_id, Definition::Complete(definition));
                }
                Err(err) => {
                    // A failed build must not leave the key claimed
                    self.definitions.shift_remove(&schema_id);
                    return Err(err);
                }
            }
        }

        Ok(schema)
    }

    /// Completed definitions in registration order
    pub fn definitions(&self) -> IndexMap<String, Schema> {
        self.definitions
            .iter()
            .filter_map(|(id, definition)| match definition {
                Definition::Complete(schema) => Some((id.clone(), schema.clone())),
                Definition::Reserved => None,
            })
            .collect()
    }

    pub fn definition(&self, schema_id: &str) -> Option<&Schema> {
        match self.definitions.get(schema_id) {
            Some(Definition::Complete(schema)) => Some(schema),
            _ => None,
        }
    }

    pub fn contains_definition(&self, schema_id: &str) -> bool {
        self.definitions.contains_key(schema_id)
    }

    pub fn resolve_contract(&self, ty: &TypeRef) -> JsonContract {
        self.contract_resolver.resolve_contract(ty)
    }

    fn create_schema(&mut self, ty: &TypeRef, referenced_types: &mut VecDeque<TypeRef>) -> Result<Schema> {
        // Nullable and pointer wrappers describe the same values as their argument
        let ty = ty.strip_wrappers();
        let contract = self.contract_resolver.resolve_contract(ty);

        let create_reference = !self.settings.custom_type_mappings.contains_key(ty)
            && match &contract {
                JsonContract::Object(_) => true,
                JsonContract::Array(_) | JsonContract::Dictionary(_) => {
                    self.is_self_referencing(ty, &contract)
                }
                JsonContract::Enum(_) => self.settings.use_referenced_definitions_for_enums,
                JsonContract::Primitive(_) | JsonContract::Any => false,
            };

        if create_reference {
            referenced_types.push_back(ty.clone());
            let schema_id = self.schema_ids.id_for(ty)?;
            Ok(Schema::reference_to(&schema_id))
        } else {
            self.create_inline_schema(ty, referenced_types)
        }
    }

    fn create_inline_schema(
        &mut self,
        ty: &TypeRef,
        referenced_types: &mut VecDeque<TypeRef>,
    ) -> Result<Schema> {
        let contract = self.contract_resolver.resolve_contract(ty);

        let custom = self.settings.custom_type_mappings.get(ty).map(|mapping| mapping());
        let mut schema = match custom {
            Some(schema) => schema,
            None => match &contract {
                JsonContract::Primitive(kind) => primitive_schema(kind),
                JsonContract::Enum(enum_contract) => self.create_enum_schema(enum_contract),
                JsonContract::Dictionary(dictionary) => {
                    self.create_dictionary_schema(dictionary, referenced_types)?
                }
                JsonContract::Array(array) => self.create_array_schema(array, referenced_types)?,
                JsonContract::Object(object) => self.create_object_schema(object, referenced_types)?,
                JsonContract::Any => Schema::object(),
            },
        };

        let settings = Arc::clone(&self.settings);
        for filter in &settings.schema_filters {
            let mut context = SchemaFilterContext {
                type_ref: ty,
                contract: &contract,
                schema_registry: self,
            };
            filter.apply(&mut schema, &mut context)?;
        }

        Ok(schema)
    }

    fn create_enum_schema(&self, contract: &EnumContract) -> Schema {
        let converter = contract
            .converter
            .or(self.serializer_settings.string_enum_converter);

        if !self.settings.describe_all_enums_as_strings && converter.is_none() {
            // Numeric values are not enumerated
            return Schema::with_format("integer", "int32");
        }

        let camel_case = self.settings.describe_string_enums_in_camel_case
            || converter.is_some_and(|c| c.camel_case_text);

        let names = contract
            .members
            .iter()
            .map(|member| {
                let name = member.value_override.as_deref().unwrap_or(&member.name);
                if camel_case {
                    lower_first_char(name)
                } else {
                    name.to_string()
                }
            })
            .collect();

        Schema {
            enum_values: Some(names),
            ..Schema::string()
        }
    }

    fn create_dictionary_schema(
        &mut self,
        contract: &DictionaryContract,
        referenced_types: &mut VecDeque<TypeRef>,
    ) -> Result<Schema> {
        let value_type = contract
            .value_type
            .clone()
            .unwrap_or_else(|| TypeRef::new("object"));
        let key_contract = contract
            .key_type
            .as_ref()
            .map(|key| self.contract_resolver.resolve_contract(key.strip_wrappers()));

        if let Some(JsonContract::Enum(key_enum)) = key_contract {
            let mut properties = IndexMap::new();
            for member in &key_enum.members {
                let value_schema = self.create_schema(&value_type, referenced_types)?;
                properties.insert(contract.key_naming.apply(&member.name), value_schema);
            }
            return Ok(Schema {
                properties: Some(properties),
                ..Schema::object()
            });
        }

        let value_schema = self.create_schema(&value_type, referenced_types)?;
        Ok(Schema {
            additional_properties: Some(Box::new(value_schema)),
            ..Schema::object()
        })
    }

    fn create_array_schema(
        &mut self,
        contract: &ArrayContract,
        referenced_types: &mut VecDeque<TypeRef>,
    ) -> Result<Schema> {
        let item_type = contract
            .item_type
            .clone()
            .unwrap_or_else(|| TypeRef::new("object"));
        let items = self.create_schema(&item_type, referenced_types)?;
        Ok(Schema::array(items))
    }

    fn create_object_schema(
        &mut self,
        contract: &ObjectContract,
        referenced_types: &mut VecDeque<TypeRef>,
    ) -> Result<Schema> {
        let ignore_obsolete = self.settings.ignore_obsolete_properties;
        let applicable: Vec<_> = contract
            .properties
            .iter()
            .filter(|p| !p.ignored)
            .filter(|p| !(ignore_obsolete && p.obsolete))
            .collect();

        let required: Vec<String> = applicable
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.clone())
            .collect();

        let mut properties = IndexMap::new();
        for property in applicable {
            let mut schema = self.create_schema(&property.property_type, referenced_types)?;
            assign_validation_properties(&mut schema, &property.validation);
            properties.insert(property.name.clone(), schema);
        }

        Ok(Schema {
            properties: Some(properties),
            required: if required.is_empty() { None } else { Some(required) },
            additional_properties: contract
                .extension_data_value_type
                .as_ref()
                .map(|_| Box::new(Schema::object())),
            ..Schema::object()
        })
    }

    /// True when `ty` can reach itself through array items or dictionary values.
    fn is_self_referencing(&self, ty: &TypeRef, contract: &JsonContract) -> bool {
        let mut visited = HashSet::new();
        let mut pending = element_types(contract);

        while let Some(next) = pending.pop() {
            let next = next.strip_wrappers().clone();
            if next == *ty {
                return true;
            }
            if !visited.insert(next.clone()) {
                continue;
            }
            let next_contract = self.contract_resolver.resolve_contract(&next);
            pending.extend(element_types(&next_contract));
        }

        false
    }
}

fn element_types(contract: &JsonContract) -> Vec<TypeRef> {
    match contract {
        JsonContract::Array(array) => array.item_type.iter().cloned().collect(),
        JsonContract::Dictionary(dictionary) => dictionary.value_type.iter().cloned().collect(),
        _ => Vec::new(),
    }
}

/// Fixed primitive type map; unmapped primitives fall back to a bare string.
fn primitive_schema(kind: &PrimitiveKind) -> Schema {
    match kind {
        PrimitiveKind::Int16
        | PrimitiveKind::UInt16
        | PrimitiveKind::Int32
        | PrimitiveKind::UInt32
        | PrimitiveKind::Byte
        | PrimitiveKind::SByte => Schema::with_format("integer", "int32"),
        PrimitiveKind::Int64 | PrimitiveKind::UInt64 => Schema::with_format("integer", "int64"),
        PrimitiveKind::Single => Schema::with_format("number", "float"),
        // Decimal keeps the double mapping consumers already depend on
        PrimitiveKind::Double | PrimitiveKind::Decimal => Schema::with_format("number", "double"),
        PrimitiveKind::ByteArray | PrimitiveKind::SByteArray => Schema::with_format("string", "byte"),
        PrimitiveKind::Boolean => Schema::of_type("boolean"),
        PrimitiveKind::DateTime | PrimitiveKind::DateTimeOffset => {
            Schema::with_format("string", "date-time")
        }
        PrimitiveKind::Guid => Schema::with_format("string", "uuid"),
        PrimitiveKind::String | PrimitiveKind::Char | PrimitiveKind::Other(_) => Schema::string(),
    }
}

/// Layer property-level validation onto a schema. References stay bare.
fn assign_validation_properties(schema: &mut Schema, validation: &PropertyValidation) {
    if schema.is_reference() || validation.is_empty() {
        return;
    }
    if validation.minimum.is_some() {
        schema.minimum = validation.minimum;
    }
    if validation.maximum.is_some() {
        schema.maximum = validation.maximum;
    }
    if validation.min_length.is_some() {
        schema.min_length = validation.min_length;
    }
    if validation.max_length.is_some() {
        schema.max_length = validation.max_length;
    }
    if validation.pattern.is_some() {
        schema.pattern = validation.pattern.clone();
    }
}
