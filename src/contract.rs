//! Type contracts: the serialization-level shape of a runtime type.
//!
//! The schema engine never inspects types directly. It asks a [`ContractResolver`]
//! for the [`JsonContract`] of a [`TypeRef`] and dispatches on the variant:
//! primitive, enum, array, dictionary, object, or the abstract "any".
//!
//! [`ContractCatalog`] is an in-memory resolver: declared types (optionally
//! generic) plus the well-known containers and value types.

use crate::error::{Error, Result};
use heck::ToLowerCamelCase;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Identity of a runtime type, including its generic arguments.
///
/// Two `TypeRef`s are the same type iff namespace, name and arguments match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TypeRef {
    /// Enclosing module or namespace, if known
    pub namespace: Option<String>,
    /// The base type name (e.g., "User", "Vec", "i32")
    pub name: String,
    /// Generic type arguments
    pub generic_args: Vec<TypeRef>,
}

impl TypeRef {
    /// Create a TypeRef for a simple, non-generic type
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            name: name.into(),
            generic_args: Vec::new(),
        }
    }

    /// Create a TypeRef for a generic instantiation
    pub fn generic(name: impl Into<String>, generic_args: Vec<TypeRef>) -> Self {
        Self {
            namespace: None,
            name: name.into(),
            generic_args,
        }
    }

    pub fn in_namespace(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            name: name.into(),
            generic_args: Vec::new(),
        }
    }

    /// `Option<inner>`
    pub fn option(inner: TypeRef) -> Self {
        Self::generic("Option", vec![inner])
    }

    /// `Vec<inner>`
    pub fn vec(inner: TypeRef) -> Self {
        Self::generic("Vec", vec![inner])
    }

    /// `HashMap<key, value>`
    pub fn map(key: TypeRef, value: TypeRef) -> Self {
        Self::generic("HashMap", vec![key, value])
    }

    pub fn is_option(&self) -> bool {
        self.name == "Option" && self.generic_args.len() == 1
    }

    /// `Option`, `Box`, `Arc`, `Rc` and `Cow` describe the same values as their argument
    pub fn is_transparent_wrapper(&self) -> bool {
        self.generic_args.len() == 1
            && matches!(self.name.as_str(), "Option" | "Box" | "Arc" | "Rc" | "Cow")
    }

    /// The innermost type under any transparent wrappers
    pub fn strip_wrappers(&self) -> &TypeRef {
        let mut ty = self;
        while ty.is_transparent_wrapper() {
            ty = &ty.generic_args[0];
        }
        ty
    }

    /// Parse a Rust type expression such as `Vec<User>` or `HashMap<Role, u32>`.
    pub fn parse(input: &str) -> Result<TypeRef> {
        let ty = syn::parse_str::<syn::Type>(input).map_err(|e| Error::InvalidTypeName {
            input: input.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self::from_syn(&ty))
    }

    /// Build a TypeRef from a parsed `syn::Type`.
    ///
    /// Path prefixes are dropped (`chrono::DateTime<Utc>` becomes `DateTime<Utc>`),
    /// references are looked through, and slices/arrays become `Vec<T>`.
    pub fn from_syn(ty: &syn::Type) -> TypeRef {
        match ty {
            syn::Type::Path(type_path) => Self::from_syn_path(&type_path.path),
            syn::Type::Reference(reference) => Self::from_syn(&reference.elem),
            syn::Type::Paren(paren) => Self::from_syn(&paren.elem),
            syn::Type::Group(group) => Self::from_syn(&group.elem),
            syn::Type::Slice(slice) => TypeRef::vec(Self::from_syn(&slice.elem)),
            syn::Type::Array(array) => TypeRef::vec(Self::from_syn(&array.elem)),
            syn::Type::Tuple(tuple) if tuple.elems.is_empty() => TypeRef::new("()"),
            _ => TypeRef::new("Unknown"),
        }
    }

    fn from_syn_path(path: &syn::Path) -> TypeRef {
        let Some(segment) = path.segments.last() else {
            return TypeRef::new("Unknown");
        };

        let mut generic_args = Vec::new();
        if let syn::PathArguments::AngleBracketed(args) = &segment.arguments {
            for arg in &args.args {
                if let syn::GenericArgument::Type(inner_ty) = arg {
                    generic_args.push(Self::from_syn(inner_ty));
                }
            }
        }

        TypeRef::generic(segment.ident.to_string(), generic_args)
    }

    /// Replace generic parameters (`T`, `U`, ...) with concrete arguments.
    pub fn substitute(&self, params: &[String], args: &[TypeRef]) -> TypeRef {
        if self.namespace.is_none() && self.generic_args.is_empty() {
            if let Some(pos) = params.iter().position(|p| *p == self.name) {
                if let Some(arg) = args.get(pos) {
                    return arg.clone();
                }
            }
        }

        TypeRef {
            namespace: self.namespace.clone(),
            name: self.name.clone(),
            generic_args: self
                .generic_args
                .iter()
                .map(|a| a.substitute(params, args))
                .collect(),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(namespace) = &self.namespace {
            write!(f, "{}::", namespace)?;
        }
        write!(f, "{}", self.name)?;
        if !self.generic_args.is_empty() {
            let args: Vec<String> = self.generic_args.iter().map(|a| a.to_string()).collect();
            write!(f, "<{}>", args.join(", "))?;
        }
        Ok(())
    }
}

impl FromStr for TypeRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        TypeRef::parse(s)
    }
}

impl TryFrom<String> for TypeRef {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        TypeRef::parse(&value)
    }
}

impl From<TypeRef> for String {
    fn from(value: TypeRef) -> Self {
        value.to_string()
    }
}

/// Well-known value types with a fixed wire representation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimitiveKind {
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Single,
    Double,
    Decimal,
    Byte,
    SByte,
    ByteArray,
    SByteArray,
    Boolean,
    DateTime,
    DateTimeOffset,
    Guid,
    String,
    Char,
    /// A primitive-like type with no fixed mapping
    Other(String),
}

/// Naming rule applied to serialized names (properties, dictionary keys)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NamingPolicy {
    #[default]
    AsIs,
    CamelCase,
}

impl NamingPolicy {
    pub fn apply(&self, name: &str) -> String {
        match self {
            NamingPolicy::AsIs => name.to_string(),
            NamingPolicy::CamelCase => name.to_lower_camel_case(),
        }
    }
}

/// Lowercases the first character only: `HTTPError` -> `hTTPError`.
///
/// This is how serde's `camelCase` rule renames enum variants, so names built
/// with it match what is written on the wire.
pub fn lower_first_char(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Converter that writes enum members by name instead of by number
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StringEnumConverter {
    pub camel_case_text: bool,
}

/// One member of an enum type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumMember {
    /// Declared member name
    pub name: String,
    /// Explicit wire name overriding `name`
    pub value_override: Option<String>,
}

impl EnumMember {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value_override: None,
        }
    }

    pub fn renamed(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value_override: Some(value.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumContract {
    pub members: Vec<EnumMember>,
    /// String converter attached to the type itself
    pub converter: Option<StringEnumConverter>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayContract {
    pub item_type: Option<TypeRef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DictionaryContract {
    pub key_type: Option<TypeRef>,
    pub value_type: Option<TypeRef>,
    /// Naming rule applied to enum member names when the key type is an enum
    pub key_naming: NamingPolicy,
}

/// Validation metadata layered onto a property's schema
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyValidation {
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub pattern: Option<String>,
}

impl PropertyValidation {
    pub fn is_empty(&self) -> bool {
        *self == PropertyValidation::default()
    }
}

/// One serialized member of an object contract
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyContract {
    /// Serialized property name
    pub name: String,
    pub property_type: TypeRef,
    /// Excluded from serialization entirely
    pub ignored: bool,
    pub obsolete: bool,
    pub required: bool,
    pub validation: PropertyValidation,
}

impl PropertyContract {
    pub fn new(name: impl Into<String>, property_type: TypeRef) -> Self {
        Self {
            name: name.into(),
            property_type,
            ignored: false,
            obsolete: false,
            required: false,
            validation: PropertyValidation::default(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn ignored(mut self) -> Self {
        self.ignored = true;
        self
    }

    pub fn obsolete(mut self) -> Self {
        self.obsolete = true;
        self
    }

    pub fn with_validation(mut self, validation: PropertyValidation) -> Self {
        self.validation = validation;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectContract {
    pub properties: Vec<PropertyContract>,
    /// Value type of an open extension-data slot, if the type declares one
    pub extension_data_value_type: Option<TypeRef>,
}

/// Serialization shape of a type
#[derive(Debug, Clone, PartialEq)]
pub enum JsonContract {
    Primitive(PrimitiveKind),
    Enum(EnumContract),
    Array(ArrayContract),
    Dictionary(DictionaryContract),
    Object(ObjectContract),
    /// No declared shape (`object`)
    Any,
}

impl JsonContract {
    pub fn is_enum(&self) -> bool {
        matches!(self, JsonContract::Enum(_))
    }

    /// Replace generic parameters in every type this contract mentions.
    pub fn substitute(&self, params: &[String], args: &[TypeRef]) -> JsonContract {
        let sub = |t: &TypeRef| t.substitute(params, args);
        match self {
            JsonContract::Array(array) => JsonContract::Array(ArrayContract {
                item_type: array.item_type.as_ref().map(sub),
            }),
            JsonContract::Dictionary(dict) => JsonContract::Dictionary(DictionaryContract {
                key_type: dict.key_type.as_ref().map(sub),
                value_type: dict.value_type.as_ref().map(sub),
                key_naming: dict.key_naming,
            }),
            JsonContract::Object(object) => JsonContract::Object(ObjectContract {
                properties: object
                    .properties
                    .iter()
                    .map(|p| PropertyContract {
                        property_type: sub(&p.property_type),
                        ..p.clone()
                    })
                    .collect(),
                extension_data_value_type: object.extension_data_value_type.as_ref().map(sub),
            }),
            other => other.clone(),
        }
    }
}

/// Supplies the serialization contract of any runtime type
pub trait ContractResolver: Send + Sync {
    fn resolve_contract(&self, ty: &TypeRef) -> JsonContract;
}

/// A declared (possibly generic) type held by a [`ContractCatalog`]
#[derive(Debug, Clone)]
pub struct TypeDeclaration {
    pub generic_params: Vec<String>,
    pub contract: JsonContract,
}

/// A declared name standing for another type (`type A = B;`, newtypes)
#[derive(Debug, Clone)]
pub struct TypeAlias {
    pub generic_params: Vec<String>,
    pub target: TypeRef,
}

/// Alias chains deeper than this resolve to `Any`
const MAX_ALIAS_DEPTH: usize = 32;

type DeclarationKey = (Option<String>, String);

/// In-memory contract resolver
#[derive(Debug, Clone, Default)]
pub struct ContractCatalog {
    declarations: HashMap<DeclarationKey, TypeDeclaration>,
    aliases: HashMap<DeclarationKey, TypeAlias>,
}

impl ContractCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a non-generic type
    pub fn declare(&mut self, ty: TypeRef, contract: JsonContract) {
        self.declare_generic(ty, Vec::new(), contract);
    }

    /// Declare a generic type whose contract mentions `generic_params` by name
    pub fn declare_generic(&mut self, ty: TypeRef, generic_params: Vec<String>, contract: JsonContract) {
        debug!("Declaring contract for {}", ty);
        self.declarations.insert(
            (ty.namespace, ty.name),
            TypeDeclaration {
                generic_params,
                contract,
            },
        );
    }

    /// Declare `ty` as another name for `target`
    pub fn declare_alias(&mut self, ty: TypeRef, generic_params: Vec<String>, target: TypeRef) {
        debug!("Declaring {} as an alias of {}", ty, target);
        self.aliases.insert(
            (ty.namespace, ty.name),
            TypeAlias {
                generic_params,
                target,
            },
        );
    }

    pub fn contains(&self, namespace: Option<&str>, name: &str) -> bool {
        let key = (namespace.map(str::to_string), name.to_string());
        self.declarations.contains_key(&key) || self.aliases.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.declarations.len() + self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty() && self.aliases.is_empty()
    }

    fn resolve(&self, ty: &TypeRef, depth: usize) -> JsonContract {
        if depth > MAX_ALIAS_DEPTH {
            warn!("Alias chain for {} is too deep, treating it as an abstract object", ty);
            return JsonContract::Any;
        }

        let key = (ty.namespace.clone(), ty.name.clone());
        if let Some(declaration) = self.declarations.get(&key) {
            if declaration.generic_params.is_empty() {
                return declaration.contract.clone();
            }
            return declaration
                .contract
                .substitute(&declaration.generic_params, &ty.generic_args);
        }
        if let Some(alias) = self.aliases.get(&key) {
            let target = alias.target.substitute(&alias.generic_params, &ty.generic_args);
            return self.resolve(&target, depth + 1);
        }

        self.builtin_contract(ty, depth).unwrap_or_else(|| {
            debug!("No contract for {}, treating it as an abstract object", ty);
            JsonContract::Any
        })
    }

    /// Contracts of the well-known containers and value types
    fn builtin_contract(&self, ty: &TypeRef, depth: usize) -> Option<JsonContract> {
        let arg = |i: usize| ty.generic_args.get(i).cloned();

        let primitive = match ty.name.as_str() {
            "i16" => Some(PrimitiveKind::Int16),
            "u16" => Some(PrimitiveKind::UInt16),
            "i32" => Some(PrimitiveKind::Int32),
            "u32" => Some(PrimitiveKind::UInt32),
            "i64" | "isize" => Some(PrimitiveKind::Int64),
            "u64" | "usize" => Some(PrimitiveKind::UInt64),
            "f32" => Some(PrimitiveKind::Single),
            "f64" => Some(PrimitiveKind::Double),
            "Decimal" | "BigDecimal" => Some(PrimitiveKind::Decimal),
            "u8" => Some(PrimitiveKind::Byte),
            "i8" => Some(PrimitiveKind::SByte),
            "Bytes" => Some(PrimitiveKind::ByteArray),
            "bool" => Some(PrimitiveKind::Boolean),
            "NaiveDateTime" | "PrimitiveDateTime" | "SystemTime" => Some(PrimitiveKind::DateTime),
            "DateTime" | "OffsetDateTime" => Some(PrimitiveKind::DateTimeOffset),
            "Uuid" => Some(PrimitiveKind::Guid),
            "String" | "str" => Some(PrimitiveKind::String),
            "char" => Some(PrimitiveKind::Char),
            "i128" | "u128" | "NaiveDate" | "NaiveTime" | "Duration" => {
                Some(PrimitiveKind::Other(ty.name.clone()))
            }
            _ => None,
        };
        if let Some(kind) = primitive {
            return Some(JsonContract::Primitive(kind));
        }

        match ty.name.as_str() {
            "Vec" | "VecDeque" | "LinkedList" | "HashSet" | "BTreeSet" | "IndexSet" => {
                match arg(0) {
                    Some(item) if item.name == "u8" && item.generic_args.is_empty() => {
                        Some(JsonContract::Primitive(PrimitiveKind::ByteArray))
                    }
                    Some(item) if item.name == "i8" && item.generic_args.is_empty() => {
                        Some(JsonContract::Primitive(PrimitiveKind::SByteArray))
                    }
                    item_type => Some(JsonContract::Array(ArrayContract { item_type })),
                }
            }
            "HashMap" | "BTreeMap" | "IndexMap" => Some(JsonContract::Dictionary(DictionaryContract {
                key_type: arg(0),
                value_type: arg(1),
                key_naming: NamingPolicy::AsIs,
            })),
            "Option" | "Box" | "Arc" | "Rc" | "Cow" => {
                let inner = ty.generic_args.last()?;
                Some(self.resolve(inner, depth + 1))
            }
            "Value" | "object" => Some(JsonContract::Any),
            _ => None,
        }
    }
}

impl ContractResolver for ContractCatalog {
    fn resolve_contract(&self, ty: &TypeRef) -> JsonContract {
        self.resolve(ty, 0)
    }
}
