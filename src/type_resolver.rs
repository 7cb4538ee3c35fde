use crate::contract::{
    lower_first_char, ArrayContract, ContractCatalog, EnumContract, EnumMember, JsonContract,
    ObjectContract, PropertyContract, PropertyValidation, StringEnumConverter, TypeRef,
};
use crate::parser::ParsedFile;
use heck::{
    ToKebabCase, ToLowerCamelCase, ToShoutyKebabCase, ToShoutySnakeCase, ToSnakeCase,
    ToUpperCamelCase,
};
use log::{debug, warn};
use std::collections::HashSet;
use syn::ext::IdentExt;
use syn::meta::ParseNestedMeta;

/// Type resolver - builds serialization contracts from Rust type declarations
///
/// Structs with named fields become object contracts, field-less enums become
/// string enums, and newtypes, `#[serde(transparent)]` structs and `type`
/// aliases become aliases of the type they wrap. Serde and validator
/// attributes are honored where they change the wire shape.
pub struct TypeResolver {
    /// All parsed files, in scan order
    parsed_files: Vec<ParsedFile>,
}

/// A type declaration found in the source tree
enum Declaration<'a> {
    Struct(&'a syn::ItemStruct),
    Enum(&'a syn::ItemEnum),
    Alias(&'a syn::ItemType),
}

/// Serde `rename_all` rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameRule {
    LowerCase,
    UpperCase,
    PascalCase,
    CamelCase,
    SnakeCase,
    ScreamingSnakeCase,
    KebabCase,
    ScreamingKebabCase,
}

impl RenameRule {
    pub fn parse(rule: &str) -> Option<RenameRule> {
        match rule {
            "lowercase" => Some(RenameRule::LowerCase),
            "UPPERCASE" => Some(RenameRule::UpperCase),
            "PascalCase" => Some(RenameRule::PascalCase),
            "camelCase" => Some(RenameRule::CamelCase),
            "snake_case" => Some(RenameRule::SnakeCase),
            "SCREAMING_SNAKE_CASE" => Some(RenameRule::ScreamingSnakeCase),
            "kebab-case" => Some(RenameRule::KebabCase),
            "SCREAMING-KEBAB-CASE" => Some(RenameRule::ScreamingKebabCase),
            _ => None,
        }
    }

    /// Rename a field. Field names are snake_case, so word splitting is safe.
    pub fn apply_to_field(&self, name: &str) -> String {
        match self {
            RenameRule::LowerCase => name.to_lowercase(),
            RenameRule::UpperCase => name.to_uppercase(),
            RenameRule::PascalCase => name.to_upper_camel_case(),
            RenameRule::CamelCase => name.to_lower_camel_case(),
            RenameRule::SnakeCase => name.to_snake_case(),
            RenameRule::ScreamingSnakeCase => name.to_shouty_snake_case(),
            RenameRule::KebabCase => name.to_kebab_case(),
            RenameRule::ScreamingKebabCase => name.to_shouty_kebab_case(),
        }
    }

    /// Rename a variant the way serde does: every uppercase letter starts a
    /// word, so `HTTPError` becomes `h_t_t_p_error` under `snake_case`.
    pub fn apply_to_variant(&self, name: &str) -> String {
        match self {
            RenameRule::PascalCase => name.to_string(),
            RenameRule::LowerCase => name.to_ascii_lowercase(),
            RenameRule::UpperCase => name.to_ascii_uppercase(),
            RenameRule::CamelCase => lower_first_char(name),
            RenameRule::SnakeCase => {
                let mut snake = String::with_capacity(name.len() + 4);
                for (i, ch) in name.char_indices() {
                    if i > 0 && ch.is_uppercase() {
                        snake.push('_');
                    }
                    snake.push(ch.to_ascii_lowercase());
                }
                snake
            }
            RenameRule::ScreamingSnakeCase => RenameRule::SnakeCase.apply_to_variant(name).to_ascii_uppercase(),
            RenameRule::KebabCase => RenameRule::SnakeCase.apply_to_variant(name).replace('_', "-"),
            RenameRule::ScreamingKebabCase => {
                RenameRule::ScreamingSnakeCase.apply_to_variant(name).replace('_', "-")
            }
        }
    }
}

/// Serde attributes on a struct or enum
#[derive(Debug, Clone, Default)]
pub struct ContainerAttributes {
    pub rename_all: Option<RenameRule>,
    /// Every field falls back to `Default`
    pub default: bool,
    pub transparent: bool,
    /// Any tagging attribute (`tag`, `untagged`, `content`)
    pub tagged: bool,
}

/// Serde, validator and deprecation attributes on a field or variant
#[derive(Debug, Clone, Default)]
pub struct FieldAttributes {
    /// Renamed field name
    pub rename: Option<String>,
    /// Whether to skip this field during serialization
    pub skip: bool,
    /// Whether to flatten this field
    pub flatten: bool,
    /// Field may be absent on the wire
    pub default: bool,
    pub deprecated: bool,
    pub validation: PropertyValidation,
}

impl TypeResolver {
    /// Create a new TypeResolver with parsed files
    pub fn new(parsed_files: Vec<ParsedFile>) -> Self {
        debug!("Initializing TypeResolver with {} files", parsed_files.len());
        Self { parsed_files }
    }

    /// Build a contract catalog from every declaration in the parsed files.
    ///
    /// When two files declare the same type name, the first declaration wins.
    pub fn build_catalog(&self) -> ContractCatalog {
        let declarations = self.collect_declarations();
        let mut catalog = ContractCatalog::new();

        for (name, declaration) in &declarations {
            match declaration {
                Declaration::Struct(item) => declare_struct(&mut catalog, name, item, &declarations),
                Declaration::Enum(item) => declare_enum(&mut catalog, name, item),
                Declaration::Alias(item) => {
                    catalog.declare_alias(
                        TypeRef::new(name.as_str()),
                        generic_params(&item.generics),
                        TypeRef::from_syn(&item.ty),
                    );
                }
            }
        }

        debug!("Built {} contracts", catalog.len());
        catalog
    }

    /// Declarations by name in first-seen order, including inline modules
    fn collect_declarations(&self) -> Vec<(String, Declaration<'_>)> {
        let mut declarations = Vec::new();
        let mut seen = HashSet::new();
        for parsed_file in &self.parsed_files {
            collect_items(&parsed_file.syntax_tree.items, &mut declarations, &mut seen, parsed_file);
        }
        declarations
    }
}

fn declare_struct(
    catalog: &mut ContractCatalog,
    name: &str,
    item: &syn::ItemStruct,
    declarations: &[(String, Declaration<'_>)],
) {
    let ty = TypeRef::new(name);
    let params = generic_params(&item.generics);
    let container = parse_container_attributes(&item.attrs);

    match &item.fields {
        syn::Fields::Named(_) if !container.transparent => {
            let mut visiting = HashSet::from([name.to_string()]);
            let contract = object_contract(item, declarations, &mut visiting);
            catalog.declare_generic(ty, params, JsonContract::Object(contract));
        }
        fields if fields.len() == 1 => {
            // Newtypes and transparent structs serialize as their only field
            if let Some(field) = fields.iter().next() {
                catalog.declare_alias(ty, params, TypeRef::from_syn(&field.ty));
            }
        }
        syn::Fields::Unit => {
            catalog.declare(ty, JsonContract::Any);
        }
        _ => {
            // Tuple structs serialize as arrays of mixed items
            debug!("Struct {} is a tuple struct, describing it as an abstract array", name);
            catalog.declare(ty, JsonContract::Array(ArrayContract { item_type: None }));
        }
    }
}

fn collect_items<'a>(
    items: &'a [syn::Item],
    declarations: &mut Vec<(String, Declaration<'a>)>,
    seen: &mut HashSet<String>,
    parsed_file: &ParsedFile,
) {
    for item in items {
        let (name, declaration) = match item {
            syn::Item::Struct(item_struct) => (item_struct.ident.to_string(), Declaration::Struct(item_struct)),
            syn::Item::Enum(item_enum) => (item_enum.ident.to_string(), Declaration::Enum(item_enum)),
            syn::Item::Type(item_type) => (item_type.ident.to_string(), Declaration::Alias(item_type)),
            syn::Item::Mod(item_mod) => {
                if let Some((_, nested)) = &item_mod.content {
                    collect_items(nested, declarations, seen, parsed_file);
                }
                continue;
            }
            _ => continue,
        };

        if !seen.insert(name.clone()) {
            warn!(
                "Duplicate declaration of {} in {}, keeping the first one",
                name,
                parsed_file.path.display()
            );
            continue;
        }
        debug!("Found declaration {} in {}", name, parsed_file.path.display());
        declarations.push((name, declaration));
    }
}

fn generic_params(generics: &syn::Generics) -> Vec<String> {
    generics.type_params().map(|p| p.ident.to_string()).collect()
}

/// Object contract for a struct with named fields.
///
/// Flattened structs contribute their own properties; a flattened map becomes
/// the extension-data slot.
fn object_contract(
    item: &syn::ItemStruct,
    declarations: &[(String, Declaration<'_>)],
    visiting: &mut HashSet<String>,
) -> ObjectContract {
    let container = parse_container_attributes(&item.attrs);
    let mut contract = ObjectContract::default();

    for field in &item.fields {
        let Some(ident) = &field.ident else { continue };
        let field_name = ident.unraw().to_string();
        let attrs = parse_field_attributes(&field.attrs);
        let field_type = TypeRef::from_syn(&field.ty);

        if attrs.flatten {
            flatten_into(&mut contract, &field_type, declarations, visiting);
            continue;
        }

        let name = match (&attrs.rename, container.rename_all) {
            (Some(rename), _) => rename.clone(),
            (None, Some(rule)) => rule.apply_to_field(&field_name),
            (None, None) => field_name,
        };

        let mut property = PropertyContract::new(name, field_type.clone())
            .with_validation(attrs.validation);
        property.ignored = attrs.skip;
        property.obsolete = attrs.deprecated;
        property.required = !field_type.is_option() && !attrs.default && !container.default;
        contract.properties.push(property);
    }

    contract
}

fn flatten_into(
    contract: &mut ObjectContract,
    field_type: &TypeRef,
    declarations: &[(String, Declaration<'_>)],
    visiting: &mut HashSet<String>,
) {
    let inner = field_type.strip_wrappers();
    if matches!(inner.name.as_str(), "HashMap" | "BTreeMap" | "IndexMap") {
        contract.extension_data_value_type = inner.generic_args.get(1).cloned();
        return;
    }

    let flattened = declarations.iter().find_map(|(name, declaration)| match declaration {
        Declaration::Struct(item) if *name == inner.name && item.generics.params.is_empty() => Some(item),
        _ => None,
    });
    match flattened {
        Some(item) if visiting.insert(inner.name.clone()) => {
            let nested = object_contract(item, declarations, visiting);
            contract.properties.extend(nested.properties);
            if nested.extension_data_value_type.is_some() {
                contract.extension_data_value_type = nested.extension_data_value_type;
            }
            visiting.remove(&inner.name);
        }
        _ => warn!("Cannot flatten {}, its fields are not declared in the scanned sources", inner),
    }
}

fn declare_enum(catalog: &mut ContractCatalog, name: &str, item: &syn::ItemEnum) {
    let container = parse_container_attributes(&item.attrs);
    let unit_only = item
        .variants
        .iter()
        .all(|v| matches!(v.fields, syn::Fields::Unit));

    if !unit_only || container.tagged {
        debug!("Enum {} carries data, describing it as an abstract object", name);
        catalog.declare(TypeRef::new(name), JsonContract::Any);
        return;
    }

    let camel_case = container.rename_all == Some(RenameRule::CamelCase);
    let members = item
        .variants
        .iter()
        .map(|variant| {
            let variant_name = variant.ident.unraw().to_string();
            let attrs = parse_field_attributes(&variant.attrs);
            let value_override = match (attrs.rename, container.rename_all) {
                (Some(rename), _) => Some(rename),
                (None, Some(rule)) if rule != RenameRule::CamelCase => Some(rule.apply_to_variant(&variant_name)),
                _ => None,
            };
            EnumMember {
                name: variant_name,
                value_override,
            }
        })
        .collect();

    debug!("Declaring enum {} as a string enum", name);
    catalog.declare(
        TypeRef::new(name),
        JsonContract::Enum(EnumContract {
            members,
            // Serde writes unit variants by name
            converter: Some(StringEnumConverter {
                camel_case_text: camel_case,
            }),
        }),
    );
}

/// Parse serde attributes from container attributes
pub fn parse_container_attributes(attrs: &[syn::Attribute]) -> ContainerAttributes {
    let mut container = ContainerAttributes::default();

    for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
        let result = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") {
                if meta.input.peek(syn::Token![=]) {
                    let rule: syn::LitStr = meta.value()?.parse()?;
                    container.rename_all = RenameRule::parse(&rule.value());
                    if container.rename_all.is_none() {
                        warn!("Unsupported rename_all rule: {}", rule.value());
                    }
                } else {
                    skip_meta_value(&meta)?;
                }
            } else if meta.path.is_ident("default") {
                container.default = true;
                skip_meta_value(&meta)?;
            } else if meta.path.is_ident("transparent") {
                container.transparent = true;
            } else if meta.path.is_ident("tag")
                || meta.path.is_ident("untagged")
                || meta.path.is_ident("content")
            {
                container.tagged = true;
                skip_meta_value(&meta)?;
            } else {
                skip_meta_value(&meta)?;
            }
            Ok(())
        });
        if let Err(e) = result {
            debug!("Ignoring unreadable serde attribute: {}", e);
        }
    }

    container
}

/// Parse serde, validate and deprecated attributes from field attributes
pub fn parse_field_attributes(attrs: &[syn::Attribute]) -> FieldAttributes {
    let mut field = FieldAttributes::default();

    for attr in attrs {
        if attr.path().is_ident("deprecated") {
            field.deprecated = true;
            continue;
        }

        let result = if attr.path().is_ident("serde") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    if meta.input.peek(syn::Token![=]) {
                        let value: syn::LitStr = meta.value()?.parse()?;
                        debug!("Found serde rename: {}", value.value());
                        field.rename = Some(value.value());
                    } else {
                        // rename(serialize = "..") names the serialized form
                        meta.parse_nested_meta(|nested| {
                            if nested.path.is_ident("serialize") {
                                let value: syn::LitStr = nested.value()?.parse()?;
                                field.rename = Some(value.value());
                            } else {
                                skip_meta_value(&nested)?;
                            }
                            Ok(())
                        })?;
                    }
                } else if meta.path.is_ident("skip") || meta.path.is_ident("skip_serializing") {
                    field.skip = true;
                } else if meta.path.is_ident("flatten") {
                    field.flatten = true;
                } else if meta.path.is_ident("default") || meta.path.is_ident("skip_serializing_if") {
                    field.default = true;
                    skip_meta_value(&meta)?;
                } else {
                    skip_meta_value(&meta)?;
                }
                Ok(())
            })
        } else if attr.path().is_ident("validate") {
            attr.parse_nested_meta(|meta| parse_validation(&meta, &mut field.validation))
        } else {
            Ok(())
        };

        if let Err(e) = result {
            debug!("Ignoring unreadable attribute: {}", e);
        }
    }

    field
}

fn parse_validation(meta: &ParseNestedMeta, validation: &mut PropertyValidation) -> syn::Result<()> {
    if meta.path.is_ident("range") {
        meta.parse_nested_meta(|nested| {
            let bound = nested.value()?.parse::<syn::Expr>()?;
            if nested.path.is_ident("min") {
                validation.minimum = expr_to_f64(&bound);
            } else if nested.path.is_ident("max") {
                validation.maximum = expr_to_f64(&bound);
            }
            Ok(())
        })
    } else if meta.path.is_ident("length") {
        meta.parse_nested_meta(|nested| {
            let bound = nested.value()?.parse::<syn::Expr>()?;
            let bound = expr_to_f64(&bound).filter(|b| *b >= 0.0).map(|b| b as u64);
            if nested.path.is_ident("min") {
                validation.min_length = bound;
            } else if nested.path.is_ident("max") {
                validation.max_length = bound;
            } else if nested.path.is_ident("equal") {
                validation.min_length = bound;
                validation.max_length = bound;
            }
            Ok(())
        })
    } else if meta.path.is_ident("regex") {
        meta.parse_nested_meta(|nested| {
            if nested.path.is_ident("pattern") {
                let pattern: syn::LitStr = nested.value()?.parse()?;
                validation.pattern = Some(pattern.value());
            } else {
                skip_meta_value(&nested)?;
            }
            Ok(())
        })
    } else {
        skip_meta_value(meta)
    }
}

/// Consume `= value` or `(..)` after a meta path we don't interpret
fn skip_meta_value(meta: &ParseNestedMeta) -> syn::Result<()> {
    if meta.input.peek(syn::Token![=]) {
        meta.value()?.parse::<syn::Expr>()?;
    } else if meta.input.peek(syn::token::Paren) {
        meta.parse_nested_meta(|nested| skip_meta_value(&nested))?;
    }
    Ok(())
}

/// Numeric value of a literal expression such as `1`, `-2.5` or `"3"`
fn expr_to_f64(expr: &syn::Expr) -> Option<f64> {
    match expr {
        syn::Expr::Lit(lit) => match &lit.lit {
            syn::Lit::Int(i) => i.base10_parse::<f64>().ok(),
            syn::Lit::Float(f) => f.base10_parse::<f64>().ok(),
            syn::Lit::Str(s) => s.value().parse().ok(),
            _ => None,
        },
        syn::Expr::Unary(unary) if matches!(unary.op, syn::UnOp::Neg(_)) => {
            expr_to_f64(&unary.expr).map(|v| -v)
        }
        syn::Expr::Paren(paren) => expr_to_f64(&paren.expr),
        _ => None,
    }
}
