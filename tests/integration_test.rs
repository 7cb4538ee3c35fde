use pretty_assertions::assert_eq;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use swagger_gen::{
    contract::ContractCatalog,
    manifest::Manifest,
    openapi::{Document, HttpMethod, ParameterStyle},
    parser::AstParser,
    scanner::FileScanner,
    schema::Schema,
    serializer::{serialize_json, serialize_yaml},
    type_resolver::TypeResolver,
};
use tempfile::TempDir;

/// Helper function to create a temporary project holding the given files
fn create_test_project(files: Vec<(&str, &str)>) -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");

    for (path, content) in files {
        let file_path = temp_dir.path().join(path);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(&file_path, content).expect("Failed to write test file");
    }

    temp_dir
}

/// Scan, parse and resolve every type declared under `root`
fn catalog_for(root: &Path) -> ContractCatalog {
    let scan_result = FileScanner::new(root.to_path_buf())
        .scan()
        .expect("Failed to scan directory");
    let parsed_files: Vec<_> = AstParser::parse_files(&scan_result.rust_files)
        .into_iter()
        .filter_map(Result::ok)
        .collect();
    TypeResolver::new(parsed_files).build_catalog()
}

fn shop_document(document_name: &str) -> Document {
    let project = create_test_project(vec![
        ("models/shop.rs", include_str!("fixtures/shop_models.rs")),
        ("routes.yaml", include_str!("fixtures/shop_routes.yaml")),
    ]);
    let catalog = catalog_for(&project.path().join("models"));
    let manifest = Manifest::load(&project.path().join("routes.yaml")).expect("Failed to load manifest");

    manifest
        .generate(Arc::new(catalog), document_name)
        .expect("Failed to generate document")
}

fn to_json(schema: &Schema) -> serde_json::Value {
    serde_json::to_value(schema).unwrap()
}

#[test]
fn test_shop_paths_are_grouped_and_sorted() {
    let document = shop_document("v1");

    assert_eq!(document.openapi, "3.0.1");
    assert_eq!(document.info.title, "Shop API");
    let paths: Vec<_> = document.paths.keys().cloned().collect();
    assert_eq!(paths, vec!["/carts", "/carts/{cartId}", "/products/{sku}", "/products"]);
    assert!(document.servers.is_empty());
}

#[test]
fn test_group_name_selects_documents() {
    let internal = shop_document("internal");

    assert!(internal.paths.contains_key("/reindex"));
    let reindex = internal.paths["/reindex"].operation(HttpMethod::Post).unwrap();
    assert_eq!(reindex.tags, vec!["Maintenance"]);
    assert_eq!(reindex.responses["200"].description, "Success");
    assert!(reindex.responses["200"].content.is_none());
}

#[test]
fn test_shop_operations() {
    let document = shop_document("v1");

    let get_cart = document.paths["/carts/{cartId}"].get.as_ref().unwrap();
    assert_eq!(get_cart.operation_id.as_deref(), Some("CartsByCartIdGet"));
    assert_eq!(get_cart.tags, vec!["Carts"]);
    let cart_id = &get_cart.parameters.as_ref().unwrap()[0];
    assert!(cart_id.required);
    assert_eq!(cart_id.schema, Some(Schema::with_format("integer", "int64")));
    assert_eq!(get_cart.responses["404"].description, "No such cart");
    assert_eq!(
        get_cart.responses["200"].content.as_ref().unwrap()["application/json"].schema,
        Some(Schema::reference_to("Cart"))
    );

    let create_cart = document.paths["/carts"].post.as_ref().unwrap();
    let body = create_cart.request_body.as_ref().unwrap();
    assert!(body.required);
    assert_eq!(body.content["application/json"].schema, Some(Schema::reference_to("Cart")));
    let codes: Vec<_> = create_cart.responses.keys().cloned().collect();
    assert_eq!(codes, vec!["201", "401", "403"]);
    assert_eq!(
        create_cart.security.as_ref().unwrap()[0]["oauth2"],
        vec!["carts.write".to_string()]
    );

    let list_products = document.paths["/products"].get.as_ref().unwrap();
    let parameters = list_products.parameters.as_ref().unwrap();
    let names: Vec<_> = parameters.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["page", "skus"]);
    assert_eq!(parameters[0].style, None);
    assert_eq!(parameters[1].style, Some(ParameterStyle::DeepObject));

    let delete_product = document.paths["/products/{sku}"].delete.as_ref().unwrap();
    assert!(delete_product.deprecated);
    assert_eq!(delete_product.responses["204"].description, "Success");
    assert!(delete_product.responses["204"].content.is_none());
}

#[test]
fn test_shop_schemas() {
    let document = shop_document("v1");
    let schemas = &document.components.as_ref().unwrap().schemas;

    let mut ids: Vec<_> = schemas.keys().cloned().collect();
    ids.sort();
    assert_eq!(ids, vec!["Cart", "CartLine", "Customer", "PageOfProduct", "Product"]);

    assert_eq!(
        to_json(&schemas["Cart"]),
        json!({
            "type": "object",
            "properties": {
                "cartId": { "type": "integer", "format": "int64" },
                "owner": { "$ref": "#/components/schemas/Customer" },
                "lines": { "type": "array", "items": { "$ref": "#/components/schemas/CartLine" } },
                "coupon": { "type": "string" },
                "legacyTotal": { "type": "number", "format": "double" }
            },
            "required": ["cartId", "owner", "lines", "legacyTotal"]
        })
    );

    assert_eq!(
        to_json(&schemas["CartLine"])["properties"]["quantity"],
        json!({ "type": "integer", "format": "int32", "minimum": 1.0, "maximum": 99.0 })
    );

    let product = to_json(&schemas["Product"]);
    assert_eq!(
        product["properties"]["status"],
        json!({ "type": "string", "enum": ["inStock", "backOrdered", "discontinued"] })
    );
    assert_eq!(
        product["properties"]["prices"],
        json!({
            "type": "object",
            "properties": {
                "Eur": { "type": "number", "format": "double" },
                "Usd": { "type": "number", "format": "double" }
            }
        })
    );
    assert_eq!(
        product["properties"]["attributes"],
        json!({ "type": "object", "additionalProperties": { "type": "string" } })
    );
    assert_eq!(
        product["properties"]["related"]["items"]["$ref"],
        "#/components/schemas/Product"
    );

    let customer = to_json(&schemas["Customer"]);
    assert_eq!(customer["properties"]["id"], json!({ "type": "integer", "format": "int64" }));
    assert_eq!(customer["properties"]["referrer"]["$ref"], "#/components/schemas/Customer");

    assert_eq!(
        to_json(&schemas["PageOfProduct"])["properties"]["items"]["items"]["$ref"],
        "#/components/schemas/Product"
    );

    assert!(document.dangling_references().is_empty());
}

#[test]
fn test_security_definitions_are_published() {
    let document = shop_document("v1");
    let security_schemes = document
        .components
        .as_ref()
        .unwrap()
        .security_schemes
        .as_ref()
        .unwrap();

    let oauth2 = &security_schemes["oauth2"];
    assert_eq!(oauth2.scheme_type, "oauth2");
    let flow = oauth2.flows.as_ref().unwrap().client_credentials.as_ref().unwrap();
    assert_eq!(flow.token_url.as_deref(), Some("https://auth.example.com/token"));
}

#[test]
fn test_generation_is_deterministic() {
    let first = serialize_json(&shop_document("v1")).unwrap();
    let second = serialize_json(&shop_document("v1")).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_yaml_output() {
    let yaml = serialize_yaml(&shop_document("v1")).unwrap();

    assert!(yaml.contains("openapi:"));
    assert!(yaml.contains("/carts/{cartId}"));
    assert!(yaml.contains("#/components/schemas/Cart"));
    assert!(yaml.contains("securitySchemes:"));
}

#[test]
fn test_json_manifest_without_types() {
    let project = create_test_project(vec![(
        "routes.json",
        r#"{
            "documents": { "v1": { "title": "Ping", "version": "1" } },
            "routes": [
                {
                    "httpMethod": "GET",
                    "relativePath": "ping",
                    "controllerName": "Health",
                    "actionName": "Ping",
                    "supportedResponseTypes": [
                        { "statusCode": 200, "type": "Pong", "mediaTypes": ["application/json"] }
                    ]
                }
            ],
            "options": { "schemes": ["http", "https"] }
        }"#,
    )]);
    let manifest = Manifest::load(&project.path().join("routes.json")).unwrap();

    let document = manifest.generate(Arc::new(ContractCatalog::new()), "v1").unwrap();

    let urls: Vec<_> = document.servers.iter().map(|s| s.url.as_str()).collect();
    assert_eq!(urls, vec!["http://example.org/", "https://example.org/"]);
    // Unknown types degrade to an open object instead of failing
    let ok = &document.paths["/ping"].get.as_ref().unwrap().responses["200"];
    assert_eq!(
        ok.content.as_ref().unwrap()["application/json"].schema,
        Some(Schema::object())
    );
    assert!(document.components.is_none());
}
