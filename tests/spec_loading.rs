//! Loading API descriptions from files and URLs, then compiling them

use std::io::Write;
use std::time::{Duration, Instant};

use serde_json::json;
use swagger_mcp::config::{ApiConfig, SpecSizeLimit};
use swagger_mcp::mcp::ToolRegistry;
use swagger_mcp::openapi::{load_spec, load_spec_with_timeout, LoadError};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn swagger_spec() -> serde_json::Value {
    json!({
        "swagger": "2.0",
        "info": {"title": "Pets", "version": "1.2.3"},
        "host": "pets.example.com",
        "basePath": "/api",
        "paths": {
            "/pets": {
                "get": {"summary": "List pets"},
                "post": {
                    "summary": "Add pet",
                    "parameters": [
                        {"name": "body", "in": "body", "required": true, "schema": {"$ref": "#/definitions/Pet"}}
                    ]
                }
            },
            "/pets/{petId}": {
                "delete": {
                    "parameters": [{"name": "petId", "in": "path", "required": true, "type": "string"}]
                }
            }
        },
        "definitions": {
            "Pet": {"type": "object", "properties": {"name": {"type": "string"}, "age": {"type": "integer"}}}
        }
    })
}

fn write_spec(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write spec");
    file
}

#[tokio::test]
async fn test_load_file_and_compile() {
    let file = write_spec(&swagger_spec().to_string());
    let location = file.path().to_string_lossy().to_string();

    let document = load_spec(&location, SpecSizeLimit::default()).await.expect("spec loads");
    assert_eq!(document.api_version(), "1.2.3");
    assert_eq!(document.base_url(), "https://pets.example.com/api");

    let (registry, report) = ToolRegistry::from_document(&document, &ApiConfig::default());
    assert!(!report.has_collisions());
    assert_eq!(
        registry.names().collect::<Vec<_>>(),
        vec!["delete_/pets/petId", "get_/pets", "post_/pets"]
    );

    let post = registry.get("post_/pets").expect("post tool");
    assert_eq!(post.url_template, "https://pets.example.com/api/pets");
    assert_eq!(post.input_schema["required"], json!(["age", "name"]));
}

#[tokio::test]
async fn test_load_file_uri() {
    let file = write_spec(&swagger_spec().to_string());
    let location = format!("file://{}", file.path().display());

    let document = load_spec(&location, SpecSizeLimit::default()).await.expect("spec loads");
    assert_eq!(document.operation_count(), 3);
}

#[tokio::test]
async fn test_missing_file() {
    let err = load_spec("/definitely/not/here.json", SpecSizeLimit::default())
        .await
        .expect_err("missing file fails");
    assert!(matches!(err, LoadError::File(_)));
    assert!(err.to_string().starts_with("error reading file:"));
}

#[tokio::test]
async fn test_file_over_limit() {
    let file = write_spec(&swagger_spec().to_string());
    let location = file.path().to_string_lossy().to_string();

    let err = load_spec(&location, SpecSizeLimit(64)).await.expect_err("too large");
    assert_eq!(err.to_string(), "spec file too large (max 64 bytes)");
}

#[tokio::test]
async fn test_fetch_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/swagger.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(swagger_spec()))
        .mount(&server)
        .await;

    let document = load_spec(&format!("{}/swagger.json", server.uri()), SpecSizeLimit::default())
        .await
        .expect("spec loads");
    assert_eq!(document.title(), Some("Pets"));
}

#[tokio::test]
async fn test_fetch_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = load_spec(&format!("{}/missing.json", server.uri()), SpecSizeLimit::default())
        .await
        .expect_err("404 fails");
    assert_eq!(err.to_string(), "error getting spec: status 404");
}

#[tokio::test]
async fn test_fetch_times_out_on_slow_host() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(swagger_spec())
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let started = Instant::now();
    let err = load_spec_with_timeout(
        &format!("{}/swagger.json", server.uri()),
        SpecSizeLimit::default(),
        Duration::from_millis(200),
    )
    .await
    .expect_err("slow host times out");

    assert!(matches!(err, LoadError::Fetch(_)));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_fetch_over_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(swagger_spec()))
        .mount(&server)
        .await;

    let err = load_spec(&format!("{}/swagger.json", server.uri()), SpecSizeLimit(32))
        .await
        .expect_err("too large");
    assert!(matches!(err, LoadError::TooLarge { max: 32 }));
}

#[tokio::test]
async fn test_invalid_json() {
    let file = write_spec("{\"swagger\": ");
    let location = file.path().to_string_lossy().to_string();

    let err = load_spec(&location, SpecSizeLimit::default()).await.expect_err("parse fails");
    assert!(err.to_string().starts_with("error parsing JSON:"));
}
