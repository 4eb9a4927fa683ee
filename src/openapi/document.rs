//! # Document Model
//!
//! Normalised in-memory view of a Swagger 2.0 or OpenAPI 3.0 description.
//! Only the parts the tool compiler consumes are modelled; unknown fields are
//! ignored. Both dialects deserialize into the same [`ApiDocument`]: the
//! presence of the `openapi` version marker decides which base-URL strategy is
//! authoritative.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Path item keys that name operations
pub const HTTP_METHODS: [&str; 8] =
    ["get", "put", "post", "delete", "options", "head", "patch", "trace"];

/// Name given to the body parameter synthesised from an OpenAPI 3 `requestBody`
pub const REQUEST_BODY_PARAM: &str = "body";

/// Deserialize `null` the same as a missing field
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Normalised API description
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDocument {
    /// Swagger 2.0 version marker
    #[serde(default, deserialize_with = "nullable")]
    pub swagger: String,

    /// OpenAPI 3.x version marker
    #[serde(default, deserialize_with = "nullable")]
    pub openapi: String,

    #[serde(default)]
    pub info: Option<ApiInfo>,

    #[serde(default, deserialize_with = "nullable")]
    pub host: String,

    #[serde(default, deserialize_with = "nullable")]
    pub base_path: String,

    #[serde(default, deserialize_with = "nullable")]
    pub servers: Vec<ServerEntry>,

    #[serde(default, deserialize_with = "nullable")]
    pub paths: BTreeMap<String, PathItem>,

    /// Swagger 2.0 schemas
    #[serde(default, deserialize_with = "nullable")]
    pub definitions: BTreeMap<String, SchemaDefinition>,

    /// OpenAPI 3.x schemas live under `components.schemas`
    #[serde(default)]
    pub components: Option<Components>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiInfo {
    #[serde(default, deserialize_with = "nullable")]
    pub title: String,
    #[serde(default, deserialize_with = "nullable")]
    pub version: String,
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerEntry {
    #[serde(default, deserialize_with = "nullable")]
    pub url: String,
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Components {
    #[serde(default, deserialize_with = "nullable")]
    pub schemas: BTreeMap<String, SchemaDefinition>,
}

/// Operations declared under one path template, plus path-level parameters
#[derive(Debug, Clone, Default)]
pub struct PathItem {
    /// Parameters shared by every operation of this path
    pub parameters: Vec<ParameterSpec>,
    /// Method name (as written in the document) to operation
    pub operations: BTreeMap<String, Operation>,
}

impl<'de> Deserialize<'de> for PathItem {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<Map<String, Value>> = Option::deserialize(deserializer)?;
        let mut item = PathItem::default();

        for (key, value) in raw.unwrap_or_default() {
            if key == "parameters" {
                item.parameters = Option::<Vec<ParameterSpec>>::deserialize(value)
                    .map_err(serde::de::Error::custom)?
                    .unwrap_or_default();
            } else if HTTP_METHODS.contains(&key.to_ascii_lowercase().as_str()) {
                let operation = Option::<Operation>::deserialize(value)
                    .map_err(|e| serde::de::Error::custom(format!("operation '{key}': {e}")))?
                    .unwrap_or_default();
                item.operations.insert(key, operation);
            }
        }

        Ok(item)
    }
}

impl PathItem {
    /// Parameters in effect for `operation`: path-level parameters not redeclared
    /// by the operation, the operation's own parameters, then a synthetic body
    /// parameter for an OpenAPI 3 JSON `requestBody`.
    pub fn effective_parameters(&self, operation: &Operation) -> Vec<ParameterSpec> {
        let mut params: Vec<ParameterSpec> = self
            .parameters
            .iter()
            .filter(|shared| {
                !operation
                    .parameters
                    .iter()
                    .any(|own| own.name == shared.name && own.location == shared.location)
            })
            .cloned()
            .collect();
        params.extend(operation.parameters.iter().cloned());

        if let Some(schema) = operation.request_body.as_ref().and_then(RequestBody::json_schema) {
            params.push(ParameterSpec {
                name: REQUEST_BODY_PARAM.to_string(),
                location: ParameterLocation::Body,
                required: operation.request_body.as_ref().map(|b| b.required).unwrap_or(false),
                param_type: String::new(),
                schema: Some(schema.clone()),
                description: String::new(),
            });
        }

        params
    }
}

/// One HTTP method under one path template
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(default, deserialize_with = "nullable")]
    pub summary: String,
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
    #[serde(default, deserialize_with = "nullable")]
    pub operation_id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub parameters: Vec<ParameterSpec>,
    #[serde(default)]
    pub request_body: Option<RequestBody>,
    #[serde(default, deserialize_with = "nullable")]
    pub responses: BTreeMap<String, ResponseSpec>,
}

/// Where a parameter is bound on the outgoing request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Body,
    /// `formData`, `cookie`, unresolved `$ref` parameters and anything else
    /// the compiler does not bind
    #[default]
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParameterSpec {
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(rename = "in", default)]
    pub location: ParameterLocation,
    #[serde(default, deserialize_with = "nullable")]
    pub required: bool,
    #[serde(rename = "type", default, deserialize_with = "nullable")]
    pub param_type: String,
    #[serde(default)]
    pub schema: Option<SchemaRef>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
}

impl ParameterSpec {
    /// Schema name a body parameter points at: the last `$ref` segment, else a raw type
    pub fn schema_name(&self) -> String {
        match &self.schema {
            Some(schema) if !schema.reference.is_empty() => {
                extract_schema_name(&schema.reference, &self.param_type)
            }
            Some(schema) if !schema.schema_type.is_empty() && self.param_type.is_empty() => {
                schema.schema_type.clone()
            }
            _ => self.param_type.clone(),
        }
    }
}

/// OpenAPI 3 request body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestBody {
    #[serde(default, deserialize_with = "nullable")]
    pub required: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub content: BTreeMap<String, MediaType>,
}

impl RequestBody {
    /// Schema of the JSON media type, if one is declared
    pub fn json_schema(&self) -> Option<&SchemaRef> {
        self.content
            .iter()
            .find(|(media, _)| media.starts_with("application/json") || media.ends_with("+json"))
            .and_then(|(_, media)| media.schema.as_ref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaType {
    #[serde(default)]
    pub schema: Option<SchemaRef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseSpec {
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
    #[serde(default)]
    pub schema: Option<SchemaRef>,
    #[serde(rename = "type", default, deserialize_with = "nullable")]
    pub response_type: String,
}

/// A schema reference or a minimal inline schema
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchemaRef {
    #[serde(rename = "$ref", default, deserialize_with = "nullable")]
    pub reference: String,
    #[serde(rename = "type", default, deserialize_with = "nullable")]
    pub schema_type: String,
    /// Inline first-level properties (only consulted when there is no `$ref`)
    #[serde(default)]
    pub properties: Option<BTreeMap<String, PropertySpec>>,
}

/// A named schema, one level deep
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchemaDefinition {
    #[serde(rename = "type", default, deserialize_with = "nullable")]
    pub schema_type: String,
    #[serde(default, deserialize_with = "nullable")]
    pub properties: BTreeMap<String, PropertySpec>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PropertySpec {
    #[serde(rename = "type", default, deserialize_with = "nullable")]
    pub property_type: String,
    #[serde(rename = "$ref", default, deserialize_with = "nullable")]
    pub reference: String,
}

impl PropertySpec {
    /// Declared scalar/array/object tag. Untyped `$ref` properties are objects;
    /// fully untyped properties pass through as strings.
    pub fn type_tag(&self) -> String {
        if !self.property_type.is_empty() {
            self.property_type.clone()
        } else if !self.reference.is_empty() {
            "object".to_string()
        } else {
            "string".to_string()
        }
    }
}

/// Last path segment of a `$ref`, or `schema_type` when there is no reference.
///
/// `extract_schema_name("#/components/schemas/User", "object") == "User"`
pub fn extract_schema_name(reference: &str, schema_type: &str) -> String {
    if reference.is_empty() {
        return schema_type.to_string();
    }
    reference.rsplit('/').next().unwrap_or(reference).to_string()
}

impl ApiDocument {
    /// Whether the OpenAPI 3 version marker is present
    pub fn is_openapi(&self) -> bool {
        !self.openapi.trim().is_empty()
    }

    /// Base URL derived from the document.
    ///
    /// OpenAPI: first server URL without its trailing slash, `/` when there are
    /// no servers. Swagger: `host` (defaulting to `https://`) plus `basePath`.
    pub fn base_url(&self) -> String {
        if self.is_openapi() {
            return match self.servers.first() {
                Some(server) => server.url.trim_end_matches('/').to_string(),
                None => "/".to_string(),
            };
        }

        let mut base = self.host.clone();
        if !base.starts_with("http://") && !base.starts_with("https://") {
            base = format!("https://{base}");
        }
        if !self.base_path.is_empty() {
            base = format!(
                "{}/{}",
                base.trim_end_matches('/'),
                self.base_path.trim_start_matches('/')
            );
        }
        base
    }

    /// Look a schema up by name in `definitions`, then `components.schemas`
    pub fn schema(&self, name: &str) -> Option<&SchemaDefinition> {
        self.definitions
            .get(name)
            .or_else(|| self.components.as_ref().and_then(|c| c.schemas.get(name)))
    }

    /// Version reported as the MCP server version
    pub fn api_version(&self) -> &str {
        match &self.info {
            Some(info) if !info.version.is_empty() => &info.version,
            _ => "1.0.0",
        }
    }

    /// Human-readable API title, when the document has one
    pub fn title(&self) -> Option<&str> {
        self.info.as_ref().map(|i| i.title.as_str()).filter(|t| !t.is_empty())
    }

    /// Number of operations across all paths
    pub fn operation_count(&self) -> usize {
        self.paths.values().map(|item| item.operations.len()).sum()
    }
}

/// Join a base URL and a path template with exactly one slash between them
pub fn join_url(base: &str, path_template: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path_template.trim_start_matches('/'))
}
