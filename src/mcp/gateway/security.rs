//! Outbound authentication for gateway tool calls.
//!
//! One scheme is configured per server and applied to every dispatched request
//! after the operation's own header parameters, so it can override them.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, COOKIE};
use tracing::{debug, warn};
use url::Url;

/// Authentication scheme selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SecurityScheme {
    #[default]
    None,
    Basic,
    Bearer,
    ApiKey,
}

impl SecurityScheme {
    /// Parse a scheme selector. Empty or unrecognised values mean no authentication.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "basic" => SecurityScheme::Basic,
            "bearer" => SecurityScheme::Bearer,
            "apikey" => SecurityScheme::ApiKey,
            "" => SecurityScheme::None,
            other => {
                warn!(scheme = %other, "Unknown security scheme, requests will be sent unauthenticated");
                SecurityScheme::None
            }
        }
    }
}

/// Scheme plus the credential strings for every scheme
#[derive(Debug, Clone, Default)]
pub struct SecurityConfig {
    pub scheme: SecurityScheme,
    /// `user:password`
    pub basic_auth: String,
    /// `passAs:name=value,...`
    pub api_key_auth: String,
    pub bearer_auth: String,
}

/// Where an API key is carried
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiKeyPlacement {
    Header,
    Query,
    Cookie,
}

/// One `passAs:name=value` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiKeyEntry {
    pub placement: ApiKeyPlacement,
    pub name: String,
    pub value: String,
}

impl ApiKeyEntry {
    /// Parse a single entry. Returns `None` when the colon or `=` is missing,
    /// when the name between them is empty, or when `passAs` is unknown.
    pub fn parse(entry: &str) -> Option<Self> {
        let colon = entry.find(':')?;
        let eq = entry.find('=')?;
        if eq < colon + 2 {
            return None;
        }

        let placement = match entry[..colon].trim().to_ascii_lowercase().as_str() {
            "header" => ApiKeyPlacement::Header,
            "query" => ApiKeyPlacement::Query,
            "cookie" => ApiKeyPlacement::Cookie,
            _ => return None,
        };

        Some(Self {
            placement,
            name: entry[colon + 1..eq].trim().to_string(),
            value: entry[eq + 1..].trim().to_string(),
        })
    }
}

/// Parse a comma-separated api-key specification, skipping malformed entries
pub fn parse_api_key_entries(spec: &str) -> Vec<ApiKeyEntry> {
    spec.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| {
            let parsed = ApiKeyEntry::parse(entry);
            if parsed.is_none() {
                debug!(entry = %entry, "Skipping malformed api key entry");
            }
            parsed
        })
        .collect()
}

/// Set `name=value` in the query string, replacing existing values for `name`
pub fn set_query_param(url: &mut Url, name: &str, value: &str) {
    let retained: Vec<(String, String)> =
        url.query_pairs().filter(|(k, _)| k != name).map(|(k, v)| (k.into_owned(), v.into_owned())).collect();

    let mut pairs = url.query_pairs_mut();
    pairs.clear();
    pairs.extend_pairs(retained);
    pairs.append_pair(name, value);
}

/// Insert a header, replacing prior values. Invalid names or values are skipped.
pub fn set_header(headers: &mut HeaderMap, name: &str, value: &str) {
    match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
        (Ok(name), Ok(value)) => {
            headers.insert(name, value);
        }
        _ => warn!(header = %name, "Skipping header with invalid name or value"),
    }
}

/// Append a header value, keeping prior values of the same name
pub fn append_header(headers: &mut HeaderMap, name: &str, value: &str) {
    match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
        (Ok(name), Ok(value)) => {
            headers.append(name, value);
        }
        _ => warn!(header = %name, "Skipping header with invalid name or value"),
    }
}

fn add_cookie(headers: &mut HeaderMap, name: &str, value: &str) {
    let pair = format!("{name}={value}");
    let cookie = match headers.get(COOKIE).and_then(|v| v.to_str().ok()) {
        Some(existing) if !existing.is_empty() => format!("{existing}; {pair}"),
        _ => pair,
    };
    set_header(headers, COOKIE.as_str(), &cookie);
}

/// Apply the configured scheme to an outbound request
pub fn apply_security(url: &mut Url, headers: &mut HeaderMap, config: &SecurityConfig) {
    match config.scheme {
        SecurityScheme::Basic => {
            if !config.basic_auth.is_empty() {
                let encoded = STANDARD.encode(config.basic_auth.as_bytes());
                set_header(headers, AUTHORIZATION.as_str(), &format!("Basic {encoded}"));
            }
        }
        SecurityScheme::Bearer => {
            if !config.bearer_auth.is_empty() {
                set_header(headers, AUTHORIZATION.as_str(), &format!("Bearer {}", config.bearer_auth));
            }
        }
        SecurityScheme::ApiKey => {
            let spec = if config.api_key_auth.is_empty() {
                &config.basic_auth
            } else {
                &config.api_key_auth
            };
            for entry in parse_api_key_entries(spec) {
                match entry.placement {
                    ApiKeyPlacement::Header => set_header(headers, &entry.name, &entry.value),
                    ApiKeyPlacement::Query => set_query_param(url, &entry.name, &entry.value),
                    ApiKeyPlacement::Cookie => add_cookie(headers, &entry.name, &entry.value),
                }
            }
        }
        SecurityScheme::None => {}
    }
}
