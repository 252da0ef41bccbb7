//! Auth header builder
//!
//! Pure mapping from a system's [`AuthConfig`] plus its additional headers to
//! the header set sent with every upstream request.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::collections::BTreeMap;

use crate::error::{EngineResult, QueryError};
use crate::models::AuthConfig;

pub const AUTHORIZATION: &str = "Authorization";

/// Header used for `api_key` auth when the system declares none
pub const DEFAULT_API_KEY_HEADER: &str = "X-API-Key";

pub type Headers = BTreeMap<String, String>;

fn required<'a>(value: &'a Option<String>, scheme: &str, field: &str) -> EngineResult<&'a str> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| QueryError::Authentication(format!("{} auth requires '{}'", scheme, field)))
}

/// Build the header map for `auth`, with `extra` merged on top.
pub fn build_auth_headers(auth: &AuthConfig, extra: &Headers) -> EngineResult<Headers> {
    let mut headers = Headers::new();

    match auth {
        AuthConfig::None => {}
        AuthConfig::Basic { username, password } => {
            let username = required(username, "basic", "username")?;
            let password = required(password, "basic", "password")?;
            let credentials = STANDARD.encode(format!("{}:{}", username, password));
            headers.insert(AUTHORIZATION.to_string(), format!("Basic {}", credentials));
        }
        AuthConfig::Bearer { token } => {
            let token = required(token, "bearer", "token")?;
            headers.insert(AUTHORIZATION.to_string(), format!("Bearer {}", token));
        }
        AuthConfig::ApiKey { key, header_name } => {
            let key = required(key, "api_key", "key")?;
            let name = header_name
                .as_deref()
                .filter(|h| !h.is_empty())
                .unwrap_or(DEFAULT_API_KEY_HEADER);
            headers.insert(name.to_string(), key.to_string());
        }
        // Token refresh is not handled here; an expired token surfaces as an
        // upstream 401.
        AuthConfig::OAuth { access_token, .. } => {
            let token = required(access_token, "oauth", "access_token")?;
            headers.insert(AUTHORIZATION.to_string(), format!("Bearer {}", token));
        }
        AuthConfig::Custom { headers: custom } => {
            headers.extend(custom.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
    }

    headers.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
    Ok(headers)
}
