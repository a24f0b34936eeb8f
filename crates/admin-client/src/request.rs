//! Per-request options and header/query helpers

use common::Secret;
use reqwest::Method;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};

/// Everything about one logical request except its path.
///
/// `skip_auth` keeps the request out of token handling entirely: no
/// `Authorization` header, no expiry check, no refresh, no 401 replay. The
/// refresh call itself and public endpoints use it.
///
/// `with_credentials` lets the request send and receive cookies from the
/// client's jar. Only endpoints that depend on the refresh cookie set it.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub skip_auth: bool,
    pub with_credentials: bool,
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    pub fn post() -> Self {
        Self::new(Method::POST)
    }

    pub fn put() -> Self {
        Self::new(Method::PUT)
    }

    pub fn patch() -> Self {
        Self::new(Method::PATCH)
    }

    pub fn delete() -> Self {
        Self::new(Method::DELETE)
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Serialize `body` as the JSON request body.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        let value = serde_json::to_value(body)
            .map_err(|e| Error::InvalidRequest(format!("serializing request body: {e}")))?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Add one query parameter. Empty values are dropped (see [`query_pairs`]).
    pub fn query(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        let value = value.into();
        self.query.extend(query_pairs(&key, &value));
        self
    }

    /// Add a whole filter payload, dropping empty values.
    pub fn query_payload<I, K>(mut self, payload: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        for (key, value) in payload {
            let key = key.into();
            self.query.extend(query_pairs(&key, &value));
        }
        self
    }

    pub fn skip_auth(mut self) -> Self {
        self.skip_auth = true;
        self
    }

    pub fn with_credentials(mut self) -> Self {
        self.with_credentials = true;
        self
    }
}

/// Expand one filter value into query pairs.
///
/// `null`, `""` and the `"all"` sentinel mean "no filter" and produce
/// nothing. Arrays repeat the key once per element; objects are sent as
/// JSON text.
pub fn query_pairs(key: &str, value: &Value) -> Vec<(String, String)> {
    match value {
        Value::Null => vec![],
        Value::String(s) if s.is_empty() || s == "all" => vec![],
        Value::String(s) => vec![(key.to_owned(), s.clone())],
        Value::Bool(b) => vec![(key.to_owned(), b.to_string())],
        Value::Number(n) => vec![(key.to_owned(), n.to_string())],
        Value::Array(items) => items.iter().flat_map(|v| query_pairs(key, v)).collect(),
        Value::Object(_) => vec![(key.to_owned(), value.to_string())],
    }
}

/// Copy `headers` and set `Authorization: Bearer <token>` on the copy.
///
/// Every other caller header is kept as-is; a caller-supplied
/// `Authorization` is replaced.
pub fn with_auth_header(headers: &HeaderMap, token: &Secret<String>) -> Result<HeaderMap> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_str()))
        .map_err(|_| Error::InvalidRequest("access token is not a valid header value".into()))?;
    value.set_sensitive(true);

    let mut merged = headers.clone();
    merged.insert(AUTHORIZATION, value);
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builders_set_method_and_flags() {
        let options = RequestOptions::post().skip_auth().with_credentials();
        assert_eq!(options.method, Method::POST);
        assert!(options.skip_auth);
        assert!(options.with_credentials);

        let options = RequestOptions::default();
        assert_eq!(options.method, Method::GET);
        assert!(!options.skip_auth);
        assert!(!options.with_credentials);
    }

    #[test]
    fn query_drops_empty_filters() {
        let options = RequestOptions::get()
            .query("page", 2)
            .query("limit", 10)
            .query("q", "")
            .query("status", "all")
            .query("category", Value::Null)
            .query("inStock", true);
        assert_eq!(
            options.query,
            vec![
                ("page".to_string(), "2".to_string()),
                ("limit".to_string(), "10".to_string()),
                ("inStock".to_string(), "true".to_string()),
            ]
        );
    }

    #[test]
    fn query_payload_expands_arrays_and_keeps_order() {
        let options = RequestOptions::get().query_payload([
            ("status", json!(["pending", "", "shipped"])),
            ("governorate", json!("cairo")),
            ("price", json!({"min": 10})),
        ]);
        assert_eq!(
            options.query,
            vec![
                ("status".to_string(), "pending".to_string()),
                ("status".to_string(), "shipped".to_string()),
                ("governorate".to_string(), "cairo".to_string()),
                ("price".to_string(), r#"{"min":10}"#.to_string()),
            ]
        );
    }

    #[test]
    fn json_body_serializes() {
        #[derive(Serialize)]
        struct NewCategory<'a> {
            name: &'a str,
        }
        let options = RequestOptions::post()
            .json(&NewCategory { name: "Shoes" })
            .unwrap();
        assert_eq!(options.body, Some(json!({"name": "Shoes"})));
    }

    #[test]
    fn auth_header_merge_preserves_caller_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-store-id", HeaderValue::from_static("eg-1"));
        headers.insert("accept-language", HeaderValue::from_static("ar"));

        let merged = with_auth_header(&headers, &Secret::from("at_1")).unwrap();

        assert_eq!(merged.get(AUTHORIZATION).unwrap(), "Bearer at_1");
        assert!(merged.get(AUTHORIZATION).unwrap().is_sensitive());
        assert_eq!(merged.get("x-store-id").unwrap(), "eg-1");
        assert_eq!(merged.get("accept-language").unwrap(), "ar");
        // The caller's map is untouched.
        assert!(headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn auth_header_replaces_caller_authorization() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic Zm9vOmJhcg=="));
        let merged = with_auth_header(&headers, &Secret::from("at_2")).unwrap();
        assert_eq!(merged.get_all(AUTHORIZATION).iter().count(), 1);
        assert_eq!(merged.get(AUTHORIZATION).unwrap(), "Bearer at_2");
    }

    #[test]
    fn token_with_control_characters_is_rejected() {
        let result = with_auth_header(&HeaderMap::new(), &Secret::from("bad\ntoken"));
        assert!(matches!(result, Err(Error::InvalidRequest(_))));
    }
}
