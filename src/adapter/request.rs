use std::collections::HashMap;

use serde_json::Value;

/// Request body as the handlers see it
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    /// Anything that did not parse as JSON
    Text(String),
}

impl RequestBody {
    pub fn parse(raw: &[u8]) -> Self {
        if raw.iter().all(u8::is_ascii_whitespace) {
            return RequestBody::Empty;
        }
        match serde_json::from_slice::<Value>(raw) {
            Ok(value) => RequestBody::Json(value),
            Err(_) => RequestBody::Text(String::from_utf8_lossy(raw).into_owned()),
        }
    }

    /// Top-level field of a JSON object body
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            RequestBody::Json(Value::Object(map)) => map.get(name),
            _ => None,
        }
    }

    /// Field as text. Numbers are taken in their JSON spelling, other
    /// non-string values count as absent.
    pub fn text_field(&self, name: &str) -> Option<String> {
        match self.field(name)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            other => {
                log::debug!("Ignoring non-text value for '{}': {}", name, other);
                None
            }
        }
    }
}

/// Platform-independent request handed to the router
#[derive(Debug, Clone, Default)]
pub struct ApiRequest {
    /// Upper-case method name
    pub method: String,
    /// Path without the query string
    pub path: String,
    pub query: HashMap<String, String>,
    /// Lower-case header names
    pub headers: HashMap<String, String>,
    pub body: RequestBody,
    /// Source address of the caller, if known
    pub client_ip: Option<String>,
    /// Filled in by the router from the matched path
    pub params: HashMap<String, String>,
}

impl ApiRequest {
    /// `target` may carry a query string, which is split off into `query`
    pub fn new(method: &str, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (target, None),
        };
        let path = if path.is_empty() { "/" } else { path };

        let request = Self {
            method: method.to_ascii_uppercase(),
            path: path.to_string(),
            ..Default::default()
        };
        match query {
            Some(query) => request.with_query_string(query),
            None => request,
        }
    }

    pub fn with_query_string(mut self, query: &str) -> Self {
        self.query.extend(
            url::form_urlencoded::parse(query.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned())),
        );
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn with_body(mut self, raw: &[u8]) -> Self {
        self.body = RequestBody::parse(raw);
        self
    }

    pub fn with_client_ip(mut self, ip: Option<String>) -> Self {
        self.client_ip = ip;
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_json_or_falls_back_to_text() {
        assert_eq!(
            RequestBody::parse(br#"{"url":"https://a.com"}"#),
            RequestBody::Json(json!({ "url": "https://a.com" }))
        );
        assert_eq!(
            RequestBody::parse(b"url=https://a.com"),
            RequestBody::Text("url=https://a.com".to_string())
        );
        assert_eq!(RequestBody::parse(b""), RequestBody::Empty);
        assert_eq!(RequestBody::parse(b" \n"), RequestBody::Empty);
    }

    #[test]
    fn text_fields_are_read_independently() {
        let body = RequestBody::Json(json!({ "url": "https://a.com", "shortCodeInput": 123 }));
        assert_eq!(body.text_field("url").as_deref(), Some("https://a.com"));
        assert_eq!(body.text_field("shortCodeInput").as_deref(), Some("123"));

        let body = RequestBody::Json(json!({ "url": ["x"], "shortCodeInput": "abc" }));
        assert!(body.text_field("url").is_none());
        assert_eq!(body.text_field("shortCodeInput").as_deref(), Some("abc"));
    }

    #[test]
    fn non_object_bodies_have_no_fields() {
        assert!(RequestBody::Text("nope".into()).text_field("url").is_none());
        assert!(RequestBody::Json(json!(["url"])).text_field("url").is_none());
        assert!(RequestBody::Empty.field("url").is_none());
    }

    #[test]
    fn splits_query_from_target() {
        let req = ApiRequest::new("get", "/abc?utm=x%20y&b=2");
        assert_eq!(req.method, "GET");
        assert_eq!(req.path, "/abc");
        assert_eq!(req.query.get("utm").map(String::as_str), Some("x y"));
        assert_eq!(req.query.len(), 2);

        assert_eq!(ApiRequest::new("GET", "").path, "/");
    }

    #[test]
    fn headers_are_case_insensitive() {
        let req = ApiRequest::new("GET", "/").with_header("X-Forwarded-For", "1.1.1.1");
        assert_eq!(req.header("x-forwarded-for"), Some("1.1.1.1"));
        assert_eq!(req.header("X-FORWARDED-FOR"), Some("1.1.1.1"));
    }
}
