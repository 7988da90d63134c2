use serde::Serialize;
use serde_json::Value;

const INTERNAL_ERROR_BODY: &str = r#"{"error":"Internal Server Error"}"#;

/// Finished response, ready to be converted to the hosting platform's type
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl ApiResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn json_body(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }
}

/// Accumulates status, headers and body. Later writes replace earlier ones;
/// [`ResponseWriter::finish`] produces the single terminal response.
#[derive(Debug)]
pub struct ResponseWriter {
    status: u16,
    headers: Vec<(String, String)>,
    body: String,
}

impl Default for ResponseWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub fn status(&mut self, code: u16) -> &mut Self {
        self.status = code;
        self
    }

    pub fn set_header(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
        {
            Some(existing) => existing.1 = value,
            None => self.headers.push((name.to_string(), value)),
        }
        self
    }

    pub fn json<T: Serialize + ?Sized>(&mut self, data: &T) -> &mut Self {
        self.body = match serde_json::to_string(data) {
            Ok(body) => body,
            Err(e) => {
                log::error!("Failed to serialize response body: {}", e);
                self.status = 500;
                INTERNAL_ERROR_BODY.to_string()
            }
        };
        self.set_header("content-type", "application/json")
    }

    pub fn text(&mut self, data: impl Into<String>) -> &mut Self {
        self.body = data.into();
        self.set_header("content-type", "text/plain")
    }

    pub fn finish(self) -> ApiResponse {
        ApiResponse {
            status: self.status,
            headers: self.headers,
            body: self.body,
        }
    }
}
