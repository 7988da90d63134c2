//! Single-invocation hosting: one event in, one response out.
//!
//! The caller builds the [`AppState`] once per process and hands it to every
//! [`handle`] call, so the limiter counts across warm invocations.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
    adapter::{self, ApiRequest},
    rate_limit::client_key,
    types::AppState,
};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionRequest {
    pub method: String,
    pub path: String,
    #[serde(default)]
    pub query: Option<HashMap<String, String>>,
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub source_ip: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionResponse {
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl FunctionRequest {
    fn into_api_request(self) -> ApiRequest {
        let mut req = ApiRequest::new(&self.method, &self.path);
        if let Some(query) = self.query {
            req.query.extend(query);
        }
        for (name, value) in self.headers.unwrap_or_default() {
            req = req.with_header(&name, &value);
        }
        if let Some(body) = self.body {
            req = req.with_body(body.as_bytes());
        }

        // First X-Forwarded-For hop wins over the platform's source address
        let forwarded = req
            .header("x-forwarded-for")
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .map(str::to_string);
        req.with_client_ip(forwarded.or(self.source_ip))
    }
}

/// Runs one event through the limiter and the router.
pub async fn handle(state: &AppState, event: FunctionRequest) -> FunctionResponse {
    let req = event.into_api_request();
    let decision = state.limiter.check(&client_key(req.client_ip.as_deref()));

    let res = adapter::process(state, req, Some(decision)).await;
    FunctionResponse {
        status_code: res.status,
        headers: res.headers.into_iter().collect(),
        body: res.body,
    }
}
