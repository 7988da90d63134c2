//! The route table, shared by the server and the function entry points.

use log::debug;
use serde_json::json;

use crate::{
    adapter::{ApiRequest, ResponseWriter},
    handlers::{create_handler, delete_handler, resolve_handler, stats_handler, update_handler},
    types::AppState,
};

pub const WELCOME_MESSAGE: &str = "Welcome to the URL Shortener API!";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Index,
    Create,
    Update(String),
    Delete(String),
    Stats(String),
    Resolve(String),
    NotFound,
}

impl Route {
    /// Matches in priority order: `/`, `/shorten`, `/shorten/{code}`,
    /// `*/stats`, then any other GET as `/{code}`.
    pub fn resolve(method: &str, path: &str) -> Route {
        match method {
            "GET" if path == "/" => Route::Index,
            "POST" if path == "/shorten" => Route::Create,
            "PUT" | "DELETE" if path.starts_with("/shorten/") => {
                let code = path.split('/').nth(2).unwrap_or_default().to_string();
                if method == "PUT" {
                    Route::Update(code)
                } else {
                    Route::Delete(code)
                }
            }
            "GET" if path.ends_with("/stats") => {
                let segments: Vec<&str> = path.split('/').collect();
                let code = segments
                    .len()
                    .checked_sub(2)
                    .map(|idx| segments[idx])
                    .unwrap_or_default();
                Route::Stats(code.to_string())
            }
            "GET" => Route::Resolve(path.strip_prefix('/').unwrap_or(path).to_string()),
            _ => Route::NotFound,
        }
    }

    fn short_code(&self) -> Option<&str> {
        match self {
            Route::Update(code) | Route::Delete(code) | Route::Stats(code) | Route::Resolve(code) => {
                Some(code)
            }
            Route::Index | Route::Create | Route::NotFound => None,
        }
    }
}

/// Routes `req` and writes the handler's outcome into `res`.
pub async fn dispatch(state: &AppState, req: &mut ApiRequest, res: &mut ResponseWriter) {
    let route = Route::resolve(&req.method, &req.path);
    debug!("{} {} -> {:?}", req.method, req.path, route);

    if let Some(code) = route.short_code() {
        req.params.insert("shortCode".to_string(), code.to_string());
    }

    let service = &state.service;
    let outcome = match route {
        Route::Index => {
            res.status(200).text(WELCOME_MESSAGE);
            Ok(())
        }
        Route::Create => create_handler(service, req, res).await,
        Route::Update(_) => update_handler(service, req, res).await,
        Route::Delete(_) => delete_handler(service, req, res).await,
        Route::Stats(_) => stats_handler(service, req, res).await,
        Route::Resolve(_) => resolve_handler(service, req, res).await,
        Route::NotFound => {
            res.status(404).json(&json!({ "error": "Not Found" }));
            Ok(())
        }
    };

    if let Err(err) = outcome {
        res.status(err.status_code()).json(&err.body());
    }
}
