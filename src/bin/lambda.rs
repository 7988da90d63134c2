use std::{collections::HashMap, sync::Arc};

use env_logger::Env;
use lambda_http::{
    request::RequestContext, run, service_fn, Body, Error, Request, RequestExt, Response,
};
use log::info;

use shortin::{
    config::Config,
    function::{self, FunctionRequest},
    types::AppState,
};

/// Caller address as reported by API Gateway
fn source_ip(req: &Request) -> Option<String> {
    match req.request_context_ref()? {
        RequestContext::ApiGatewayV2(ctx) => ctx.http.source_ip.clone(),
        RequestContext::ApiGatewayV1(ctx) => ctx.identity.source_ip.clone(),
        _ => None,
    }
}

fn to_event(req: Request) -> FunctionRequest {
    let query = req.uri().query().map(|q| {
        url::form_urlencoded::parse(q.as_bytes())
            .into_owned()
            .collect::<HashMap<_, _>>()
    });
    let headers = req
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect::<HashMap<_, _>>();
    let body = match req.body() {
        Body::Empty => None,
        Body::Text(text) => Some(text.clone()),
        Body::Binary(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
    };

    FunctionRequest {
        method: req.method().as_str().to_string(),
        path: req.uri().path().to_string(),
        query,
        headers: Some(headers),
        body,
        source_ip: source_ip(&req),
    }
}

async fn invoke(state: &AppState, req: Request) -> Result<Response<Body>, Error> {
    let res = function::handle(state, to_event(req)).await;

    let mut builder = Response::builder().status(res.status_code);
    for (name, value) in res.headers {
        builder = builder.header(name, value);
    }
    Ok(builder.body(Body::Text(res.body))?)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = Config::load()?;
    // Built once per cold start, shared by warm invocations
    let state = Arc::new(AppState::from_config(&config)?);
    info!("{} v{} ready", config.app.name, state.version);

    run(service_fn(move |req: Request| {
        let state = state.clone();
        async move { invoke(&state, req).await }
    }))
    .await
}
