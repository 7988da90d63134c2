use log::debug;

use crate::{
    adapter::{ApiRequest, ResponseWriter},
    errors::ServiceError,
    models::{
        CreateShortLinkDto, MessageResponse, ResolveResponse, StatsResponse, UpdateShortLinkDto,
    },
    services::ShortLinkService,
};

type Result<T> = std::result::Result<T, ServiceError>;

fn short_code(req: &ApiRequest) -> &str {
    req.param("shortCode").unwrap_or_default()
}

/// `POST /shorten`
pub async fn create_handler(
    service: &ShortLinkService,
    req: &ApiRequest,
    res: &mut ResponseWriter,
) -> Result<()> {
    let dto = CreateShortLinkDto::from_body(&req.body);
    let record = service.create(dto).await?;
    res.status(201).json(&record);
    Ok(())
}

/// `GET /{shortCode}`
pub async fn resolve_handler(
    service: &ShortLinkService,
    req: &ApiRequest,
    res: &mut ResponseWriter,
) -> Result<()> {
    let code = short_code(req);
    debug!("Resolve requested for code: {}", code);
    let url = service.resolve(code).await?;
    res.status(200).json(&ResolveResponse { url });
    Ok(())
}

/// `PUT /shorten/{shortCode}`
pub async fn update_handler(
    service: &ShortLinkService,
    req: &ApiRequest,
    res: &mut ResponseWriter,
) -> Result<()> {
    let dto = UpdateShortLinkDto::from_body(&req.body);
    service.update(short_code(req), dto).await?;
    res.status(200).json(&MessageResponse {
        message: "Short code updated successfully".to_string(),
    });
    Ok(())
}

/// `DELETE /shorten/{shortCode}`
pub async fn delete_handler(
    service: &ShortLinkService,
    req: &ApiRequest,
    res: &mut ResponseWriter,
) -> Result<()> {
    service.delete(short_code(req)).await?;
    res.status(200).json(&MessageResponse {
        message: "Short code deleted successfully".to_string(),
    });
    Ok(())
}

/// `GET /shorten/{shortCode}/stats`
pub async fn stats_handler(
    service: &ShortLinkService,
    req: &ApiRequest,
    res: &mut ResponseWriter,
) -> Result<()> {
    let count = service.stats(short_code(req)).await?;
    res.status(200).json(&StatsResponse { count });
    Ok(())
}
