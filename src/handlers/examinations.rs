use axum::{
    extract::State,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::database::models::{Attachment, Examination, ImageAsset, ImageSeries};
use crate::middleware::{ApiJson, ApiPath, ApiResponse, ApiResult};
use crate::services::examination_service::{
    AssetRequest, AttachmentRequest, ExaminationPatch, ExaminationRequest, SeriesRequest,
};
use crate::services::{ExaminationService, ExaminationView};

pub fn routes(service: Arc<ExaminationService>) -> Router {
    Router::new()
        .route("/api/examinations", post(create))
        .route("/api/examinations/:id", get(show).put(replace).patch(patch).delete(remove))
        .route("/api/examinations/:id/view", get(view))
        .route("/api/examinations/:id/series", post(add_series))
        .route("/api/examinations/:id/series/:series_id", delete(remove_series))
        .route("/api/examinations/:id/series/:series_id/assets", post(add_asset))
        .route(
            "/api/examinations/:id/series/:series_id/assets/:asset_id",
            delete(remove_asset),
        )
        .route("/api/examinations/:id/attachments", post(add_attachment))
        .route("/api/examinations/:id/attachments/:attachment_id", delete(remove_attachment))
        .with_state(service)
}

/// Passcode lookup, mounted without authentication
pub fn public_routes(service: Arc<ExaminationService>) -> Router {
    Router::new()
        .route("/public/examinations/:passcode", get(view_by_passcode))
        .with_state(service)
}

async fn create(
    State(service): State<Arc<ExaminationService>>,
    ApiJson(request): ApiJson<ExaminationRequest>,
) -> ApiResult<Examination> {
    Ok(ApiResponse::created(service.create(request).await?))
}

async fn show(State(service): State<Arc<ExaminationService>>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<Examination> {
    Ok(ApiResponse::success(service.get(id).await?))
}

async fn replace(
    State(service): State<Arc<ExaminationService>>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<ExaminationRequest>,
) -> ApiResult<Examination> {
    Ok(ApiResponse::success(service.replace(id, request).await?))
}

async fn patch(
    State(service): State<Arc<ExaminationService>>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<ExaminationPatch>,
) -> ApiResult<Examination> {
    Ok(ApiResponse::success(service.patch(id, patch).await?))
}

async fn remove(State(service): State<Arc<ExaminationService>>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<()> {
    service.delete(id).await?;
    Ok(ApiResponse::no_content())
}

async fn view(State(service): State<Arc<ExaminationService>>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<ExaminationView> {
    Ok(ApiResponse::success(service.view(id).await?))
}

async fn view_by_passcode(
    State(service): State<Arc<ExaminationService>>,
    ApiPath(passcode): ApiPath<String>,
) -> ApiResult<ExaminationView> {
    Ok(ApiResponse::success(service.view_by_passcode(&passcode).await?))
}

async fn add_series(
    State(service): State<Arc<ExaminationService>>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<SeriesRequest>,
) -> ApiResult<ImageSeries> {
    Ok(ApiResponse::created(service.add_series(id, request).await?))
}

async fn remove_series(
    State(service): State<Arc<ExaminationService>>,
    ApiPath((id, series_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<()> {
    service.delete_series(id, series_id).await?;
    Ok(ApiResponse::no_content())
}

async fn add_asset(
    State(service): State<Arc<ExaminationService>>,
    ApiPath((id, series_id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(request): ApiJson<AssetRequest>,
) -> ApiResult<ImageAsset> {
    Ok(ApiResponse::created(service.add_asset(id, series_id, request).await?))
}

async fn remove_asset(
    State(service): State<Arc<ExaminationService>>,
    ApiPath((id, series_id, asset_id)): ApiPath<(Uuid, Uuid, Uuid)>,
) -> ApiResult<()> {
    service.delete_asset(id, series_id, asset_id).await?;
    Ok(ApiResponse::no_content())
}

async fn add_attachment(
    State(service): State<Arc<ExaminationService>>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<AttachmentRequest>,
) -> ApiResult<Attachment> {
    Ok(ApiResponse::created(service.add_attachment(id, request).await?))
}

async fn remove_attachment(
    State(service): State<Arc<ExaminationService>>,
    ApiPath((id, attachment_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<()> {
    service.delete_attachment(id, attachment_id).await?;
    Ok(ApiResponse::no_content())
}
