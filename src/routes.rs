//! HTTP endpoints. Everything lives under `/api`.

use actix_web::{get, web, HttpResponse, Responder, ResponseError};
use std::collections::HashMap;

use crate::app_state::AppState;
use crate::http_client::FetchError;
use crate::models::{AtHomeServerResponse, PageRequest, QualityTier};
use crate::retrieval::RetrievalOutcome;

/// Header naming the path that produced a page (`direct` or `render`)
pub const RETRIEVAL_PATH_HEADER: &str = "X-Retrieval-Path";

fn query_number(query: &HashMap<String, String>, key: &str, default: u32) -> u32 {
    query
        .get(key)
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(default)
}

fn upstream_error(e: FetchError) -> HttpResponse {
    log::error!("MangaDex request failed: {}", e);
    HttpResponse::InternalServerError().json(serde_json::json!({"error": e.to_string()}))
}

#[get("/api/manga/search")]
async fn search_manga(
    data: web::Data<AppState>,
    query: web::Query<HashMap<String, String>>,
) -> impl Responder {
    let title = query.get("title").map(String::as_str).unwrap_or_default();
    let limit = query_number(&query, "limit", 10);

    match data.mangadex.search_manga(title, limit).await {
        Ok(results) => HttpResponse::Ok().json(results),
        Err(e) => upstream_error(e),
    }
}

#[get("/api/manga/{id}")]
async fn get_manga(data: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    match data.mangadex.get_manga(&path.into_inner()).await {
        Ok(manga) => HttpResponse::Ok().json(manga),
        Err(e) => upstream_error(e),
    }
}

#[get("/api/manga/{id}/chapters")]
async fn get_chapters(
    data: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<HashMap<String, String>>,
) -> impl Responder {
    let manga_id = path.into_inner();
    let lang = query.get("lang").map(String::as_str).unwrap_or("en");
    let limit = query_number(&query, "limit", 30);
    let offset = query_number(&query, "offset", 0);

    match data.mangadex.get_chapters(&manga_id, lang, limit, offset).await {
        Ok(chapters) => HttpResponse::Ok().json(chapters),
        Err(e) => upstream_error(e),
    }
}

#[get("/api/chapter/{id}/pages")]
async fn get_chapter_pages(data: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    match data.mangadex.get_chapter_pages(&path.into_inner()).await {
        Ok(manifest) => HttpResponse::Ok().json(AtHomeServerResponse::from(manifest)),
        Err(e) => e.error_response(),
    }
}

#[get("/api/chapter/{id}/download/{page}")]
async fn download_page(
    data: web::Data<AppState>,
    path: web::Path<(String, String)>,
    query: web::Query<HashMap<String, String>>,
) -> impl Responder {
    let (chapter_id, page) = path.into_inner();

    let page_index = match page.parse::<usize>() {
        Ok(index) => index,
        Err(_) => {
            return HttpResponse::BadRequest()
                .json(serde_json::json!({"error": "Invalid page number"}))
        }
    };

    let tier = match query.get("quality").map(|q| q.parse::<QualityTier>()) {
        None => QualityTier::Standard,
        Some(Ok(tier)) => tier,
        Some(Err(e)) => {
            return HttpResponse::BadRequest().json(serde_json::json!({"error": e.to_string()}))
        }
    };

    let request = PageRequest {
        chapter_id,
        page_index,
        tier,
    };

    match data.orchestrator.retrieve(&request).await {
        RetrievalOutcome::Served {
            content_type,
            body,
            path,
        } => {
            log::info!(
                "Serving chapter {} page {} ({}) via {}",
                request.chapter_id,
                request.page_index,
                request.tier,
                path
            );
            HttpResponse::Ok()
                .content_type(content_type)
                .insert_header((RETRIEVAL_PATH_HEADER, path.to_string()))
                .streaming(body.into_stream())
        }
        RetrievalOutcome::Failed(e) => {
            log::warn!(
                "Chapter {} page {} failed ({}): {}",
                request.chapter_id,
                request.page_index,
                e.kind(),
                e
            );
            e.error_response()
        }
    }
}

#[get("/api/metrics")]
async fn get_metrics(data: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "paths": data.metrics.get_all_metrics(),
        "browser_running": data
            .browser_manager
            .as_ref()
            .map(|m| m.is_running())
            .unwrap_or(false),
    }))
}

/// Register every endpoint. Search is registered before `/api/manga/{id}`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(search_manga)
        .service(get_chapters)
        .service(get_manga)
        .service(get_chapter_pages)
        .service(download_page)
        .service(get_metrics);
}
