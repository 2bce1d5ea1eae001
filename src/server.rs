use std::time::{Duration, SystemTime};

use actix_web::{
    http::{header, Method},
    route, web, HttpRequest, HttpResponse, Responder,
};

use crate::cache::{CacheEntry, FeedCache};

/// Cache key of the feed a resource serves.
struct FeedRoute(String);

#[route("/", method = "GET", method = "HEAD")]
async fn health() -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body("OK")
}

async fn feed(
    route: web::Data<FeedRoute>,
    cache: web::Data<FeedCache>,
    req: HttpRequest,
) -> HttpResponse {
    match cache.get(&route.0).await {
        Some(entry) => create_response(&req, &entry),
        None => {
            tracing::debug!("{}: requested before first successful refresh", route.0);
            HttpResponse::ServiceUnavailable().finish()
        }
    }
}

/// Registers the health route and one route per feed. Expects a
/// `web::Data<FeedCache>` on the app.
pub fn configure(cfg: &mut web::ServiceConfig, routes: &[String]) {
    cfg.service(health);
    for path in routes {
        cfg.service(
            web::resource(path.as_str())
                .app_data(web::Data::new(FeedRoute(path.clone())))
                .route(web::get().to(feed))
                .route(web::head().to(feed)),
        );
    }
}

fn create_response(req: &HttpRequest, entry: &CacheEntry) -> HttpResponse {
    let last_modified = header::HttpDate::from(
        SystemTime::UNIX_EPOCH + Duration::from_secs(entry.cached_at.max(0) as u64),
    );

    let mut response = HttpResponse::Ok();
    response.insert_header((header::CONTENT_TYPE, entry.content_type.as_str()));
    response.insert_header((header::LAST_MODIFIED, last_modified.to_string()));

    if req.method() == Method::HEAD {
        response.no_chunking(entry.body.len() as u64).finish()
    } else {
        response.body(entry.body.clone())
    }
}
