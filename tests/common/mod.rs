//! Local stand-ins for the upstream feed host and the translation provider.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use actix_web::dev::ServerHandle;
use actix_web::{web, App, HttpResponse, HttpServer};
use rss_translator::cache::FeedCache;
use rss_translator::config::Config;
use rss_translator::scheduler::Scheduler;

pub const RSS_CONTENT_TYPE: &str = "application/rss+xml; charset=utf-8";

#[derive(Default)]
pub struct Upstream {
    /// When set, `/flaky.xml` answers 500.
    pub flaky_down: AtomicBool,
    /// Incremented on every `/generation.xml` fetch.
    pub generation: AtomicUsize,
    /// Delay applied to every translation request, in milliseconds.
    pub translate_delay_ms: AtomicUsize,
    pub translate_calls: AtomicUsize,
}

pub fn rss(titles: &[&str]) -> String {
    let items: String = titles
        .iter()
        .map(|title| format!("<item><title>{title}</title><link>http://x/{title}</link></item>"))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><rss version="2.0"><channel><title>Upstream</title>{items}</channel></rss>"#
    )
}

async fn news() -> HttpResponse {
    HttpResponse::Ok()
        .content_type(RSS_CONTENT_TYPE)
        .body(rss(&["Hello"]))
}

async fn mixed() -> HttpResponse {
    HttpResponse::Ok()
        .content_type(RSS_CONTENT_TYPE)
        .body(rss(&["Hello", "Boom", "World"]))
}

async fn boom() -> HttpResponse {
    HttpResponse::Ok()
        .content_type(RSS_CONTENT_TYPE)
        .body(rss(&["Boom"]))
}

async fn flaky(state: web::Data<Upstream>) -> HttpResponse {
    if state.flaky_down.load(Ordering::SeqCst) {
        return HttpResponse::InternalServerError().finish();
    }
    HttpResponse::Ok()
        .content_type(RSS_CONTENT_TYPE)
        .body(rss(&["Hello"]))
}

async fn generation(state: web::Data<Upstream>) -> HttpResponse {
    let generation = state.generation.fetch_add(1, Ordering::SeqCst) + 1;
    HttpResponse::Ok()
        .content_type(format!("application/rss+xml; generation={generation}"))
        .body(rss(&[&format!("Gen{generation}")]))
}

async fn broken() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html")
        .body("<html><body>maintenance")
}

/// Mimics `translate_a/single?client=gtx&dj=1`: "Hello" and "World" have
/// fixed translations, "Boom" fails with 500, anything else is echoed back
/// with a marker.
async fn translate(
    state: web::Data<Upstream>,
    query: web::Query<HashMap<String, String>>,
) -> HttpResponse {
    state.translate_calls.fetch_add(1, Ordering::SeqCst);
    let delay = state.translate_delay_ms.load(Ordering::SeqCst) as u64;
    if delay > 0 {
        actix_web::rt::time::sleep(Duration::from_millis(delay)).await;
    }

    let expected = [
        ("client", "gtx"),
        ("dt", "t"),
        ("dj", "1"),
        ("ie", "UTF-8"),
        ("sl", "auto"),
    ];
    if expected
        .iter()
        .any(|(key, value)| query.get(*key).map(String::as_str) != Some(*value))
    {
        return HttpResponse::BadRequest().finish();
    }
    let (Some(text), Some(lang)) = (query.get("q"), query.get("tl")) else {
        return HttpResponse::BadRequest().finish();
    };

    let sentences = match text.as_str() {
        "Boom" => return HttpResponse::InternalServerError().finish(),
        "Hello" => serde_json::json!([{ "trans": "你好", "orig": "Hello" }]),
        "World" => serde_json::json!([{ "trans": "世", "orig": "Wor" }, { "trans": "界", "orig": "ld" }]),
        other => serde_json::json!([{ "trans": format!("[{lang}]{other}") }]),
    };
    HttpResponse::Ok()
        .content_type("application/json; charset=utf-8")
        .body(serde_json::json!({ "sentences": sentences, "src": "en" }).to_string())
}

pub struct TestUpstream {
    pub addr: SocketAddr,
    pub state: web::Data<Upstream>,
    handle: ServerHandle,
}

impl TestUpstream {
    pub async fn start() -> Self {
        let state = web::Data::new(Upstream::default());
        let app_state = state.clone();
        let server = HttpServer::new(move || {
            App::new()
                .app_data(app_state.clone())
                .route("/news.xml", web::get().to(news))
                .route("/mixed.xml", web::get().to(mixed))
                .route("/boom.xml", web::get().to(boom))
                .route("/flaky.xml", web::get().to(flaky))
                .route("/generation.xml", web::get().to(generation))
                .route("/broken.xml", web::get().to(broken))
                .route("/translate_a/single", web::get().to(translate))
        })
        .workers(2)
        .bind(("127.0.0.1", 0))
        .unwrap();

        let addr = server.addrs()[0];
        let server = server.run();
        let handle = server.handle();
        actix_web::rt::spawn(server);

        Self {
            addr,
            state,
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Config serving `feeds` (`(upstream path, route)` pairs) translated to
    /// zh-CN through this server.
    pub fn config(&self, feeds: &[(&str, &str)]) -> Config {
        let rss: Vec<serde_json::Value> = feeds
            .iter()
            .map(|(upstream, route)| {
                serde_json::json!({
                    "url": self.url(upstream),
                    "path": route,
                    "xml_item_path": "//item",
                    "xml_title_in_item_path": "title",
                })
            })
            .collect();
        serde_json::json!({
            "host": "127.0.0.1",
            "port": 0,
            "language": "zh-CN",
            "cron": "0 0 * * * *",
            "translate_endpoint": self.url("/translate_a/single"),
            "rss": rss,
        })
        .to_string()
        .parse()
        .unwrap()
    }

    pub fn scheduler(&self, feeds: &[(&str, &str)]) -> (Arc<Scheduler>, Arc<FeedCache>) {
        let cache = Arc::new(FeedCache::new());
        let scheduler = rss_translator::build_scheduler(&self.config(feeds), cache.clone()).unwrap();
        (Arc::new(scheduler), cache)
    }

    pub async fn stop(self) {
        self.handle.stop(false).await;
    }
}
