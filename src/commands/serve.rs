//! The resident mode: a daily 23:59 scheduled fetch plus an HTTP endpoint
//! that triggers a fetch on demand and returns the results.

use crate::api::Mode;
use crate::commands::run::run_once;
use crate::commands::Out;
use crate::{Config, Result};
use anyhow::Context;
use chrono::{DateTime, Local, NaiveDateTime, TimeDelta};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

const TRIGGER_PATH: &str = "/transactions/vcb/today";

/// Runs the scheduler and the trigger endpoint until the process is stopped.
pub async fn serve(config: Config, mode: Mode, port: u16) -> Result<Out<()>> {
    let scheduler_config = config.clone();
    tokio::spawn(async move {
        run_daily(scheduler_config, mode).await;
    });
    serve_http(config, mode, port).await?;
    Ok(Out::new_message("Server stopped"))
}

/// Fires once per day at 23:59 local time. A failed run is logged and the
/// schedule keeps going.
async fn run_daily(config: Config, mode: Mode) {
    loop {
        let delay = duration_until_next_fire(Local::now());
        debug!("Next scheduled run in {}s", delay.as_secs());
        tokio::time::sleep(delay).await;
        info!("Scheduled run starting");
        match run_once(&config, mode).await {
            Ok(report) => info!(
                "Scheduled run processed {} message(s), persisted {}",
                report.count,
                report.persisted_count()
            ),
            Err(e) => error!("Scheduled run failed: {e:#}"),
        }
    }
}

fn duration_until_next_fire(now: DateTime<Local>) -> Duration {
    let Some(today_fire) = now.date_naive().and_hms_opt(23, 59, 0) else {
        return Duration::from_secs(60);
    };
    let next: NaiveDateTime = if now.naive_local() < today_fire {
        today_fire
    } else {
        today_fire + TimeDelta::days(1)
    };
    (next - now.naive_local())
        .to_std()
        .unwrap_or(Duration::from_secs(60))
}

async fn serve_http(config: Config, mode: Mode, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Unable to bind to {addr}"))?;
    info!("Trigger endpoint listening on http://{addr}{TRIGGER_PATH}");
    loop {
        let (stream, peer) = listener
            .accept()
            .await
            .context("Failed to accept a connection")?;
        debug!("Connection from {peer}");
        let io = TokioIo::new(stream);
        let config = config.clone();
        tokio::spawn(async move {
            let service = service_fn(move |req| {
                let config = config.clone();
                async move { handle(req, &config, mode).await }
            });
            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                warn!("Connection error: {e}");
            }
        });
    }
}

async fn handle<B>(
    req: Request<B>,
    config: &Config,
    mode: Mode,
) -> std::result::Result<Response<Full<Bytes>>, Infallible> {
    if req.method() != Method::GET || req.uri().path() != TRIGGER_PATH {
        return Ok(json_response(
            StatusCode::NOT_FOUND,
            serde_json::json!({"error": "not found"}).to_string(),
        ));
    }
    info!("Trigger endpoint hit, running the pipeline");
    let response = match run_once(config, mode).await {
        Ok(report) => match serde_json::to_string(&report) {
            Ok(body) => json_response(StatusCode::OK, body),
            Err(e) => json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({"error": e.to_string()}).to_string(),
            ),
        },
        Err(e) => {
            error!("Triggered run failed: {e:#}");
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({"error": format!("{e:#}")}).to_string(),
            )
        }
    };
    Ok(response)
}

fn json_response(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SECRET_JSON: &str = r#"{
        "installed": {
            "client_id": "abc.apps.googleusercontent.com",
            "auth_uri": "https://accounts.google.com/o/oauth2/auth",
            "token_uri": "https://oauth2.googleapis.com/token",
            "client_secret": "shhh",
            "redirect_uris": ["http://localhost"]
        }
    }"#;

    async fn test_config(dir: &std::path::Path) -> Config {
        let secret = dir.join("secret.json");
        tokio::fs::write(&secret, SECRET_JSON).await.unwrap();
        Config::create(dir.join("vcb"), &secret).await.unwrap()
    }

    #[test]
    fn test_fire_later_today() {
        let now = Local.with_ymd_and_hms(2026, 1, 2, 10, 0, 0).unwrap();
        let delay = duration_until_next_fire(now);
        // 10:00:00 to 23:59:00 is 13h59m.
        assert_eq!(delay, Duration::from_secs(13 * 3600 + 59 * 60));
    }

    #[test]
    fn test_fire_rolls_to_tomorrow() {
        let now = Local.with_ymd_and_hms(2026, 1, 2, 23, 59, 30).unwrap();
        let delay = duration_until_next_fire(now);
        assert_eq!(delay, Duration::from_secs(24 * 3600 - 30));
    }

    #[tokio::test]
    async fn test_handle_trigger_returns_count_and_data() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path()).await;
        let req = Request::builder()
            .method(Method::GET)
            .uri(TRIGGER_PATH)
            .body(String::new())
            .unwrap();

        let response = handle(req, &config, Mode::Test).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let body = String::from_utf8(
            http_body_util::BodyExt::collect(response.into_body())
                .await
                .unwrap()
                .to_bytes()
                .to_vec(),
        )
        .unwrap();
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["count"], 2);
        assert_eq!(json["data"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_handle_unknown_path_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path()).await;
        let req = Request::builder()
            .method(Method::GET)
            .uri("/nope")
            .body(String::new())
            .unwrap();
        let response = handle(req, &config, Mode::Test).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_handle_wrong_method_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path()).await;
        let req = Request::builder()
            .method(Method::POST)
            .uri(TRIGGER_PATH)
            .body(String::new())
            .unwrap();
        let response = handle(req, &config, Mode::Test).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
