//! HTTP server: accept loop, shared state, and top-level dispatch

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::Args;
use crate::content::ContentService;
use crate::db::store::EntityStore;
use crate::moderation::ModerationService;
use crate::routes;
use crate::types::Result;

type FullBody = Full<Bytes>;

pub struct AppState {
    pub args: Args,
    pub store: Arc<dyn EntityStore>,
    pub moderation: ModerationService,
    pub content: ContentService,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(args: Args, store: Arc<dyn EntityStore>) -> Self {
        Self {
            moderation: ModerationService::new(Arc::clone(&store)),
            content: ContentService::new(Arc::clone(&store)),
            args,
            store,
            started_at: Instant::now(),
        }
    }
}

pub async fn run(state: Arc<AppState>) -> Result<()> {
    let addr = state.args.listen;
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);
                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, peer, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .preserve_header_case(true)
                        .title_case_headers(true)
                        .serve_connection(io, service)
                        .with_upgrades()
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", peer, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

async fn handle_request(
    state: Arc<AppState>,
    peer: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<FullBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    info!("[{}] {} {}", peer, method, path);

    // The feed upgrade has to run before ordinary dispatch so the request
    // still carries its upgrade extensions.
    if method == Method::GET
        && path == "/api/v1/admin/feed"
        && hyper_tungstenite::is_upgrade_request(&req)
    {
        return Ok(routes::feed_ws::handle_feed_ws(state, req).await);
    }

    let response = match (method, path.as_str()) {
        (Method::GET, "/health") | (Method::GET, "/healthz") => routes::health::health_check(&state),
        (Method::GET, "/version") => routes::health::version_info(),
        (Method::OPTIONS, _) => routes::preflight_response(),
        (_, p) if p.starts_with("/api/v1/admin") => {
            routes::admin::handle_admin_request(req, state, p).await
        }
        (_, p) if p.starts_with("/api/v1") => {
            routes::content::handle_content_request(req, state, p).await
        }
        _ => routes::not_found_response(&path),
    };

    Ok(response)
}
