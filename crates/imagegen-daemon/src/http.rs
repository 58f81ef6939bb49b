use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::State;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use imagegen_proto::protocol::{
    routes, GenerateRequest, GenerationResult, ImageData, ImagePathRequest, LogEntry,
    ReadinessStatus, SavedImage,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::environment::Environment;
use crate::error::DaemonError;
use crate::generator::Generator;
use crate::images;
use crate::log_queue::{LogQueue, FETCH_WAIT};

#[derive(Clone)]
pub struct HttpState {
    pub env: Arc<Environment>,
    pub generator: Arc<Generator>,
    pub log_queue: Arc<LogQueue>,
    /// Save target; `None` when no desktop could be determined.
    pub desktop_dir: Option<PathBuf>,
}

pub fn router(state: HttpState) -> Router {
    Router::new()
        .route(routes::ENVIRONMENT, get(check_environment))
        .route(routes::INSTALL_LOG, get(install_log))
        .route(routes::GENERATE, post(generate))
        .route(routes::IMAGE_DATA, post(image_data))
        .route(routes::IMAGE_SAVE, post(save_image))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until `cancel` fires.
pub fn start_server(
    listener: TcpListener,
    state: HttpState,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if let Ok(addr) = listener.local_addr() {
            info!("HTTP API listening on http://{}", addr);
        }
        let app = router(state);
        let shutdown = async move { cancel.cancelled().await };
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
        {
            error!("HTTP server error: {}", e);
        }
        info!("HTTP API stopped");
    })
}

async fn check_environment(State(state): State<HttpState>) -> Json<ReadinessStatus> {
    Json(state.env.readiness().await)
}

async fn install_log(State(state): State<HttpState>) -> Json<LogEntry> {
    Json(state.log_queue.next(FETCH_WAIT).await)
}

async fn generate(
    State(state): State<HttpState>,
    Json(req): Json<GenerateRequest>,
) -> Json<GenerationResult> {
    info!("HTTP API: generate {:?}", req.prompt);
    Json(state.generator.generate(&req.prompt, &req.options).await)
}

async fn image_data(
    State(_state): State<HttpState>,
    Json(req): Json<ImagePathRequest>,
) -> Result<Json<ImageData>, DaemonError> {
    let data = images::image_data(Path::new(&req.image_path)).await?;
    Ok(Json(ImageData { data }))
}

async fn save_image(
    State(state): State<HttpState>,
    Json(req): Json<ImagePathRequest>,
) -> Result<Json<SavedImage>, DaemonError> {
    info!("HTTP API: save {}", req.image_path);
    let desktop = state
        .desktop_dir
        .clone()
        .ok_or_else(|| DaemonError::DesktopMissing(PathBuf::from("Desktop")))?;
    let destination = images::save_to_desktop(Path::new(&req.image_path), &desktop).await?;
    Ok(Json(SavedImage {
        destination: destination.to_string_lossy().to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use imagegen_proto::config::GeneratorConfig;
    use imagegen_proto::protocol::{ApiError, Severity};
    use serde::de::DeserializeOwned;
    use tower::ServiceExt;

    fn state(desktop_dir: Option<PathBuf>) -> HttpState {
        let env = Arc::new(Environment::new());
        let generator = Arc::new(Generator::new(
            Arc::clone(&env),
            &GeneratorConfig::default(),
        ));
        HttpState {
            env,
            generator,
            log_queue: Arc::new(LogQueue::new()),
            desktop_dir,
        }
    }

    async fn call<T: DeserializeOwned>(
        state: HttpState,
        req: Request<Body>,
    ) -> (StatusCode, T) {
        let resp = router(state).oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_json(route: &str, body: serde_json::Value) -> Request<Body> {
        Request::post(route)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_environment_starts_not_ready() {
        let req = Request::get(routes::ENVIRONMENT).body(Body::empty()).unwrap();
        let (status, body): (_, ReadinessStatus) = call(state(None), req).await;
        assert_eq!(status, StatusCode::OK);
        assert!(!body.ready);
        assert!(!body.message.is_empty());
    }

    #[tokio::test]
    async fn test_log_route_pops_queue_then_answers_empty() {
        let st = state(None);
        st.log_queue.push("Collecting torch", Severity::Info);
        let get = || Request::get(routes::INSTALL_LOG).body(Body::empty()).unwrap();

        let (_, first): (_, LogEntry) = call(st.clone(), get()).await;
        assert_eq!(first, LogEntry::new("Collecting torch", Severity::Info));
        let (_, second): (_, LogEntry) = call(st, get()).await;
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn test_generate_while_not_ready_is_application_failure() {
        let req = post_json(
            routes::GENERATE,
            serde_json::json!({
                "prompt": "a red fox",
                "options": {"steps": 20, "guidanceScale": 7.5, "width": 1024, "height": 1024, "seed": 0}
            }),
        );
        let (status, body): (_, GenerationResult) = call(state(None), req).await;
        assert_eq!(status, StatusCode::OK);
        assert!(!body.success);
    }

    #[tokio::test]
    async fn test_image_data_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let desktop = dir.path().join("Desktop");
        std::fs::create_dir(&desktop).unwrap();
        let file = dir.path().join("out.png");
        std::fs::write(&file, b"\x89PNG").unwrap();
        let path = file.to_string_lossy().to_string();
        let st = state(Some(desktop.clone()));

        let req = post_json(routes::IMAGE_DATA, serde_json::json!({ "imagePath": path }));
        let (status, body): (_, ImageData) = call(st.clone(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.data.starts_with(images::DATA_URL_PREFIX));

        let req = post_json(routes::IMAGE_SAVE, serde_json::json!({ "imagePath": path }));
        let (status, body): (_, SavedImage) = call(st, req).await;
        assert_eq!(status, StatusCode::OK);
        assert!(Path::new(&body.destination).starts_with(&desktop));
    }

    #[tokio::test]
    async fn test_missing_image_is_api_error() {
        let req = post_json(
            routes::IMAGE_DATA,
            serde_json::json!({ "imagePath": "/definitely/missing.png" }),
        );
        let (status, body): (_, ApiError) = call(state(None), req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.message.contains("missing.png"));
    }

    #[tokio::test]
    async fn test_save_without_desktop_is_api_error() {
        let req = post_json(routes::IMAGE_SAVE, serde_json::json!({ "imagePath": "/x.png" }));
        let (status, body): (_, ApiError) = call(state(None), req).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body.message.contains("desktop"));
    }
}
