use std::convert::Infallible;
use std::sync::Arc;

use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Body, Method, Request, Response, StatusCode};
use log::{debug, error, info, warn};
use serde::Serialize;
use tomato_serve::{ErrorResponse, Predictor};
use tower_http::cors::CorsLayer;

use crate::config::ErrorStatus;
use crate::upload::read_upload;

pub const PING_MESSAGE: &str = "Hello, I am alive";

/// State shared by every request.
pub struct AppContext {
    pub predictor: Arc<Predictor>,
    pub error_status: ErrorStatus,
    pub max_upload_bytes: u64,
}

/// Any origin, method and header, with credentials.
pub fn cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

pub async fn handle(
    req: Request<Body>,
    ctx: Arc<AppContext>,
) -> Result<Response<Body>, Infallible> {
    let response = match (req.method(), req.uri().path()) {
        (&Method::GET, "/ping") => json_response(StatusCode::OK, &PING_MESSAGE),
        (&Method::POST, "/predict") => predict(req, &ctx).await,
        _ => status_response(StatusCode::NOT_FOUND),
    };

    Ok(response)
}

async fn predict(req: Request<Body>, ctx: &AppContext) -> Response<Body> {
    let upload = match read_upload(req, ctx.max_upload_bytes).await {
        Ok(upload) => upload,
        Err(err) => {
            warn!("Error reading upload: {}", err);
            return failure(ctx.error_status.status(StatusCode::BAD_REQUEST));
        }
    };

    info!(
        "Received file: {}, Content type: {}",
        upload.file_name.as_deref().unwrap_or("<unnamed>"),
        upload.content_type.as_deref().unwrap_or("<none>")
    );

    let predictor = Arc::clone(&ctx.predictor);

    match tokio::task::spawn_blocking(move || predictor.predict(&upload)).await {
        Ok(Ok(prediction)) => {
            debug!("Stage timings: {:?}", prediction.timings);
            json_response(StatusCode::OK, &prediction.result)
        }
        Ok(Err(err)) => {
            warn!("Error in prediction: {}", err);
            let status = if err.is_client_error() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            failure(ctx.error_status.status(status))
        }
        Err(err) => {
            error!("Prediction task failed: {}", err);
            failure(ctx.error_status.status(StatusCode::INTERNAL_SERVER_ERROR))
        }
    }
}

fn failure(status: StatusCode) -> Response<Body> {
    json_response(status, &ErrorResponse::default())
}

fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response<Body> {
    match serde_json::to_vec(value) {
        Ok(body) => {
            let mut response = Response::new(Body::from(body));
            *response.status_mut() = status;
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            response
        }
        Err(err) => {
            error!("Could not serialize response: {}", err);
            status_response(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

fn status_response(status: StatusCode) -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response
}
