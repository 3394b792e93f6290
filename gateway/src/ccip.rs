//! EIP-3668 gateway endpoints.

use alloy_primitives::{hex, Address};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use ensgate_resolver::{service::Service, Error, Lookup};
use serde::Deserialize;
use serde_json::json;

/// Body of a `POST` request.
#[derive(Deserialize)]
pub struct Request {
    pub sender: String,
    pub data: String,
}

/// Router serving `GET /{sender}/{data}` (optionally suffixed with `.json`) and `POST /`.
pub fn router<L: Lookup>(service: Service<L>) -> Router {
    Router::new()
        .route("/{sender}/{data}", get(query::<L>))
        .route("/", post(submit::<L>))
        .with_state(service)
}

async fn query<L: Lookup>(
    State(service): State<Service<L>>,
    Path((sender, data)): Path<(String, String)>,
) -> Response {
    let data = data.strip_suffix(".json").unwrap_or(&data);
    answer(&service, &sender, data).await
}

async fn submit<L: Lookup>(
    State(service): State<Service<L>>,
    Json(request): Json<Request>,
) -> Response {
    answer(&service, &request.sender, &request.data).await
}

async fn answer<L: Lookup>(service: &Service<L>, sender: &str, data: &str) -> Response {
    let Ok(sender) = sender.parse::<Address>() else {
        return failure(StatusCode::BAD_REQUEST, "Invalid request format");
    };
    let Ok(data) = hex::decode(data) else {
        return failure(StatusCode::BAD_REQUEST, "Invalid request format");
    };
    match service.resolve(sender, &data).await {
        Ok(response) => Json(json!({ "data": response })).into_response(),
        Err(err) => failure(status(&err), &err.to_string()),
    }
}

fn status(err: &Error) -> StatusCode {
    match err {
        Error::UnknownEntryPoint(_) => StatusCode::NOT_FOUND,
        err if err.is_protocol() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn failure(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status() {
        assert_eq!(
            status(&Error::UnknownEntryPoint("0x12345678".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(status(&Error::NameMismatch), StatusCode::BAD_REQUEST);
        assert_eq!(status(&Error::NameNotNormalized), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(&Error::Lookup("down".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
