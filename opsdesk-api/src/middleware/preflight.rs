/// Preflight middleware
///
/// `OPTIONS` on any path answers 200 with an empty body before identity is
/// checked. Real CORS preflights never get here because the CORS layer
/// answers them itself; this covers bare `OPTIONS` requests.

use axum::{
    extract::Request,
    http::{Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

pub async fn answer_options(req: Request, next: Next) -> Response {
    if req.method() == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }

    next.run(req).await
}
