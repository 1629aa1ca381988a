use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};

// -- Content responses --

pub fn html(status: StatusCode, body: String) -> Response {
    (status, [(header::CONTENT_TYPE, "text/html")], body).into_response()
}

pub fn text(status: StatusCode, body: &'static str) -> Response {
    (status, [(header::CONTENT_TYPE, "text/plain")], body).into_response()
}

pub fn not_found() -> Response {
    text(StatusCode::NOT_FOUND, "Not found")
}

pub fn method_not_allowed() -> Response {
    text(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

// -- Redirects --

/// Status for a redirect rule
///
/// GET and HEAD get the classic codes; every other method gets the codes that
/// forbid clients from switching to GET.
pub fn redirect_status(method: &Method, permanent: bool) -> StatusCode {
    let safe = *method == Method::GET || *method == Method::HEAD;
    match (safe, permanent) {
        (true, true) => StatusCode::MOVED_PERMANENTLY,
        (true, false) => StatusCode::FOUND,
        (false, true) => StatusCode::PERMANENT_REDIRECT,
        (false, false) => StatusCode::TEMPORARY_REDIRECT,
    }
}

pub fn redirect(status: StatusCode, location: HeaderValue) -> Response {
    (status, [(header::LOCATION, location)]).into_response()
}
