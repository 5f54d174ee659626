use axum::{extract::Request, http::Method};

/// HTML forms can only POST. A `_method=PUT` or `_method=DELETE` query
/// parameter on a POST turns it into that method before routing.
pub fn method_override(mut request: Request) -> Request {
    if request.method() != Method::POST {
        return request;
    }

    let target = request.uri().query().and_then(|query| {
        query
            .split('&')
            .find_map(|pair| pair.strip_prefix("_method="))
            .map(str::to_ascii_uppercase)
    });

    match target.as_deref() {
        Some("PUT") => *request.method_mut() = Method::PUT,
        Some("DELETE") => *request.method_mut() = Method::DELETE,
        _ => {}
    }

    request
}
