// Operator context extraction from request headers
use crate::application::operator_context::OperatorContext;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use std::convert::Infallible;

pub const OPERATOR_HEADER: &str = "x-operator-id";

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for OperatorContext {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let operator = parts
            .headers
            .get(OPERATOR_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty());

        Ok(match operator {
            Some(id) => OperatorContext::for_operator(id),
            None => OperatorContext::anonymous(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(request: Request<()>) -> OperatorContext {
        let (mut parts, _) = request.into_parts();
        OperatorContext::from_request_parts(&mut parts, &()).await.unwrap()
    }

    #[tokio::test]
    async fn test_operator_header() {
        let request = Request::builder().header(OPERATOR_HEADER, " WG42 ").body(()).unwrap();
        assert_eq!(extract(request).await.actor(), "WG42");

        let request = Request::builder().body(()).unwrap();
        assert_eq!(extract(request).await, OperatorContext::anonymous());
    }
}
