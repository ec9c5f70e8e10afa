pub mod handlers;

pub use handlers::*;

use crate::db::OrderRepository;
use crate::service::VerificationService;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;

/// All verification routes over one shared service
pub fn router<R: OrderRepository + 'static>(service: Arc<VerificationService<R>>) -> Router {
    let verification_routes = Router::new()
        .route("/api/verification/compare", post(handlers::compare::<R>))
        .route("/api/verification/preview", post(handlers::preview::<R>))
        .route("/api/verification/apply", post(handlers::apply::<R>))
        .route("/api/verification/report", post(handlers::report::<R>))
        .with_state(service);

    Router::new()
        .route("/health", get(handlers::health_check))
        .merge(verification_routes)
        .layer(ServiceBuilder::new())
}
