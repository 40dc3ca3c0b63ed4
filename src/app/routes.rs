use crate::app::handlers;
use crate::core::relay::RelayService;
use crate::core::RecordStore;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;

pub fn router<S: RecordStore + 'static>(relay: Arc<RelayService<S>>) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/message/write", get(handlers::write_message::<S>))
        .route("/http", get(handlers::proxy_http::<S>))
        .route("/image/messages", get(handlers::render_messages::<S>))
        .with_state(relay)
}
