use std::path::Path;

use axum::Router;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::get;
use staffhub_core::AppError;
use staffhub_domain::{
    CustomerFields, EntityFields, EventFields, ExpenseClaimFields, LeaveRequestFields,
    LocationFields, ProductRequestFields, ProjectFields, PromotionFields, ResourceFields,
    UserProfileFields, VendorFields,
};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::handlers::entities::entity_routes;
use crate::state::AppState;
use crate::{handlers, middleware};

mod cors;

pub fn build_router(
    app_state: AppState,
    frontend_url: &str,
    blob_root: &Path,
) -> Result<Router, AppError> {
    let entity_api = Router::new();
    let entity_api = mount::<EventFields>(entity_api);
    let entity_api = mount::<LeaveRequestFields>(entity_api);
    let entity_api = mount::<ExpenseClaimFields>(entity_api);
    let entity_api = mount::<ProjectFields>(entity_api);
    let entity_api = mount::<PromotionFields>(entity_api);
    let entity_api = mount::<ResourceFields>(entity_api);
    let entity_api = mount::<ProductRequestFields>(entity_api);
    let entity_api = mount::<CustomerFields>(entity_api);
    let entity_api = mount::<VendorFields>(entity_api);
    let entity_api = mount::<UserProfileFields>(entity_api);
    let entity_api = mount::<LocationFields>(entity_api)
        .route_layer(from_fn(middleware::require_actor));

    let cors_layer = cors::build_cors_layer(frontend_url)?;

    Ok(Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(entity_api)
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_same_origin_for_mutations,
        ))
        .nest_service("/files", ServeDir::new(blob_root))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(app_state))
}

fn mount<F: EntityFields>(router: Router<AppState>) -> Router<AppState> {
    router.nest(&format!("/api/{}", F::COLLECTION.as_str()), entity_routes::<F>())
}
