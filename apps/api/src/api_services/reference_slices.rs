use staffhub_application::{SubscribeOptions, SubscriptionScope, SyncService};
use staffhub_core::AppResult;
use staffhub_domain::{CustomerFields, LocationFields, VendorFields};
use tracing::info;

/// Opens the process-wide channels that publish join targets into application state.
pub async fn open_reference_slices(sync_service: &SyncService) -> AppResult<SubscriptionScope> {
    let scope = SubscriptionScope::new(sync_service.clone());
    scope
        .subscribe(SubscribeOptions::<CustomerFields>::new().publish())
        .await?;
    scope
        .subscribe(SubscribeOptions::<VendorFields>::new().publish())
        .await?;
    scope
        .subscribe(SubscribeOptions::<LocationFields>::new().publish())
        .await?;

    info!(channels = scope.len(), "reference slices published");
    Ok(scope)
}
