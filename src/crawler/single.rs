//! One-shot commands: crawl a single package or person, touch a package
//!
//! These bypass the batch loop entirely. The blacklist is still fed (and
//! persisted) when a package turns out not to exist, but it is never used to
//! refuse an explicit request.

use crate::crawler::worker::{process_package, process_person, CrawlContext, PackageOutcome, PersonOutcome};
use crate::item::decode;
use crate::rpc::wire::calls;
use crate::rpc::Coordinator;
use crate::{AgentError, Result};

/// Crawls and pushes one package
pub async fn crawl_one_package(ctx: &CrawlContext, path: &str) -> PackageOutcome {
    let outcome = process_package(ctx, path).await;
    ctx.persist_skip_sets();
    outcome
}

/// Crawls and pushes one person given as `site:username`
///
/// # Returns
///
/// * `Ok(PersonOutcome)` - What happened to the person
/// * `Err(AgentError::MalformedIdentity)` - `id` lacks the separator
pub async fn crawl_one_person(ctx: &CrawlContext, id: &str) -> Result<PersonOutcome> {
    let person = decode(id)?;
    Ok(process_person(ctx, &person).await)
}

/// Asks the coordinator to crawl a package soon
///
/// # Returns
///
/// * `Ok(true)` - The package was moved ahead in the queue
/// * `Ok(false)` - It was already due
/// * `Err(AgentError::CoordinatorUnavailable)` - The call failed
pub async fn touch_package(coordinator: &dyn Coordinator, path: &str) -> Result<bool> {
    let scheduled = coordinator
        .touch_package(path)
        .await
        .map_err(|e| AgentError::coordinator(calls::TOUCH_PACKAGE, e))?;

    tracing::info!("Touch package {}: scheduled early: {}", path, scheduled);
    Ok(scheduled)
}
