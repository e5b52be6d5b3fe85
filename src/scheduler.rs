use crate::types::{FetchOutput, Resource};
use anyhow::Context;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error};

/// Run `fetch` for every resource, with at most `max_concurrent` running at once.
///
/// Tasks are spawned in list order but finish in whatever order their
/// subprocesses do. A failed fetch is logged and kept in the returned list;
/// it never stops the others. `Err` means the fan-out itself broke (a task
/// panicked), not that some fetch failed.
pub async fn fan_out<F, Fut>(
    resources: Vec<Resource>,
    max_concurrent: usize,
    fetch: F,
) -> anyhow::Result<Vec<FetchOutput>>
where
    F: Fn(Resource) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = FetchOutput> + Send + 'static,
{
    let total = resources.len();
    // Semaphore::new panics past MAX_PERMITS and zero permits would never run anything.
    let semaphore = Arc::new(Semaphore::new(
        max_concurrent.clamp(1, Semaphore::MAX_PERMITS),
    ));
    let fetch = Arc::new(fetch);
    let mut tasks = JoinSet::new();

    for resource in resources {
        let semaphore = Arc::clone(&semaphore);
        let fetch = Arc::clone(&fetch);
        tasks.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .context("concurrency limiter closed")?;
            debug!("Fetching {}", resource.name);
            Ok::<_, anyhow::Error>(fetch(resource).await)
        });
    }

    let mut outputs = Vec::with_capacity(total);
    while let Some(joined) = tasks.join_next().await {
        let output = joined.context("fetch task did not complete")??;
        debug!("Finished {}", output.command_log.trim_end());
        if let Some(err) = &output.error {
            error!("error processing resource {}: {}", output.resource_name, err);
        }
        outputs.push(output);
    }

    Ok(outputs)
}
