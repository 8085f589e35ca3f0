use std::future::Future;

use smallvec::SmallVec;

use crate::error::GatewayError;
use crate::health::{HealthKey, HealthStore, HealthTracker};
use crate::util::unix_now_secs;

/// Result of a successful failover run.
#[derive(Debug)]
pub struct FailoverOutcome<R> {
    pub response: R,
    pub endpoint: usize,
    pub source: usize,
    pub attempts: usize,
}

/// Walk `[start, count)` then `[0, start)`, returning the first untried
/// index accepted by `pred`.
fn first_untried<F>(count: usize, start: usize, tried: &[bool], mut pred: F) -> Option<usize>
where
    F: FnMut(usize) -> bool,
{
    for offset in 0..count {
        let index = (start + offset) % count;
        if !tried[index] && pred(index) {
            return Some(index);
        }
    }
    None
}

/// Pick the next endpoint to try.
///
/// First pass selects the first untried endpoint with at least one available
/// source; when every untried endpoint looks unhealthy, a second pass picks
/// the first untried endpoint regardless, so a total outage still makes
/// forward progress instead of refusing to route.
pub(crate) fn select_endpoint<F>(
    endpoint_count: usize,
    source_count: usize,
    start: usize,
    tried: &[bool],
    mut source_available: F,
) -> Option<usize>
where
    F: FnMut(usize, usize) -> bool,
{
    first_untried(endpoint_count, start, tried, |endpoint| {
        (0..source_count).any(|source| source_available(endpoint, source))
    })
    .or_else(|| first_untried(endpoint_count, start, tried, |_| true))
}

/// Drive the failover algorithm over `endpoint_count` endpoints reachable
/// through `source_count` sources each.
///
/// Endpoints are visited starting at the preferred index (priority index 0
/// when no preference is given), each at most once. Within an endpoint,
/// sources are exhausted in declared order before moving to the next
/// endpoint, so a transient blip on the primary source of the cheapest tier
/// does not escalate to a pricier tier prematurely. The first attempt whose
/// result is `Ok` wins outright; every outcome is recorded against its
/// `(endpoint, source)` health key.
///
/// # Errors
///
/// Returns [`GatewayError::Exhausted`] when every endpoint/source pair has
/// been attempted without success.
pub async fn run_failover<S, F, Fut, R>(
    endpoint_count: usize,
    source_count: usize,
    preferred: Option<usize>,
    health: &HealthTracker<S>,
    mut attempt: F,
) -> Result<FailoverOutcome<R>, GatewayError>
where
    S: HealthStore,
    F: FnMut(usize, usize) -> Fut,
    Fut: Future<Output = Result<R, GatewayError>>,
{
    if endpoint_count == 0 || source_count == 0 {
        return Err(GatewayError::Exhausted { attempts: 0 });
    }

    let start = preferred.filter(|index| *index < endpoint_count).unwrap_or(0);
    let mut tried: SmallVec<[bool; 8]> = SmallVec::from_elem(false, endpoint_count);
    let mut attempts = 0;

    for _ in 0..endpoint_count {
        let now = unix_now_secs();
        let Some(endpoint) = select_endpoint(endpoint_count, source_count, start, &tried, |e, s| {
            health.is_available(
                HealthKey {
                    endpoint: e,
                    source: s,
                },
                now,
            )
        }) else {
            break;
        };
        tried[endpoint] = true;

        for source in 0..source_count {
            let key = HealthKey { endpoint, source };
            attempts += 1;
            match attempt(endpoint, source).await {
                Ok(response) => {
                    health.record_success(key);
                    return Ok(FailoverOutcome {
                        response,
                        endpoint,
                        source,
                        attempts,
                    });
                }
                Err(err) => {
                    tracing::warn!(
                        endpoint,
                        source,
                        attempts,
                        error = %err,
                        "failover attempt failed"
                    );
                    health.record_failure(key, unix_now_secs());
                }
            }
        }
    }

    Err(GatewayError::Exhausted { attempts })
}
