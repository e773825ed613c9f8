use futures::stream::{self, StreamExt};
use std::future::Future;

/// Runs `f` over every input with at most `limit` futures in flight
///
/// Returns once every future has completed. Results arrive in completion
/// order, not input order; callers that need a stable order sort afterwards.
pub async fn fan_out<I, T, F, Fut>(inputs: I, limit: usize, f: F) -> Vec<T>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = T>,
{
    stream::iter(inputs)
        .map(f)
        .buffer_unordered(limit.max(1))
        .collect()
        .await
}
