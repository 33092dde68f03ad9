//! Bounded parallel fan-out
//!
//! Runs a batch of independent calls with at most `jobs` in flight, keeping
//! results index-aligned with inputs (completion order never reorders the
//! output). Callers that need per-item outcomes use the `_settled` variant;
//! otherwise the first failure fails the whole batch.

use rayon::prelude::*;

/// Fan out an infallible operation over a batch of inputs
///
/// Results are in input order. With `jobs <= 1` (or a single item) the batch
/// runs sequentially on the calling thread.
pub fn map_bounded<T, R, F>(items: Vec<T>, jobs: usize, op: F) -> Vec<R>
where
    T: Send,
    R: Send,
    F: Fn(T) -> R + Sync + Send,
{
    if jobs <= 1 || items.len() <= 1 {
        return items.into_iter().map(op).collect();
    }

    match build_pool(jobs) {
        Some(pool) => pool.install(|| items.into_par_iter().map(op).collect()),
        None => items.into_iter().map(op).collect(),
    }
}

/// Fan out a fallible operation; the first error fails the whole batch
///
/// On success the results are index-aligned with the inputs. Callers that
/// must not lose partial progress wrap per-item outcomes themselves (or use
/// [`map_bounded_settled`]); this function does not swallow errors.
pub fn try_map_bounded<T, R, E, F>(items: Vec<T>, jobs: usize, op: F) -> Result<Vec<R>, E>
where
    T: Send,
    R: Send,
    E: Send,
    F: Fn(T) -> Result<R, E> + Sync + Send,
{
    if jobs <= 1 || items.len() <= 1 {
        return items.into_iter().map(op).collect();
    }

    match build_pool(jobs) {
        Some(pool) => pool.install(|| items.into_par_iter().map(op).collect()),
        None => items.into_iter().map(op).collect(),
    }
}

/// Fan out a fallible operation, capturing each item's outcome
pub fn map_bounded_settled<T, R, E, F>(items: Vec<T>, jobs: usize, op: F) -> Vec<Result<R, E>>
where
    T: Send,
    R: Send,
    E: Send,
    F: Fn(T) -> Result<R, E> + Sync + Send,
{
    map_bounded(items, jobs, op)
}

fn build_pool(jobs: usize) -> Option<rayon::ThreadPool> {
    match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
        Ok(pool) => Some(pool),
        Err(err) => {
            log::warn!("thread pool unavailable ({err}), running batch sequentially");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_results_align_with_inputs() {
        let items: Vec<usize> = (0..100).collect();
        let results = map_bounded(items, 8, |i| i * 2);
        assert_eq!(results.len(), 100);
        for (i, r) in results.iter().enumerate() {
            assert_eq!(*r, i * 2);
        }
    }

    #[test]
    fn test_sequential_path_for_single_job() {
        let results = map_bounded(vec![1, 2, 3], 1, |i| i + 1);
        assert_eq!(results, vec![2, 3, 4]);
    }

    #[test]
    fn test_first_error_fails_the_batch() {
        let result: Result<Vec<usize>, String> = try_map_bounded((0..10).collect(), 4, |i| {
            if i == 7 {
                Err(format!("item {i} failed"))
            } else {
                Ok(i)
            }
        });
        assert_eq!(result.unwrap_err(), "item 7 failed");
    }

    #[test]
    fn test_settled_captures_per_item_outcomes() {
        let outcomes: Vec<Result<usize, String>> =
            map_bounded_settled((0..6).collect(), 4, |i| {
                if i % 2 == 0 {
                    Ok(i)
                } else {
                    Err(format!("odd {i}"))
                }
            });
        assert_eq!(outcomes.len(), 6);
        assert_eq!(outcomes[2], Ok(2));
        assert_eq!(outcomes[3], Err("odd 3".to_string()));
    }

    #[test]
    fn test_every_item_runs_exactly_once() {
        let calls = AtomicUsize::new(0);
        let results = map_bounded((0..50).collect::<Vec<usize>>(), 16, |i| {
            calls.fetch_add(1, Ordering::Relaxed);
            i
        });
        assert_eq!(results.len(), 50);
        assert_eq!(calls.load(Ordering::Relaxed), 50);
    }
}
