#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
use rayon::ThreadPool;
#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
use std::sync::OnceLock;

/// Thread pool shared by every task this crate runs.
///
/// Rayon's global pool panics on first use if it cannot spawn its threads. A crate-local pool
/// lets task dispatch degrade to sequential execution instead.
#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
static TASK_POOL: OnceLock<Option<ThreadPool>> = OnceLock::new();

#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
fn desired_threads() -> usize {
    let from_env = std::env::var("RAYON_NUM_THREADS")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|&n| n > 0);
    from_env.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    })
}

#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
fn build_task_pool() -> Option<ThreadPool> {
    let mut threads = desired_threads().max(1);
    loop {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("densegroup-task-{i}"))
            .build()
        {
            Ok(pool) => return Some(pool),
            Err(err) if threads > 1 => {
                log::warn!(
                    "failed to build a {threads}-thread task pool ({err}); retrying smaller"
                );
                threads /= 2;
            }
            Err(err) => {
                log::warn!("task pool unavailable ({err}); tasks will run sequentially");
                return None;
            }
        }
    }
}

/// Returns the crate-local thread pool, if one could be created.
#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
pub(crate) fn task_pool() -> Option<&'static ThreadPool> {
    TASK_POOL.get_or_init(build_task_pool).as_ref()
}
