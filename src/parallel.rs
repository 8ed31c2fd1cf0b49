//! Worker fan-out.
//!
//! Every embarrassingly-parallel step of a run goes through these helpers:
//! neighbor wiring, chain folding, ranking statistics and the two
//! propagation passes. With the `parallel` feature they dispatch to the
//! rayon pool that is current on the calling thread: a run's [`WorkerPool`]
//! while inside [`WorkerPool::install`], rayon's global pool otherwise.
//! Without the feature they run inline in the same order.

use crate::Result;

const DEFAULT_CHUNK_SIZE: usize = 64;

/// Worker pool owned by one run. Its threads shut down when it is dropped.
#[cfg(feature = "parallel")]
#[derive(Debug)]
pub struct WorkerPool {
    pool: rayon::ThreadPool,
}

#[cfg(feature = "parallel")]
impl WorkerPool {
    /// `workers == 0` picks one worker per available core.
    pub fn new(workers: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("hansel-worker-{i}"))
            .build()
            .map_err(|e| crate::Error::Config(format!("cannot start worker pool: {e}")))?;
        Ok(Self { pool })
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run `op` with this pool as the target of every fan-out inside it.
    pub fn install<R, F>(&self, op: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }
}

#[cfg(not(feature = "parallel"))]
#[derive(Debug)]
pub struct WorkerPool;

#[cfg(not(feature = "parallel"))]
impl WorkerPool {
    pub fn new(_workers: usize) -> Result<Self> {
        Ok(Self)
    }

    pub fn workers(&self) -> usize {
        1
    }

    pub fn install<R, F>(&self, op: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        op()
    }
}

pub fn preferred_chunk_size(total_items: usize) -> usize {
    if total_items == 0 {
        1
    } else {
        DEFAULT_CHUNK_SIZE.min(total_items.max(1))
    }
}

/// Map `f` over `items`, preserving order.
#[cfg(feature = "parallel")]
pub fn map<T, R, F>(items: &[T], f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync + Send,
{
    use rayon::prelude::*;
    let chunk = preferred_chunk_size(items.len());
    items.par_iter().with_min_len(chunk).map(f).collect()
}

#[cfg(not(feature = "parallel"))]
pub fn map<T, R, F>(items: &[T], f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync + Send,
{
    items.iter().map(f).collect()
}

/// Apply `f` to every element in place.
#[cfg(feature = "parallel")]
pub fn for_each_mut<T, F>(items: &mut [T], f: F)
where
    T: Send,
    F: Fn(&mut T) + Sync + Send,
{
    use rayon::prelude::*;
    let chunk = preferred_chunk_size(items.len());
    items.par_iter_mut().with_min_len(chunk).for_each(f);
}

#[cfg(not(feature = "parallel"))]
pub fn for_each_mut<T, F>(items: &mut [T], f: F)
where
    T: Send,
    F: Fn(&mut T) + Sync + Send,
{
    items.iter_mut().for_each(f);
}

/// Run two closures, potentially on different workers.
#[cfg(feature = "parallel")]
pub fn join<A, B, RA, RB>(a: A, b: B) -> (RA, RB)
where
    A: FnOnce() -> RA + Send,
    B: FnOnce() -> RB + Send,
    RA: Send,
    RB: Send,
{
    rayon::join(a, b)
}

#[cfg(not(feature = "parallel"))]
pub fn join<A, B, RA, RB>(a: A, b: B) -> (RA, RB)
where
    A: FnOnce() -> RA + Send,
    B: FnOnce() -> RB + Send,
    RA: Send,
    RB: Send,
{
    (a(), b())
}
