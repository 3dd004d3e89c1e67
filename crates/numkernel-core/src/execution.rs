//! Row-chunked execution inside a kernel
//!
//! A kernel splits its input rows into fixed chunks, computes one partial
//! statistic per chunk and reduces them in chunk order with its own merge
//! arithmetic. With the `parallel` feature the chunks are mapped on the rayon
//! global pool; the reduction order is the same either way, so results do not
//! depend on scheduling.

use crate::error::Result;
use std::ops::Range;

/// Smallest chunk worth scheduling on its own
pub const MIN_CHUNK_ROWS: usize = 1024;

/// Execution strategy for chunked work
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ExecutionStrategy {
    /// Process chunks sequentially
    Sequential,
    /// Map chunks in parallel when the `parallel` feature is enabled
    Parallel,
    /// Parallel for inputs spanning more than one chunk
    #[default]
    Auto,
}

/// Chunk size for `n_rows` rows spread over the available cores
pub fn chunk_rows(n_rows: usize) -> usize {
    let threads = num_cpus::get().max(1);
    n_rows.div_ceil(threads).max(MIN_CHUNK_ROWS)
}

/// Consecutive `chunk`-row ranges covering `0..n_rows`
pub fn row_chunks(n_rows: usize, chunk: usize) -> impl Iterator<Item = Range<usize>> {
    let chunk = chunk.max(1);
    (0..n_rows)
        .step_by(chunk)
        .map(move |start| start..(start + chunk).min(n_rows))
}

/// Map every row chunk and reduce the results in chunk order
///
/// Returns `Ok(None)` for zero rows. The first error from `map` or `reduce`
/// is returned.
pub fn fold_row_chunks<A, M, R>(
    strategy: ExecutionStrategy,
    n_rows: usize,
    chunk: usize,
    map: M,
    reduce: R,
) -> Result<Option<A>>
where
    A: Send,
    M: Fn(Range<usize>) -> Result<A> + Sync + Send,
    R: Fn(A, A) -> Result<A>,
{
    let ranges: Vec<Range<usize>> = row_chunks(n_rows, chunk).collect();
    let parallel = match strategy {
        ExecutionStrategy::Sequential => false,
        ExecutionStrategy::Parallel => true,
        ExecutionStrategy::Auto => ranges.len() > 1,
    };

    let mapped: Vec<A> = if parallel {
        map_parallel(ranges, &map)?
    } else {
        ranges.into_iter().map(&map).collect::<Result<_>>()?
    };

    let mut acc: Option<A> = None;
    for item in mapped {
        acc = Some(match acc {
            Some(prev) => reduce(prev, item)?,
            None => item,
        });
    }
    Ok(acc)
}

#[cfg(feature = "parallel")]
fn map_parallel<A, M>(ranges: Vec<Range<usize>>, map: &M) -> Result<Vec<A>>
where
    A: Send,
    M: Fn(Range<usize>) -> Result<A> + Sync + Send,
{
    use rayon::prelude::*;
    ranges.into_par_iter().map(map).collect()
}

#[cfg(not(feature = "parallel"))]
fn map_parallel<A, M>(ranges: Vec<Range<usize>>, map: &M) -> Result<Vec<A>>
where
    A: Send,
    M: Fn(Range<usize>) -> Result<A> + Sync + Send,
{
    ranges.into_iter().map(map).collect()
}
