//! Thread configuration for batch runs

use cuenca_core::{Error, Result};

/// Processing mode for batch runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingMode {
    /// Single-threaded processing, items complete in input order
    Sequential,
    /// Parallel processing on the global rayon pool
    #[default]
    Parallel,
    /// Parallel on a dedicated pool with the given number of threads
    ParallelWith(usize),
}

impl ProcessingMode {
    /// Mode for a `--threads` style flag: `None` or `0` means all cores,
    /// `1` means sequential.
    pub fn from_threads(threads: Option<usize>) -> Self {
        match threads {
            None | Some(0) => ProcessingMode::Parallel,
            Some(1) => ProcessingMode::Sequential,
            Some(n) => ProcessingMode::ParallelWith(n),
        }
    }

    pub fn is_sequential(&self) -> bool {
        matches!(self, ProcessingMode::Sequential)
    }

    /// Number of worker threads this mode will use
    pub fn threads(&self) -> usize {
        match self {
            ProcessingMode::Sequential => 1,
            ProcessingMode::Parallel => num_cpus(),
            ProcessingMode::ParallelWith(n) => *n,
        }
    }

    /// Run `op` inside the pool this mode selects.
    ///
    /// `Sequential` and `Parallel` run on the caller's current pool;
    /// `ParallelWith(n)` builds a scoped pool of `n` threads.
    pub fn install<R, F>(&self, op: F) -> Result<R>
    where
        R: Send,
        F: FnOnce() -> R + Send,
    {
        match self {
            ProcessingMode::Sequential | ProcessingMode::Parallel => Ok(op()),
            ProcessingMode::ParallelWith(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(*threads)
                    .build()
                    .map_err(|e| Error::Other(format!("failed to build thread pool: {}", e)))?;
                Ok(pool.install(op))
            }
        }
    }
}

/// Get the number of available CPU cores
pub fn num_cpus() -> usize {
    rayon::current_num_threads()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_threads() {
        assert_eq!(ProcessingMode::from_threads(None), ProcessingMode::Parallel);
        assert_eq!(ProcessingMode::from_threads(Some(0)), ProcessingMode::Parallel);
        assert_eq!(ProcessingMode::from_threads(Some(1)), ProcessingMode::Sequential);
        assert_eq!(ProcessingMode::from_threads(Some(3)), ProcessingMode::ParallelWith(3));
    }

    #[test]
    fn test_install_dedicated_pool() {
        let threads = ProcessingMode::ParallelWith(2)
            .install(rayon::current_num_threads)
            .unwrap();
        assert_eq!(threads, 2);
    }

    #[test]
    fn test_install_sequential() {
        assert_eq!(ProcessingMode::Sequential.install(|| 7).unwrap(), 7);
        assert_eq!(ProcessingMode::Sequential.threads(), 1);
    }
}
