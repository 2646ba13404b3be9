//! Fixed-budget retry for idempotent driver calls.

use std::fmt::Display;
use std::future::Future;

use tracing::warn;

/// Run `op` until it succeeds, fails with a non-transient error, or
/// `attempts` tries have been spent. `attempts` counts the first try.
pub(crate) async fn with_retries<T, E, F, Fut>(
    op_name: &str,
    attempts: u32,
    is_transient: impl Fn(&E) -> bool,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) if attempt < attempts && is_transient(&e) => {
                warn!(op = op_name, attempt, max_attempts = attempts, err = %e, "transient cassandra error, retrying");
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Debug, PartialEq)]
    enum FakeErr {
        Timeout,
        Syntax,
    }

    impl Display for FakeErr {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    fn transient(e: &FakeErr) -> bool {
        matches!(e, FakeErr::Timeout)
    }

    #[tokio::test]
    async fn recovers_within_budget() {
        let calls = Cell::new(0);
        let out = with_retries("test", 3, transient, || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move {
                if n < 3 {
                    Err(FakeErr::Timeout)
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(out, Ok(3));
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn gives_up_after_budget() {
        let calls = Cell::new(0);
        let out: Result<(), _> = with_retries("test", 3, transient, || {
            calls.set(calls.get() + 1);
            async { Err(FakeErr::Timeout) }
        })
        .await;
        assert_eq!(out, Err(FakeErr::Timeout));
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let calls = Cell::new(0);
        let out: Result<(), _> = with_retries("test", 3, transient, || {
            calls.set(calls.get() + 1);
            async { Err(FakeErr::Syntax) }
        })
        .await;
        assert_eq!(out, Err(FakeErr::Syntax));
        assert_eq!(calls.get(), 1);
    }
}
