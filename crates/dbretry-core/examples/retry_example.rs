//! Example: Running flaky database calls through a retry policy
//!
//! This example demonstrates:
//! 1. Blocking retry with exponential backoff
//! 2. Custom retry predicate (only retry deadlocks)
//! 3. Cancelling an async retry loop during backoff
//!
//! Run with:
//! ```bash
//! RUST_LOG=dbretry_core=debug cargo run -p dbretry-core --example retry_example
//! ```

use dbretry_core::prelude::*;
use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// A simulated database that fails the first few times
struct FlakyDatabase {
    attempts: Arc<AtomicU32>,
    fail_count: u32,
    failure: ErrorCategory,
}

impl FlakyDatabase {
    fn new(fail_count: u32, failure: ErrorCategory) -> Self {
        Self {
            attempts: Arc::new(AtomicU32::new(0)),
            fail_count,
            failure,
        }
    }

    fn execute_non_query(&self) -> Result<i64, ErrorDescription> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);

        if attempt < self.fail_count {
            println!("  Attempt {}: FAILED ({})", attempt + 1, self.failure);
            Err(ErrorDescription::new(
                self.failure,
                format!("simulated failure on attempt {}", attempt + 1),
            ))
        } else {
            println!("  Attempt {}: SUCCESS", attempt + 1);
            Ok(1)
        }
    }

    fn total_attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

/// Example 1: Blocking retry with exponential backoff
fn example_blocking_retry() -> Result<(), Box<dyn Error>> {
    println!("\n=== Example 1: Blocking Retry with Exponential Backoff ===\n");

    let policy = RetryPolicy::builder()
        .max_retries(3)
        .base_delay(Duration::from_millis(100))
        .multiplier(2.0)
        .jitter(false) // No jitter for predictable output
        .build();

    let db = FlakyDatabase::new(2, ErrorCategory::ConnectionReset);

    println!("Executing against a database that drops the connection twice...");
    let start = Instant::now();
    let affected = policy.execute(|| db.execute_non_query())?;

    println!("\nRows affected: {}", affected);
    println!("Total attempts: {}", db.total_attempts());
    println!("Total time: {:?}", start.elapsed());
    println!("Expected delays: 0ms (attempt 1) + 100ms + 200ms = ~300ms");

    Ok(())
}

/// Example 2: Custom retry predicate
fn example_custom_predicate() -> Result<(), Box<dyn Error>> {
    println!("\n=== Example 2: Custom Retry Predicate (Deadlocks Only) ===\n");

    let policy = RetryPolicy::builder()
        .max_retries(3)
        .base_delay(Duration::from_millis(10))
        .retry_if(|e: &ErrorDescription| e.category == ErrorCategory::Deadlock)
        .build();

    println!("Test 1: Timeout (should NOT retry under this predicate)");
    let db = FlakyDatabase::new(1, ErrorCategory::Timeout);
    let err = policy.execute(|| db.execute_non_query()).unwrap_err();
    println!("  -> {} after {} attempt(s)", err, db.total_attempts());

    println!("\nTest 2: Deadlock victim (should retry)");
    let db = FlakyDatabase::new(2, ErrorCategory::Deadlock);
    let affected = policy.execute(|| db.execute_non_query())?;
    println!("  -> {} row(s) after {} attempts", affected, db.total_attempts());

    Ok(())
}

/// Example 3: Cancellation during backoff
async fn example_cancellation() -> Result<(), Box<dyn Error>> {
    println!("\n=== Example 3: Cancellation During Backoff ===\n");

    let policy = RetryPolicy::builder()
        .max_retries(5)
        .base_delay(Duration::from_secs(2))
        .on_retry(|event: &RetryEvent| {
            println!(
                "  Retry event: attempt {} failed, waiting {:?}",
                event.attempt.number, event.delay
            );
        })
        .build();

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        println!("  Cancelling...");
        canceller.cancel();
    });

    let db = FlakyDatabase::new(u32::MAX, ErrorCategory::Throttled);
    let result = policy
        .execute_async(
            |_| {
                let db = &db;
                async move { db.execute_non_query() }
            },
            &token,
        )
        .await;

    match result {
        Err(err) if err.is_cancelled() => println!("  -> {}", err),
        other => println!("  -> unexpected outcome: {:?}", other),
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("==============================================");
    println!("   dbretry Core: Retry Policy Examples");
    println!("==============================================");

    example_blocking_retry()?;
    example_custom_predicate()?;
    example_cancellation().await?;

    println!("\n==============================================");
    println!("   All examples completed successfully!");
    println!("==============================================\n");

    Ok(())
}
