#![no_main]

//! Fuzz testing for retry backoff computation.

use std::time::Duration;

use arbitrary::Arbitrary;
use azure_aci::RetryConfig;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    wait_min_ms: u32,
    wait_max_ms: u32,
    max_retries: u32,
    attempt: u32,
    retry_after_secs: Option<u32>,
}

fuzz_target!(|input: Input| {
    let min = Duration::from_millis(input.wait_min_ms.min(input.wait_max_ms) as u64);
    let max = Duration::from_millis(input.wait_min_ms.max(input.wait_max_ms) as u64);
    let retry = RetryConfig::new(min, max, input.max_retries);
    let retry_after = input.retry_after_secs.map(|s| Duration::from_secs(s as u64));

    // Never overflows and never exceeds the cap
    let wait = retry.backoff(input.attempt, retry_after);
    assert!(wait <= max);

    if retry_after.is_none() {
        assert!(wait >= min);
    }

    assert_eq!(retry.can_retry(input.attempt), input.attempt < input.max_retries);
});
