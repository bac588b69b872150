//! Sequential runner for fixture-backed test cases.
//!
//! Cases run one after another against the same [`TestContext`]. A case fails
//! by returning an error or by panicking; either way the remaining cases
//! still run and the suite reports a non-zero exit code.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;

use futures::FutureExt;
use tracing::{debug, warn};

use super::TestContext;

/// Outcome of a single test case.
pub type TestResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

type CaseFuture = Pin<Box<dyn Future<Output = TestResult>>>;
type CaseFn = Box<dyn Fn(TestContext) -> CaseFuture>;

/// Anything that can run a suite against a context and report an exit code.
///
/// Implemented for [`Suite`] and for closures `FnOnce(TestContext) -> impl Future<Output = i32>`.
#[allow(async_fn_in_trait)]
pub trait SuiteRunner {
    async fn run(self, ctx: TestContext) -> i32;
}

impl<F, Fut> SuiteRunner for F
where
    F: FnOnce(TestContext) -> Fut,
    Fut: Future<Output = i32>,
{
    async fn run(self, ctx: TestContext) -> i32 {
        self(ctx).await
    }
}

struct Case {
    name: String,
    run: CaseFn,
}

/// An ordered list of named async test cases.
#[derive(Default)]
pub struct Suite {
    cases: Vec<Case>,
    filter: Option<String>,
}

impl std::fmt::Debug for Suite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Suite")
            .field("cases", &self.cases.iter().map(|c| &c.name).collect::<Vec<_>>())
            .field("filter", &self.filter)
            .finish()
    }
}

impl Suite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a case.
    pub fn case<F, Fut>(mut self, name: impl Into<String>, test: F) -> Self
    where
        F: Fn(TestContext) -> Fut + 'static,
        Fut: Future<Output = TestResult> + 'static,
    {
        self.cases.push(Case {
            name: name.into(),
            run: Box::new(move |ctx: TestContext| -> CaseFuture { Box::pin(test(ctx)) }),
        });
        self
    }

    /// Only runs cases whose name contains `filter`.
    pub fn filter(mut self, filter: Option<String>) -> Self {
        self.filter = filter.filter(|f| !f.is_empty());
        self
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    fn selected(&self, name: &str) -> bool {
        self.filter.as_deref().map_or(true, |f| name.contains(f))
    }

    /// Runs every selected case and collects the results.
    pub async fn execute(self, ctx: TestContext) -> SuiteReport {
        let mut report = SuiteReport::default();
        let selected = self.cases.iter().filter(|c| self.selected(&c.name)).count();
        println!("\nrunning {} tests", selected);

        for case in &self.cases {
            if !self.selected(&case.name) {
                report.filtered_out += 1;
                continue;
            }

            debug!(test = case.name.as_str(), "running test");
            let outcome = AssertUnwindSafe((case.run)(ctx.clone()))
                .catch_unwind()
                .await;

            match outcome {
                Ok(Ok(())) => {
                    println!("test {} ... ok", case.name);
                    report.passed.push(case.name.clone());
                }
                Ok(Err(err)) => {
                    println!("test {} ... FAILED", case.name);
                    warn!(test = case.name.as_str(), error = %err, "test failed");
                    report.failed.push((case.name.clone(), err.to_string()));
                }
                Err(panic) => {
                    println!("test {} ... FAILED", case.name);
                    let message = panic_message(panic.as_ref());
                    warn!(test = case.name.as_str(), message = message.as_str(), "test panicked");
                    report.failed.push((case.name.clone(), message));
                }
            }
        }

        report.print_summary();
        report
    }
}

impl SuiteRunner for Suite {
    async fn run(self, ctx: TestContext) -> i32 {
        self.execute(ctx).await.exit_code()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

/// Results of a suite run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuiteReport {
    pub passed: Vec<String>,
    /// Failed case names with their error messages.
    pub failed: Vec<(String, String)>,
    pub filtered_out: usize,
}

impl SuiteReport {
    /// `0` when every selected case passed, `1` otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.failed.is_empty() {
            0
        } else {
            1
        }
    }

    fn print_summary(&self) {
        if !self.failed.is_empty() {
            println!("\nfailures:");
            for (name, message) in &self.failed {
                println!("    {}: {}", name, message);
            }
        }
        println!(
            "\ntest result: {}. {} passed; {} failed; {} filtered out\n",
            if self.failed.is_empty() { "ok" } else { "FAILED" },
            self.passed.len(),
            self.failed.len(),
            self.filtered_out
        );
    }
}
