//! Resource-group test fixture.
//!
//! Live API tests need somewhere to put the resources they create. The
//! fixture provisions a throwaway resource group before the suite runs and
//! deletes it afterwards, so everything a test leaves behind goes with it.
//!
//! # Lifecycle
//!
//! 1. [`Fixture::initialize`] picks a unique group name and loads credentials
//!    through an [`AuthCell`] (at most once per cell).
//! 2. [`Fixture::set_up`] creates the resource group. Failure aborts the run.
//! 3. [`Fixture::run_suite`] runs the suite and captures its exit code.
//! 4. [`Fixture::tear_down`] deletes the group. Failure is logged, not fatal.
//! 5. [`exit`] terminates the process with the suite's code.
//!
//! [`run`] drives steps 1-4 and returns the code to hand to [`exit`].
//!
//! # Example
//!
//! ```no_run
//! use azure_aci::fixture::{self, AuthCell, FixtureSettings, Suite, TestContext, TestResult};
//!
//! static AUTH: AuthCell = AuthCell::new();
//!
//! async fn lists_nothing(ctx: TestContext) -> TestResult {
//!     let client = ctx.new_scoped_client()?;
//!     let _ = client.get_vnet(ctx.resource_group(), "missing").await;
//!     Ok(())
//! }
//!
//! fn main() {
//!     fixture::init_tracing();
//!     let runtime = tokio::runtime::Builder::new_current_thread()
//!         .enable_all()
//!         .build()
//!         .unwrap();
//!     let suite = Suite::new().case("lists_nothing", lists_nothing);
//!     let code = runtime.block_on(fixture::run(&FixtureSettings::from_env(), &AUTH, suite));
//!     fixture::exit(code);
//! }
//! ```

pub mod suite;

use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use futures::FutureExt;
use thiserror::Error;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

pub use suite::{Suite, SuiteReport, SuiteRunner, TestResult};

use crate::auth::{AuthError, Authentication};
use crate::client::ApiError;
use crate::resourcegroups::{self, Group};
use crate::{network, HttpClientConfig, RetryConfig};

/// Region the test resource group is created in.
pub const DEFAULT_LOCATION: &str = "westus";

/// Base name of the test resource group; a random suffix is appended.
pub const DEFAULT_GROUP_BASE: &str = "virtual-node-test-rg";

/// User agent suffix for clients built by the fixture.
pub const USER_AGENT: &str = "unit-test";

/// Overrides [`DEFAULT_LOCATION`].
pub const LOCATION_ENV: &str = "AZURE_TEST_LOCATION";

/// Overrides [`DEFAULT_GROUP_BASE`].
pub const GROUP_ENV: &str = "AZURE_TEST_RESOURCE_GROUP";

/// Overrides [`RetryConfig::max_retries`].
pub const RETRY_MAX_ENV: &str = "AZURE_TEST_RETRY_MAX";

/// Exit code when the fixture cannot be set up.
pub const SETUP_FAILURE: i32 = 1;

/// Exit code when the suite runner panics.
pub const SUITE_PANIC: i32 = 101;

/// Length of the random resource-group suffix.
const SUFFIX_LEN: usize = 6;

/// Errors that abort or degrade the fixture lifecycle.
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("failed to load Azure authentication file: {0}")]
    Auth(#[source] Arc<AuthError>),

    #[error("failed to create API client: {0}")]
    Client(#[source] ApiError),

    #[error("failed to create resource group {name}: {source}")]
    CreateGroup {
        name: String,
        #[source]
        source: ApiError,
    },

    #[error("failed to delete resource group {name}: {source}")]
    DeleteGroup {
        name: String,
        #[source]
        source: ApiError,
    },
}

/// One-shot latch around credential loading.
///
/// The first call runs the loader (retrying once on failure) and memoizes the
/// outcome, success or failure. Every later call returns the memoized value
/// without touching the filesystem.
#[derive(Debug, Default)]
pub struct AuthCell {
    cell: OnceLock<Result<Arc<Authentication>, Arc<AuthError>>>,
}

impl AuthCell {
    pub const fn new() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }

    /// Loads credentials from `path`, or from `AZURE_AUTH_LOCATION` when `None`.
    pub fn get_or_load(&self, path: Option<&Path>) -> Result<Arc<Authentication>, FixtureError> {
        match path {
            Some(path) => self.get_or_load_with(|| Authentication::from_file(path)),
            None => self.get_or_load_with(Authentication::from_env),
        }
    }

    /// Runs `load` on first use; a failed first attempt is retried once.
    pub fn get_or_load_with<F>(&self, load: F) -> Result<Arc<Authentication>, FixtureError>
    where
        F: Fn() -> Result<Authentication, AuthError>,
    {
        self.cell
            .get_or_init(|| {
                load()
                    .or_else(|err| {
                        warn!(error = %err, "loading authentication failed, retrying once");
                        load()
                    })
                    .map(Arc::new)
                    .map_err(Arc::new)
            })
            .clone()
            .map_err(FixtureError::Auth)
    }

    /// Returns `true` once a load has been attempted.
    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }
}

/// Returns `base` with a random 6-hex-character suffix.
pub fn unique_group_name(base: &str) -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{}-{}", base, &id[..SUFFIX_LEN])
}

/// Knobs for a fixture run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureSettings {
    pub location: String,
    pub group_base: String,
    pub user_agent: String,
    pub retry: RetryConfig,
    pub http: HttpClientConfig,
    /// Explicit auth file; `AZURE_AUTH_LOCATION` is used when unset.
    pub auth_location: Option<PathBuf>,
}

impl Default for FixtureSettings {
    fn default() -> Self {
        Self {
            location: DEFAULT_LOCATION.to_string(),
            group_base: DEFAULT_GROUP_BASE.to_string(),
            user_agent: USER_AGENT.to_string(),
            retry: RetryConfig::default(),
            http: HttpClientConfig::default(),
            auth_location: None,
        }
    }
}

impl FixtureSettings {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        override_string(&mut settings.location, LOCATION_ENV);
        override_string(&mut settings.group_base, GROUP_ENV);
        override_u32(&mut settings.retry.max_retries, RETRY_MAX_ENV);
        settings
    }
}

fn override_string(target: &mut String, env_key: &str) {
    match std::env::var(env_key) {
        Ok(val) if !val.trim().is_empty() => *target = val.trim().to_string(),
        _ => {}
    }
}

fn override_u32(target: &mut u32, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.trim().parse::<u32>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u32 from env var, ignoring"
            ),
        }
    }
}

/// Read-only state shared by every test in a run.
///
/// Cheap to clone: the credentials sit behind an `Arc`.
#[derive(Debug, Clone)]
pub struct TestContext {
    auth: Arc<Authentication>,
    retry: RetryConfig,
    http: HttpClientConfig,
    user_agent: String,
    location: String,
    resource_group: String,
}

impl TestContext {
    pub fn authentication(&self) -> &Arc<Authentication> {
        &self.auth
    }

    pub fn retry_config(&self) -> RetryConfig {
        self.retry
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Name of the resource group created for this run.
    pub fn resource_group(&self) -> &str {
        &self.resource_group
    }

    /// Builds a network client sharing this run's credentials and retry policy.
    ///
    /// Tests propagate the error with `?`, which fails only that test.
    pub fn new_scoped_client(&self) -> Result<network::Client, ApiError> {
        network::Client::with_config(
            Arc::clone(&self.auth),
            &self.user_agent,
            self.retry,
            self.http.clone(),
        )
    }

    pub fn resource_groups_client(&self) -> Result<resourcegroups::Client, ApiError> {
        resourcegroups::Client::with_config(
            Arc::clone(&self.auth),
            &self.user_agent,
            self.retry,
            self.http.clone(),
        )
    }
}

/// A provisioned resource group plus the client that will remove it.
#[derive(Debug)]
pub struct Fixture {
    ctx: TestContext,
    groups: resourcegroups::Client,
}

impl Fixture {
    /// Picks the group name and loads credentials.
    pub fn initialize(settings: &FixtureSettings, auth: &AuthCell) -> Result<TestContext, FixtureError> {
        let resource_group = unique_group_name(&settings.group_base);
        let auth = auth.get_or_load(settings.auth_location.as_deref())?;

        Ok(TestContext {
            auth,
            retry: settings.retry,
            http: settings.http.clone(),
            user_agent: settings.user_agent.clone(),
            location: settings.location.clone(),
            resource_group,
        })
    }

    /// Creates the resource group described by `ctx`.
    pub async fn set_up(ctx: TestContext) -> Result<Self, FixtureError> {
        let groups = ctx.resource_groups_client().map_err(FixtureError::Client)?;

        info!(
            resource_group = ctx.resource_group(),
            location = ctx.location(),
            "creating resource group"
        );
        let group = Group::new(ctx.resource_group(), ctx.location());
        groups
            .create_resource_group(ctx.resource_group(), &group)
            .await
            .map_err(|source| FixtureError::CreateGroup {
                name: ctx.resource_group.clone(),
                source,
            })?;

        Ok(Self { ctx, groups })
    }

    pub fn context(&self) -> &TestContext {
        &self.ctx
    }

    /// Runs `suite` and returns its exit code.
    ///
    /// A panicking runner yields [`SUITE_PANIC`] so teardown still happens.
    pub async fn run_suite<S: SuiteRunner>(&self, suite: S) -> i32 {
        let code = AssertUnwindSafe(suite.run(self.ctx.clone()))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| {
                error!("test suite panicked");
                SUITE_PANIC
            });
        info!(code, "test suite finished");
        code
    }

    /// Deletes the resource group.
    pub async fn tear_down(self) -> Result<(), FixtureError> {
        info!(resource_group = self.ctx.resource_group(), "deleting resource group");
        self.groups
            .delete_resource_group(self.ctx.resource_group())
            .await
            .map_err(|source| FixtureError::DeleteGroup {
                name: self.ctx.resource_group,
                source,
            })
    }
}

/// Runs the whole lifecycle and returns the process exit code.
///
/// Setup failures return [`SETUP_FAILURE`] without running the suite.
/// Otherwise the suite's own code is returned, whatever teardown does.
pub async fn run<S: SuiteRunner>(settings: &FixtureSettings, auth: &AuthCell, suite: S) -> i32 {
    let ctx = match Fixture::initialize(settings, auth) {
        Ok(ctx) => ctx,
        Err(err) => {
            error!(error = %err, "error setting up auth");
            return SETUP_FAILURE;
        }
    };

    let fixture = match Fixture::set_up(ctx).await {
        Ok(fixture) => fixture,
        Err(err) => {
            error!(error = %err, "error setting up resource group");
            return SETUP_FAILURE;
        }
    };

    let code = fixture.run_suite(suite).await;

    if let Err(err) = fixture.tear_down().await {
        warn!(error = %err, "error removing resource group");
    }

    code
}

/// Terminates the process with `code`.
pub fn exit(code: i32) -> ! {
    std::process::exit(code)
}

/// Installs a stderr subscriber filtered by `RUST_LOG` (default `info`).
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
