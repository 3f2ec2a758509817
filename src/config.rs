use std::time::Duration;

/// Category substituted when a request leaves it unset.
pub const DEFAULT_CATEGORY: &str = "milp";

/// Solver substituted when a request leaves it unset.
pub const DEFAULT_SOLVER: &str = "FICO-Xpress";

/// Default service endpoint; override with the `NEOS_HOST` environment
/// variable or the `--endpoint` flag.
pub const DEFAULT_ENDPOINT: &str = "https://neos-server.org:3333";

const DEFAULT_PORT: u16 = 3333;
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable holding an endpoint override. Accepts either a
/// full URL or a bare hostname.
pub const ENV_ENDPOINT: &str = "NEOS_HOST";

/// Queueing envelope the job is submitted under. Short jobs are expected
/// to finish within minutes and are polled aggressively; long jobs may sit
/// queued for hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Short,
    Long,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Short => write!(f, "short"),
            Priority::Long => write!(f, "long"),
        }
    }
}

/// One solve request, minus the identity fields supplied by the
/// credential provider.
#[derive(Debug, Clone)]
pub struct SolveConfig {
    /// Problem category. Empty means "use the default".
    pub category: String,
    /// Solver name. Empty means "use the default".
    pub solver: String,
    /// Space-separated `key=value` tokens passed through to the solver.
    pub options: String,
    pub priority: Priority,
}

impl Default for SolveConfig {
    fn default() -> Self {
        Self {
            category: DEFAULT_CATEGORY.to_string(),
            solver: DEFAULT_SOLVER.to_string(),
            options: String::new(),
            priority: Priority::Long,
        }
    }
}

impl SolveConfig {
    pub fn new(category: impl Into<String>, solver: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            solver: solver.into(),
            ..Default::default()
        }
    }

    pub fn with_options(mut self, options: impl Into<String>) -> Self {
        self.options = options.into();
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}

/// Policy constants driving the status poller. These are tunables, not
/// contracts; tests construct their own values.
#[derive(Debug, Clone)]
pub struct PollPolicy {
    /// Wait before the second poll; later waits double from here.
    pub initial_interval: Duration,
    /// Backoff ceiling.
    pub max_interval: Duration,
    /// Total wall-clock allowance for one job, submission to terminal.
    pub budget: Duration,
    /// Consecutive transport failures tolerated before giving up.
    pub max_transport_failures: u32,
}

impl PollPolicy {
    /// Envelope for jobs expected to finish within a few minutes.
    pub fn short() -> Self {
        Self {
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(15),
            budget: Duration::from_secs(5 * 60),
            max_transport_failures: 5,
        }
    }

    /// Envelope for jobs that may sit queued for a long time.
    pub fn long() -> Self {
        Self {
            initial_interval: Duration::from_secs(5),
            max_interval: Duration::from_secs(60),
            budget: Duration::from_secs(12 * 60 * 60),
            max_transport_failures: 5,
        }
    }

    pub fn for_priority(priority: Priority) -> Self {
        match priority {
            Priority::Short => Self::short(),
            Priority::Long => Self::long(),
        }
    }

    pub fn with_intervals(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_interval = initial;
        self.max_interval = max;
        self
    }

    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_max_transport_failures(mut self, max: u32) -> Self {
        self.max_transport_failures = max;
        self
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::long()
    }
}

/// Where and how to reach the service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub endpoint: String,
    /// Timeout for each individual remote call, independent of the
    /// polling budget.
    pub call_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

impl ServiceConfig {
    /// Default configuration with the `NEOS_HOST` override applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(host) = std::env::var(ENV_ENDPOINT) {
            if !host.trim().is_empty() {
                config.endpoint = normalize_endpoint(host.trim());
            }
        }
        config
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = normalize_endpoint(&endpoint.into());
        self
    }
}

fn normalize_endpoint(host: &str) -> String {
    if host.contains("://") {
        host.trim_end_matches('/').to_string()
    } else {
        format!("https://{}:{}", host, DEFAULT_PORT)
    }
}
