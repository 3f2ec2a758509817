/// Identity of one submitted job: the service-issued number plus the
/// opaque access token required by every later call about this job.
///
/// Losing the handle makes the job unrecoverable by this client; the job
/// keeps running server-side regardless.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub number: i32,
    pub password: String,
}

impl JobHandle {
    pub fn new(number: i32, password: impl Into<String>) -> Self {
        Self {
            number,
            password: password.into(),
        }
    }
}

/// Why a job ended without a usable solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Killed,
    InputError,
    ResourceLimit,
    ServerError,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Killed => write!(f, "job killed"),
            FailureKind::InputError => write!(f, "input error"),
            FailureKind::ResourceLimit => write!(f, "resource limit"),
            FailureKind::ServerError => write!(f, "server error"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Running,
    Done,
    Failed(FailureKind),
    /// The service does not recognize the handle (expired job, wrong token).
    Unknown,
}

impl JobStatus {
    /// Terminal states stop the polling loop; everything else keeps it going.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed(_))
    }

    /// Map a wire status string onto the closed status set. Returns `None`
    /// for strings outside the documented set so the caller can reject the
    /// response instead of guessing.
    pub fn from_wire(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("done") {
            Some(JobStatus::Done)
        } else if s.eq_ignore_ascii_case("running") {
            Some(JobStatus::Running)
        } else if s.eq_ignore_ascii_case("waiting") {
            Some(JobStatus::Queued)
        } else if s.eq_ignore_ascii_case("unknown job") || s.eq_ignore_ascii_case("bad password") {
            Some(JobStatus::Unknown)
        } else if s.eq_ignore_ascii_case("job killed") {
            Some(JobStatus::Failed(FailureKind::Killed))
        } else if s.eq_ignore_ascii_case("input error") {
            Some(JobStatus::Failed(FailureKind::InputError))
        } else if s.eq_ignore_ascii_case("resource limit") {
            Some(JobStatus::Failed(FailureKind::ResourceLimit))
        } else {
            None
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Queued => write!(f, "queued"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Done => write!(f, "done"),
            JobStatus::Failed(kind) => write!(f, "failed ({})", kind),
            JobStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// The service's final verdict for a terminal job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionCode {
    Normal,
    OutOfMemory,
    TimedOut,
    DiskSpace,
    ServerError,
    Killed,
    /// Verdict string outside the documented set, kept verbatim.
    Other(String),
}

impl CompletionCode {
    pub fn from_wire(s: &str) -> Self {
        let s = s.trim();
        if s.eq_ignore_ascii_case("normal") {
            CompletionCode::Normal
        } else if s.eq_ignore_ascii_case("out of memory") {
            CompletionCode::OutOfMemory
        } else if s.eq_ignore_ascii_case("timed out") {
            CompletionCode::TimedOut
        } else if s.eq_ignore_ascii_case("disk space") {
            CompletionCode::DiskSpace
        } else if s.eq_ignore_ascii_case("server error") {
            CompletionCode::ServerError
        } else if s.eq_ignore_ascii_case("killed") {
            CompletionCode::Killed
        } else {
            CompletionCode::Other(s.to_string())
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CompletionCode::Normal)
    }

    /// Failure kind implied by this code, for jobs whose status alone does
    /// not say why they ended. Unrecognized codes count as server-side
    /// failures rather than silent successes.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            CompletionCode::Normal => None,
            CompletionCode::Killed => Some(FailureKind::Killed),
            CompletionCode::OutOfMemory
            | CompletionCode::TimedOut
            | CompletionCode::DiskSpace => Some(FailureKind::ResourceLimit),
            CompletionCode::ServerError | CompletionCode::Other(_) => {
                Some(FailureKind::ServerError)
            }
        }
    }
}

impl std::fmt::Display for CompletionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompletionCode::Normal => write!(f, "Normal"),
            CompletionCode::OutOfMemory => write!(f, "Out of memory"),
            CompletionCode::TimedOut => write!(f, "Timed out"),
            CompletionCode::DiskSpace => write!(f, "Disk space"),
            CompletionCode::ServerError => write!(f, "Server error"),
            CompletionCode::Killed => write!(f, "Killed"),
            CompletionCode::Other(s) => write!(f, "{}", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_wire_mapping() {
        assert_eq!(JobStatus::from_wire("Done"), Some(JobStatus::Done));
        assert_eq!(JobStatus::from_wire("Running"), Some(JobStatus::Running));
        assert_eq!(JobStatus::from_wire("Waiting"), Some(JobStatus::Queued));
        assert_eq!(JobStatus::from_wire("Unknown Job"), Some(JobStatus::Unknown));
        assert_eq!(JobStatus::from_wire("Bad Password"), Some(JobStatus::Unknown));
        assert_eq!(
            JobStatus::from_wire("job killed"),
            Some(JobStatus::Failed(FailureKind::Killed))
        );
        assert_eq!(
            JobStatus::from_wire("Input Error"),
            Some(JobStatus::Failed(FailureKind::InputError))
        );
        assert_eq!(JobStatus::from_wire("whatever"), None);
    }

    #[test]
    fn status_wire_mapping_tolerates_whitespace_and_case() {
        assert_eq!(JobStatus::from_wire("  done \n"), Some(JobStatus::Done));
        assert_eq!(JobStatus::from_wire("RUNNING"), Some(JobStatus::Running));
    }

    #[test]
    fn only_done_and_failed_are_terminal() {
        assert!(JobStatus::Done.is_terminal());
        assert!(JobStatus::Failed(FailureKind::Killed).is_terminal());
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(!JobStatus::Unknown.is_terminal());
    }

    #[test]
    fn completion_code_wire_mapping() {
        assert_eq!(CompletionCode::from_wire("Normal"), CompletionCode::Normal);
        assert_eq!(
            CompletionCode::from_wire("Out of memory"),
            CompletionCode::OutOfMemory
        );
        assert_eq!(
            CompletionCode::from_wire("Bus error"),
            CompletionCode::Other("Bus error".to_string())
        );
    }

    #[test]
    fn only_normal_is_success() {
        assert!(CompletionCode::Normal.is_success());
        assert!(!CompletionCode::Killed.is_success());
        assert!(!CompletionCode::Other("Solved".to_string()).is_success());
    }

    #[test]
    fn failure_kind_from_completion_code() {
        assert_eq!(CompletionCode::Normal.failure_kind(), None);
        assert_eq!(
            CompletionCode::Killed.failure_kind(),
            Some(FailureKind::Killed)
        );
        assert_eq!(
            CompletionCode::TimedOut.failure_kind(),
            Some(FailureKind::ResourceLimit)
        );
        assert_eq!(
            CompletionCode::Other("Bus error".to_string()).failure_kind(),
            Some(FailureKind::ServerError)
        );
    }
}
