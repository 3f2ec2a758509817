//! Backoff, budget and failure-handling properties of the status poller,
//! checked on tokio's paused clock so the wait intervals are exact.


use std::time::Duration;

use tokio_util::sync::CancellationToken;

use nemos::config::PollPolicy;
use nemos::error::PollError;
use nemos::job::{JobHandle, JobStatus};
use nemos::poller::{poll_to_terminal, PollOutcome};
use nemos::stream::OutputStream;

use test_harness::{FakeNeos, ScriptedPoll};

fn handle() -> JobHandle {
    JobHandle::new(42, "tok")
}

fn policy() -> PollPolicy {
    PollPolicy::short()
        .with_intervals(Duration::from_secs(1), Duration::from_secs(60))
        .with_budget(Duration::from_secs(3600))
}

async fn run(neos: &FakeNeos, policy: &PollPolicy) -> Result<PollOutcome, PollError> {
    let mut stream = OutputStream::new();
    let mut sink = Vec::new();
    let cancel = CancellationToken::new();
    poll_to_terminal(neos, &handle(), policy, &mut stream, &mut sink, &cancel).await
}

#[tokio::test(start_paused = true)]
async fn backoff_doubles_while_status_is_unchanged_and_resets_on_change() {
    // Starts as Queued, so three more Queued polls are "unchanged".
    let neos = FakeNeos::new().with_statuses([
        JobStatus::Queued,
        JobStatus::Queued,
        JobStatus::Queued,
        JobStatus::Running,
        JobStatus::Running,
        JobStatus::Done,
    ]);

    let outcome = run(&neos, &policy()).await.unwrap();
    assert_eq!(outcome, PollOutcome::Terminal(JobStatus::Done));

    let gaps = neos.poll_gaps();
    assert_eq!(
        gaps,
        vec![
            Duration::from_secs(2), // unchanged: 1s doubled
            Duration::from_secs(4),
            Duration::from_secs(8),
            Duration::from_secs(1), // Queued -> Running resets to the minimum
            Duration::from_secs(2), // unchanged again
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn backoff_is_capped_at_the_policy_maximum() {
    let neos = FakeNeos::new().with_statuses([
        JobStatus::Queued,
        JobStatus::Queued,
        JobStatus::Queued,
        JobStatus::Queued,
        JobStatus::Queued,
        JobStatus::Done,
    ]);

    let policy = policy().with_intervals(Duration::from_secs(1), Duration::from_secs(4));
    run(&neos, &policy).await.unwrap();

    let gaps = neos.poll_gaps();
    assert_eq!(
        gaps,
        vec![
            Duration::from_secs(2),
            Duration::from_secs(4),
            Duration::from_secs(4),
            Duration::from_secs(4),
            Duration::from_secs(4),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn terminal_state_stops_polling_immediately() {
    let neos = FakeNeos::new().with_statuses([JobStatus::Running, JobStatus::Done]);

    run(&neos, &policy()).await.unwrap();
    assert_eq!(
        neos.status_calls.load(std::sync::atomic::Ordering::SeqCst),
        2
    );
}

#[tokio::test(start_paused = true)]
async fn unknown_job_is_fatal_without_retry() {
    let neos = FakeNeos::new().with_statuses([JobStatus::Unknown, JobStatus::Done]);

    let err = run(&neos, &policy()).await.unwrap_err();
    assert!(matches!(err, PollError::JobNotFound));
    assert_eq!(
        neos.status_calls.load(std::sync::atomic::Ordering::SeqCst),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn budget_exhaustion_is_reported_distinctly() {
    // The script runs dry on Queued and stays there.
    let neos = FakeNeos::new().with_statuses([JobStatus::Queued]);

    let policy = policy().with_budget(Duration::from_secs(10));
    let err = run(&neos, &policy).await.unwrap_err();
    match err {
        PollError::BudgetExceeded(budget) => assert_eq!(budget, Duration::from_secs(10)),
        other => panic!("expected budget exhaustion, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn consecutive_transport_failures_exhaust_the_bound() {
    let neos = FakeNeos::new().with_polls([
        ScriptedPoll::TransportFailure,
        ScriptedPoll::TransportFailure,
        ScriptedPoll::TransportFailure,
    ]);

    let policy = policy().with_max_transport_failures(3);
    let err = run(&neos, &policy).await.unwrap_err();
    match err {
        PollError::TransportExhausted { attempts, .. } => assert_eq!(attempts, 3),
        other => panic!("expected transport exhaustion, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn a_successful_poll_resets_the_failure_counter() {
    let neos = FakeNeos::new().with_polls([
        ScriptedPoll::TransportFailure,
        ScriptedPoll::TransportFailure,
        ScriptedPoll::Status(JobStatus::Running),
        ScriptedPoll::TransportFailure,
        ScriptedPoll::TransportFailure,
        ScriptedPoll::Status(JobStatus::Done),
    ]);

    // Three consecutive failures would be fatal, but the successes in
    // between start the count over.
    let policy = policy().with_max_transport_failures(3);
    let outcome = run(&neos, &policy).await.unwrap();
    assert_eq!(outcome, PollOutcome::Terminal(JobStatus::Done));
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_the_wait() {
    let neos = FakeNeos::new().with_statuses([JobStatus::Running]);

    let mut stream = OutputStream::new();
    let mut sink = Vec::new();
    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(1500)).await;
        canceller.cancel();
    });

    let outcome = poll_to_terminal(&neos, &handle(), &policy(), &mut stream, &mut sink, &cancel)
        .await
        .unwrap();
    assert_eq!(outcome, PollOutcome::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn partial_output_reaches_the_sink_exactly_once() {
    let neos = FakeNeos::new()
        .with_statuses([JobStatus::Running, JobStatus::Running, JobStatus::Done])
        .with_partial_output(b"progress line\n");

    let mut stream = OutputStream::new();
    let mut sink = Vec::new();
    let cancel = CancellationToken::new();
    poll_to_terminal(&neos, &handle(), &policy(), &mut stream, &mut sink, &cancel)
        .await
        .unwrap();

    assert_eq!(sink, b"progress line\n");
    assert_eq!(stream.offset(), b"progress line\n".len());
}
