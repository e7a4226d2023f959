use std::sync::Arc;
use std::time::Duration;

use crate::workflows::fixtures::{clock, Script, ScriptedMessenger};
use crate::workflows::outreach::{
    AttemptOutcome, EpisodeState, FailoverController, OutreachTarget,
};

fn targets(count: usize) -> Vec<OutreachTarget> {
    (1..=count)
        .map(|rank| OutreachTarget {
            rank,
            candidate_id: format!("D{rank}"),
            name: format!("Donor {rank}"),
            channel: format!("+9100{rank}"),
        })
        .collect()
}

fn controller(messenger: Arc<ScriptedMessenger>) -> FailoverController {
    FailoverController::new(messenger, clock(), Duration::from_millis(200))
}

#[tokio::test]
async fn stops_at_first_accepting_candidate() {
    let messenger = Arc::new(
        ScriptedMessenger::default()
            .with("+91001", Script::Reject)
            .with("+91002", Script::Fail),
    );

    let episode = controller(messenger.clone())
        .run(&targets(5), |target| format!("hello {}", target.candidate_id))
        .await;

    assert_eq!(episode.state, EpisodeState::Succeeded { rank: 3 });
    assert_eq!(episode.attempts.len(), 3);
    let outcomes = episode
        .attempts
        .iter()
        .map(|attempt| attempt.outcome)
        .collect::<Vec<_>>();
    assert_eq!(
        outcomes,
        vec![AttemptOutcome::Failed, AttemptOutcome::Error, AttemptOutcome::Success]
    );
    assert_eq!(messenger.recipients(), vec!["+91001", "+91002", "+91003"]);
    assert_eq!(
        episode.contacted().map(|attempt| attempt.candidate_id.as_str()),
        Some("D3")
    );
    assert_eq!(
        episode.attempts[2].provider_message_id.as_deref(),
        Some("SM-+91003")
    );
}

#[tokio::test]
async fn exhausts_after_one_attempt_per_candidate() {
    let messenger = Arc::new(
        ScriptedMessenger::default()
            .with("+91001", Script::Reject)
            .with("+91002", Script::Reject)
            .with("+91003", Script::Fail),
    );

    let episode = controller(messenger.clone())
        .run(&targets(3), |_| "body".to_string())
        .await;

    assert_eq!(episode.state, EpisodeState::ExhaustedFailed);
    assert_eq!(episode.attempts.len(), 3);
    assert!(episode.attempts.iter().all(|attempt| !attempt.succeeded()));
    assert!(episode.contacted().is_none());
    let ranks = episode
        .attempts
        .iter()
        .map(|attempt| attempt.rank)
        .collect::<Vec<_>>();
    assert_eq!(ranks, vec![1, 2, 3]);
}

#[tokio::test]
async fn hanging_provider_is_an_error_attempt_and_failover_continues() {
    let messenger = Arc::new(ScriptedMessenger::default().with("+91001", Script::Hang));

    let episode = controller(messenger)
        .run(&targets(2), |_| "body".to_string())
        .await;

    assert_eq!(episode.state, EpisodeState::Succeeded { rank: 2 });
    assert_eq!(episode.attempts[0].outcome, AttemptOutcome::Error);
    assert!(episode.attempts[0]
        .detail
        .as_deref()
        .is_some_and(|detail| detail.contains("timed out")));
}

#[tokio::test]
async fn empty_target_list_is_exhausted_without_sending() {
    let messenger = Arc::new(ScriptedMessenger::default());

    let episode = controller(messenger.clone())
        .run(&[], |_| "body".to_string())
        .await;

    assert_eq!(episode.state, EpisodeState::ExhaustedFailed);
    assert!(episode.attempts.is_empty());
    assert!(messenger.sent().is_empty());
}
