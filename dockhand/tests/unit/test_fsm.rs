//! FSM unit tests

use dockhand::deploy::fsm::{JobEvent, JobFsm};
use dockhand::models::job::JobStatus;

#[test]
fn test_fsm_initial_state() {
    let fsm = JobFsm::new();
    assert_eq!(fsm.state(), JobStatus::Pending);
    assert!(fsm.error().is_none());
}

#[test]
fn test_fsm_success_flow() {
    let mut fsm = JobFsm::new();

    // Pending -> Running
    assert_eq!(fsm.process(JobEvent::Start).unwrap(), JobStatus::Running);

    // Running -> Completed
    assert_eq!(fsm.process(JobEvent::Complete).unwrap(), JobStatus::Completed);
    assert!(fsm.state().is_terminal());
}

#[test]
fn test_fsm_failure_flow() {
    let mut fsm = JobFsm::new();

    fsm.process(JobEvent::Start).unwrap();
    fsm.process(JobEvent::Fail("push stage failed: denied".to_string()))
        .unwrap();

    assert_eq!(fsm.state(), JobStatus::Failed);
    assert_eq!(fsm.error(), Some("push stage failed: denied"));
}

#[test]
fn test_fsm_invalid_transitions() {
    let mut fsm = JobFsm::new();

    // Cannot finish before starting
    assert!(fsm.process(JobEvent::Complete).is_err());
    assert!(fsm.process(JobEvent::Fail("early".to_string())).is_err());
    assert_eq!(fsm.state(), JobStatus::Pending);

    fsm.process(JobEvent::Start).unwrap();
    // Cannot start twice
    assert!(fsm.process(JobEvent::Start).is_err());
}

#[test]
fn test_fsm_terminal_states_are_final() {
    let mut completed = JobFsm::new();
    completed.process(JobEvent::Start).unwrap();
    completed.process(JobEvent::Complete).unwrap();

    for event in [
        JobEvent::Start,
        JobEvent::Complete,
        JobEvent::Fail("late".to_string()),
    ] {
        assert!(completed.process(event).is_err());
        assert_eq!(completed.state(), JobStatus::Completed);
    }

    let mut failed = JobFsm::new();
    failed.process(JobEvent::Start).unwrap();
    failed.process(JobEvent::Fail("boom".to_string())).unwrap();
    assert!(failed.process(JobEvent::Complete).is_err());
    assert_eq!(failed.state(), JobStatus::Failed);
}
