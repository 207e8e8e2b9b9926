mod common;

use ai_bt::{BtInstance, BtStatus, BtTemplate};
use ai_core::Blackboard;
use common::*;

#[test]
fn selector_with_all_children_failing_fails_without_side_effects() {
    let root = TNode::selector(
        "choose",
        vec![never("first"), never("second"), alarm()],
    );
    let mut tree = BtInstance::new(BtTemplate::shared("all-fail", root).expect("compile"));
    let mut agent = RecordingAgent::default();
    let mut bb = Blackboard::new();

    assert_eq!(step(&mut tree, &mut agent, &mut bb, 1), BtStatus::Failure);
    assert!(agent.log.is_empty());
    assert!(!agent.alarm);
    assert!(bb.is_empty());
    assert!(!tree.is_active());
}

#[test]
fn selector_returns_first_success() {
    let root = TNode::selector("choose", vec![fail("a"), succeed("b"), succeed("c")]);
    let mut tree = BtInstance::new(BtTemplate::shared("first-success", root).expect("compile"));
    let mut agent = RecordingAgent::default();
    let mut bb = Blackboard::new();

    assert_eq!(step(&mut tree, &mut agent, &mut bb, 1), BtStatus::Success);
    assert_eq!(count(&agent.log, "start:c"), 0);
    assert_eq!(count(&agent.log, "end:a:Failed"), 1);
    assert_eq!(count(&agent.log, "end:b:Succeeded"), 1);
}

#[test]
fn higher_priority_branch_aborts_running_lower_priority_action() {
    let root = TNode::selector(
        "root",
        vec![
            TNode::reactive_sequence("engage", vec![alarm(), run_forever("chase")]),
            run_forever("patrol"),
        ],
    );
    let mut tree = BtInstance::new(BtTemplate::shared("preempt", root).expect("compile"));
    let mut agent = RecordingAgent::default();
    let mut bb = Blackboard::new();

    assert_eq!(step(&mut tree, &mut agent, &mut bb, 1), BtStatus::Running);
    assert_eq!(agent.log, vec!["start:patrol", "exec:patrol"]);

    agent.log.clear();
    agent.alarm = true;
    assert_eq!(step(&mut tree, &mut agent, &mut bb, 2), BtStatus::Running);
    assert_eq!(
        agent.log,
        vec!["end:patrol:Aborted", "start:chase", "exec:chase"]
    );

    agent.log.clear();
    agent.alarm = false;
    assert_eq!(step(&mut tree, &mut agent, &mut bb, 3), BtStatus::Running);
    assert_eq!(
        agent.log,
        vec!["end:chase:Aborted", "start:patrol", "exec:patrol"]
    );
}

#[test]
fn running_child_that_fails_lets_selector_fall_through() {
    let root = TNode::selector(
        "root",
        vec![
            scripted("try", &[BtStatus::Running, BtStatus::Failure]),
            succeed("fallback"),
        ],
    );
    let mut tree = BtInstance::new(BtTemplate::shared("fallthrough", root).expect("compile"));
    let mut agent = RecordingAgent::default();
    let mut bb = Blackboard::new();

    assert_eq!(step(&mut tree, &mut agent, &mut bb, 1), BtStatus::Running);
    assert_eq!(step(&mut tree, &mut agent, &mut bb, 2), BtStatus::Success);
    assert_eq!(count(&agent.log, "end:try:Failed"), 1);
    assert_eq!(count(&agent.log, "end:try:Aborted"), 0);
    assert_eq!(count(&agent.log, "end:fallback:Succeeded"), 1);
}

#[test]
fn failing_guards_leave_the_running_branch_alone() {
    let root = TNode::selector(
        "root",
        vec![
            TNode::reactive_sequence("engage", vec![alarm(), run_forever("chase")]),
            run_forever("patrol"),
        ],
    );
    let mut tree = BtInstance::new(BtTemplate::shared("guards", root).expect("compile"));
    let mut agent = RecordingAgent::default();
    let mut bb = Blackboard::new();

    step(&mut tree, &mut agent, &mut bb, 1);
    agent.log.clear();
    for tick in 2..5 {
        assert_eq!(step(&mut tree, &mut agent, &mut bb, tick), BtStatus::Running);
    }
    assert_eq!(agent.log, vec!["exec:patrol", "exec:patrol", "exec:patrol"]);
}

#[test]
fn abandoned_branch_ends_before_a_nested_leaf_starts() {
    let root = TNode::selector(
        "root",
        vec![
            TNode::reactive_sequence(
                "engage",
                vec![
                    alarm(),
                    TNode::sequence("approach", vec![succeed("brace"), run_forever("chase")]),
                ],
            ),
            TNode::sequence("wander", vec![succeed("look"), run_forever("patrol")]),
        ],
    );
    let mut tree = BtInstance::new(BtTemplate::shared("nested-preempt", root).expect("compile"));
    let mut agent = RecordingAgent::default();
    let mut bb = Blackboard::new();

    step(&mut tree, &mut agent, &mut bb, 1);
    agent.log.clear();
    agent.alarm = true;
    assert_eq!(step(&mut tree, &mut agent, &mut bb, 2), BtStatus::Running);
    assert_eq!(
        agent.log,
        vec![
            "end:patrol:Aborted",
            "start:brace",
            "exec:brace",
            "end:brace:Succeeded",
            "start:chase",
            "exec:chase",
        ]
    );

    // The abandoned memory sequence starts over once it runs again.
    agent.log.clear();
    agent.alarm = false;
    step(&mut tree, &mut agent, &mut bb, 3);
    assert_eq!(count(&agent.log, "end:chase:Aborted"), 1);
    assert_eq!(count(&agent.log, "start:look"), 1);
    assert_eq!(count(&agent.log, "start:patrol"), 1);
}
