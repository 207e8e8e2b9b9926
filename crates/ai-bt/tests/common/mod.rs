#![allow(dead_code)]

use ai_bt::{BtAction, BtCtx, BtDomain, BtInstance, BtStatus, LeafExit, Node};
use ai_core::{Blackboard, TickContext};

#[derive(Debug, Default)]
pub struct RecordingAgent {
    pub log: Vec<String>,
    pub alarm: bool,
    pub reads: u32,
}

pub struct TestDomain;

impl BtDomain for TestDomain {
    type Agent = RecordingAgent;
    type Env<'e> = ();
}

pub type TNode = Node<TestDomain>;

/// Returns the scripted statuses in order, repeating the last one.
pub struct Scripted {
    pub name: &'static str,
    pub script: Vec<BtStatus>,
}

#[derive(Default)]
pub struct ScriptState {
    calls: usize,
}

impl BtAction<TestDomain> for Scripted {
    type State = ScriptState;

    fn start(&self, cx: &mut BtCtx<'_, TestDomain>, _state: &mut ScriptState) {
        cx.agent.log.push(format!("start:{}", self.name));
    }

    fn execute(&self, cx: &mut BtCtx<'_, TestDomain>, state: &mut ScriptState) -> BtStatus {
        cx.agent.log.push(format!("exec:{}", self.name));
        let status = self
            .script
            .get(state.calls)
            .or_else(|| self.script.last())
            .copied()
            .unwrap_or(BtStatus::Success);
        state.calls += 1;
        status
    }

    fn end(&self, cx: &mut BtCtx<'_, TestDomain>, _state: &mut ScriptState, exit: LeafExit) {
        cx.agent.log.push(format!("end:{}:{:?}", self.name, exit));
    }
}

pub fn scripted(name: &'static str, script: &[BtStatus]) -> TNode {
    TNode::action(
        name,
        Scripted {
            name,
            script: script.to_vec(),
        },
    )
}

pub fn succeed(name: &'static str) -> TNode {
    scripted(name, &[BtStatus::Success])
}

pub fn fail(name: &'static str) -> TNode {
    scripted(name, &[BtStatus::Failure])
}

pub fn run_forever(name: &'static str) -> TNode {
    scripted(name, &[BtStatus::Running])
}

pub fn alarm() -> TNode {
    TNode::condition("alarm", |cx| cx.agent.alarm)
}

pub fn never(name: &'static str) -> TNode {
    TNode::condition(name, |_| false)
}

pub fn ctx(tick: u64) -> TickContext {
    TickContext {
        tick,
        dt_seconds: 0.1,
        seed: 123,
    }
}

pub fn step(
    instance: &mut BtInstance<TestDomain>,
    agent: &mut RecordingAgent,
    blackboard: &mut Blackboard,
    tick: u64,
) -> BtStatus {
    let ctx = ctx(tick);
    let mut cx = BtCtx {
        tick: &ctx,
        agent,
        env: &(),
        blackboard,
    };
    instance.step(&mut cx)
}

pub fn abort(
    instance: &mut BtInstance<TestDomain>,
    agent: &mut RecordingAgent,
    blackboard: &mut Blackboard,
) {
    let ctx = ctx(0);
    let mut cx = BtCtx {
        tick: &ctx,
        agent,
        env: &(),
        blackboard,
    };
    instance.abort(&mut cx);
}

pub fn count(log: &[String], entry: &str) -> usize {
    log.iter().filter(|l| *l == entry).count()
}
