use std::fmt;
use std::sync::Arc;

use ai_tools::{emit_with, TraceEvent};

use crate::bt::{BtCtx, BtDomain, BtStatus, DynAction, LeafExit, LeafState};
use crate::template::{BtTemplate, CompiledBody, NodeId, NodeKind};

#[derive(Default)]
struct NodeRun {
    last: Option<BtStatus>,
    /// Memory sequences: child to resume at.
    cursor: usize,
    /// Reactive composites: child that returned `Running` on the previous step.
    running: Option<usize>,
    /// Action leaves: `Some` between `start` and `end`.
    leaf: Option<LeafState>,
}

/// Per-agent run state of a shared [`BtTemplate`].
///
/// Holds one record per template node; the structure itself is only referenced.
pub struct BtInstance<D: BtDomain> {
    template: Arc<BtTemplate<D>>,
    runs: Vec<NodeRun>,
    last: Option<BtStatus>,
    subject: u64,
    lifecycle_violations: u32,
    /// Running branches of reactive composites that lose their place as soon as a
    /// higher-priority sibling starts a leaf. Innermost last.
    preempted: Vec<NodeId>,
}

impl<D: BtDomain> fmt::Debug for BtInstance<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BtInstance")
            .field("template", &self.template.name())
            .field("last", &self.last)
            .field("active_leaves", &self.active_leaves())
            .field("lifecycle_violations", &self.lifecycle_violations)
            .finish()
    }
}

impl<D: BtDomain> BtInstance<D> {
    pub fn new(template: Arc<BtTemplate<D>>) -> Self {
        let runs = (0..template.len()).map(|_| NodeRun::default()).collect();
        Self {
            template,
            runs,
            last: None,
            subject: 0,
            lifecycle_violations: 0,
            preempted: Vec::new(),
        }
    }

    /// Tags trace events emitted by this instance (usually the agent's stable id).
    pub fn with_subject(mut self, subject: u64) -> Self {
        self.subject = subject;
        self
    }

    pub fn template(&self) -> &Arc<BtTemplate<D>> {
        &self.template
    }

    /// Status returned by the root on the last step.
    pub fn last_status(&self) -> Option<BtStatus> {
        self.last
    }

    /// Status a node returned the last time it was evaluated.
    pub fn node_status(&self, node: NodeId) -> Option<BtStatus> {
        self.runs.get(node.index()).and_then(|r| r.last)
    }

    /// Action leaves that are between `start` and `end`.
    pub fn active_leaves(&self) -> Vec<NodeId> {
        (0..self.runs.len())
            .filter(|&i| self.runs[i].leaf.is_some())
            .map(NodeId::from_index)
            .collect()
    }

    pub fn is_active(&self) -> bool {
        self.runs.iter().any(|r| r.leaf.is_some())
    }

    /// Count of rejected lifecycle calls (e.g. an interrupt for a leaf that never started).
    pub fn lifecycle_violations(&self) -> u32 {
        self.lifecycle_violations
    }

    /// Evaluates the tree once from the root.
    pub fn step(&mut self, cx: &mut BtCtx<'_, D>) -> BtStatus {
        let template = Arc::clone(&self.template);
        if template.is_empty() {
            return BtStatus::Failure;
        }
        let status = self.eval(&template, template.root(), cx);
        self.preempted.clear();
        self.last = Some(status);
        status
    }

    /// Ends every running leaf with [`LeafExit::Aborted`] and rewinds all composites.
    pub fn abort(&mut self, cx: &mut BtCtx<'_, D>) {
        let template = Arc::clone(&self.template);
        if template.is_empty() {
            return;
        }
        self.halt(&template, template.root(), cx);
    }

    /// Aborts the subtree rooted at `node`.
    ///
    /// Interrupting an action leaf that is not running is rejected: `end` is never delivered
    /// without a matching `start`. The rejection is logged and counted.
    pub fn interrupt(&mut self, node: NodeId, cx: &mut BtCtx<'_, D>) -> bool {
        let template = Arc::clone(&self.template);
        let Some(kind) = template.node_kind(node) else {
            self.violation(cx, node, "interrupt for unknown node");
            return false;
        };
        if kind == NodeKind::Action && self.runs[node.index()].leaf.is_none() {
            self.violation(cx, node, "end requested for a leaf that was never started");
            return false;
        }
        self.halt(&template, node, cx);
        true
    }

    fn eval(&mut self, t: &BtTemplate<D>, id: NodeId, cx: &mut BtCtx<'_, D>) -> BtStatus {
        let node = t.node(id);
        let status = match &node.body {
            CompiledBody::Composite(children) => match node.kind {
                NodeKind::Sequence => self.eval_sequence(t, id, children, cx),
                NodeKind::ReactiveSequence => self.eval_reactive_sequence(t, id, children, cx),
                _ => self.eval_selector(t, id, children, cx),
            },
            CompiledBody::Condition(predicate) => {
                if predicate(&*cx) {
                    BtStatus::Success
                } else {
                    BtStatus::Failure
                }
            }
            CompiledBody::Action(action) => self.eval_action(t, id, action.as_ref(), cx),
        };
        self.runs[id.index()].last = Some(status);
        status
    }

    fn eval_sequence(
        &mut self,
        t: &BtTemplate<D>,
        id: NodeId,
        children: &[NodeId],
        cx: &mut BtCtx<'_, D>,
    ) -> BtStatus {
        let resume_at = self.runs[id.index()].cursor;
        for (i, &child) in children.iter().enumerate().skip(resume_at) {
            match self.eval(t, child, cx) {
                BtStatus::Success => {}
                BtStatus::Running => {
                    self.runs[id.index()].cursor = i;
                    return BtStatus::Running;
                }
                BtStatus::Failure => {
                    self.runs[id.index()].cursor = 0;
                    return BtStatus::Failure;
                }
            }
        }
        self.runs[id.index()].cursor = 0;
        BtStatus::Success
    }

    fn eval_reactive_sequence(
        &mut self,
        t: &BtTemplate<D>,
        id: NodeId,
        children: &[NodeId],
        cx: &mut BtCtx<'_, D>,
    ) -> BtStatus {
        for i in 0..children.len() {
            match self.eval_guarded(t, id, children, i, cx) {
                BtStatus::Success => {}
                BtStatus::Running => {
                    self.switch_running(t, id, children, Some(i), cx);
                    return BtStatus::Running;
                }
                BtStatus::Failure => {
                    self.switch_running(t, id, children, None, cx);
                    return BtStatus::Failure;
                }
            }
        }
        self.switch_running(t, id, children, None, cx);
        BtStatus::Success
    }

    fn eval_selector(
        &mut self,
        t: &BtTemplate<D>,
        id: NodeId,
        children: &[NodeId],
        cx: &mut BtCtx<'_, D>,
    ) -> BtStatus {
        for i in 0..children.len() {
            match self.eval_guarded(t, id, children, i, cx) {
                BtStatus::Failure => {}
                BtStatus::Success => {
                    self.switch_running(t, id, children, None, cx);
                    return BtStatus::Success;
                }
                BtStatus::Running => {
                    self.switch_running(t, id, children, Some(i), cx);
                    return BtStatus::Running;
                }
            }
        }
        self.switch_running(t, id, children, None, cx);
        BtStatus::Failure
    }

    /// Evaluates child `i` of a reactive composite.
    ///
    /// While a child before the one that was running is evaluated, the running child is queued
    /// for preemption: the first leaf `start` below child `i` halts it, so the abandoned branch
    /// is ended before the new one begins. A leaf that starts and then fails at once still
    /// preempts.
    fn eval_guarded(
        &mut self,
        t: &BtTemplate<D>,
        id: NodeId,
        children: &[NodeId],
        i: usize,
        cx: &mut BtCtx<'_, D>,
    ) -> BtStatus {
        let running = self.runs[id.index()]
            .running
            .filter(|&p| i < p)
            .and_then(|p| children.get(p).copied());
        let depth = self.preempted.len();
        if let Some(running) = running {
            self.preempted.push(running);
        }
        let status = self.eval(t, children[i], cx);
        self.preempted.truncate(depth);
        status
    }

    /// Halts every branch queued for preemption, innermost first.
    fn flush_preempted(&mut self, t: &BtTemplate<D>, cx: &mut BtCtx<'_, D>) {
        while let Some(node) = self.preempted.pop() {
            self.halt(t, node, cx);
        }
    }

    /// Records the new running child of a reactive composite, halting the previous one.
    fn switch_running(
        &mut self,
        t: &BtTemplate<D>,
        id: NodeId,
        children: &[NodeId],
        next: Option<usize>,
        cx: &mut BtCtx<'_, D>,
    ) {
        let previous = std::mem::replace(&mut self.runs[id.index()].running, next);
        if let Some(prev) = previous.filter(|&p| Some(p) != next) {
            if let Some(&child) = children.get(prev) {
                self.halt(t, child, cx);
            }
        }
    }

    fn eval_action(
        &mut self,
        t: &BtTemplate<D>,
        id: NodeId,
        action: &dyn DynAction<D>,
        cx: &mut BtCtx<'_, D>,
    ) -> BtStatus {
        let mut state = match self.runs[id.index()].leaf.take() {
            Some(state) => state,
            None => {
                self.flush_preempted(t, cx);
                let mut state = action.fresh_state();
                action.start(cx, &mut state);
                self.trace(cx, "bt.leaf.start", id);
                state
            }
        };

        let status = action.execute(cx, &mut state);
        match status {
            BtStatus::Running => self.runs[id.index()].leaf = Some(state),
            BtStatus::Success => self.finish(id, action, state, LeafExit::Succeeded, cx),
            BtStatus::Failure => self.finish(id, action, state, LeafExit::Failed, cx),
        }
        status
    }

    fn finish(
        &mut self,
        id: NodeId,
        action: &dyn DynAction<D>,
        mut state: LeafState,
        exit: LeafExit,
        cx: &mut BtCtx<'_, D>,
    ) {
        if !action.end(cx, &mut state, exit) {
            self.violation(cx, id, "leaf state does not match its action");
            return;
        }
        let tag = match exit {
            LeafExit::Succeeded => "bt.leaf.succeeded",
            LeafExit::Failed => "bt.leaf.failed",
            LeafExit::Aborted => "bt.leaf.aborted",
        };
        self.trace(cx, tag, id);
    }

    fn halt(&mut self, t: &BtTemplate<D>, id: NodeId, cx: &mut BtCtx<'_, D>) {
        match &t.node(id).body {
            CompiledBody::Composite(children) => {
                for &child in children {
                    self.halt(t, child, cx);
                }
                let run = &mut self.runs[id.index()];
                run.cursor = 0;
                run.running = None;
            }
            CompiledBody::Condition(_) => {}
            CompiledBody::Action(action) => {
                if let Some(state) = self.runs[id.index()].leaf.take() {
                    self.finish(id, action.as_ref(), state, LeafExit::Aborted, cx);
                }
            }
        }
    }

    fn trace(&self, cx: &mut BtCtx<'_, D>, tag: &'static str, id: NodeId) {
        let tick = cx.tick.tick;
        let subject = self.subject;
        emit_with(cx.blackboard, || {
            TraceEvent::new(tick, tag)
                .with_subject(subject)
                .with_detail(id.index() as u64)
        });
    }

    fn violation(&mut self, cx: &mut BtCtx<'_, D>, id: NodeId, reason: &'static str) {
        self.lifecycle_violations += 1;
        tracing::warn!(
            tree = self.template.name(),
            node = %id,
            subject = self.subject,
            reason,
            "behavior tree lifecycle violation"
        );
        self.trace(cx, "bt.lifecycle.violation", id);
    }
}
