use std::any::Any;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use ai_core::{Blackboard, TickContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BtStatus {
    Running,
    Success,
    Failure,
}

impl BtStatus {
    pub fn is_done(self) -> bool {
        !matches!(self, BtStatus::Running)
    }
}

/// Why an action leaf stopped running. Passed to [`BtAction::end`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LeafExit {
    Succeeded,
    Failed,
    /// A composite above the leaf switched branches, or the whole tree was aborted.
    Aborted,
}

/// Binds a tree to the types it reads and writes.
///
/// `Agent` is the mutable state the tree drives. `Env` is the read-only environment available
/// during a step (ports into physics, scene queries, ...); it may borrow frame-local data.
pub trait BtDomain: 'static {
    type Agent;
    type Env<'e>: ?Sized;
}

/// Everything a node sees during one step.
pub struct BtCtx<'a, D: BtDomain> {
    pub tick: &'a TickContext,
    pub agent: &'a mut D::Agent,
    pub env: &'a D::Env<'a>,
    pub blackboard: &'a mut Blackboard,
}

/// An action leaf.
///
/// The leaf value itself lives in the shared template and is immutable; anything that changes while
/// the action runs goes into `State`, which the tree instance creates on `start` and drops after
/// `end`. `end` runs exactly once per `start`, whatever the reason the action stops.
pub trait BtAction<D: BtDomain>: Send + Sync + 'static {
    type State: Default + Send + 'static;

    fn start(&self, _cx: &mut BtCtx<'_, D>, _state: &mut Self::State) {}

    fn execute(&self, cx: &mut BtCtx<'_, D>, state: &mut Self::State) -> BtStatus;

    fn end(&self, _cx: &mut BtCtx<'_, D>, _state: &mut Self::State, _exit: LeafExit) {}
}

/// Condition predicate. Takes the context by shared reference, so it cannot mutate the agent.
pub type ConditionFn<D> = Box<dyn Fn(&BtCtx<'_, D>) -> bool + Send + Sync>;

pub(crate) type LeafState = Box<dyn Any + Send>;

/// Object-safe view of [`BtAction`] with the state type erased.
pub(crate) trait DynAction<D: BtDomain>: Send + Sync {
    fn fresh_state(&self) -> LeafState;
    fn start(&self, cx: &mut BtCtx<'_, D>, state: &mut LeafState);
    fn execute(&self, cx: &mut BtCtx<'_, D>, state: &mut LeafState) -> BtStatus;
    fn end(&self, cx: &mut BtCtx<'_, D>, state: &mut LeafState, exit: LeafExit) -> bool;
}

impl<D, T> DynAction<D> for T
where
    D: BtDomain,
    T: BtAction<D>,
{
    fn fresh_state(&self) -> LeafState {
        Box::new(T::State::default())
    }

    fn start(&self, cx: &mut BtCtx<'_, D>, state: &mut LeafState) {
        if let Some(state) = state.as_mut().downcast_mut::<T::State>() {
            BtAction::start(self, cx, state);
        }
    }

    fn execute(&self, cx: &mut BtCtx<'_, D>, state: &mut LeafState) -> BtStatus {
        match state.as_mut().downcast_mut::<T::State>() {
            Some(state) => BtAction::execute(self, cx, state),
            None => BtStatus::Failure,
        }
    }

    fn end(&self, cx: &mut BtCtx<'_, D>, state: &mut LeafState, exit: LeafExit) -> bool {
        match state.as_mut().downcast_mut::<T::State>() {
            Some(state) => {
                BtAction::end(self, cx, state, exit);
                true
            }
            None => false,
        }
    }
}
