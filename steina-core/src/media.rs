//! C7 shared plumbing: the `(args, util)` convention media-block
//! primitives are built on (spec.md §4.4).

use crate::play_queue::PlayId;
use crate::runtime::RuntimeServices;
use crate::target::TargetId;
use crate::thread::{StackFrame, Thread, ThreadStatus};

/// `util` as described in spec.md §4.4: exposes `target`, `thread`,
/// `stackFrame`, and `runtime` to a primitive.
pub struct Util<'t, 'r> {
    pub thread: &'t mut Thread,
    pub runtime: &'r mut dyn RuntimeServices,
}

impl<'t, 'r> Util<'t, 'r> {
    pub fn new(thread: &'t mut Thread, runtime: &'r mut dyn RuntimeServices) -> Self {
        Self { thread, runtime }
    }

    pub fn target_id(&self) -> Option<TargetId> {
        self.thread.target
    }

    pub fn stack_frame_mut(&mut self) -> Option<&mut StackFrame> {
        self.thread.top_frame_mut()
    }
}

/// Outcome of polling a blocking media play at its current call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockingPoll {
    /// No `playingId` recorded yet: caller should insert the play and
    /// remember its id.
    FirstEntry,
    /// A `playingId` was recorded and the play is still the current
    /// occupant of the queue: the thread keeps waiting.
    StillPlaying,
    /// A `playingId` was recorded but the play is gone or was overwritten:
    /// the block completes (spec.md §7.4: "treat as successful
    /// completion").
    Completed,
}

/// Reads the two-call blocking convention's current phase (spec.md §4.4)
/// without mutating anything, given a closure that checks whether the
/// remembered id is still the current occupant of the relevant queue.
pub fn poll_blocking(frame: &StackFrame, still_current: impl FnOnce(PlayId) -> bool) -> BlockingPoll {
    match frame.playing_id {
        None => BlockingPoll::FirstEntry,
        Some(id) => {
            if still_current(id) {
                BlockingPoll::StillPlaying
            } else {
                BlockingPoll::Completed
            }
        }
    }
}

/// Parks the thread until next tick's first inner pass (spec.md §4.4:
/// "set `thread.status := YIELD_TICK`").
pub fn park_until_next_tick(thread: &mut Thread) {
    thread.status = ThreadStatus::YieldTick;
}
