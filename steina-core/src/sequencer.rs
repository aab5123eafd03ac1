//! C6: the per-tick cooperative scheduler (spec.md §4.1).

use std::time::Instant;

use crate::play_queue::{advance_audio_play, advance_video_play};
use crate::runtime::{ProfilerEvent, ProfilerPhase, RuntimeServices};
use crate::thread::{BlockId, StackFrame, Thread, ThreadStatus};
use crate::timer::Timer;

/// Fraction of `current_step_time_ms` budgeted to the thread-stepping phase
/// of a tick (spec.md §4.1).
pub const WORK_FRACTION: f64 = 0.33;

/// Upper bound, in milliseconds, on a single warp-mode burst (spec.md §4.1,
/// §6 constants).
pub const WARP_TIME_MS: f64 = 500.0;

/// Runs one block on a thread, mutating its stack and status (spec.md §6:
/// `execute(sequencer, thread)`).
///
/// Named with `runtime` rather than `sequencer` in the parameter list: the
/// play queues and target state a media-block primitive needs to touch are
/// owned by [`RuntimeServices`] (spec.md §6: `runtime.videoState`,
/// `runtime.audioState`), not by the (otherwise stateless) [`Sequencer`]
/// itself, so that is the collaborator primitives actually need.
pub trait BlockExecutor {
    fn execute(&mut self, threads: &mut [Thread], index: usize, runtime: &mut dyn RuntimeServices);
}

/// Seam for the block-storage/parsing collaborator (spec.md §1: out of
/// scope). The sequencer only needs enough of it to walk sequential flow,
/// branches, and procedure calls — not to interpret a single block's own
/// behavior (that's [`BlockExecutor`]'s job).
pub trait BlockGraph {
    /// First block of the given branch of `block`, or `None` for an empty
    /// branch (spec.md §4.1 `stepToBranch`: "push the branch's first block
    /// id (or null sentinel)").
    fn branch_first_block(&self, block: BlockId, branch_num: u8) -> Option<BlockId>;
    /// Block that sequentially follows `block` within its frame, if any.
    fn next_block(&self, block: BlockId) -> Option<BlockId>;
    /// Resolves a procedure `code` to its definition's first block.
    fn procedure_definition(&self, code: u64) -> Option<BlockId>;
    /// Whether calling `code` from `thread`'s current call chain would be
    /// recursive (spec.md §4.1 `stepToProcedure`: "detect recursion").
    fn is_recursive_call(&self, thread: &Thread, code: u64) -> bool;
    /// Whether the procedure's `warp` mutation requests warp mode.
    fn procedure_is_warp(&self, code: u64) -> bool;
}

/// Per-tick scheduler (spec.md §4.1). Carries no state of its own between
/// ticks — every invariant it enforces (work budget, warp budget) is scoped
/// to a single [`Sequencer::step_threads`] call.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sequencer;

/// Outcome of stepping one thread far enough to hit a suspension point.
enum StepOutcome {
    /// Thread suspended (via YIELD/YIELD_TICK/PROMISE_WAIT) or finished
    /// (DONE); it may still be present in the thread list.
    Suspended,
    /// Thread was removed from the list mid-step (spec.md §5(d)).
    Removed,
}

impl Sequencer {
    pub fn new() -> Self {
        Self
    }

    /// Entry point for one tick. Returns the threads that finished during
    /// this tick (already removed from `threads`).
    ///
    /// `timer` is the C1 monotonic elapsed-ms source bounding the
    /// thread-stepping phase against `WORK_TIME` (spec.md §4.1, §8 S2);
    /// callers outside tests pass a fresh [`crate::timer::MonotonicTimer`].
    /// It is reset on entry.
    pub fn step_threads(
        &self,
        threads: &mut Vec<Thread>,
        runtime: &mut dyn RuntimeServices,
        executor: &mut dyn BlockExecutor,
        graph: &dyn BlockGraph,
        timer: &mut dyn Timer,
    ) -> Vec<Thread> {
        runtime.clear_redraw_requested();
        if let Some(p) = runtime.profiler_mut() {
            p.mark(ProfilerPhase::ThreadLoop, ProfilerEvent::Start);
        }

        let step_time_ms = runtime.current_step_time_ms();
        let work_time_ms = WORK_FRACTION * step_time_ms;
        timer.reset();

        let mut first_inner_pass = true;
        let mut has_run_once = false;
        let mut num_active = 0usize;

        loop {
            if threads.is_empty() {
                break;
            }
            if has_run_once && num_active == 0 {
                break;
            }
            if timer.elapsed_ms() >= work_time_ms {
                break;
            }
            if !runtime.turbo_mode() && runtime.redraw_requested() {
                break;
            }

            num_active = 0;
            let mut i = 0usize;
            while i < threads.len() {
                if threads[i].is_stack_empty() || threads[i].status == ThreadStatus::Done {
                    i += 1;
                    continue;
                }

                if threads[i].status == ThreadStatus::YieldTick && first_inner_pass {
                    threads[i].status = ThreadStatus::Running;
                }

                if matches!(threads[i].status, ThreadStatus::Running | ThreadStatus::Yield) {
                    let len_before = threads.len();
                    let outcome = self.step_thread_at(threads, i, runtime, executor, graph);
                    if matches!(outcome, StepOutcome::Removed) || threads.len() < len_before {
                        // Thread was killed mid-step; keep indexing stable so the
                        // next thread is not skipped (spec.md §5(d)).
                        continue;
                    }
                    threads[i].warp_timer = None;
                    if threads[i].status == ThreadStatus::Running {
                        num_active += 1;
                    }
                }
                i += 1;
            }

            first_inner_pass = false;
            has_run_once = true;
        }

        if let Some(p) = runtime.profiler_mut() {
            p.mark(ProfilerPhase::ThreadLoop, ProfilerEvent::Stop);
        }

        // Finalization: compact the thread list, keeping order, dropping
        // anything that finished (spec.md §4.1 "Finalization").
        let mut finished = Vec::new();
        let mut kept = Vec::with_capacity(threads.len());
        for t in threads.drain(..) {
            if t.is_stack_empty() || t.status == ThreadStatus::Done {
                finished.push(t);
            } else {
                kept.push(t);
            }
        }
        *threads = kept;

        self.advance_media_queues(runtime);

        finished
    }

    /// Media advancement, run once per tick after thread stepping
    /// concludes (spec.md §4.1, §5).
    fn advance_media_queues(&self, runtime: &mut dyn RuntimeServices) {
        if let Some(p) = runtime.profiler_mut() {
            p.mark(ProfilerPhase::MediaAdvance, ProfilerEvent::Start);
        }

        let step_time_ms = runtime.current_step_time_ms();

        let video_ids: Vec<_> = runtime.play_queues().video.iter().map(|(id, _)| id).collect();
        let mut any_video_advanced = false;
        for target_id in video_ids {
            let play = match runtime.play_queues().video.get(target_id) {
                Some(p) => *p,
                None => continue,
            };
            let done = {
                let Some(target) = runtime.get_video_target_mut(target_id) else {
                    runtime.play_queues_mut().video.remove(target_id);
                    continue;
                };
                advance_video_play(target, &play, step_time_ms)
            };
            any_video_advanced = true;
            if done {
                runtime.play_queues_mut().video.remove(target_id);
            }
        }
        // Every active video play moves currentFrame, so one redraw per tick
        // covers them all (spec.md §4.2 setCurrentFrame "requests a redraw").
        if any_video_advanced {
            runtime.request_redraw();
        }

        let audio_ids: Vec<_> = runtime.play_queues().audio.iter().map(|(id, _)| id).collect();
        let mut to_remove = Vec::new();
        for play_id in audio_ids {
            if let Some(play) = runtime.play_queues_mut().audio.playing_mut(play_id) {
                if advance_audio_play(play, step_time_ms) {
                    to_remove.push(play_id);
                }
            }
        }
        for play_id in to_remove {
            if let Some(play) = runtime.play_queues_mut().audio.remove(play_id) {
                if !play.blocking {
                    if let Some(target) = runtime.get_audio_target_mut(play.audio_target_id) {
                        target.release_nonblocking_slot();
                    }
                }
            }
        }

        if let Some(p) = runtime.profiler_mut() {
            p.mark(ProfilerPhase::MediaAdvance, ProfilerEvent::Stop);
        }
    }

    /// `stepThread` (spec.md §4.1): runs `threads[index]` until it hits a
    /// suspension point or finishes.
    fn step_thread_at(
        &self,
        threads: &mut Vec<Thread>,
        index: usize,
        runtime: &mut dyn RuntimeServices,
        executor: &mut dyn BlockExecutor,
        graph: &dyn BlockGraph,
    ) -> StepOutcome {
        loop {
            if index >= threads.len() {
                return StepOutcome::Removed;
            }

            if threads[index].is_warp() && threads[index].warp_timer.is_none() {
                threads[index].warp_timer = Some(Instant::now());
            }

            if threads[index].target.is_none() {
                threads[index].retire();
                return StepOutcome::Suspended;
            }

            let block_before = threads[index].top_block();
            let len_before = threads.len();
            executor.execute(threads, index, runtime);
            if threads.len() != len_before || index >= threads.len() {
                return StepOutcome::Removed;
            }

            match threads[index].status {
                ThreadStatus::Yield => {
                    threads[index].status = ThreadStatus::Running;
                    if threads[index].is_warp() && self.warp_budget_remaining(&threads[index]) {
                        continue;
                    }
                    return StepOutcome::Suspended;
                }
                ThreadStatus::PromiseWait => return StepOutcome::Suspended,
                ThreadStatus::YieldTick => return StepOutcome::Suspended,
                ThreadStatus::Done => return StepOutcome::Suspended,
                ThreadStatus::Running => {}
            }

            if threads[index].top_block() == block_before {
                self.go_to_next_block(&mut threads[index], graph);
            }

            match self.drain_empty_frames(&mut threads[index]) {
                DrainOutcome::Continue => continue,
                DrainOutcome::Done => return StepOutcome::Suspended,
                DrainOutcome::YieldedAfterLoop => {
                    if threads[index].is_warp() && self.warp_budget_remaining(&threads[index]) {
                        continue;
                    }
                    return StepOutcome::Suspended;
                }
                DrainOutcome::YieldedAfterReporter => return StepOutcome::Suspended,
            }
        }
    }

    fn warp_budget_remaining(&self, thread: &Thread) -> bool {
        thread
            .warp_timer
            .map(|start| start.elapsed().as_secs_f64() * 1000.0 <= WARP_TIME_MS)
            .unwrap_or(true)
    }

    fn go_to_next_block(&self, thread: &mut Thread, graph: &dyn BlockGraph) {
        if let Some(frame) = thread.top_frame_mut() {
            frame.block = frame.block.and_then(|b| graph.next_block(b));
        }
    }

    /// Step 6 of `stepThread`: pop exhausted frames, reacting to loop and
    /// waiting-reporter frames as they're popped (spec.md §4.1).
    fn drain_empty_frames(&self, thread: &mut Thread) -> DrainOutcome {
        loop {
            let top_empty = thread.top_frame().map(|f| f.block.is_none()).unwrap_or(true);
            if !top_empty {
                return DrainOutcome::Continue;
            }
            let popped = thread.pop_frame();
            if thread.is_stack_empty() {
                thread.status = ThreadStatus::Done;
                return DrainOutcome::Done;
            }
            if let Some(popped) = popped {
                if popped.is_loop {
                    return DrainOutcome::YieldedAfterLoop;
                }
                if popped.waiting_reporter {
                    return DrainOutcome::YieldedAfterReporter;
                }
            }
        }
    }

    /// `stepToBranch` (spec.md §4.1): marks the current frame's loop flag
    /// and pushes the branch's first block.
    pub fn step_to_branch(&self, thread: &mut Thread, branch_num: u8, is_loop: bool, graph: &dyn BlockGraph) {
        let (cur_block, warp) = {
            let frame = thread.top_frame_mut().expect("stepToBranch requires a current frame");
            frame.is_loop = is_loop;
            (frame.block, frame.warp_mode)
        };
        let first = cur_block.and_then(|b| graph.branch_first_block(b, branch_num));
        let mut new_frame = StackFrame::new(first);
        new_frame.warp_mode = warp;
        thread.push_frame(new_frame);
    }

    /// `stepToProcedure` (spec.md §4.1): resolves and pushes a procedure
    /// call, honoring warp-mode budget and the recursive-call rule.
    pub fn step_to_procedure(&self, thread: &mut Thread, code: u64, graph: &dyn BlockGraph) {
        let is_recursive = graph.is_recursive_call(thread, code);
        let definition = graph.procedure_definition(code);
        let budget_exhausted = thread.is_warp() && !self.warp_budget_remaining(thread);

        thread.push_frame(StackFrame::new(definition));

        if budget_exhausted {
            thread.status = ThreadStatus::Yield;
            return;
        }

        if graph.procedure_is_warp(code) {
            if let Some(frame) = thread.top_frame_mut() {
                frame.warp_mode = true;
            }
        } else if is_recursive {
            thread.status = ThreadStatus::Yield;
        }
    }
}

enum DrainOutcome {
    Continue,
    Done,
    YieldedAfterLoop,
    YieldedAfterReporter,
}
