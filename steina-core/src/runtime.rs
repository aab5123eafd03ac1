//! C8 and the host services bundle from spec.md §6.
//!
//! `runtime.threads` is modeled as a parameter passed alongside
//! `RuntimeServices` rather than a method on the trait, mirroring the
//! teacher's `ThreadContext::run(runtime, globals, max_steps)` split: the
//! VM step function takes the mutable globals slice separately from the
//! `VmRuntime` collaborator for the same reason — a single trait object
//! cannot safely hand out two independent mutable borrows of itself.

use crate::audio::AudioTarget;
use crate::play_queue::PlayQueues;
use crate::target::TargetId;
use crate::video::DrawOrder;
use crate::video::VideoTarget;

/// Device-motion reading in degrees (spec.md §2, C8).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Motion {
    pub pitch: f64,
    pub roll: f64,
    pub heading: f64,
}

/// Which phase of the tick a profiler mark brackets (spec.md §6:
/// "optional; START/STOP timestamp records"), placed around exactly the
/// two phases spec.md §2's control-flow description names: thread stepping,
/// then media-queue advancement (SPEC_FULL.md §4 addition).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfilerPhase {
    ThreadLoop,
    MediaAdvance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfilerEvent {
    Start,
    Stop,
}

/// Optional profiler collaborator (spec.md §6).
pub trait Profiler {
    fn mark(&mut self, phase: ProfilerPhase, event: ProfilerEvent);
}

/// Host services the sequencer and media-block primitives consume
/// (spec.md §6). A host implements this once over its real target
/// registry, play-queue storage, and motion source.
pub trait RuntimeServices {
    fn current_step_time_ms(&self) -> f64;
    fn turbo_mode(&self) -> bool;
    fn redraw_requested(&self) -> bool;
    fn request_redraw(&mut self);
    fn clear_redraw_requested(&mut self);

    fn get_video_target(&self, id: TargetId) -> Option<&VideoTarget>;
    fn get_video_target_mut(&mut self, id: TargetId) -> Option<&mut VideoTarget>;
    fn video_targets(&self) -> Box<dyn Iterator<Item = &VideoTarget> + '_>;
    fn video_targets_mut(&mut self) -> Box<dyn Iterator<Item = &mut VideoTarget> + '_>;

    fn get_audio_target(&self, id: TargetId) -> Option<&AudioTarget>;
    fn get_audio_target_mut(&mut self, id: TargetId) -> Option<&mut AudioTarget>;
    fn audio_targets_mut(&mut self) -> Box<dyn Iterator<Item = &mut AudioTarget> + '_>;

    fn draw_order(&mut self) -> &mut DrawOrder;

    fn play_queues(&self) -> &PlayQueues;
    fn play_queues_mut(&mut self) -> &mut PlayQueues;

    fn motion(&self) -> Motion;

    fn profiler_mut(&mut self) -> Option<&mut dyn Profiler>;
}

/// Broadcasts `PROJECT_STOP_ALL` (spec.md §4.4): clears both play queues
/// and resets every audio target's non-blocking slot counter. Exposed as a
/// directly callable entry point (SPEC_FULL.md §4 addition) so a host's
/// `on('PROJECT_STOP_ALL', ...)` subscription, or a test, can invoke it
/// synchronously instead of only describing the effect.
pub fn stop_all(runtime: &mut dyn RuntimeServices) {
    let mut queues = std::mem::take(runtime.play_queues_mut());
    queues.stop_all(runtime.audio_targets_mut());
    *runtime.play_queues_mut() = queues;
}
