//! C7 video primitives (spec.md §4.4).

use crate::media::{park_until_next_tick, poll_blocking, BlockingPoll, Util};
use crate::play_queue::VideoPlay;
use crate::video::VideoEffect;

/// Forced playback direction for the direction-naming primitives
/// (`playForwardUntilDone`, `playBackwardUntilDone`, and their
/// reverse/non-blocking counterparts).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    fn sign(self) -> f64 {
        match self {
            Direction::Forward => 1.0,
            Direction::Backward => -1.0,
        }
    }
}

fn insert_video_play(util: &mut Util, start: f64, end: f64, blocking: bool, forced_sign: Option<f64>) {
    let Some(target_id) = util.target_id() else { return };
    let id = util.runtime.play_queues_mut().next_play_id();
    let play = VideoPlay {
        id,
        start,
        end,
        thread_top_block: util.thread.top_block().map(|b| b.0).unwrap_or(0),
        blocking,
        forced_sign,
    };
    util.runtime.play_queues_mut().video.insert(target_id, play);
    if blocking {
        if let Some(frame) = util.stack_frame_mut() {
            frame.playing_id = Some(id);
        }
        park_until_next_tick(util.thread);
    }
}

/// Drives the two-call blocking convention for a video play already
/// inserted by a prior call. `on_first_entry` installs the play if this is
/// the first call.
fn blocking_template(util: &mut Util, on_first_entry: impl FnOnce(&mut Util)) {
    let Some(target_id) = util.target_id() else { return };
    let frame = match util.stack_frame_mut() {
        Some(f) => f.clone(),
        None => return,
    };
    let queue_has = |id| util.runtime.play_queues().video.is_current(target_id, id);
    match poll_blocking(&frame, queue_has) {
        BlockingPoll::FirstEntry => on_first_entry(util),
        BlockingPoll::StillPlaying => park_until_next_tick(util.thread),
        BlockingPoll::Completed => {}
    }
}

pub fn play_entire_video_until_done(util: &mut Util) {
    blocking_template(util, |util| {
        let Some(target_id) = util.target_id() else { return };
        let Some(target) = util.runtime.get_video_target_mut(target_id) else { return };
        let trim_start = target.trim_start() as f64;
        let trim_end = target.trim_end() as f64;
        target.set_current_frame(trim_start);
        util.runtime.request_redraw();
        insert_video_play(util, trim_start, trim_end, true, Some(1.0));
    });
}

pub fn play_video_from_a_to_b(util: &mut Util, a: f64, b: f64) {
    blocking_template(util, |util| {
        let Some(target_id) = util.target_id() else { return };
        let Some(target) = util.runtime.get_video_target_mut(target_id) else { return };
        target.set_current_frame(a);
        // Direction derives from the sign of b-a combined with the sign of
        // the target's configured rate (spec.md §4.4).
        let rate_sign = if target.playback_rate() < 0.0 { -1.0 } else { 1.0 };
        let span_sign = if b < a { -1.0 } else { 1.0 };
        util.runtime.request_redraw();
        insert_video_play(util, a, b, true, Some(span_sign * rate_sign));
    });
}

pub fn play_forward_reverse_until_done(util: &mut Util, dir: Direction) {
    blocking_template(util, |util| {
        let Some(target_id) = util.target_id() else { return };
        let Some(target) = util.runtime.get_video_target_mut(target_id) else { return };
        let current = target.current_frame();
        let end = match dir {
            Direction::Forward => target.trim_end() as f64,
            Direction::Backward => target.trim_start() as f64,
        };
        insert_video_play(util, current, end, true, Some(dir.sign()));
    });
}

pub fn play_forward_until_done(util: &mut Util) {
    play_forward_reverse_until_done(util, Direction::Forward);
}

pub fn play_backward_until_done(util: &mut Util) {
    play_forward_reverse_until_done(util, Direction::Backward);
}

pub fn start_playing_forward_reverse(util: &mut Util, dir: Direction) {
    let Some(target_id) = util.target_id() else { return };
    let Some(target) = util.runtime.get_video_target_mut(target_id) else { return };
    let current = target.current_frame();
    let end = match dir {
        Direction::Forward => target.trim_end() as f64,
        Direction::Backward => target.trim_start() as f64,
    };
    // Non-blocking: the primitive does not yield (spec.md §4.4).
    insert_video_play(util, current, end, false, Some(dir.sign()));
}

pub fn start_playing(util: &mut Util) {
    start_playing_forward_reverse(util, Direction::Forward);
}

pub fn stop_playing(util: &mut Util) {
    let Some(target_id) = util.target_id() else { return };
    util.runtime.play_queues_mut().video.remove(target_id);
}

pub fn play_n_frames(util: &mut Util, n: f64) {
    blocking_template(util, |util| {
        let Some(target_id) = util.target_id() else { return };
        let Some(target) = util.runtime.get_video_target_mut(target_id) else { return };
        let trim_start = target.trim_start() as f64;
        let trim_end = target.trim_end() as f64;
        let start = target.current_frame();
        let end = (start + n).clamp(trim_start, trim_end);
        insert_video_play(util, start, end, true, Some(1.0));
    });
}

/// Frames are 1-indexed in scripts, 0-indexed internally (spec.md §4.4).
pub fn go_to_frame(util: &mut Util, f: f64) {
    let Some(target_id) = util.target_id() else { return };
    let Some(target) = util.runtime.get_video_target_mut(target_id) else { return };
    let trim_start = target.trim_start() as f64;
    target.set_current_frame((f + trim_start) - 1.0);
    util.runtime.request_redraw();
}

pub fn next_frame(util: &mut Util) {
    let Some(target_id) = util.target_id() else { return };
    let Some(target) = util.runtime.get_video_target_mut(target_id) else { return };
    let cur = target.current_frame();
    target.set_current_frame(cur + 1.0);
    util.runtime.request_redraw();
}

pub fn previous_frame(util: &mut Util) {
    let Some(target_id) = util.target_id() else { return };
    let Some(target) = util.runtime.get_video_target_mut(target_id) else { return };
    let cur = target.current_frame();
    target.set_current_frame(cur - 1.0);
    util.runtime.request_redraw();
}

/// Unknown effect names are a no-op (spec.md §7.1).
pub fn change_effect_by(util: &mut Util, name: &str, delta: f64) {
    let Some(effect) = VideoEffect::from_name(name) else { return };
    let Some(target_id) = util.target_id() else { return };
    let Some(target) = util.runtime.get_video_target_mut(target_id) else { return };
    target.change_effect_by(effect, delta);
}

pub fn set_effect_to(util: &mut Util, name: &str, value: f64) {
    let Some(effect) = VideoEffect::from_name(name) else { return };
    let Some(target_id) = util.target_id() else { return };
    let Some(target) = util.runtime.get_video_target_mut(target_id) else { return };
    target.set_effect(effect, value);
}

pub fn clear_video_effects(util: &mut Util) {
    let Some(target_id) = util.target_id() else { return };
    let Some(target) = util.runtime.get_video_target_mut(target_id) else { return };
    target.clear_effects();
}

pub fn when_played_to_end(util: &Util) -> bool {
    let Some(target_id) = util.target_id() else { return false };
    let Some(target) = util.runtime.get_video_target(target_id) else { return false };
    target.current_frame() == target.trim_end() as f64
}

pub fn when_played_to_beginning(util: &Util) -> bool {
    let Some(target_id) = util.target_id() else { return false };
    let Some(target) = util.runtime.get_video_target(target_id) else { return false };
    target.current_frame() == target.trim_start() as f64
}

pub fn when_reached(util: &Util, marker: f64) -> bool {
    let Some(target_id) = util.target_id() else { return false };
    let Some(target) = util.runtime.get_video_target(target_id) else { return false };
    marker == target.current_frame()
}

/// Only the hat consumes the latch (spec.md §3 invariant); the `isTapped`
/// reporter does not.
pub fn when_tapped(util: &mut Util) -> bool {
    let Some(target_id) = util.target_id() else { return false };
    let Some(target) = util.runtime.get_video_target_mut(target_id) else { return false };
    target.consume_tapped()
}

pub fn get_current_frame(util: &Util) -> f64 {
    let Some(target_id) = util.target_id() else { return 0.0 };
    let Some(target) = util.runtime.get_video_target(target_id) else { return 0.0 };
    (target.current_frame() - target.trim_start() as f64) + 1.0
}

pub fn get_total_frames(util: &Util) -> f64 {
    let Some(target_id) = util.target_id() else { return 0.0 };
    let Some(target) = util.runtime.get_video_target(target_id) else { return 0.0 };
    (target.trim_end() - target.trim_start()) as f64
}

pub fn get_play_rate(util: &Util) -> f64 {
    let Some(target_id) = util.target_id() else { return 0.0 };
    let Some(target) = util.runtime.get_video_target(target_id) else { return 0.0 };
    target.playback_rate()
}

pub fn is_tapped(util: &Util) -> bool {
    let Some(target_id) = util.target_id() else { return false };
    let Some(target) = util.runtime.get_video_target(target_id) else { return false };
    target.is_tapped()
}
