//! C7 audio primitives (spec.md §4.4).

use crate::media::{park_until_next_tick, poll_blocking, BlockingPoll, Util};
use crate::play_queue::AudioPlay;

fn insert_audio_play(util: &mut Util, start: f64, end: f64, blocking: bool) {
    let Some(target_id) = util.target_id() else { return };
    let Some(target) = util.runtime.get_audio_target(target_id) else { return };
    let sample_rate = target.sample_rate();
    let playback_rate = target.playback_rate();

    if !blocking {
        // Non-blocking starts are subject to the per-target slot cap
        // (spec.md §3 invariant A1, §7.3).
        let Some(target) = util.runtime.get_audio_target_mut(target_id) else { return };
        if !target.try_acquire_nonblocking_slot() {
            return;
        }
    }

    let id = util.runtime.play_queues_mut().next_play_id();
    let play = AudioPlay {
        audio_target_id: target_id,
        sample_rate,
        start,
        end,
        playback_rate,
        prev_playhead: start,
        playhead: start,
        blocking,
    };
    util.runtime.play_queues_mut().audio.insert(id, play);
    if blocking {
        if let Some(frame) = util.stack_frame_mut() {
            frame.playing_id = Some(id);
        }
        park_until_next_tick(util.thread);
    }
}

/// Drives the two-call blocking convention for audio plays. Audio plays are
/// keyed by [`crate::play_queue::PlayId`] rather than target id, so the
/// "still current" check is membership in the audio queue, not a
/// per-target overwrite comparison (spec.md §4.4, §7.4).
fn blocking_template(util: &mut Util, on_first_entry: impl FnOnce(&mut Util)) {
    let frame = match util.stack_frame_mut() {
        Some(f) => f.clone(),
        None => return,
    };
    let queue_has = |id| util.runtime.play_queues().audio.contains(id);
    match poll_blocking(&frame, queue_has) {
        BlockingPoll::FirstEntry => on_first_entry(util),
        BlockingPoll::StillPlaying => park_until_next_tick(util.thread),
        BlockingPoll::Completed => {}
    }
}

pub fn start_sound(util: &mut Util) {
    let Some(target_id) = util.target_id() else { return };
    let Some(target) = util.runtime.get_audio_target(target_id) else { return };
    let (start, end) = (target.trim_start() as f64, target.trim_end() as f64);
    insert_audio_play(util, start, end, false);
}

pub fn start_sound_from_a_to_b(util: &mut Util, a: f64, b: f64) {
    insert_audio_play(util, a, b, false);
}

pub fn play_sound(util: &mut Util) {
    blocking_template(util, |util| {
        let Some(target_id) = util.target_id() else { return };
        let Some(target) = util.runtime.get_audio_target(target_id) else { return };
        let (start, end) = (target.trim_start() as f64, target.trim_end() as f64);
        insert_audio_play(util, start, end, true);
    });
}

pub fn play_sound_from_a_to_b(util: &mut Util, a: f64, b: f64) {
    blocking_template(util, |util| {
        insert_audio_play(util, a, b, true);
    });
}

pub fn set_play_rate(util: &mut Util, rate: f64) {
    let Some(target_id) = util.target_id() else { return };
    let Some(target) = util.runtime.get_audio_target_mut(target_id) else { return };
    target.set_rate(rate);
}

pub fn change_play_rate_by(util: &mut Util, delta: f64) {
    let Some(target_id) = util.target_id() else { return };
    let Some(target) = util.runtime.get_audio_target_mut(target_id) else { return };
    let rate = target.playback_rate();
    target.set_rate(rate + delta);
}

pub fn set_volume_to(util: &mut Util, value: f64) {
    let Some(target_id) = util.target_id() else { return };
    let Some(target) = util.runtime.get_audio_target_mut(target_id) else { return };
    target.set_volume(value);
}

pub fn change_volume_by(util: &mut Util, delta: f64) {
    let Some(target_id) = util.target_id() else { return };
    let Some(target) = util.runtime.get_audio_target_mut(target_id) else { return };
    let v = target.volume();
    target.set_volume(v + delta);
}

pub fn get_volume(util: &Util) -> f64 {
    let Some(target_id) = util.target_id() else { return 0.0 };
    let Some(target) = util.runtime.get_audio_target(target_id) else { return 0.0 };
    target.volume()
}

pub fn get_play_rate(util: &Util) -> f64 {
    let Some(target_id) = util.target_id() else { return 0.0 };
    let Some(target) = util.runtime.get_audio_target(target_id) else { return 0.0 };
    target.playback_rate()
}
