//! C5: play-queue state — the two containers tracking active video and
//! audio plays, plus the per-tick advancement step described in spec.md
//! §4.1 ("Media advancement").

use std::collections::HashMap;

use crate::audio::AudioTarget;
use crate::target::TargetId;
use crate::video::VideoTarget;

/// Opaque handle to a single play-queue entry (spec.md §3: `id:opaque`).
/// Stored by blocking media-block primitives on their stack frame so a
/// later invocation can detect whether its own play was overwritten or
/// completed (spec.md §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlayId(u64);

#[derive(Debug, Default)]
pub(crate) struct PlayIdGen(u64);

impl PlayIdGen {
    pub(crate) fn next(&mut self) -> PlayId {
        self.0 += 1;
        PlayId(self.0)
    }
}

/// An active video play (spec.md §3).
///
/// `start`/`end` are frame boundaries; `blocking` plays hold their owning
/// thread in `YIELD_TICK` until removed from [`VideoPlayQueue`].
///
/// `forced_sign` resolves the direction-forcing primitives
/// (`playForwardUntilDone`/`playBackwardUntilDone`/the reverse variants and
/// `playVideoFromAToB`) per spec.md §9/§8 boundary note: "negative rate with
/// `playForwardUntilDone` still advances toward `trimEnd` (absolute value of
/// rate is used in the direction-forced primitives)". When `None`, the
/// tick's advancement derives direction from the *signed* target rate, as
/// spec.md §4.1 describes for the general case.
#[derive(Debug, Clone, Copy)]
pub struct VideoPlay {
    pub id: PlayId,
    pub start: f64,
    pub end: f64,
    pub thread_top_block: u64,
    pub blocking: bool,
    pub forced_sign: Option<f64>,
}

#[derive(Debug, Default)]
pub struct VideoPlayQueue {
    playing: HashMap<TargetId, VideoPlay>,
}

impl VideoPlayQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// At most one play per video target — a new insertion overwrites any
    /// existing one (spec.md §3 invariant V2). Returns the prior entry, if
    /// any, so a blocking caller's surviving `playingId` can be compared to
    /// the prior `PlayId` to detect the overwrite at its next entry.
    pub fn insert(&mut self, target: TargetId, play: VideoPlay) -> Option<VideoPlay> {
        self.playing.insert(target, play)
    }

    pub fn get(&self, target: TargetId) -> Option<&VideoPlay> {
        self.playing.get(&target)
    }

    /// True only if the play at `target` still has the given id — the
    /// "stale play reference" check media-block primitives use on their
    /// second and later entries (spec.md §4.4, §7.4).
    pub fn is_current(&self, target: TargetId, id: PlayId) -> bool {
        matches!(self.playing.get(&target), Some(p) if p.id == id)
    }

    pub fn remove(&mut self, target: TargetId) -> Option<VideoPlay> {
        self.playing.remove(&target)
    }

    pub fn clear(&mut self) {
        self.playing.clear();
    }

    pub fn len(&self) -> usize {
        self.playing.len()
    }

    pub fn is_empty(&self) -> bool {
        self.playing.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TargetId, &VideoPlay)> {
        self.playing.iter().map(|(k, v)| (*k, v))
    }
}

/// An active audio play (spec.md §3). Many may exist concurrently per
/// target, keyed by [`PlayId`] (not target id).
#[derive(Debug, Clone, Copy)]
pub struct AudioPlay {
    pub audio_target_id: TargetId,
    pub sample_rate: u32,
    pub start: f64,
    pub end: f64,
    pub playback_rate: f64,
    pub prev_playhead: f64,
    pub playhead: f64,
    pub blocking: bool,
}

#[derive(Debug, Default)]
pub struct AudioPlayQueue {
    playing: HashMap<PlayId, AudioPlay>,
}

impl AudioPlayQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: PlayId, play: AudioPlay) {
        self.playing.insert(id, play);
    }

    pub fn get(&self, id: PlayId) -> Option<&AudioPlay> {
        self.playing.get(&id)
    }

    pub fn playing_mut(&mut self, id: PlayId) -> Option<&mut AudioPlay> {
        self.playing.get_mut(&id)
    }

    pub fn contains(&self, id: PlayId) -> bool {
        self.playing.contains_key(&id)
    }

    pub fn remove(&mut self, id: PlayId) -> Option<AudioPlay> {
        self.playing.remove(&id)
    }

    pub fn clear(&mut self) {
        self.playing.clear();
    }

    pub fn len(&self) -> usize {
        self.playing.len()
    }

    pub fn is_empty(&self) -> bool {
        self.playing.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PlayId, &AudioPlay)> {
        self.playing.iter().map(|(k, v)| (*k, v))
    }
}

/// Bundles both containers plus the shared id allocator (spec.md §3).
#[derive(Debug, Default)]
pub struct PlayQueues {
    pub video: VideoPlayQueue,
    pub audio: AudioPlayQueue,
    ids: PlayIdGen,
}

impl PlayQueues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_play_id(&mut self) -> PlayId {
        self.ids.next()
    }

    /// PROJECT_STOP_ALL (spec.md §4.4): clear both containers and reset
    /// every audio target's non-blocking slot counter. The containers
    /// themselves are reset in place, not reallocated (spec.md §9).
    pub fn stop_all<'a>(&mut self, audio_targets: impl Iterator<Item = &'a mut AudioTarget>) {
        self.video.clear();
        self.audio.clear();
        for t in audio_targets {
            t.reset_nonblocking_slots();
        }
    }
}

/// Advances one video target's play by one tick, per spec.md §4.1.
/// Returns `true` if the play is done and should be removed from the queue.
///
/// `play.start` is always the origin (the current frame at the moment the
/// play was installed) and `play.end` is always the destination, for both
/// directions: `playBackwardUntilDone`/`playForwardReverseUntilDone(Backward)`
/// insert `[currentFrame, trimStart]` (start > end), and
/// `playVideoFromAToB(a,b)` with `b < a` inserts `[a,b]`. So completion is
/// always "reached `play.end`" — which side of `play.start` that is just
/// depends on the direction of travel.
pub fn advance_video_play(target: &mut VideoTarget, play: &VideoPlay, current_step_time_ms: f64) -> bool {
    let rate = target.playback_rate();
    let sign = play.forced_sign.unwrap_or_else(|| {
        if rate < 0.0 {
            -1.0
        } else {
            1.0
        }
    });
    let delta = (current_step_time_ms / 1000.0) * (rate.abs() / 100.0) * target.fps() * sign;
    let next = target.current_frame() + delta;

    let moving_down = if delta != 0.0 { delta < 0.0 } else { play.end < play.start };

    if moving_down && next <= play.end {
        target.set_current_frame(play.end);
        true
    } else if !moving_down && next >= play.end {
        target.set_current_frame(play.end);
        true
    } else {
        target.set_current_frame(next);
        false
    }
}

/// Advances one audio play by one tick, per spec.md §4.1. Returns `true` if
/// the play has reached `end` and should be removed (and, if non-blocking,
/// its target's slot counter incremented).
pub fn advance_audio_play(play: &mut AudioPlay, current_step_time_ms: f64) -> bool {
    if play.playhead == play.end {
        return true;
    }
    let delta_samples = (current_step_time_ms / 1000.0) * (play.sample_rate as f64) * (play.playback_rate / 100.0);
    let next = (play.playhead + delta_samples).min(play.end);
    play.prev_playhead = play.playhead;
    play.playhead = next;
    false
}
