//! Save/load JSON shapes (spec.md §6: "Persisted target JSON").

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::audio::AudioTarget;
use crate::target::{Target, TargetId};
use crate::video::{VideoEffects, VideoTarget};

/// `blocks`/`variables`/`lists` are out of scope (spec.md §1) and are kept
/// as opaque JSON so round-tripping a project never drops them. Notably,
/// the trim range is not part of the persisted video shape (spec.md §6) —
/// only `fps`/`frames`/`currentFrame`/`playbackRate` are.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoTargetJson {
    pub id: TargetId,
    pub x: f64,
    pub y: f64,
    pub size: f64,
    pub direction: f64,
    pub visible: bool,
    pub effects: VideoEffects,
    #[serde(default)]
    pub blocks: Value,
    #[serde(default)]
    pub variables: Value,
    #[serde(default)]
    pub lists: Value,
    pub fps: f64,
    pub frames: u32,
    pub current_frame: f64,
    pub playback_rate: f64,
}

impl From<&VideoTarget> for VideoTargetJson {
    fn from(t: &VideoTarget) -> Self {
        Self {
            id: t.id(),
            x: t.x,
            y: t.y,
            size: t.size,
            direction: t.direction,
            visible: t.visible,
            effects: *t.effects(),
            blocks: Value::Null,
            variables: Value::Null,
            lists: Value::Null,
            fps: t.fps(),
            frames: t.frames(),
            current_frame: t.current_frame(),
            playback_rate: t.playback_rate(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioTargetJson {
    pub id: TargetId,
    pub volume: f64,
    pub total_samples: u64,
    pub sample_rate: u32,
    #[serde(default)]
    pub blocks: Value,
    #[serde(default)]
    pub variables: Value,
    #[serde(default)]
    pub lists: Value,
    pub markers: Vec<i64>,
    pub trim_start: u64,
    pub trim_end: u64,
    pub playback_rate: f64,
}

impl From<&AudioTarget> for AudioTargetJson {
    fn from(t: &AudioTarget) -> Self {
        Self {
            id: t.id(),
            volume: t.volume(),
            total_samples: t.total_samples(),
            sample_rate: t.sample_rate(),
            blocks: Value::Null,
            variables: Value::Null,
            lists: Value::Null,
            markers: t.markers().to_vec(),
            trim_start: t.trim_start(),
            trim_end: t.trim_end(),
            playback_rate: t.playback_rate(),
        }
    }
}

/// Loads a persisted video target from its saved JSON text (project load,
/// spec.md §6). The fallible boundary: malformed project files are a host
/// concern to report, not a panic or a silently-absorbed per-tick fault.
pub fn load_video_target_json(json: &str) -> Result<VideoTargetJson> {
    serde_json::from_str(json).context("failed to parse persisted video target JSON")
}

/// Serializes a video target to its saved JSON text (project save).
pub fn save_video_target_json(target: &VideoTarget) -> Result<String> {
    serde_json::to_string(&VideoTargetJson::from(target)).context("failed to serialize video target")
}

/// Loads a persisted audio target from its saved JSON text (project load).
pub fn load_audio_target_json(json: &str) -> Result<AudioTargetJson> {
    serde_json::from_str(json).context("failed to parse persisted audio target JSON")
}

/// Serializes an audio target to its saved JSON text (project save).
pub fn save_audio_target_json(target: &AudioTarget) -> Result<String> {
    serde_json::to_string(&AudioTargetJson::from(target)).context("failed to serialize audio target")
}
