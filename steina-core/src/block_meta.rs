//! Extension metadata exposed to the editor (spec.md §6).

use std::collections::HashMap;

use anyhow::{Context, Result};

use crate::audio::AudioTarget;
use crate::video::VideoTarget;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BlockType {
    Command,
    Reporter,
    Boolean,
    Hat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ArgumentType {
    Number,
    String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ArgumentSpec {
    #[serde(rename = "type")]
    pub ty: ArgumentType,
    pub menu: Option<String>,
    pub default_value: serde_json::Value,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BlockDescriptor {
    pub opcode: String,
    pub block_type: BlockType,
    /// Template text with `[PLACEHOLDER]` markers (spec.md §6).
    pub text: String,
    pub arguments: HashMap<String, ArgumentSpec>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MenuEntry {
    pub text: String,
    pub value: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ExtensionMetadata {
    pub id: String,
    pub name: String,
    pub blocks: Vec<BlockDescriptor>,
    pub menus: Vec<String>,
}

/// Loads a `{id, name, blocks, menus}` extension-metadata table from its
/// source JSON (spec.md §6). Malformed metadata is a host-facing load
/// failure, not a per-tick fault, so it is reported through `anyhow`
/// rather than absorbed.
pub fn load_extension_metadata(json: &str) -> Result<ExtensionMetadata> {
    serde_json::from_str(json).context("failed to parse extension metadata")
}

/// Builds the dynamic "markers" menu for a video target (spec.md §6):
/// synthesized `start`/numbered marker entries/`end` entries bracketing the
/// target's own markers, feeding `whenReached`'s argument menu.
pub fn video_markers_menu(target: Option<&VideoTarget>) -> Vec<MenuEntry> {
    let Some(target) = target else {
        return vec![MenuEntry { text: "n/a".into(), value: "0".into() }];
    };
    let mut entries = vec![MenuEntry {
        text: "start".into(),
        value: target.trim_start().to_string(),
    }];
    for (i, marker) in target.markers().iter().enumerate() {
        entries.push(MenuEntry {
            text: format!("marker {}", i + 1),
            value: marker.to_string(),
        });
    }
    entries.push(MenuEntry {
        text: "end".into(),
        value: target.trim_end().to_string(),
    });
    entries
}

/// Builds the dynamic "markers" menu for an audio target (spec.md §6):
/// synthesized "start"/numbered marker entries/"end"; `{text:'n/a',
/// value:'0'}` if no target resolved.
pub fn audio_markers_menu(target: Option<&AudioTarget>) -> Vec<MenuEntry> {
    let Some(target) = target else {
        return vec![MenuEntry { text: "n/a".into(), value: "0".into() }];
    };
    let mut entries = vec![MenuEntry {
        text: "start".into(),
        value: target.trim_start().to_string(),
    }];
    for (i, marker) in target.markers().iter().enumerate() {
        entries.push(MenuEntry {
            text: format!("marker {}", i + 1),
            value: marker.to_string(),
        });
    }
    entries.push(MenuEntry {
        text: "end".into(),
        value: target.trim_end().to_string(),
    });
    entries
}
