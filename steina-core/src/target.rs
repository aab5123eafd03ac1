//! C2: target registry glue.
//!
//! The registry itself (lifetime, lookup by id, iteration order) is owned
//! by the host; this module only models the id type and the lookup/iterate
//! seam the sequencer and media-block primitives need.

/// Opaque id of a target (sprite-like script-owning entity).
///
/// Strong-typed wrapper over the host's id space; the core never
/// interprets the bits, it only compares and hashes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct TargetId(pub u64);

impl std::fmt::Display for TargetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A host-owned entity a thread may be attached to.
///
/// Only the minimal surface the sequencer needs (thread retirement on a
/// null target) is modeled here; video/audio specifics live in
/// [`crate::video::VideoTarget`] / [`crate::audio::AudioTarget`].
pub trait Target {
    fn id(&self) -> TargetId;
}

/// Lookup of targets by id, owned and iterated by the host (spec.md §2, C2).
pub trait TargetRegistry<T: Target> {
    fn get(&self, id: TargetId) -> Option<&T>;
    fn get_mut(&mut self, id: TargetId) -> Option<&mut T>;
    fn iter(&self) -> Box<dyn Iterator<Item = &T> + '_>;
}
