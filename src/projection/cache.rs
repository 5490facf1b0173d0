//! Memoization of cube-face remap fields.

use super::remap::{cube_face_field, ImageShape, ProjectionMethod, RemapField};
use super::ProjectionError;
use crate::core::CubeFace;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Parameters that fully determine a cube-face field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RemapKey {
    pub src: ImageShape,
    pub face: CubeFace,
    pub face_size: u32,
    /// `f64::to_bits` of the overlap in degrees
    pub overlap_bits: u64,
    pub method: ProjectionMethod,
}

impl RemapKey {
    pub fn new(
        src: ImageShape,
        face: CubeFace,
        face_size: u32,
        overlap_deg: f64,
        method: ProjectionMethod,
    ) -> Self {
        Self {
            src,
            face,
            face_size,
            overlap_bits: overlap_deg.to_bits(),
            method,
        }
    }

    pub fn overlap_deg(&self) -> f64 {
        f64::from_bits(self.overlap_bits)
    }
}

/// Thread-safe cache of remap fields shared by all face and panorama tasks.
///
/// A batch of panoramas with the same resolution needs only six fields.
#[derive(Debug, Default)]
pub struct RemapCache {
    fields: Mutex<HashMap<RemapKey, Arc<RemapField>>>,
}

impl RemapCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached field for `key`, building it on first use.
    ///
    /// The lock is not held while building, so two tasks may race to build
    /// the same key; the first inserted field wins and both get it.
    pub fn get_or_build(&self, key: RemapKey) -> Result<Arc<RemapField>, ProjectionError> {
        if let Some(field) = self.lock().get(&key) {
            return Ok(Arc::clone(field));
        }

        let field = Arc::new(cube_face_field(
            key.src,
            key.face,
            key.face_size,
            key.overlap_deg(),
            key.method,
        )?);
        log::debug!(
            "built remap field for {} ({}px, {}x{} source)",
            key.face,
            key.face_size,
            key.src.width,
            key.src.height
        );

        Ok(Arc::clone(self.lock().entry(key).or_insert(field)))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<RemapKey, Arc<RemapField>>> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.fields.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
