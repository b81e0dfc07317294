//! # Graphics State Caches
//!
//! Transparency, extended graphics state and soft mask requests are mapped
//! to already-materialized objects by structural equality. A value is turned
//! into an object at most once per document; every later request with an
//! equal value gets the same store index back. Values that change nothing
//! (alpha 1.0 with normal blending) never create an object.
//!
//! Floating point inputs are quantized to millionths before hashing so that
//! equal-looking values compare equal.

use std::collections::HashMap;
use std::hash::Hash;

use tracing::trace;

use crate::pdf::{ExtGState, FormXObject, ObjectStore, PdfObject, ResourceDict, SMask, SMaskType};
use crate::style::{BlendMode, Transparency};

/// A cached object: its store index and resource name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResource {
    pub index: usize,
    pub name: String,
}

/// Value -> object mapping with structural keys.
#[derive(Debug)]
pub struct ResourceCache<K> {
    entries: HashMap<K, CachedResource>,
}

impl<K> Default for ResourceCache<K> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<K: Hash + Eq> ResourceCache<K> {
    pub fn find(&self, key: &K) -> Option<&CachedResource> {
        self.entries.get(key)
    }

    pub fn save(&mut self, key: K, resource: CachedResource) {
        self.entries.insert(key, resource);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn quantize(v: f64) -> i64 {
    (v * 1_000_000.0).round() as i64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransparencyKey {
    alpha: i64,
    blend_mode: BlendMode,
}

impl From<Transparency> for TransparencyKey {
    fn from(t: Transparency) -> Self {
        Self {
            alpha: quantize(t.alpha),
            blend_mode: t.blend_mode,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExtGStateKey {
    fill_alpha: Option<i64>,
    stroke_alpha: Option<i64>,
    blend_mode: Option<BlendMode>,
    smask: Option<usize>,
}

impl From<&ExtGState> for ExtGStateKey {
    fn from(s: &ExtGState) -> Self {
        Self {
            fill_alpha: s.fill_alpha.map(quantize),
            stroke_alpha: s.stroke_alpha.map(quantize),
            blend_mode: s.blend_mode,
            smask: s.smask,
        }
    }
}

/// Identity of a soft mask: its type, the mask image and where it is drawn.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SMaskKey {
    pub subtype: SMaskType,
    /// Resource name of the mask image.
    pub image: String,
    rect: [i64; 4],
}

impl SMaskKey {
    pub fn new(subtype: SMaskType, image: &str, rect: [f64; 4]) -> Self {
        Self {
            subtype,
            image: image.to_string(),
            rect: rect.map(quantize),
        }
    }
}

/// The per-document graphics caches.
#[derive(Debug, Default)]
pub struct GraphicsCaches {
    transparency: ResourceCache<TransparencyKey>,
    ext_gstates: ResourceCache<ExtGStateKey>,
    smasks: ResourceCache<SMaskKey>,
}

impl GraphicsCaches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Graphics state for `state`, created on first request. `None` when the
    /// state is a no-op.
    pub fn ext_gstate(
        &mut self,
        store: &mut ObjectStore,
        resources: &mut ResourceDict,
        state: ExtGState,
    ) -> Option<CachedResource> {
        if state.is_noop() {
            return None;
        }
        let key = ExtGStateKey::from(&state);
        if let Some(hit) = self.ext_gstates.find(&key) {
            trace!(name = %hit.name, "ext gstate cache hit");
            return Some(hit.clone());
        }

        let index = store.append(PdfObject::ExtGState(state));
        let name = format!("GS{}", self.ext_gstates.len() + 1);
        resources.ext_gstates.insert(name.clone(), index);
        let resource = CachedResource { index, name };
        trace!(name = %resource.name, index, "ext gstate created");
        self.ext_gstates.save(key, resource.clone());
        Some(resource)
    }

    /// Graphics state applying `transparency` to fills and strokes.
    pub fn transparency(
        &mut self,
        store: &mut ObjectStore,
        resources: &mut ResourceDict,
        transparency: Transparency,
    ) -> Option<CachedResource> {
        if transparency.is_noop() {
            return None;
        }
        let key = TransparencyKey::from(transparency);
        if let Some(hit) = self.transparency.find(&key) {
            return Some(hit.clone());
        }

        let state = ExtGState {
            fill_alpha: Some(transparency.alpha),
            stroke_alpha: Some(transparency.alpha),
            blend_mode: Some(transparency.blend_mode),
            smask: None,
        };
        let resource = self.ext_gstate(store, resources, state)?;
        self.transparency.save(key, resource.clone());
        Some(resource)
    }

    /// Soft mask for `key`. On a miss the group form is appended first and
    /// the mask dictionary after it. Returns the store index of the mask.
    pub fn soft_mask(&mut self, store: &mut ObjectStore, key: SMaskKey, group: FormXObject) -> usize {
        if let Some(hit) = self.smasks.find(&key) {
            return hit.index;
        }
        let group_index = store.append(PdfObject::Form(group));
        let index = store.append(PdfObject::SMask(SMask {
            subtype: key.subtype,
            group: group_index,
        }));
        let name = format!("SM{}", self.smasks.len() + 1);
        self.smasks.save(key, CachedResource { index, name });
        index
    }

    pub fn ext_gstate_count(&self) -> usize {
        self.ext_gstates.len()
    }
}
