//! Catchment geometry store keyed by network node id

use std::collections::HashMap;

use geo_types::{Geometry, MultiPolygon};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::network::NodeKey;
use crate::vector::normalize::{clean, to_multi_polygon};

/// A catchment polygon as supplied by the polygon source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchmentRecord<K> {
    pub id: K,
    pub geometry: Geometry<f64>,
}

/// Outcome of looking up a set of node ids.
#[derive(Debug, Clone)]
pub struct Resolved<'a> {
    /// Matched geometries, ordered by node id
    pub geometries: Vec<&'a MultiPolygon<f64>>,
    /// Ids that had a stored geometry
    pub matched: usize,
    /// Ids looked up, matched or not
    pub queried: usize,
}

impl Resolved<'_> {
    /// Share of queried ids with a geometry, in `[0, 1]`.
    pub fn match_ratio(&self) -> f64 {
        if self.queried == 0 {
            0.0
        } else {
            self.matched as f64 / self.queried as f64
        }
    }

    pub fn is_complete(&self) -> bool {
        self.matched == self.queried
    }
}

/// Lookup of catchment geometry by node id.
///
/// Implementations must be safe to share across worker threads and must
/// not mutate on lookup. A store backed by a remote service should bound
/// the time it spends in `lookup`.
pub trait GeometryResolver<K: NodeKey>: Send + Sync {
    fn lookup(&self, id: &K) -> Option<&MultiPolygon<f64>>;

    /// Resolve a set of distinct ids.
    ///
    /// Ids with no geometry are left out of `geometries` but still count
    /// towards `queried`.
    fn resolve<'s, 'k, I>(&'s self, ids: I) -> Resolved<'s>
    where
        I: IntoIterator<Item = &'k K>,
        K: 'k,
    {
        let mut queried = 0;
        let mut hits: Vec<(&K, &MultiPolygon<f64>)> = Vec::new();
        for id in ids {
            queried += 1;
            if let Some(geom) = self.lookup(id) {
                hits.push((id, geom));
            }
        }
        hits.sort_by(|a, b| a.0.cmp(b.0));

        Resolved {
            matched: hits.len(),
            queried,
            geometries: hits.into_iter().map(|(_, g)| g).collect(),
        }
    }
}

/// In-memory catchment store.
///
/// Geometries are normalized on insert (see [`crate::vector::to_multi_polygon`]).
/// Repeated ids accumulate: every polygon supplied for an id is kept and
/// dissolved later by the union.
#[derive(Debug, Clone)]
pub struct GeometryStore<K: NodeKey> {
    geometries: HashMap<K, MultiPolygon<f64>>,
    degenerate: usize,
}

impl<K: NodeKey> Default for GeometryStore<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: NodeKey> GeometryStore<K> {
    pub fn new() -> Self {
        Self {
            geometries: HashMap::new(),
            degenerate: 0,
        }
    }

    /// Build a store from `(id, geometry)` pairs.
    ///
    /// # Errors
    /// [`crate::Error::GeometryType`] on the first non-areal geometry.
    pub fn from_records<I>(records: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, Geometry<f64>)>,
    {
        let mut store = Self::new();
        for (id, geometry) in records {
            store.insert(id, geometry)?;
        }
        debug!(
            catchments = store.len(),
            degenerate = store.degenerate,
            "built catchment store"
        );
        Ok(store)
    }

    pub fn from_catchments<I>(records: I) -> Result<Self>
    where
        I: IntoIterator<Item = CatchmentRecord<K>>,
    {
        Self::from_records(records.into_iter().map(|r| (r.id, r.geometry)))
    }

    /// Add one catchment. The id counts as matched even when every polygon
    /// in the geometry turns out to be degenerate.
    pub fn insert(&mut self, id: K, geometry: Geometry<f64>) -> Result<()> {
        let (mp, dropped) = clean(to_multi_polygon(&id, geometry)?);
        if dropped > 0 {
            debug!(id = %id, dropped, "dropped degenerate catchment polygons");
            self.degenerate += dropped;
        }
        self.geometries
            .entry(id)
            .and_modify(|existing| existing.0.extend(mp.0.iter().cloned()))
            .or_insert(mp);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.geometries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geometries.is_empty()
    }

    pub fn contains(&self, id: &K) -> bool {
        self.geometries.contains_key(id)
    }

    pub fn get(&self, id: &K) -> Option<&MultiPolygon<f64>> {
        self.geometries.get(id)
    }

    /// Number of degenerate polygons dropped on insert
    pub fn degenerate_count(&self) -> usize {
        self.degenerate
    }

    pub fn ids(&self) -> impl Iterator<Item = &K> + '_ {
        self.geometries.keys()
    }
}

impl<K: NodeKey> GeometryResolver<K> for GeometryStore<K> {
    fn lookup(&self, id: &K) -> Option<&MultiPolygon<f64>> {
        self.geometries.get(id)
    }
}
