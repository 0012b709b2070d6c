//! Spatial index: H3 cell → driver ids, used to prefilter dispatch candidates.
//!
//! Drivers are bucketed at [`INDEX_RESOLUTION`] (~1.2 km hexagon edge). A radius
//! query walks a grid disk wide enough to cover the radius; callers still apply
//! the exact haversine check on the returned ids.

use std::collections::HashMap;

use h3o::{CellIndex, Resolution};

use crate::geo::Location;
use crate::model::UserId;

/// Resolution used for driver buckets.
pub const INDEX_RESOLUTION: Resolution = Resolution::Seven;

/// Grid disks beyond this ring count are slower than a plain scan.
const MAX_DISK_K: u32 = 48;

/// Hexagon sizes vary across the globe; widen the disk so the radius is
/// always covered.
const DISK_SLACK: f64 = 1.5;

#[derive(Debug, Default)]
pub struct SpatialIndex {
    drivers_by_cell: HashMap<CellIndex, Vec<UserId>>,
    driver_to_cell: HashMap<UserId, CellIndex>,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.driver_to_cell.len()
    }

    pub fn is_empty(&self) -> bool {
        self.driver_to_cell.is_empty()
    }

    /// Inserts or moves a driver. Drivers without a valid cell are removed.
    pub fn upsert(&mut self, driver_id: &UserId, location: Option<Location>) {
        let new_cell = location.and_then(|loc| loc.cell(INDEX_RESOLUTION).ok());
        let old_cell = self.driver_to_cell.get(driver_id).copied();
        if old_cell == new_cell {
            return;
        }
        self.remove(driver_id);
        if let Some(cell) = new_cell {
            self.drivers_by_cell
                .entry(cell)
                .or_default()
                .push(driver_id.clone());
            self.driver_to_cell.insert(driver_id.clone(), cell);
        }
    }

    pub fn remove(&mut self, driver_id: &UserId) {
        if let Some(cell) = self.driver_to_cell.remove(driver_id) {
            if let Some(ids) = self.drivers_by_cell.get_mut(&cell) {
                ids.retain(|id| id != driver_id);
                if ids.is_empty() {
                    self.drivers_by_cell.remove(&cell);
                }
            }
        }
    }

    pub fn cell_of(&self, driver_id: &UserId) -> Option<CellIndex> {
        self.driver_to_cell.get(driver_id).copied()
    }

    /// Driver ids that may lie within `radius_km` of `origin`.
    ///
    /// Returns `None` when the radius is too large for a disk query (or the
    /// origin has no cell); the caller should scan every driver instead.
    pub fn candidates_within(&self, origin: &Location, radius_km: f64) -> Option<Vec<UserId>> {
        let k = disk_k_for_radius(radius_km)?;
        let origin_cell = origin.cell(INDEX_RESOLUTION).ok()?;
        let ids = origin_cell
            .grid_disk::<Vec<_>>(k)
            .into_iter()
            .filter_map(|cell| self.drivers_by_cell.get(&cell))
            .flatten()
            .cloned()
            .collect();
        Some(ids)
    }
}

/// Ring count whose disk covers `radius_km` at [`INDEX_RESOLUTION`].
fn disk_k_for_radius(radius_km: f64) -> Option<u32> {
    if !radius_km.is_finite() || radius_km < 0.0 {
        return None;
    }
    let edge_km = INDEX_RESOLUTION.edge_length_km();
    let rings = (radius_km * DISK_SLACK / edge_km).ceil() + 1.0;
    if rings > f64::from(MAX_DISK_K) {
        return None;
    }
    Some(rings as u32)
}
