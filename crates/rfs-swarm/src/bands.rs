//! Scan-band partitioning across the active swarm.

use std::collections::BTreeMap;

use rfs_core::{DroneId, FrequencyHz};

/// The standard scan bands, in Hz: FM broadcast, 2 m amateur, 70 cm amateur,
/// and the upper UHF business band.
pub const FREQUENCY_BANDS: [(FrequencyHz, FrequencyHz); 4] = [
    (FrequencyHz(88_000_000), FrequencyHz(108_000_000)),
    (FrequencyHz(144_000_000), FrequencyHz(148_000_000)),
    (FrequencyHz(430_000_000), FrequencyHz(440_000_000)),
    (FrequencyHz(450_000_000), FrequencyHz(470_000_000)),
];

/// Partition the scan bands round-robin over the swarm.
///
/// Drones are sorted by id first, so every agent computes the identical
/// assignment from the same membership — no coordination round needed.
/// Bands are disjoint per drone whenever `drones.len() <= FREQUENCY_BANDS.len()`;
/// beyond that the allocation wraps.
pub fn assign_bands(
    drones: impl IntoIterator<Item = DroneId>,
) -> BTreeMap<DroneId, (FrequencyHz, FrequencyHz)> {
    let mut ids: Vec<DroneId> = drones.into_iter().collect();
    ids.sort();
    ids.dedup();

    ids.into_iter()
        .enumerate()
        .map(|(i, id)| (id, FREQUENCY_BANDS[i % FREQUENCY_BANDS.len()]))
        .collect()
}

/// `true` when `frequency` falls inside `band` (edges inclusive).
#[inline]
pub fn band_contains(band: (FrequencyHz, FrequencyHz), frequency: FrequencyHz) -> bool {
    band.0 <= frequency && frequency <= band.1
}
