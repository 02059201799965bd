//! World generation: a diamond-square heightmap sampled onto the hex disc,
//! percentile biome bands, an ocean rim, then resources and danger points
//! scattered over the land reachable from the starting site.

use std::collections::{BTreeSet, VecDeque};

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    config::{MAX_MAP_RADIUS, MIN_MAP_RADIUS},
    error::RealmError,
    hex::Coord,
    rng::Rando,
    rules::{self, MAX_DANGER_STRENGTH},
    world::{DangerPoint, Hex, HexMap, ResourceKind, Terrain},
};

pub const WATER_SHARE: f64 = 0.20;
pub const HILLS_FROM: f64 = 0.93;
pub const MOUNTAIN_FROM: f64 = 0.98;

pub const QUARRY_COUNT: usize = 3;
pub const FOREST_COUNT: usize = 8;
pub const GOLD_COUNT: usize = 3;

/// Starting sites must lie within this share of the radius from the centre.
pub const START_REACH: f64 = 0.4;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TerrainParams {
    /// Side of the square heightmap, `2^n + 1`.
    pub heightmap_size: usize,
    /// Noise decay per halving pass.
    pub roughness: f64,
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            heightmap_size: 129,
            roughness: 0.55,
        }
    }
}

/// Square grid of heights normalised to `[0, 100]`.
pub struct Heightmap {
    size: usize,
    cells: Vec<f64>,
}

impl Heightmap {
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, x: usize, y: usize) -> f64 {
        self.cells[y * self.size + x]
    }

    fn set(&mut self, x: usize, y: usize, value: f64) {
        self.cells[y * self.size + x] = value;
    }

    /// Height under a hex, mapping the disc's bounding square onto the grid.
    pub fn sample(&self, coord: Coord, radius: i32) -> f64 {
        let span = f64::from(radius.max(1) * 2);
        let last = (self.size - 1) as f64;
        let to_cell = |axis: i32| {
            let norm = f64::from(axis + radius) / span;
            (norm * last).round().clamp(0.0, last) as usize
        };
        self.get(to_cell(coord.q), to_cell(coord.r))
    }
}

pub fn diamond_square(size: usize, roughness: f64, rng: &mut impl Rng) -> Heightmap {
    let size = size.max(3);
    let mut map = Heightmap {
        size,
        cells: vec![0.0; size * size],
    };
    let last = size - 1;
    for (x, y) in [(0, 0), (last, 0), (0, last), (last, last)] {
        let corner = rng.float(0.0, 1.0);
        map.set(x, y, corner);
    }

    let mut step = last;
    let mut scale = roughness;
    while step > 1 {
        let half = step / 2;

        let mut y = half;
        while y < last {
            let mut x = half;
            while x < last {
                let avg = (map.get(x - half, y - half)
                    + map.get(x + half, y - half)
                    + map.get(x - half, y + half)
                    + map.get(x + half, y + half))
                    / 4.0;
                let jitter = rng.float(-0.5, 0.5) * scale;
                map.set(x, y, avg + jitter);
                x += step;
            }
            y += step;
        }

        let mut y = 0;
        while y < size {
            let mut x = (y + half) % step;
            while x < size {
                let mut sum = 0.0;
                let mut count = 0.0;
                if x >= half {
                    sum += map.get(x - half, y);
                    count += 1.0;
                }
                if x + half < size {
                    sum += map.get(x + half, y);
                    count += 1.0;
                }
                if y >= half {
                    sum += map.get(x, y - half);
                    count += 1.0;
                }
                if y + half < size {
                    sum += map.get(x, y + half);
                    count += 1.0;
                }
                let jitter = rng.float(-0.5, 0.5) * scale;
                map.set(x, y, sum / count + jitter);
                x += step;
            }
            y += half;
        }

        step = half;
        scale *= roughness;
    }

    normalise(&mut map.cells);
    map
}

fn normalise(cells: &mut [f64]) {
    let min = cells.iter().copied().fold(f64::INFINITY, f64::min);
    let max = cells.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    for cell in cells.iter_mut() {
        *cell = if range > f64::EPSILON {
            (*cell - min) / range * 100.0
        } else {
            50.0
        };
    }
}

/// Elevation cut points for water, hills and mountains taken from the sorted
/// inner elevations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiomeThresholds {
    pub water: f64,
    pub hills: f64,
    pub mountain: f64,
}

impl BiomeThresholds {
    pub fn from_elevations(mut elevations: Vec<f64>) -> Self {
        elevations.sort_by(f64::total_cmp);
        let at = |share: f64, fallback: f64| {
            let index = (elevations.len() as f64 * share).floor() as usize;
            elevations.get(index).copied().unwrap_or(fallback)
        };
        Self {
            water: at(WATER_SHARE, 0.0),
            hills: at(HILLS_FROM, 93.0),
            mountain: at(MOUNTAIN_FROM, 98.0),
        }
    }

    pub fn classify(&self, elevation: f64) -> Terrain {
        if elevation < self.water {
            Terrain::Water
        } else if elevation >= self.mountain {
            Terrain::Mountain
        } else if elevation >= self.hills {
            Terrain::Hills
        } else {
            Terrain::Plains
        }
    }
}

pub struct GeneratedTerrain {
    pub map: HexMap,
    /// Land reachable on foot from `start`, plus the mountains bordering it.
    pub accessible: BTreeSet<Coord>,
    pub start: Coord,
}

pub struct TerrainGenerator {
    radius: i32,
    hazard_budget: u32,
    params: TerrainParams,
}

impl TerrainGenerator {
    pub fn new(radius: i32, hazard_budget: u32) -> Result<Self, RealmError> {
        if !(MIN_MAP_RADIUS..=MAX_MAP_RADIUS).contains(&radius) {
            return Err(RealmError::InvalidRadius(radius));
        }
        Ok(Self {
            radius,
            hazard_budget,
            params: TerrainParams::default(),
        })
    }

    pub fn with_params(mut self, params: TerrainParams) -> Self {
        self.params = params;
        self
    }

    pub fn generate(&self, rng: &mut impl Rng) -> Result<GeneratedTerrain, RealmError> {
        let heightmap = diamond_square(self.params.heightmap_size, self.params.roughness, rng);
        let mut map = self.shape(&heightmap);
        let start = best_starting_hex(&map, false).ok_or(RealmError::NoStartingSite)?;
        let accessible = accessible_from(&map, start);
        place_resources(&mut map, &accessible, rng);
        place_danger_points(&mut map, &accessible, self.hazard_budget, rng);
        debug!(
            radius = self.radius,
            hexes = map.len(),
            accessible = accessible.len(),
            start = %start,
            "terrain generated"
        );
        Ok(GeneratedTerrain {
            map,
            accessible,
            start,
        })
    }

    fn shape(&self, heightmap: &Heightmap) -> HexMap {
        let radius = self.radius;
        let mut map = HexMap::new(radius);
        let mut inner = Vec::new();
        for coord in Coord::ORIGIN.within(radius) {
            let elevation = heightmap.sample(coord, radius);
            let mut hex = Hex::new(coord, Terrain::Water, elevation);
            hex.is_edge = coord.distance(Coord::ORIGIN) >= radius - 1;
            if !hex.is_edge {
                inner.push(elevation);
            }
            map.insert(hex);
        }

        let thresholds = BiomeThresholds::from_elevations(inner);
        for hex in map.hexes_mut() {
            hex.terrain = if hex.is_edge {
                Terrain::Water
            } else {
                thresholds.classify(hex.elevation)
            };
        }
        map
    }
}

fn starting_score(map: &HexMap, hex: &Hex, count_resources: bool) -> Option<i32> {
    if hex.terrain != Terrain::Plains
        || (count_resources && (hex.danger_point.is_some() || hex.resource.is_some()))
    {
        return None;
    }
    let radius = map.radius();
    let distance = hex.coord.distance(Coord::ORIGIN);
    if f64::from(distance) > f64::from(radius) * START_REACH {
        return None;
    }
    let mut score = (radius - distance) * 2;
    for n in hex.coord.neighbors() {
        let Some(neighbour) = map.get(n) else {
            continue;
        };
        if neighbour.terrain == Terrain::Plains {
            score += 1;
        }
        if count_resources && neighbour.resource.is_some() {
            score += 5;
        }
    }
    Some(score)
}

fn best_starting_hex(map: &HexMap, count_resources: bool) -> Option<Coord> {
    let mut best: Option<(i32, Coord)> = None;
    for hex in map.hexes() {
        let Some(score) = starting_score(map, hex, count_resources) else {
            continue;
        };
        if best.map_or(true, |(top, _)| score > top) {
            best = Some((score, hex.coord));
        }
    }
    best.map(|(_, coord)| coord)
}

/// Where the first camp goes once resources and hazards are on the map:
/// central plains, keeping clear of danger points, drawn toward resources.
pub fn find_starting_location(map: &HexMap) -> Option<Coord> {
    best_starting_hex(map, true)
}

/// Breadth-first walk over plains and hills from `start`, then every
/// mountain touching the walked land.
pub fn accessible_from(map: &HexMap, start: Coord) -> BTreeSet<Coord> {
    let mut accessible = BTreeSet::from([start]);
    let mut queue = VecDeque::from([start]);
    while let Some(current) = queue.pop_front() {
        for n in current.neighbors() {
            if accessible.contains(&n) {
                continue;
            }
            if map.terrain(n).is_some_and(Terrain::is_open) {
                accessible.insert(n);
                queue.push_back(n);
            }
        }
    }

    let mountains: Vec<Coord> = accessible
        .iter()
        .flat_map(|c| c.neighbors())
        .filter(|n| map.terrain(*n) == Some(Terrain::Mountain))
        .collect();
    accessible.extend(mountains);
    accessible
}

fn accessible_of(map: &HexMap, accessible: &BTreeSet<Coord>, terrain: Terrain) -> Vec<Coord> {
    accessible
        .iter()
        .copied()
        .filter(|c| map.terrain(*c) == Some(terrain))
        .collect()
}

/// Quarries on hills, forests on plains, then gold anywhere accessible
/// that is still free, mountains included.
pub fn place_resources(map: &mut HexMap, accessible: &BTreeSet<Coord>, rng: &mut impl Rng) {
    let mut plains = accessible_of(map, accessible, Terrain::Plains);
    let mut hills = accessible_of(map, accessible, Terrain::Hills);
    let mut mountains = accessible_of(map, accessible, Terrain::Mountain);
    rng.shuffle(&mut plains);
    rng.shuffle(&mut hills);
    rng.shuffle(&mut mountains);

    let quarries = QUARRY_COUNT.min(hills.len());
    let forests = FOREST_COUNT.min(plains.len());
    let mut assign = |coords: &[Coord], kind: ResourceKind| {
        for coord in coords {
            if let Some(hex) = map.get_mut(*coord) {
                hex.resource = Some(kind);
            }
        }
    };
    assign(&hills[..quarries], ResourceKind::Quarry);
    assign(&plains[..forests], ResourceKind::Forest);

    let mut gold: Vec<Coord> = plains[forests..]
        .iter()
        .chain(&hills[quarries..])
        .chain(&mountains)
        .copied()
        .collect();
    rng.shuffle(&mut gold);
    gold.truncate(GOLD_COUNT);
    assign(&gold, ResourceKind::GoldDeposit);
}

/// Split `total` into `parts` pieces of at least one each, dealing the rest
/// out one point at a time.
pub fn distribute_randomly(total: u32, parts: usize, rng: &mut impl Rng) -> Vec<u32> {
    if parts == 0 {
        return Vec::new();
    }
    let mut result = vec![1u32; parts];
    let mut remaining = total.saturating_sub(parts as u32);
    while remaining > 0 {
        let index = rng.gen_range(0..parts);
        result[index] += 1;
        remaining -= 1;
    }
    rng.shuffle(&mut result);
    result
}

/// Three to six danger points on the outer rings, drawn from accessible
/// plains and hills, their strengths sharing the hazard budget.
pub fn place_danger_points(
    map: &mut HexMap,
    accessible: &BTreeSet<Coord>,
    budget: u32,
    rng: &mut impl Rng,
) {
    let count = rng.int(3, 6) as usize;
    let sizes = distribute_randomly(budget, count, rng);

    let radius = map.radius();
    let mut sites: Vec<Coord> = map
        .hexes()
        .filter(|h| h.coord.distance(Coord::ORIGIN) >= radius - 2)
        .filter(|h| h.terrain.is_open() && accessible.contains(&h.coord))
        .map(|h| h.coord)
        .collect();
    rng.shuffle(&mut sites);

    for (coord, size) in sites.into_iter().zip(sizes) {
        let strength = size.min(u32::from(MAX_DANGER_STRENGTH)) as u8;
        let countdown = rng.int(1, rules::spawn_rate(strength));
        if let Some(hex) = map.get_mut(coord) {
            hex.danger_point = Some(DangerPoint {
                strength,
                turns_until_spawn: f64::from(countdown),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn generate(seed: u64, radius: i32) -> GeneratedTerrain {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        TerrainGenerator::new(radius, 15)
            .unwrap()
            .generate(&mut rng)
            .unwrap()
    }

    #[test]
    fn heightmap_is_normalised() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let map = diamond_square(33, 0.55, &mut rng);
        let cells: Vec<f64> = (0..33)
            .flat_map(|y| (0..33).map(move |x| (x, y)))
            .map(|(x, y)| map.get(x, y))
            .collect();
        let min = cells.iter().copied().fold(f64::INFINITY, f64::min);
        let max = cells.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(min, 0.0);
        assert!((max - 100.0).abs() < 1e-9);
    }

    #[test]
    fn outer_rings_are_ocean() {
        for seed in 0..5 {
            let terrain = generate(seed, 12);
            for hex in terrain.map.hexes() {
                if hex.coord.distance(Coord::ORIGIN) >= 11 {
                    assert!(hex.is_edge);
                    assert_eq!(hex.terrain, Terrain::Water, "{}", hex.coord);
                }
            }
        }
    }

    #[test]
    fn inner_biomes_follow_their_percentiles() {
        let plains_share = 1.0 - WATER_SHARE - (1.0 - HILLS_FROM);
        let targets = [
            (Terrain::Water, WATER_SHARE),
            (Terrain::Plains, plains_share),
            (Terrain::Hills, MOUNTAIN_FROM - HILLS_FROM),
            (Terrain::Mountain, 1.0 - MOUNTAIN_FROM),
        ];
        for radius in [8, 12, 20] {
            for seed in 0..5 {
                let terrain = generate(seed, radius);
                let inner: Vec<&Hex> = terrain.map.hexes().filter(|h| !h.is_edge).collect();
                let n = inner.len() as f64;
                for (kind, share) in targets {
                    let count = inner.iter().filter(|h| h.terrain == kind).count() as f64;
                    assert!(
                        (count - n * share).abs() <= 2.0,
                        "radius {radius} seed {seed}: {kind:?} {count} of {n}, want {share}"
                    );
                }
            }
        }
    }

    #[test]
    fn start_is_central_plains_and_accessible() {
        let terrain = generate(3, 12);
        assert_eq!(terrain.map.terrain(terrain.start), Some(Terrain::Plains));
        assert!(f64::from(terrain.start.distance(Coord::ORIGIN)) <= 12.0 * START_REACH);
        assert!(terrain.accessible.contains(&terrain.start));
        for coord in &terrain.accessible {
            assert!(terrain.map.terrain(*coord).is_some_and(Terrain::is_land));
        }
    }

    #[test]
    fn resources_and_hazards_stay_in_reach() {
        for seed in 0..5 {
            let terrain = generate(seed, 12);
            let mut resources = 0;
            let mut hazard_total = 0;
            for hex in terrain.map.hexes() {
                if let Some(kind) = hex.resource {
                    resources += 1;
                    assert!(terrain.accessible.contains(&hex.coord));
                    match kind {
                        ResourceKind::Quarry => assert_eq!(hex.terrain, Terrain::Hills),
                        ResourceKind::Forest => assert_eq!(hex.terrain, Terrain::Plains),
                        ResourceKind::GoldDeposit => assert!(hex.terrain.is_land()),
                    }
                }
                if let Some(point) = hex.danger_point {
                    hazard_total += u32::from(point.strength);
                    assert!(hex.terrain.is_open());
                    assert!(!hex.is_edge);
                    assert!((1..=MAX_DANGER_STRENGTH).contains(&point.strength));
                    assert!(point.turns_until_spawn >= 1.0);
                }
            }
            assert!(resources <= QUARRY_COUNT + FOREST_COUNT + GOLD_COUNT);
            assert!(hazard_total <= 15);
        }
    }

    #[test]
    fn distribution_keeps_the_total_and_the_floor() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        for parts in 1..=6 {
            let pieces = distribute_randomly(15, parts, &mut rng);
            assert_eq!(pieces.len(), parts);
            assert_eq!(pieces.iter().sum::<u32>(), 15);
            assert!(pieces.iter().all(|p| *p >= 1));
        }
        assert!(distribute_randomly(15, 0, &mut rng).is_empty());
    }

    #[test]
    fn radius_out_of_range_is_rejected() {
        assert!(matches!(
            TerrainGenerator::new(2, 15),
            Err(RealmError::InvalidRadius(2))
        ));
    }

    #[test]
    fn same_seed_same_world() {
        let a = generate(77, 10);
        let b = generate(77, 10);
        assert_eq!(a.start, b.start);
        let terrains = |t: &GeneratedTerrain| -> Vec<Terrain> {
            t.map.hexes().map(|h| h.terrain).collect()
        };
        assert_eq!(terrains(&a), terrains(&b));
    }
}
