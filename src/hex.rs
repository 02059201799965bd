//! Axial hex-grid math and pathfinding.
//!
//! Pointy-top hexes addressed by axial `(q, r)`; the implicit cube
//! coordinate is `s = -q - r`.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Radius of a rendered hex in pixels.
pub const HEX_SIZE: f64 = 21.0;

pub const DIRECTIONS: [Coord; 6] = [
    Coord::new(1, 0),
    Coord::new(1, -1),
    Coord::new(0, -1),
    Coord::new(-1, 0),
    Coord::new(-1, 1),
    Coord::new(0, 1),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coord {
    pub q: i32,
    pub r: i32,
}

impl Coord {
    pub const ORIGIN: Coord = Coord::new(0, 0);

    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    pub fn s(self) -> i32 {
        -self.q - self.r
    }

    pub fn offset(self, delta: Coord) -> Coord {
        Coord::new(self.q + delta.q, self.r + delta.r)
    }

    pub fn neighbors(self) -> [Coord; 6] {
        DIRECTIONS.map(|d| self.offset(d))
    }

    pub fn distance(self, other: Coord) -> i32 {
        let dq = self.q - other.q;
        let dr = self.r - other.r;
        (dq.abs() + (dq + dr).abs() + dr.abs()) / 2
    }

    pub fn is_adjacent(self, other: Coord) -> bool {
        self.distance(other) == 1
    }

    /// Every hex within `radius` steps, centre included.
    pub fn within(self, radius: i32) -> Vec<Coord> {
        let mut out = Vec::new();
        for dq in -radius..=radius {
            let lo = (-radius).max(-dq - radius);
            let hi = radius.min(-dq + radius);
            for dr in lo..=hi {
                out.push(Coord::new(self.q + dq, self.r + dr));
            }
        }
        out
    }
}

impl std::fmt::Display for Coord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.q, self.r)
    }
}

pub fn hex_to_pixel(coord: Coord, size: f64) -> (f64, f64) {
    let q = f64::from(coord.q);
    let r = f64::from(coord.r);
    let x = size * (3f64.sqrt() * q + 3f64.sqrt() / 2.0 * r);
    let y = size * (1.5 * r);
    (x, y)
}

pub fn pixel_to_hex(x: f64, y: f64, size: f64) -> Coord {
    let q = (3f64.sqrt() / 3.0 * x - y / 3.0) / size;
    let r = (2.0 / 3.0 * y) / size;
    hex_round(q, r)
}

/// Round fractional axial coordinates, repairing whichever component drifted
/// furthest so that `q + r + s == 0` still holds.
pub fn hex_round(q: f64, r: f64) -> Coord {
    let s = -q - r;
    let mut rq = q.round();
    let mut rr = r.round();
    let rs = s.round();

    let q_diff = (rq - q).abs();
    let r_diff = (rr - r).abs();
    let s_diff = (rs - s).abs();

    if q_diff > r_diff && q_diff > s_diff {
        rq = -rr - rs;
    } else if r_diff > s_diff {
        rr = -rq - rs;
    }
    Coord::new(rq as i32, rr as i32)
}

/// Cost-weighted flood from `start`. `step_cost` returns the price of
/// entering a hex, or `None` when it cannot be entered. Hexes whose
/// cumulative cost would exceed `budget` are not expanded. The start hex is
/// not part of the result.
pub fn reachable<F>(start: Coord, budget: u32, step_cost: F) -> BTreeMap<Coord, u32>
where
    F: Fn(Coord) -> Option<u32>,
{
    let mut best: HashMap<Coord, u32> = HashMap::new();
    best.insert(start, 0);
    let mut frontier = BinaryHeap::new();
    frontier.push(Reverse((0u32, start)));

    while let Some(Reverse((spent, current))) = frontier.pop() {
        if best.get(&current).is_some_and(|&b| b < spent) {
            continue;
        }
        for next in current.neighbors() {
            let Some(cost) = step_cost(next) else {
                continue;
            };
            let total = spent + cost;
            if total > budget {
                continue;
            }
            if best.get(&next).map_or(true, |&b| total < b) {
                best.insert(next, total);
                frontier.push(Reverse((total, next)));
            }
        }
    }

    best.remove(&start);
    best.into_iter().collect()
}

/// A* search with hex distance as the heuristic. Admissible because every
/// step costs at least one. Returns the path including both endpoints.
pub fn find_path<P, C>(
    start: Coord,
    goal: Coord,
    passable: P,
    step_cost: C,
    max_cost: Option<u32>,
) -> Option<Vec<Coord>>
where
    P: Fn(Coord) -> bool,
    C: Fn(Coord) -> u32,
{
    if start == goal {
        return Some(vec![start]);
    }
    if !passable(goal) {
        return None;
    }

    let mut open = BinaryHeap::new();
    let mut g_score: HashMap<Coord, u32> = HashMap::new();
    let mut came_from: HashMap<Coord, Coord> = HashMap::new();
    let mut closed: HashSet<Coord> = HashSet::new();

    g_score.insert(start, 0);
    open.push(Reverse((start.distance(goal) as u32, 0u32, start)));

    while let Some(Reverse((_, g, current))) = open.pop() {
        if current == goal {
            let mut path = vec![current];
            let mut cursor = current;
            while let Some(&prev) = came_from.get(&cursor) {
                path.push(prev);
                cursor = prev;
            }
            path.reverse();
            return Some(path);
        }
        if !closed.insert(current) {
            continue;
        }

        for next in current.neighbors() {
            if closed.contains(&next) || !passable(next) {
                continue;
            }
            let tentative = g + step_cost(next).max(1);
            if max_cost.is_some_and(|max| tentative > max) {
                continue;
            }
            if g_score.get(&next).map_or(true, |&known| tentative < known) {
                g_score.insert(next, tentative);
                came_from.insert(next, current);
                let f = tentative + next.distance(goal) as u32;
                open.push(Reverse((f, tentative, next)));
            }
        }
    }
    None
}
