//! Shared world state and the mutation protocol executed under the global lock.

use crate::grid::Grid;
use parking_lot::Mutex;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use wildgrid_core::{
    AnimalId, AnimalStatus, Error, HunterId, Location, Result, SimConfig, Species, Terrain,
};

/// State of one animal; mutated only under the world lock
#[derive(Debug, Clone)]
pub struct AnimalRecord {
    pub species: Species,
    pub status: AnimalStatus,
    pub location: Location,
}

/// State of one hunter; points only increase
#[derive(Debug, Clone)]
pub struct HunterRecord {
    pub points: u32,
    pub location: Location,
}

struct WorldState {
    grid: Grid,
    animals: HashMap<AnimalId, AnimalRecord>,
    hunters: HashMap<HunterId, HunterRecord>,
}

/// The one shared mutable resource of the simulation.
///
/// Every read-modify-write sequence that touches site membership or
/// cross-references an agent's location with a site runs entirely inside the
/// single lock, so all relocations and kill sweeps are linearized. Agent
/// tasks never sleep while holding it.
pub struct World {
    config: SimConfig,
    state: Mutex<WorldState>,
}

/// Outcome of one primary move attempt by an animal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The animal was killed by a hunter since its last look
    Dead,
    /// Candidate was off the grid; the attempt is abandoned
    OutOfBounds,
    /// The relocation committed
    Moved { to: Location, terrain: Terrain },
}

/// Outcome of a committed hunter move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strike {
    pub to: Location,
    /// Animals swept from the destination site
    pub killed: u32,
    /// The hunter's running total after this strike
    pub points: u32,
}

impl World {
    /// Build a world with randomly sampled terrain
    pub fn new(config: SimConfig, rng: &mut ChaCha8Rng) -> Self {
        let grid = Grid::from_config(&config, rng);
        Self::from_grid(config, grid)
    }

    /// Build a world around a pre-constructed grid. The grid dimensions are
    /// authoritative; `config.width`/`config.height` should match.
    pub fn from_grid(config: SimConfig, grid: Grid) -> Self {
        Self {
            config,
            state: Mutex::new(WorldState {
                grid,
                animals: HashMap::new(),
                hunters: HashMap::new(),
            }),
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Place a new animal at a uniformly random location
    pub fn spawn_animal(&self, species: Species, rng: &mut impl Rng) -> AnimalId {
        let mut state = self.state.lock();
        let location = Location::new(
            rng.gen_range(0..state.grid.width),
            rng.gen_range(0..state.grid.height),
        );
        Self::insert_animal(&mut state, species, location)
    }

    /// Place a new animal at a fixed location
    pub fn spawn_animal_at(&self, species: Species, location: Location) -> AnimalId {
        let mut state = self.state.lock();
        Self::insert_animal(&mut state, species, location)
    }

    fn insert_animal(state: &mut WorldState, species: Species, location: Location) -> AnimalId {
        let id = AnimalId::new();
        state.grid.site_mut(location).animals.insert(id);
        state.animals.insert(
            id,
            AnimalRecord {
                species,
                status: AnimalStatus::Alive,
                location,
            },
        );
        id
    }

    /// Place a new hunter at a uniformly random location
    pub fn spawn_hunter(&self, rng: &mut impl Rng) -> HunterId {
        let mut state = self.state.lock();
        let location = Location::new(
            rng.gen_range(0..state.grid.width),
            rng.gen_range(0..state.grid.height),
        );
        Self::insert_hunter(&mut state, location)
    }

    /// Place a new hunter at a fixed location
    pub fn spawn_hunter_at(&self, location: Location) -> HunterId {
        let mut state = self.state.lock();
        Self::insert_hunter(&mut state, location)
    }

    fn insert_hunter(state: &mut WorldState, location: Location) -> HunterId {
        let id = HunterId::new();
        state.grid.site_mut(location).hunters.insert(id);
        state.hunters.insert(
            id,
            HunterRecord {
                points: 0,
                location,
            },
        );
        id
    }

    pub fn animal(&self, id: AnimalId) -> Result<AnimalRecord> {
        let state = self.state.lock();
        state
            .animals
            .get(&id)
            .cloned()
            .ok_or(Error::UnknownAnimal(id))
    }

    pub fn hunter(&self, id: HunterId) -> Result<HunterRecord> {
        let state = self.state.lock();
        state
            .hunters
            .get(&id)
            .cloned()
            .ok_or(Error::UnknownHunter(id))
    }

    /// Attempt an animal's primary move by the given delta.
    ///
    /// Out-of-bounds candidates abandon the attempt; that is a normal branch,
    /// not an error. A concurrent hunter kill is reported as [`MoveOutcome::Dead`]
    /// so the caller can terminate without touching the grid again.
    pub fn step_animal(&self, id: AnimalId, dx: i32, dy: i32) -> Result<MoveOutcome> {
        let mut state = self.state.lock();
        let record = state.animals.get(&id).ok_or(Error::UnknownAnimal(id))?;
        if record.status == AnimalStatus::Dead {
            return Ok(MoveOutcome::Dead);
        }
        let from = record.location;
        let to = from.offset(dx, dy);
        if !state.grid.contains(to) {
            return Ok(MoveOutcome::OutOfBounds);
        }

        state.grid.site_mut(from).animals.remove(&id);
        state.grid.site_mut(to).animals.insert(id);
        let terrain = state.grid.site(to).terrain;
        if let Some(record) = state.animals.get_mut(&id) {
            record.location = to;
        }
        Ok(MoveOutcome::Moved { to, terrain })
    }

    /// The secondary move after landing on a feeding or nesting site: resample
    /// the delta until the candidate is in bounds, then relocate.
    ///
    /// Unlike [`World::step_animal`], this must succeed; the resampling loop
    /// always terminates because a zero delta is a valid draw. Returns `None`
    /// if the animal was killed in the meantime.
    pub fn wander_animal(
        &self,
        id: AnimalId,
        rng: &mut impl Rng,
    ) -> Result<Option<(Location, Terrain)>> {
        let mut state = self.state.lock();
        let record = state.animals.get(&id).ok_or(Error::UnknownAnimal(id))?;
        if record.status == AnimalStatus::Dead {
            return Ok(None);
        }
        let from = record.location;
        let to = loop {
            let candidate = from.offset(rng.gen_range(-1..=1), rng.gen_range(-1..=1));
            if state.grid.contains(candidate) {
                break candidate;
            }
        };

        state.grid.site_mut(from).animals.remove(&id);
        state.grid.site_mut(to).animals.insert(id);
        let terrain = state.grid.site(to).terrain;
        if let Some(record) = state.animals.get_mut(&id) {
            record.location = to;
        }
        Ok(Some((to, terrain)))
    }

    /// Wintering mortality: mark the animal dead. The record stays in its
    /// site's set; only hunter sweeps remove members.
    pub fn kill_animal(&self, id: AnimalId) -> Result<Location> {
        let mut state = self.state.lock();
        let record = state.animals.get_mut(&id).ok_or(Error::UnknownAnimal(id))?;
        record.status = AnimalStatus::Dead;
        Ok(record.location)
    }

    /// Attempt a hunter move by the given delta. In bounds, the relocation
    /// and the kill sweep of the destination site commit as one critical
    /// section: every animal present is marked dead, the site's animal set is
    /// cleared, and the count is credited to the hunter.
    pub fn strike(&self, id: HunterId, dx: i32, dy: i32) -> Result<Option<Strike>> {
        let mut state = self.state.lock();
        let record = state.hunters.get(&id).ok_or(Error::UnknownHunter(id))?;
        let from = record.location;
        let to = from.offset(dx, dy);
        if !state.grid.contains(to) {
            return Ok(None);
        }

        state.grid.site_mut(from).hunters.remove(&id);
        state.grid.site_mut(to).hunters.insert(id);

        let victims: Vec<AnimalId> = state.grid.site_mut(to).animals.drain().collect();
        for victim in &victims {
            if let Some(animal) = state.animals.get_mut(victim) {
                animal.status = AnimalStatus::Dead;
            }
        }

        let killed = victims.len() as u32;
        let record = state.hunters.get_mut(&id).ok_or(Error::UnknownHunter(id))?;
        record.points += killed;
        record.location = to;
        Ok(Some(Strike {
            to,
            killed,
            points: record.points,
        }))
    }

    /// Number of animals still alive
    pub fn alive_count(&self) -> usize {
        let state = self.state.lock();
        state
            .animals
            .values()
            .filter(|record| record.status == AnimalStatus::Alive)
            .count()
    }

    /// Consistency probe: every alive animal and every hunter is a member of
    /// exactly the one site matching its recorded location, every set member
    /// is a known agent, and the alive totals agree between the registry and
    /// the sites.
    pub fn validate(&self) -> bool {
        let state = self.state.lock();
        let mut animal_seen: HashMap<AnimalId, Vec<Location>> = HashMap::new();
        let mut hunter_seen: HashMap<HunterId, Vec<Location>> = HashMap::new();
        for (loc, site) in state.grid.iter() {
            for id in &site.animals {
                if !state.animals.contains_key(id) {
                    return false;
                }
                animal_seen.entry(*id).or_default().push(loc);
            }
            for id in &site.hunters {
                if !state.hunters.contains_key(id) {
                    return false;
                }
                hunter_seen.entry(*id).or_default().push(loc);
            }
        }

        for (id, record) in &state.animals {
            let seen = animal_seen.get(id).map(Vec::as_slice).unwrap_or(&[]);
            match record.status {
                AnimalStatus::Alive => {
                    if seen.len() != 1 || seen[0] != record.location {
                        return false;
                    }
                }
                // A corpse is in at most the site it died on
                AnimalStatus::Dead => {
                    if seen.len() > 1 || seen.iter().any(|loc| *loc != record.location) {
                        return false;
                    }
                }
            }
        }
        for (id, record) in &state.hunters {
            let seen = hunter_seen.get(id).map(Vec::as_slice).unwrap_or(&[]);
            if seen.len() != 1 || seen[0] != record.location {
                return false;
            }
        }

        let alive_in_sites = animal_seen
            .keys()
            .filter(|id| {
                state
                    .animals
                    .get(id)
                    .map(|record| record.status == AnimalStatus::Alive)
                    .unwrap_or(false)
            })
            .count();
        let alive_records = state
            .animals
            .values()
            .filter(|record| record.status == AnimalStatus::Alive)
            .count();
        alive_in_sites == alive_records
    }

    /// Capture the per-cell occupancy, atomically with respect to all moves
    pub fn snapshot(&self) -> GridSnapshot {
        let state = self.state.lock();
        let cells = state
            .grid
            .iter()
            .map(|(_, site)| {
                let mut cell = CellSnapshot {
                    terrain: site.terrain,
                    bears: 0,
                    birds: 0,
                    pandas: 0,
                    hunters: site.hunters.len() as u32,
                };
                for id in &site.animals {
                    if let Some(record) = state.animals.get(id) {
                        match record.species {
                            Species::Bear => cell.bears += 1,
                            Species::Bird => cell.birds += 1,
                            Species::Panda => cell.pandas += 1,
                        }
                    }
                }
                cell
            })
            .collect();
        GridSnapshot {
            width: state.grid.width,
            height: state.grid.height,
            cells,
        }
    }
}

/// Occupancy of one cell at snapshot time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellSnapshot {
    pub terrain: Terrain,
    pub bears: u32,
    pub birds: u32,
    pub pandas: u32,
    pub hunters: u32,
}

/// A point-in-time view of the whole grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSnapshot {
    pub width: i32,
    pub height: i32,
    pub cells: Vec<CellSnapshot>,
}

impl GridSnapshot {
    pub fn cell(&self, x: i32, y: i32) -> &CellSnapshot {
        &self.cells[(y * self.width + x) as usize]
    }
}

impl fmt::Display for GridSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..self.height {
            for x in 0..self.width {
                let cell = self.cell(x, y);
                let symbol = match cell.terrain {
                    Terrain::Feeding => 'F',
                    Terrain::Nesting => 'N',
                    Terrain::Wintering => 'W',
                };
                write!(
                    f,
                    "|{}-{{{}, {}, {}}}{{{}}}|",
                    symbol, cell.bears, cell.birds, cell.pandas, cell.hunters
                )?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn feeding_world(width: i32, height: i32) -> World {
        let config = SimConfig {
            width,
            height,
            ..Default::default()
        };
        World::from_grid(config, Grid::uniform(width, height, Terrain::Feeding))
    }

    #[test]
    fn test_spawn_inserts_membership() {
        let world = feeding_world(5, 5);
        let id = world.spawn_animal_at(Species::Bear, Location::new(2, 3));

        let record = world.animal(id).unwrap();
        assert_eq!(record.status, AnimalStatus::Alive);
        assert_eq!(record.location, Location::new(2, 3));
        assert_eq!(world.snapshot().cell(2, 3).bears, 1);
        assert!(world.validate());
    }

    #[test]
    fn test_step_moves_between_sites() {
        let world = feeding_world(5, 5);
        let id = world.spawn_animal_at(Species::Bird, Location::new(1, 1));

        let outcome = world.step_animal(id, 1, 0).unwrap();
        assert_eq!(
            outcome,
            MoveOutcome::Moved {
                to: Location::new(2, 1),
                terrain: Terrain::Feeding,
            }
        );
        assert_eq!(world.animal(id).unwrap().location, Location::new(2, 1));
        assert_eq!(world.snapshot().cell(1, 1).birds, 0);
        assert_eq!(world.snapshot().cell(2, 1).birds, 1);
        assert!(world.validate());
    }

    #[test]
    fn test_corner_underflow_abandoned() {
        let world = feeding_world(5, 5);
        let id = world.spawn_animal_at(Species::Panda, Location::new(0, 0));

        let outcome = world.step_animal(id, -1, -1).unwrap();
        assert_eq!(outcome, MoveOutcome::OutOfBounds);
        assert_eq!(world.animal(id).unwrap().location, Location::new(0, 0));
        assert!(world.validate());
    }

    #[test]
    fn test_zero_delta_is_a_valid_move() {
        let world = feeding_world(1, 1);
        let id = world.spawn_animal_at(Species::Bear, Location::new(0, 0));

        let outcome = world.step_animal(id, 0, 0).unwrap();
        assert_eq!(
            outcome,
            MoveOutcome::Moved {
                to: Location::new(0, 0),
                terrain: Terrain::Feeding,
            }
        );
        assert_eq!(world.snapshot().cell(0, 0).bears, 1);
        assert!(world.validate());
    }

    #[test]
    fn test_wander_stays_in_bounds() {
        let world = feeding_world(1, 1);
        let id = world.spawn_animal_at(Species::Bird, Location::new(0, 0));
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        // Only the zero delta is in bounds on a 1x1 grid, so resampling must
        // settle on staying put.
        let moved = world.wander_animal(id, &mut rng).unwrap();
        assert_eq!(moved, Some((Location::new(0, 0), Terrain::Feeding)));
        assert!(world.validate());
    }

    #[test]
    fn test_wander_skips_dead_animal() {
        let world = feeding_world(3, 3);
        let id = world.spawn_animal_at(Species::Bird, Location::new(1, 1));
        world.kill_animal(id).unwrap();

        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert_eq!(world.wander_animal(id, &mut rng).unwrap(), None);
        assert_eq!(world.animal(id).unwrap().location, Location::new(1, 1));
    }

    #[test]
    fn test_step_reports_dead() {
        let world = feeding_world(3, 3);
        let id = world.spawn_animal_at(Species::Bear, Location::new(1, 1));
        world.kill_animal(id).unwrap();

        assert_eq!(world.step_animal(id, 1, 0).unwrap(), MoveOutcome::Dead);
        // No grid mutation happened
        assert_eq!(world.snapshot().cell(1, 1).bears, 1);
    }

    #[test]
    fn test_wintering_corpse_stays_in_site() {
        let world = feeding_world(3, 3);
        let id = world.spawn_animal_at(Species::Panda, Location::new(2, 2));

        let loc = world.kill_animal(id).unwrap();
        assert_eq!(loc, Location::new(2, 2));
        assert_eq!(world.animal(id).unwrap().status, AnimalStatus::Dead);
        assert_eq!(world.snapshot().cell(2, 2).pandas, 1);
        assert_eq!(world.alive_count(), 0);
        assert!(world.validate());
    }

    #[test]
    fn test_strike_sweeps_destination() {
        let world = feeding_world(5, 5);
        let a = world.spawn_animal_at(Species::Bear, Location::new(2, 2));
        let b = world.spawn_animal_at(Species::Bird, Location::new(2, 2));
        let hunter = world.spawn_hunter_at(Location::new(2, 1));

        let strike = world.strike(hunter, 0, 1).unwrap().unwrap();
        assert_eq!(strike.to, Location::new(2, 2));
        assert_eq!(strike.killed, 2);
        assert_eq!(strike.points, 2);

        assert_eq!(world.animal(a).unwrap().status, AnimalStatus::Dead);
        assert_eq!(world.animal(b).unwrap().status, AnimalStatus::Dead);
        let snapshot = world.snapshot();
        let cell = snapshot.cell(2, 2);
        assert_eq!(cell.bears + cell.birds + cell.pandas, 0);
        assert_eq!(cell.hunters, 1);
        assert!(world.validate());
    }

    #[test]
    fn test_strike_empty_site_is_noop_kill() {
        let world = feeding_world(5, 5);
        let hunter = world.spawn_hunter_at(Location::new(0, 0));

        let strike = world.strike(hunter, 1, 1).unwrap().unwrap();
        assert_eq!(strike.killed, 0);
        assert_eq!(strike.points, 0);
        assert_eq!(world.hunter(hunter).unwrap().location, Location::new(1, 1));
        assert!(world.validate());
    }

    #[test]
    fn test_strike_out_of_bounds_abandoned() {
        let world = feeding_world(5, 5);
        let hunter = world.spawn_hunter_at(Location::new(0, 0));

        assert_eq!(world.strike(hunter, -1, 0).unwrap(), None);
        assert_eq!(world.hunter(hunter).unwrap().location, Location::new(0, 0));
        assert_eq!(world.hunter(hunter).unwrap().points, 0);
    }

    #[test]
    fn test_snapshot_display() {
        let world = feeding_world(2, 1);
        world.spawn_animal_at(Species::Bear, Location::new(0, 0));
        world.spawn_hunter_at(Location::new(1, 0));

        let rendered = world.snapshot().to_string();
        assert_eq!(rendered, "|F-{1, 0, 0}{0}||F-{0, 0, 0}{1}|\n");
    }

    #[test]
    fn test_unknown_agent_errors() {
        let world = feeding_world(2, 2);
        assert!(world.animal(AnimalId::new()).is_err());
        assert!(world.step_animal(AnimalId::new(), 0, 0).is_err());
        assert!(world.strike(HunterId::new(), 0, 0).is_err());
    }
}
