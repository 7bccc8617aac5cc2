//! 2D grid of sites.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;
use wildgrid_core::{AnimalId, HunterId, Location, SimConfig, Terrain};

/// One grid cell: immutable terrain plus the agents currently on it
#[derive(Debug, Clone)]
pub struct Site {
    pub terrain: Terrain,
    pub animals: HashSet<AnimalId>,
    pub hunters: HashSet<HunterId>,
}

impl Site {
    fn new(terrain: Terrain) -> Self {
        Self {
            terrain,
            animals: HashSet::new(),
            hunters: HashSet::new(),
        }
    }
}

/// A fixed-size 2D grid, row-major
#[derive(Debug, Clone)]
pub struct Grid {
    pub width: i32,
    pub height: i32,
    sites: Vec<Site>,
}

impl Grid {
    /// Create a grid with terrain sampled per the configured cut points
    pub fn from_config(config: &SimConfig, rng: &mut ChaCha8Rng) -> Self {
        let size = (config.width * config.height) as usize;
        let mut sites = Vec::with_capacity(size);
        for _ in 0..size {
            let roll = rng.gen::<f64>();
            let terrain = if roll < config.wintering_cut {
                Terrain::Wintering
            } else if roll < config.feeding_cut {
                Terrain::Feeding
            } else {
                Terrain::Nesting
            };
            sites.push(Site::new(terrain));
        }
        Self {
            width: config.width,
            height: config.height,
            sites,
        }
    }

    /// Create a grid with every site of the same terrain
    pub fn uniform(width: i32, height: i32, terrain: Terrain) -> Self {
        let size = (width * height) as usize;
        Self {
            width,
            height,
            sites: vec![Site::new(terrain); size],
        }
    }

    pub fn contains(&self, loc: Location) -> bool {
        loc.x >= 0 && loc.x < self.width && loc.y >= 0 && loc.y < self.height
    }

    /// Site at a location; caller must have bounds-checked
    pub fn site(&self, loc: Location) -> &Site {
        &self.sites[self.index(loc)]
    }

    pub fn site_mut(&mut self, loc: Location) -> &mut Site {
        let index = self.index(loc);
        &mut self.sites[index]
    }

    /// Iterator over all sites with their locations, row-major
    pub fn iter(&self) -> impl Iterator<Item = (Location, &Site)> + '_ {
        self.sites.iter().enumerate().map(move |(i, site)| {
            let x = (i as i32) % self.width;
            let y = (i as i32) / self.width;
            (Location::new(x, y), site)
        })
    }

    fn index(&self, loc: Location) -> usize {
        (loc.y * self.width + loc.x) as usize
    }
}
