//! Environment sectors (grass and water)
//!
//! Sectors are axis-aligned rectangles generated in clusters at world init.
//! Grass depletes when grazed and slowly regrows; water never depletes.
//! All distance queries go through `WorldBounds` so they honor wrap-around.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::config::EnvironmentConfig;
use crate::core::types::Vec2;
use crate::spatial::bounds::WorldBounds;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectorKind {
    Grass,
    Water,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Terrain {
    /// Density 0.0 (bare) to max density
    Grass { density: f32 },
    Water { depth: f32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sector {
    /// Minimum corner
    pub origin: Vec2,
    pub width: f32,
    pub height: f32,
    pub terrain: Terrain,
}

impl Sector {
    pub fn grass(origin: Vec2, width: f32, height: f32, density: f32) -> Self {
        Self { origin, width, height, terrain: Terrain::Grass { density } }
    }

    pub fn water(origin: Vec2, width: f32, height: f32, depth: f32) -> Self {
        Self { origin, width, height, terrain: Terrain::Water { depth } }
    }

    pub fn kind(&self) -> SectorKind {
        match self.terrain {
            Terrain::Grass { .. } => SectorKind::Grass,
            Terrain::Water { .. } => SectorKind::Water,
        }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.origin.x + self.width / 2.0, self.origin.y + self.height / 2.0)
    }

    /// Grass density, zero for water
    pub fn density(&self) -> f32 {
        match self.terrain {
            Terrain::Grass { density } => density,
            Terrain::Water { .. } => 0.0,
        }
    }

    /// Whether the sector currently offers anything to consume
    pub fn is_available(&self) -> bool {
        match self.terrain {
            Terrain::Grass { density } => density > 0.0,
            Terrain::Water { .. } => true,
        }
    }

    /// Distance from `pos` to the nearest point of the rectangle
    pub fn distance_to(&self, pos: Vec2, bounds: &WorldBounds) -> f32 {
        let d = bounds.delta(pos, self.center());
        let dx = (d.x.abs() - self.width / 2.0).max(0.0);
        let dy = (d.y.abs() - self.height / 2.0).max(0.0);
        (dx * dx + dy * dy).sqrt()
    }

    /// Circle/rectangle overlap test for an entity footprint
    pub fn overlaps(&self, pos: Vec2, radius: f32, bounds: &WorldBounds) -> bool {
        self.distance_to(pos, bounds) <= radius
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub sectors: Vec<Sector>,
}

impl Environment {
    pub fn new(sectors: Vec<Sector>) -> Self {
        Self { sectors }
    }

    /// Scatter grass and water clusters across the world
    pub fn generate<R: Rng>(config: &EnvironmentConfig, bounds: &WorldBounds, rng: &mut R) -> Self {
        let mut sectors = Vec::new();
        let clusters = std::iter::repeat(SectorKind::Grass)
            .take(config.grass_clusters as usize)
            .chain(std::iter::repeat(SectorKind::Water).take(config.water_clusters as usize));

        for kind in clusters {
            let center = bounds.random_point(rng);
            for _ in 0..config.sectors_per_cluster {
                let width = rng.gen_range(config.sector_min_size..=config.sector_max_size);
                let height = rng.gen_range(config.sector_min_size..=config.sector_max_size);
                let offset = Vec2::new(
                    rng.gen_range(-config.cluster_spread..=config.cluster_spread),
                    rng.gen_range(-config.cluster_spread..=config.cluster_spread),
                );
                let width = width.min(bounds.width);
                let height = height.min(bounds.height);
                let origin = Vec2::new(
                    (center.x + offset.x - width / 2.0).clamp(0.0, bounds.width - width),
                    (center.y + offset.y - height / 2.0).clamp(0.0, bounds.height - height),
                );
                let sector = match kind {
                    SectorKind::Grass => {
                        Sector::grass(origin, width, height, config.grass_max_density)
                    }
                    SectorKind::Water => {
                        let depth = rng.gen_range(config.water_min_depth..=config.water_max_depth);
                        Sector::water(origin, width, height, depth)
                    }
                };
                sectors.push(sector);
            }
        }

        tracing::debug!("generated {} environment sectors", sectors.len());
        Self { sectors }
    }

    pub fn get(&self, index: usize) -> Option<&Sector> {
        self.sectors.get(index)
    }

    /// First available sector of `kind` overlapping the footprint
    pub fn overlapping(
        &self,
        kind: SectorKind,
        pos: Vec2,
        radius: f32,
        bounds: &WorldBounds,
    ) -> Option<usize> {
        self.sectors
            .iter()
            .position(|s| s.kind() == kind && s.is_available() && s.overlaps(pos, radius, bounds))
    }

    /// Nearest available sector of `kind` and its distance
    pub fn nearest(&self, kind: SectorKind, pos: Vec2, bounds: &WorldBounds) -> Option<(usize, f32)> {
        self.sectors
            .iter()
            .enumerate()
            .filter(|(_, s)| s.kind() == kind && s.is_available())
            .map(|(i, s)| (i, s.distance_to(pos, bounds)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Remove up to `amount` grass density, returning what was removed
    pub fn graze(&mut self, index: usize, amount: f32) -> f32 {
        match self.sectors.get_mut(index).map(|s| &mut s.terrain) {
            Some(Terrain::Grass { density }) => {
                let taken = amount.max(0.0).min(*density);
                *density -= taken;
                taken
            }
            _ => 0.0,
        }
    }

    /// Passive regrowth of grass
    pub fn regenerate(&mut self, config: &EnvironmentConfig, dt: f32) {
        for sector in &mut self.sectors {
            if let Terrain::Grass { density } = &mut sector.terrain {
                *density = (*density + config.grass_regen_per_sec * dt).min(config.grass_max_density);
            }
        }
    }
}
