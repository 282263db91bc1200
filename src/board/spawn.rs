//! Weighted tile spawning.

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use std::collections::BTreeMap;

use super::types::TileType;
use crate::error::LevelError;

/// Spawn probability per tile kind. Only kinds present with a positive weight spawn.
pub type TileWeights = BTreeMap<TileType, f64>;

/// Samples tile kinds according to a weight map.
#[derive(Debug, Clone)]
pub struct TileSampler {
    kinds: Vec<TileType>,
    weights: Vec<f64>,
    index: WeightedIndex<f64>,
}

impl TileSampler {
    pub fn new(weights: &TileWeights) -> Result<Self, LevelError> {
        let (kinds, values): (Vec<TileType>, Vec<f64>) = weights
            .iter()
            .filter(|(_, w)| w.is_finite() && **w > 0.0)
            .map(|(k, w)| (*k, *w))
            .unzip();
        if kinds.len() < 3 {
            return Err(LevelError::InvalidTileWeights(format!(
                "need at least 3 spawnable kinds, got {}",
                kinds.len()
            )));
        }
        let index = WeightedIndex::new(&values)
            .map_err(|e| LevelError::InvalidTileWeights(e.to_string()))?;
        Ok(Self {
            kinds,
            weights: values,
            index,
        })
    }

    /// Kinds this sampler can produce.
    pub fn kinds(&self) -> &[TileType] {
        &self.kinds
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> TileType {
        self.kinds[self.index.sample(rng)]
    }

    /// Sample a kind other than `excluded`. Falls back to a uniform pick of the
    /// remaining kinds if re-weighting fails.
    pub fn sample_excluding<R: Rng>(&self, rng: &mut R, excluded: TileType) -> TileType {
        let (kinds, weights): (Vec<TileType>, Vec<f64>) = self
            .kinds
            .iter()
            .zip(&self.weights)
            .filter(|(k, _)| **k != excluded)
            .map(|(k, w)| (*k, *w))
            .unzip();
        match WeightedIndex::new(&weights) {
            Ok(index) => kinds[index.sample(rng)],
            Err(_) => kinds[rng.gen_range(0..kinds.len())],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn uniform(kinds: &[TileType]) -> TileWeights {
        kinds.iter().map(|k| (*k, 1.0)).collect()
    }

    #[test]
    fn test_rejects_too_few_kinds() {
        let weights = uniform(&[TileType::Leaf, TileType::Berry]);
        assert!(matches!(
            TileSampler::new(&weights),
            Err(LevelError::InvalidTileWeights(_))
        ));
    }

    #[test]
    fn test_zero_weight_kinds_never_spawn() {
        let mut weights = uniform(&TileType::ALL[..4]);
        weights.insert(TileType::Pebble, 0.0);
        let sampler = TileSampler::new(&weights).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..500 {
            assert_ne!(sampler.sample(&mut rng), TileType::Pebble);
        }
    }

    #[test]
    fn test_sample_excluding() {
        let sampler = TileSampler::new(&uniform(&TileType::ALL[..3])).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..200 {
            assert_ne!(sampler.sample_excluding(&mut rng, TileType::Leaf), TileType::Leaf);
        }
    }

    #[test]
    fn test_boosted_kind_spawns_more() {
        let mut weights = uniform(&TileType::ALL[..5]);
        weights.insert(TileType::Berry, 3.0);
        let sampler = TileSampler::new(&weights).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let berries = (0..2000)
            .filter(|_| sampler.sample(&mut rng) == TileType::Berry)
            .count();
        // Expected share 3/7 ≈ 0.43
        assert!(berries > 700, "berries spawned {berries} times");
    }
}
