use crate::Float;
use crate::arena::ArenaError;
use crate::bvh::SplitMethod;
use std::fmt::{self, Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BvhConfig {
    /// Radius of the bounding sphere placed around every entity position.
    pub entity_radius: Float,
    /// Number of nodes per arena block.
    pub block_capacity: usize,
    pub split_method: SplitMethod,
}

impl Default for BvhConfig {
    fn default() -> Self {
        Self {
            entity_radius: 1.0,
            block_capacity: 256,
            split_method: SplitMethod::Middle,
        }
    }
}

impl BvhConfig {
    pub fn with_radius(entity_radius: Float) -> Self {
        Self { entity_radius, ..Self::default() }
    }

    /// The block capacity is checked by the arena itself when the BVH is constructed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.entity_radius.is_finite() || self.entity_radius < 0.0 {
            return Err(ConfigError::InvalidRadius(self.entity_radius));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    InvalidRadius(Float),
    Arena(ArenaError),
}

impl From<ArenaError> for ConfigError {
    fn from(e: ArenaError) -> Self {
        Self::Arena(e)
    }
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidRadius(r) => write!(f, "entity radius must be finite and >= 0, got {}", r),
            ConfigError::Arena(e) => write!(f, "invalid arena configuration: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Arena(e) => Some(e),
            _ => None,
        }
    }
}
