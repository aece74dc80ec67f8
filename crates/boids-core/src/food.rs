use glam::Vec3;
use serde::{Deserialize, Serialize};

/// A food source. Owned by the world and read-only during a tick.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FoodItem {
    pub position: Vec3,
    pub mass: f32,
}

impl FoodItem {
    pub fn new(position: Vec3, mass: f32) -> Self {
        Self { position, mass }
    }
}

/// Position snapshot used to rebuild the food index.
pub fn food_positions(food: &[FoodItem]) -> Vec<Vec3> {
    food.iter().map(|f| f.position).collect()
}
