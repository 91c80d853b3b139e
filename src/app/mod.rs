//! Application layer: collaborator traits, budget control and the engine facade.

pub mod engine;
pub mod governor;
pub mod interfaces;

pub use engine::{Diagnostics, RenderableChunk, TerrainEngine};
pub use governor::{BudgetAdjustment, Budgets, GovernorSettings, PerformanceGovernor};
pub use interfaces::{CameraFrustumSource, TerrainHeightSource, ViewpointProvider};
