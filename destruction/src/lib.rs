pub mod bodies;
pub mod config;
pub mod constants;
pub mod data;
pub mod error;
pub mod fragmentation;
pub mod frustum;
pub mod grid;
pub mod impulse;
pub mod lifecycle;
pub mod merge;
pub mod physics;
pub mod rapier;
pub mod render;
pub mod spawner;
pub mod structure;
pub mod types;
pub mod world;

pub use bodies::{BodyKind, CollidableEntry, EntryFilter};
pub use config::Tunables;
pub use data::{BlockData, NormalizedStructure, StructureData};
pub use error::{ConfigError, SpawnError};
pub use fragmentation::{BreakOptions, FragmentationProgress, ImpulseSpec, radial_impulse};
pub use frustum::CameraView;
pub use lifecycle::LifecycleReport;
pub use merge::{MergedBox, merge};
pub use physics::{CollisionLayers, PhysicsWorld};
pub use rapier::{StaticDef, StaticShape};
pub use render::{MeshKind, RenderScene, SceneChange, SceneMesh};
pub use spawner::SpawnPlacement;
pub use structure::{BlockEntry, DynamicState, Fragment, Structure, StructureState};
pub use types::{FragmentId, MaterialKey, MeshId, Rgb, StructureId, Vec3};
pub use world::{DestructionWorld, TickReport};
