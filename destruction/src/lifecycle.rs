//! Per-frame maintenance of live structures.
//!
//! Runs after the physics step so every rule sees this frame's positions:
//! cull → age → despawn → dispose.

use crate::frustum::CameraView;
use crate::structure::{DynamicState, StructureState};
use crate::types::{FragmentId, StructureId};
use crate::world::DestructionWorld;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LifecycleReport {
    pub visibility_toggles: usize,
    pub demoted: usize,
    pub despawned: usize,
    pub disposed: usize,
}

impl LifecycleReport {
    #[inline]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl DestructionWorld {
    pub fn run_lifecycle(&mut self, camera: &CameraView) -> LifecycleReport {
        let mut report = LifecycleReport {
            visibility_toggles: self.cull_chunks(camera),
            demoted: self.age_fragments(camera),
            ..Default::default()
        };
        report.despawned = self.despawn_fragments(camera);
        report.disposed = self.dispose_emptied();

        if !report.is_empty() {
            log::debug!("lifecycle: {report:?}");
        }
        report
    }

    /// Show a static chunk when it is within cull distance and in view.
    fn cull_chunks(&mut self, camera: &CameraView) -> usize {
        let cull_distance = self.tunables.cull_distance;
        let mut toggles = 0;
        for structure in self.structures.iter_mut().filter(|s| s.is_static()) {
            for chunk in &mut structure.chunks {
                let near = camera.distance_to(&chunk.centroid) - chunk.radius <= cull_distance;
                let visible = near && camera.sees_sphere(&chunk.centroid, chunk.radius);
                if visible == chunk.visible {
                    continue;
                }
                chunk.visible = visible;
                for batch in &chunk.batches {
                    self.scene.set_visible(batch.mesh, visible);
                }
                toggles += 1;
            }
        }
        toggles
    }

    /// Freeze old, distant debris. Passive fragments never wake up again.
    fn age_fragments(&mut self, camera: &CameraView) -> usize {
        let now = self.now;
        let max_age = self.tunables.fragment_active_duration;
        let sleep_distance = self.tunables.sleep_distance;
        let mut demoted = 0;
        for structure in &mut self.structures {
            for fragment in &mut structure.fragments {
                if fragment.state != DynamicState::Active || fragment.age(now) <= max_age {
                    continue;
                }
                let Some(position) = self.physics.translation(fragment.body) else {
                    continue;
                };
                if camera.distance_to(&position) <= sleep_distance {
                    continue;
                }
                if self.physics.make_passive(fragment.body) {
                    fragment.state = DynamicState::Passive;
                    self.impulses.remove(fragment.body);
                    demoted += 1;
                }
            }
        }
        demoted
    }

    fn despawn_fragments(&mut self, camera: &CameraView) -> usize {
        let now = self.now;
        let t = &self.tunables;
        let doomed: Vec<(StructureId, FragmentId)> = self
            .structures
            .iter()
            .flat_map(|s| s.fragments.iter())
            .filter(|f| {
                let Some(p) = self.physics.translation(f.body) else {
                    return true;
                };
                p.y > t.remove_height
                    || camera.distance_to(&p) > t.remove_distance
                    || f.age(now) > t.remove_timeout
            })
            .map(|f| (f.structure, f.id))
            .collect();

        doomed
            .into_iter()
            .filter(|&(structure, fragment)| self.remove_fragment(structure, fragment))
            .count()
    }

    fn dispose_emptied(&mut self) -> usize {
        let emptied: Vec<StructureId> = self
            .structures
            .iter()
            .filter(|s| s.state == StructureState::Fragments && s.fragments.is_empty())
            .map(|s| s.id)
            .collect();
        emptied
            .into_iter()
            .filter(|&id| self.dispose_structure(id))
            .count()
    }
}
