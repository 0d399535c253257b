//! Time-sliced conversion of static structures into debris.
//!
//! Breaking a structure does not create its fragments immediately. It tears
//! down the static form and enqueues a [`FragmentationTask`] on one shared FIFO;
//! [`DestructionWorld::process_fragmentation`] then materializes entries until
//! either the per-frame batch cap or the wall-clock budget runs out. A task
//! interrupted mid-way resumes next frame from where it stopped, since all of
//! its state lives here rather than on any caller's stack.
//!
//! Flow
//! - `Static` → `break_structure` → `Breaking` (static body and batches gone)
//! - each processed entry → one [`Fragment`]
//! - task drained → `Fragments`

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::bodies::BodyKind;
use crate::physics::DebrisBody;
use crate::structure::{BlockEntry, DynamicState, Fragment, StructureState};
use crate::types::{FragmentId, Point3, Quat, StructureId, Vec3};
use crate::world::DestructionWorld;

/// An impulse to apply to one fragment once it exists.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImpulseSpec {
    pub vector: Vec3,
    /// World-space application point; the center of mass when `None`.
    pub point: Option<Point3>,
    pub delay: Option<Duration>,
}

pub type ComputeImpulse<'a> =
    Box<dyn FnMut(&BlockEntry) -> anyhow::Result<Option<ImpulseSpec>> + 'a>;

pub type PartCreatedHook =
    Box<dyn FnMut(&Fragment, &BlockEntry) -> anyhow::Result<()> + Send + Sync>;

/// Arguments of [`DestructionWorld::break_structure`].
#[derive(Default)]
pub struct BreakOptions<'a> {
    /// Indices into the structure's blocks; all blocks when `None`.
    pub entries: Option<Vec<usize>>,
    pub compute_impulse: Option<ComputeImpulse<'a>>,
    pub on_part_created: Option<PartCreatedHook>,
}

impl<'a> BreakOptions<'a> {
    pub fn entries(mut self, entries: Vec<usize>) -> Self {
        self.entries = Some(entries);
        self
    }

    pub fn impulse<F>(mut self, f: F) -> Self
    where
        F: FnMut(&BlockEntry) -> anyhow::Result<Option<ImpulseSpec>> + 'a,
    {
        self.compute_impulse = Some(Box::new(f));
        self
    }

    pub fn on_part_created<F>(mut self, f: F) -> Self
    where
        F: FnMut(&Fragment, &BlockEntry) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on_part_created = Some(Box::new(f));
        self
    }
}

/// Blast centered on `center`: pushes parts within `radius` away from it,
/// linearly weaker with distance, plus a constant upward `lift`.
pub fn radial_impulse(
    center: Vec3,
    radius: f32,
    force: f32,
    lift: f32,
) -> impl FnMut(&BlockEntry) -> anyhow::Result<Option<ImpulseSpec>> {
    move |entry: &BlockEntry| {
        let offset = entry.world_position - center;
        let distance = offset.norm();
        if distance > radius || distance <= 0.01 {
            return Ok(None);
        }
        let strength = force * (1.0 - distance / radius);
        let vector = offset / distance * strength + Vec3::new(0.0, lift, 0.0);
        Ok(Some(ImpulseSpec {
            vector,
            point: Some(Point3::from(entry.world_position)),
            delay: None,
        }))
    }
}

struct PendingEntry {
    entry: usize,
    impulse: Option<ImpulseSpec>,
}

pub struct FragmentationTask {
    structure: StructureId,
    pending: VecDeque<PendingEntry>,
    processed: usize,
    total: usize,
    on_part_created: Option<PartCreatedHook>,
}

impl FragmentationTask {
    #[inline]
    pub fn structure(&self) -> StructureId {
        self.structure
    }

    /// `(processed, total)` entries.
    #[inline]
    pub fn progress(&self) -> (usize, usize) {
        (self.processed, self.total)
    }
}

/// The single shared queue of fragmentation work.
#[derive(Default)]
pub struct FragmentationEngine {
    tasks: VecDeque<FragmentationTask>,
}

impl FragmentationEngine {
    fn enqueue(&mut self, task: FragmentationTask) {
        self.tasks.push_back(task);
    }

    /// Drop the queued task of `structure`, if any.
    pub fn cancel(&mut self, structure: StructureId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.structure != structure);
        self.tasks.len() != before
    }

    pub fn task(&self, structure: StructureId) -> Option<&FragmentationTask> {
        self.tasks.iter().find(|t| t.structure == structure)
    }

    #[inline]
    pub fn is_queued(&self, structure: StructureId) -> bool {
        self.task(structure).is_some()
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// What one [`DestructionWorld::process_fragmentation`] call did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FragmentationProgress {
    pub processed: usize,
    pub completed: Vec<StructureId>,
    /// Stopped on the time budget rather than the batch cap or an empty queue.
    pub budget_exhausted: bool,
}

impl DestructionWorld {
    /// Start breaking a structure, or re-push an already broken one.
    ///
    /// - Unknown or disposed ids: `None`, nothing happens.
    /// - `Breaking`/`Fragments`: never restarts. `compute_impulse`, if given,
    ///   runs once per existing fragment (with the entry's `world_position`
    ///   moved to where the fragment is now) and the results are scheduled.
    /// - `Static`: the selected entries are queued and the static collider and
    ///   batches are removed. Selecting no valid entry leaves it untouched.
    ///
    /// Callback errors are logged and count as "no impulse" for that entry.
    pub fn break_structure(
        &mut self,
        id: StructureId,
        mut options: BreakOptions<'_>,
    ) -> Option<&[Fragment]> {
        let idx = self.structure_index(id)?;

        match self.structures[idx].state {
            StructureState::Disposed => return None,
            StructureState::Breaking | StructureState::Fragments => {
                if let Some(compute) = options.compute_impulse.as_mut() {
                    self.reimpulse_fragments(idx, compute);
                }
                return Some(&self.structures[idx].fragments);
            }
            StructureState::Static => {}
        }

        let selected = select_entries(self.structures[idx].blocks.len(), options.entries.take());
        if selected.is_empty() {
            return Some(&self.structures[idx].fragments);
        }

        let pending: VecDeque<PendingEntry> = selected
            .into_iter()
            .map(|entry| {
                let block = &self.structures[idx].blocks[entry];
                let impulse = options
                    .compute_impulse
                    .as_mut()
                    .and_then(|compute| run_compute(compute, block, id));
                PendingEntry { entry, impulse }
            })
            .collect();

        let structure = &mut self.structures[idx];
        structure.state = StructureState::Breaking;
        if let Some(body) = structure.static_body.take() {
            self.bodies.remove(body);
            self.physics.remove_body(body);
        }
        for chunk in structure.chunks.drain(..) {
            for batch in chunk.batches {
                self.scene.remove(batch.mesh);
            }
        }

        log::info!(
            "breaking {id}: {} of {} blocks queued",
            pending.len(),
            structure.blocks.len()
        );

        self.fragmentation.enqueue(FragmentationTask {
            structure: id,
            total: pending.len(),
            pending,
            processed: 0,
            on_part_created: options.on_part_created.take(),
        });

        Some(&self.structures[idx].fragments)
    }

    fn reimpulse_fragments(&mut self, idx: usize, compute: &mut ComputeImpulse<'_>) {
        let structure = &self.structures[idx];
        let targets: Vec<_> = structure
            .fragments
            .iter()
            .filter_map(|f| {
                let mut entry = structure.blocks.get(f.entry)?.clone();
                entry.world_position = self.physics.translation(f.body)?;
                Some((f.body, entry))
            })
            .collect();
        let id = structure.id;
        for (body, entry) in targets {
            if let Some(spec) = run_compute(compute, &entry, id) {
                self.schedule_impulse(body, spec);
            }
        }
    }

    /// Materialize queued fragments within this frame's budget.
    pub fn process_fragmentation(&mut self) -> FragmentationProgress {
        let started = Instant::now();
        let cap = self.tunables.break_batch_size;
        let budget = self.tunables.break_time_budget;
        let mut progress = FragmentationProgress::default();

        while progress.processed < cap {
            let Some(task) = self.fragmentation.tasks.front_mut() else {
                break;
            };
            let id = task.structure;

            if let Some(next) = task.pending.pop_front() {
                task.processed += 1;
                let mut hook = task.on_part_created.take();
                let created = self.materialize(id, next, hook.as_mut());
                if let Some(task) = self.fragmentation.tasks.front_mut() {
                    task.on_part_created = hook;
                }
                if !created && self.structure_index(id).is_none() {
                    // owner vanished without cancelling; drop the rest
                    self.fragmentation.cancel(id);
                    continue;
                }
                progress.processed += 1;
            }

            let drained = self
                .fragmentation
                .tasks
                .front()
                .is_some_and(|t| t.structure == id && t.pending.is_empty());
            if drained {
                self.fragmentation.tasks.pop_front();
                self.finish_break(id);
                progress.completed.push(id);
            }

            if started.elapsed() >= budget {
                progress.budget_exhausted = !self.fragmentation.is_empty();
                break;
            }
        }
        progress
    }

    fn materialize(
        &mut self,
        id: StructureId,
        next: PendingEntry,
        hook: Option<&mut PartCreatedHook>,
    ) -> bool {
        let Some(idx) = self.structure_index(id) else {
            return false;
        };
        let cell_size = self.structures[idx].cell_size;
        let Some(entry) = self.structures[idx].blocks.get(next.entry).cloned() else {
            return false;
        };

        let geometry = self.scene.cube(cell_size);
        let material = self.scene.material(entry.material_key());
        let mesh = self
            .scene
            .add_single(geometry, material, entry.world_position, Quat::identity());

        let mass = self.tunables.fragment_mass(cell_size);
        let body = self.physics.add_debris(DebrisBody {
            position: entry.world_position,
            half_extent: cell_size * 0.5,
            mass,
            linear_damping: self.tunables.fragment_linear_damping,
            angular_damping: self.tunables.fragment_angular_damping,
        });

        let fragment_id = FragmentId(self.fragment_ids.next_raw());
        self.bodies.insert(
            body,
            BodyKind::StructurePart {
                structure: id,
                fragment: fragment_id,
            },
        );

        let fragment = Fragment {
            id: fragment_id,
            structure: id,
            mesh,
            body,
            entry: next.entry,
            spawned_at: self.now,
            state: DynamicState::Active,
            mass,
        };

        if let Some(spec) = next.impulse {
            self.schedule_impulse(body, spec);
        }
        if let Some(hook) = hook {
            if let Err(err) = hook(&fragment, &entry) {
                log::warn!("part-created hook failed for {id}: {err:#}");
            }
        }

        self.structures[idx].fragments.push(fragment);
        true
    }

    fn finish_break(&mut self, id: StructureId) {
        if let Some(idx) = self.structure_index(id) {
            let structure = &mut self.structures[idx];
            if structure.state == StructureState::Breaking {
                structure.state = StructureState::Fragments;
            }
            log::debug!("{id} fully fragmented into {} parts", structure.fragments.len());
        }
    }
}

/// Requested entries in block order, deduplicated, out-of-range dropped.
fn select_entries(block_count: usize, requested: Option<Vec<usize>>) -> Vec<usize> {
    match requested {
        None => (0..block_count).collect(),
        Some(mut list) => {
            list.retain(|&i| i < block_count);
            list.sort_unstable();
            list.dedup();
            list
        }
    }
}

fn run_compute(
    compute: &mut ComputeImpulse<'_>,
    entry: &BlockEntry,
    id: StructureId,
) -> Option<ImpulseSpec> {
    match compute(entry) {
        Ok(spec) => spec,
        Err(err) => {
            log::warn!(
                "compute_impulse failed for {id} block {:?}: {err:#}",
                entry.coord
            );
            None
        }
    }
}
