//! Deferred force application.
//!
//! Two queues live here:
//! - [`ImpulseBatcher`]: rate-limited "pull toward a point" impulses with at
//!   most one pending entry per body. Repeated requests for the same body keep
//!   the strongest magnitude instead of stacking.
//! - [`DelayedImpulses`]: fixed impulse vectors due at a given world time,
//!   serviced by the frame loop in due-time order.
//!
//! Both check body liveness right before touching the physics world.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::time::Duration;

use rapier3d::prelude::RigidBodyHandle;

use crate::physics::PhysicsWorld;
use crate::types::{Point3, Vec3};

/// Scale `v` down so its length does not exceed `max`.
#[inline]
pub fn clamp_magnitude(v: Vec3, max: f32) -> Vec3 {
    let len = v.norm();
    if len > max && len > 0.0 {
        v * (max / len)
    } else {
        v
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PendingImpulse {
    pub body: RigidBodyHandle,
    pub magnitude: f32,
    pub source: Vec3,
}

pub struct ImpulseBatcher {
    /// Live entries, each tagged with the ticket of its slot in `order`.
    pending: HashMap<RigidBodyHandle, (u64, PendingImpulse)>,
    /// Request order. Slots whose ticket no longer matches `pending` are
    /// stale and skipped.
    order: VecDeque<(RigidBodyHandle, u64)>,
    next_ticket: u64,
    capacity: usize,
    max_magnitude: f32,
}

impl ImpulseBatcher {
    pub fn new(capacity: usize, max_magnitude: f32) -> Self {
        Self {
            pending: HashMap::new(),
            order: VecDeque::new(),
            next_ticket: 0,
            capacity: capacity.max(1),
            max_magnitude,
        }
    }

    /// Request a pull of `magnitude` on `body` toward `source`.
    ///
    /// A body already queued keeps its place; its magnitude becomes the max of
    /// both requests and its source is replaced. When full, the oldest entry
    /// is evicted.
    pub fn queue(&mut self, body: RigidBodyHandle, magnitude: f32, source: Vec3) {
        if let Some((_, existing)) = self.pending.get_mut(&body) {
            existing.magnitude = existing.magnitude.max(magnitude);
            existing.source = source;
            return;
        }

        while self.pending.len() >= self.capacity {
            if self.pop_oldest().is_none() {
                break;
            }
        }

        self.next_ticket += 1;
        let ticket = self.next_ticket;
        self.pending.insert(
            body,
            (
                ticket,
                PendingImpulse {
                    body,
                    magnitude,
                    source,
                },
            ),
        );
        self.order.push_back((body, ticket));
    }

    /// Remove and return the oldest live entry, dropping stale slots on the way.
    fn pop_oldest(&mut self) -> Option<PendingImpulse> {
        while let Some((body, ticket)) = self.order.pop_front() {
            match self.pending.get(&body) {
                Some(&(live, _)) if live == ticket => {
                    return self.pending.remove(&body).map(|(_, entry)| entry);
                }
                _ => continue,
            }
        }
        None
    }

    /// Apply up to `count` pending impulses in request order.
    ///
    /// Returns how many were actually applied; entries for vanished bodies or
    /// with no usable direction are consumed without effect.
    pub fn drain(&mut self, physics: &mut PhysicsWorld, count: usize) -> usize {
        let mut applied = 0;
        for _ in 0..count {
            let Some(entry) = self.pop_oldest() else {
                break;
            };
            let Some(position) = physics.translation(entry.body) else {
                continue;
            };
            let Some(dir) = (entry.source - position).try_normalize(1.0e-6) else {
                continue;
            };
            let magnitude = entry.magnitude.min(self.max_magnitude);
            if physics.apply_impulse(entry.body, dir * magnitude, None) {
                applied += 1;
            }
        }
        applied
    }

    pub fn get(&self, body: RigidBodyHandle) -> Option<&PendingImpulse> {
        self.pending.get(&body).map(|(_, entry)| entry)
    }

    /// Drop the pending entry for `body`. Its slot in the order goes stale and
    /// is skipped later; the order is compacted once stale slots dominate.
    pub fn remove(&mut self, body: RigidBodyHandle) {
        if self.pending.remove(&body).is_some() && self.order.len() > 2 * self.pending.len() + 64 {
            let pending = &self.pending;
            self.order
                .retain(|(b, t)| pending.get(b).is_some_and(|&(live, _)| live == *t));
        }
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.order.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct DelayedImpulse {
    pub body: RigidBodyHandle,
    pub impulse: Vec3,
    pub point: Option<Point3>,
    pub due: Duration,
    seq: u64,
}

impl PartialEq for DelayedImpulse {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for DelayedImpulse {}

impl PartialOrd for DelayedImpulse {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DelayedImpulse {
    // Reversed so the max-heap pops the earliest due time first; ties go to
    // the earlier schedule call.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Impulses waiting for their due time.
#[derive(Default)]
pub struct DelayedImpulses {
    heap: BinaryHeap<DelayedImpulse>,
    next_seq: u64,
}

impl DelayedImpulses {
    pub fn schedule(
        &mut self,
        body: RigidBodyHandle,
        impulse: Vec3,
        point: Option<Point3>,
        due: Duration,
    ) {
        self.next_seq += 1;
        self.heap.push(DelayedImpulse {
            body,
            impulse,
            point,
            due,
            seq: self.next_seq,
        });
    }

    /// Pop the earliest entry if it is due at `now`.
    pub fn pop_due(&mut self, now: Duration) -> Option<DelayedImpulse> {
        if self.heap.peek()?.due <= now {
            self.heap.pop()
        } else {
            None
        }
    }

    /// Apply every entry due at `now`; returns how many reached a live body.
    pub fn apply_due(&mut self, physics: &mut PhysicsWorld, now: Duration) -> usize {
        let mut applied = 0;
        while let Some(entry) = self.pop_due(now) {
            if physics.apply_impulse(entry.body, entry.impulse, entry.point) {
                applied += 1;
            }
        }
        applied
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
