use crate::sim::effects::TrailParticle;

/// Handle to a slot in a [`TrailPool`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TrailSlot(usize);

impl TrailSlot {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Slot arena for trail particles.
///
/// Released slots go onto a free-list and are handed out again before the arena grows.
#[derive(Debug, Default)]
pub struct TrailPool {
    slots: Vec<TrailParticle>,
    in_use: Vec<bool>,
    free: Vec<usize>,
}

impl TrailPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&mut self, trail: TrailParticle) -> TrailSlot {
        if let Some(i) = self.free.pop() {
            self.slots[i] = trail;
            self.in_use[i] = true;
            return TrailSlot(i);
        }
        self.slots.push(trail);
        self.in_use.push(true);
        TrailSlot(self.slots.len() - 1)
    }

    /// Return `slot` to the free-list. Releasing a free slot is a no-op.
    pub fn release(&mut self, slot: TrailSlot) {
        if let Some(used) = self.in_use.get_mut(slot.0)
            && *used
        {
            *used = false;
            self.free.push(slot.0);
        }
    }

    pub fn get(&self, slot: TrailSlot) -> Option<&TrailParticle> {
        match self.in_use.get(slot.0) {
            Some(true) => self.slots.get(slot.0),
            _ => None,
        }
    }

    /// Advance every live trail one tick.
    pub fn update(&mut self) {
        for (trail, used) in self.slots.iter_mut().zip(&self.in_use) {
            if *used {
                trail.update();
            }
        }
    }

    pub fn live(&self) -> impl Iterator<Item = &TrailParticle> {
        self.slots
            .iter()
            .zip(&self.in_use)
            .filter_map(|(t, used)| used.then_some(t))
    }

    pub fn live_count(&self) -> usize {
        self.in_use.iter().filter(|u| **u).count()
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/sim/pool.rs"]
mod tests;
