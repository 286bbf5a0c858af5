//! Fixed-size charger pool

use chargepool_util::{ChargeError, ChargeResult, ChargerIndex, MAX_SLOTS};

/// State a pool slot can be reset to
pub trait SlotState: Clone + Default {
    /// True when nobody holds the slot
    fn is_empty(&self) -> bool;
}

/// Ordered pool of exactly `N` slots. The index is the charger identity.
///
/// Slot mutation is crate-private: only the lifecycles change slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePool<S> {
    slots: Vec<S>,
}

impl<S: SlotState> ResourcePool<S> {
    /// Create `count` empty slots. `count` must be in `1..MAX_SLOTS`.
    pub fn new(count: usize) -> ChargeResult<Self> {
        if count == 0 || count >= MAX_SLOTS {
            return Err(ChargeError::InvalidResourceCount(count));
        }
        Ok(Self {
            slots: vec![S::default(); count],
        })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, index: ChargerIndex) -> ChargeResult<&S> {
        let count = self.slots.len();
        self.slots
            .get(index)
            .ok_or(ChargeError::InvalidIndex { index, count })
    }

    pub(crate) fn get_mut(&mut self, index: ChargerIndex) -> ChargeResult<&mut S> {
        let count = self.slots.len();
        self.slots
            .get_mut(index)
            .ok_or(ChargeError::InvalidIndex { index, count })
    }

    pub(crate) fn reset(&mut self, index: ChargerIndex) -> ChargeResult<()> {
        *self.get_mut(index)? = S::default();
        Ok(())
    }

    /// Lowest index whose slot is empty
    pub fn first_empty(&self) -> Option<ChargerIndex> {
        self.slots.iter().position(S::is_empty)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ChargerIndex, &S)> {
        self.slots.iter().enumerate()
    }
}
