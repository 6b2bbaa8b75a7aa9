use crate::graphics::{backend::Backend, upload_buffer::UploadBuffer};

/// How many frame resources still hold stale constants for an entity.
///
/// A change re-arms the counter to the ring size instead of adding to it,
/// and every upload into a frame resource retires one stale copy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DirtyCounter(usize);

impl DirtyCounter {
    pub fn dirty(frames_in_flight: usize) -> Self {
        Self(frames_in_flight)
    }

    pub fn clean() -> Self {
        Self(0)
    }

    pub fn mark(&mut self, frames_in_flight: usize) {
        self.0 = frames_in_flight;
    }

    pub fn is_dirty(&self) -> bool {
        self.0 > 0
    }

    pub fn remaining(&self) -> usize {
        self.0
    }

    /// Retires one stale copy. Returns `false` if there was none.
    pub fn consume(&mut self) -> bool {
        if self.0 == 0 {
            return false;
        }

        self.0 -= 1;
        true
    }
}

pub trait DirtyTracked {
    type Constants: Copy;

    fn dirty_counter(&mut self) -> &mut DirtyCounter;
    fn constant_buffer_index(&self) -> usize;
    fn pack(&self) -> Self::Constants;
}

/// Copies every stale entity into `buffer` and retires one stale copy each.
/// Clean entities are skipped. Returns the number of uploads.
pub fn upload_dirty<'a, E, B>(
    entities: impl IntoIterator<Item = &'a mut E>,
    buffer: &mut UploadBuffer<E::Constants, B>,
) -> usize
where
    E: DirtyTracked + 'a,
    B: Backend,
{
    let mut uploaded = 0;

    for entity in entities {
        if !entity.dirty_counter().is_dirty() {
            continue;
        }

        let constants = entity.pack();
        buffer.copy_data(entity.constant_buffer_index(), &constants);
        entity.dirty_counter().consume();
        uploaded += 1;
    }

    uploaded
}
