use std::{
    ops::{Deref, DerefMut},
    ptr::NonNull,
};

/// Hardware granularity of constant buffer views.
pub const CONSTANT_BUFFER_ALIGNMENT: usize = 256;

pub const fn align(value: usize, alignment: usize) -> usize {
    (value + (alignment - 1)) & !(alignment - 1)
}

/// Pointer into persistently mapped memory that may move across threads
/// together with its owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NonNullSend<T>(NonNull<T>);

impl<T> Deref for NonNullSend<T> {
    type Target = NonNull<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> DerefMut for NonNullSend<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

unsafe impl<T> Send for NonNullSend<T> {}

impl<T> From<NonNull<T>> for NonNullSend<T> {
    fn from(value: NonNull<T>) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::{align, CONSTANT_BUFFER_ALIGNMENT};

    #[test]
    fn align_rounds_up_to_multiple() {
        assert_eq!(align(0, CONSTANT_BUFFER_ALIGNMENT), 0);
        assert_eq!(align(1, CONSTANT_BUFFER_ALIGNMENT), 256);
        assert_eq!(align(256, CONSTANT_BUFFER_ALIGNMENT), 256);
        assert_eq!(align(257, CONSTANT_BUFFER_ALIGNMENT), 512);
        assert_eq!(align(13, 4), 16);
    }
}
