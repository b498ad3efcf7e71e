use std::ptr::NonNull;

/// A non-null pointer to a slice that may be shared across worker threads.
///
/// Used by the update kernel to let every unit write into the shared weight and momentum buffers.
/// Writes through it are only sound as long as no two threads touch the same index.
#[derive(Debug)]
pub struct SlicePtr<T> {
    pub ptr: NonNull<T>,
    pub len: usize,
}

// Safety: `SlicePtr` only hands out element accesses through unsafe methods whose contracts
// require disjoint indices between threads.
unsafe impl<T: Send> Send for SlicePtr<T> {}
unsafe impl<T: Send + Sync> Sync for SlicePtr<T> {}

impl<T> Eq for SlicePtr<T> {}

impl<T> PartialEq for SlicePtr<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr == other.ptr && self.len == other.len
    }
}

impl<T> Clone for SlicePtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for SlicePtr<T> {}

impl<T> SlicePtr<T> {
    pub fn from_mut(slice: &mut [T]) -> Self {
        let len = slice.len();
        Self {
            ptr: NonNull::from(slice).cast(),
            len,
        }
    }

    pub fn from_ref(slice: &[T]) -> Self {
        Self {
            ptr: NonNull::from(slice).cast(),
            len: slice.len(),
        }
    }

    /// A pointer to the sub-slice starting at `offset`.
    ///
    /// # Safety
    ///
    /// - `self` must point to an allocation of at least `self.len` elements
    /// - `offset` must not be greater than `self.len`
    #[inline(always)]
    pub unsafe fn offset(self, offset: usize) -> Self {
        debug_assert!(offset <= self.len);
        Self {
            ptr: unsafe { self.ptr.add(offset) },
            len: self.len - offset,
        }
    }

    /// # Safety
    ///
    /// - `index` must be smaller than `self.len`
    /// - no other thread may be writing to `index` at the same time
    #[inline(always)]
    pub unsafe fn read(self, index: usize) -> T
    where
        T: Copy,
    {
        debug_assert!(index < self.len);
        unsafe { self.ptr.add(index).read() }
    }

    /// # Safety
    ///
    /// - `index` must be smaller than `self.len`
    /// - no other thread may be reading or writing `index` at the same time
    /// - the pointee must have been derived from a `&mut` borrow that is still live
    #[inline(always)]
    pub unsafe fn write(self, index: usize, value: T) {
        debug_assert!(index < self.len);
        unsafe { self.ptr.add(index).write(value) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_addresses_the_tail() {
        let mut data = [1.0f32, 2.0, 3.0, 4.0];
        let ptr = SlicePtr::from_mut(&mut data[..]);
        let tail = unsafe { ptr.offset(1) };
        assert_eq!(tail.len, 3);
        unsafe {
            assert_eq!(tail.read(0), 2.0);
            tail.write(2, 5.0);
        }
        let end = unsafe { ptr.offset(4) };
        assert_eq!(end.len, 0);
        assert_eq!(data, [1.0, 2.0, 3.0, 5.0]);
    }

    #[test]
    fn copies_compare_equal() {
        let data = [0u8; 3];
        let a = SlicePtr::from_ref(&data[..]);
        let b = a;
        assert_eq!(a, b);
        assert_ne!(a, unsafe { a.offset(1) });
    }
}
