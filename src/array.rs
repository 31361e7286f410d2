use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, RwLock, RwLockReadGuard};

use crate::utils::error::{PaginatedError, Result};
use crate::utils::expect_msg::ExpectMsg;

/// A view over a shared, lock-protected `f32` buffer.
///
/// Cloning or slicing an `Array` never copies elements: every view aliases the
/// same storage, so a `copy_from` into a slice of a cached page is visible to
/// any later reader of that page.
#[derive(Clone)]
pub struct Array {
    buffer: Arc<RwLock<Vec<f32>>>,
    offset: usize,
    len: usize,
}

impl Array {
    pub fn from_vec(data: Vec<f32>) -> Self {
        let len = data.len();
        Self {
            buffer: Arc::new(RwLock::new(data)),
            offset: 0,
            len,
        }
    }

    pub fn zeros(len: usize) -> Self {
        Self::from_vec(vec![0.0; len])
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Half-open sub-range `[start, end)` of this view, aliasing the same storage.
    pub fn slice(&self, start: usize, end: usize) -> Result<Array> {
        if start > end || end > self.len {
            return Err(PaginatedError::Bounds {
                start,
                end,
                len: self.len,
            });
        }

        Ok(Self {
            buffer: Arc::clone(&self.buffer),
            offset: self.offset + start,
            len: end - start,
        })
    }

    /// Overwrite every element of this view with the elements of `src`.
    pub fn copy_from(&self, src: &Array) -> Result<()> {
        if self.len != src.len {
            return Err(PaginatedError::LengthMismatch {
                dst: self.len,
                src: src.len,
            });
        }

        if self.len == 0 {
            return Ok(());
        }

        // both views over one buffer: taking a read and a write lock would deadlock
        if self.shares_storage(src) {
            let mut guard = self
                .buffer
                .write()
                .expect_msg("Failed to acquire write lock on array data");
            guard.copy_within(src.range(), self.offset);
            return Ok(());
        }

        // never hold the source lock while waiting for our own
        let source = src.to_vec();
        let mut guard = self
            .buffer
            .write()
            .expect_msg("Failed to acquire write lock on array data");
        guard[self.range()].copy_from_slice(&source);
        Ok(())
    }

    /// Read-only access to the elements of this view.
    pub fn read_data(&self) -> ArrayReadGuard<'_> {
        ArrayReadGuard {
            guard: self
                .buffer
                .read()
                .expect_msg("Failed to acquire read lock on array data"),
            start: self.offset,
            end: self.offset + self.len,
        }
    }

    pub fn to_vec(&self) -> Vec<f32> {
        self.read_data().to_vec()
    }

    pub fn shares_storage(&self, other: &Array) -> bool {
        Arc::ptr_eq(&self.buffer, &other.buffer)
    }

    pub fn size_in_bytes(&self) -> u64 {
        (self.len * std::mem::size_of::<f32>()) as u64
    }

    fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.len
    }
}

impl From<Vec<f32>> for Array {
    fn from(data: Vec<f32>) -> Self {
        Self::from_vec(data)
    }
}

impl From<&[f32]> for Array {
    fn from(data: &[f32]) -> Self {
        Self::from_vec(data.to_vec())
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Array")
            .field("offset", &self.offset)
            .field("len", &self.len)
            .finish()
    }
}

// Wrapper for RwLockReadGuard that derefs to the viewed window only
pub struct ArrayReadGuard<'a> {
    guard: RwLockReadGuard<'a, Vec<f32>>,
    start: usize,
    end: usize,
}

impl<'a> Deref for ArrayReadGuard<'a> {
    type Target = [f32];

    fn deref(&self) -> &Self::Target {
        &self.guard[self.start..self.end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_is_half_open() {
        let array = Array::from_vec(vec![1.0, 2.0, 3.0, 4.0]);
        let slice = array.slice(1, 3).unwrap();
        assert_eq!(slice.len(), 2);
        assert_eq!(slice.to_vec(), vec![2.0, 3.0]);
    }

    #[test]
    fn test_slice_of_slice_offsets_compose() {
        let array = Array::from_vec((0..10).map(|v| v as f32).collect());
        let inner = array.slice(2, 8).unwrap().slice(3, 5).unwrap();
        assert_eq!(inner.to_vec(), vec![5.0, 6.0]);
    }

    #[test]
    fn test_slice_out_of_bounds() {
        let array = Array::zeros(4);
        assert!(matches!(
            array.slice(2, 5),
            Err(PaginatedError::Bounds { start: 2, end: 5, len: 4 })
        ));
        assert!(matches!(array.slice(3, 2), Err(PaginatedError::Bounds { .. })));
        assert!(array.slice(4, 4).unwrap().is_empty());
    }

    #[test]
    fn test_copy_into_slice_is_visible_in_parent() {
        let page = Array::zeros(4);
        let window = page.slice(2, 4).unwrap();
        window.copy_from(&Array::from_vec(vec![7.0, 8.0])).unwrap();
        assert_eq!(page.to_vec(), vec![0.0, 0.0, 7.0, 8.0]);
    }

    #[test]
    fn test_copy_length_mismatch() {
        let dst = Array::zeros(3);
        let src = Array::from_vec(vec![1.0, 2.0]);
        assert!(matches!(
            dst.copy_from(&src),
            Err(PaginatedError::LengthMismatch { dst: 3, src: 2 })
        ));
        assert_eq!(dst.to_vec(), vec![0.0; 3]);
    }

    #[test]
    fn test_copy_within_shared_storage() {
        let array = Array::from_vec(vec![1.0, 2.0, 3.0, 4.0]);
        let head = array.slice(0, 2).unwrap();
        let tail = array.slice(2, 4).unwrap();
        tail.copy_from(&head).unwrap();
        assert_eq!(array.to_vec(), vec![1.0, 2.0, 1.0, 2.0]);
    }

    #[test]
    fn test_crossed_copies_do_not_deadlock() {
        let x = Array::from_vec(vec![1.0; 1024]);
        let y = Array::from_vec(vec![2.0; 1024]);

        let handles: Vec<_> = [(x.clone(), y.clone()), (y.clone(), x.clone())]
            .into_iter()
            .map(|(dst, src)| {
                std::thread::spawn(move || {
                    for _ in 0..2000 {
                        dst.copy_from(&src).unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        // every copy moves a whole buffer, so each side ends uniform
        for array in [x, y] {
            let data = array.to_vec();
            assert!(data.iter().all(|v| *v == data[0]));
        }
    }
}
