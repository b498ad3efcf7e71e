use std::fmt::{self, Debug};

use faer::prelude::*;

/// A dense row-major matrix of `f32`.
///
/// Rows are units of a layer, columns are samples, so element `(row, column)` lives at
/// `row * ncols + column` in the flat buffer.
#[derive(Clone, PartialEq)]
pub struct Matrix {
    nrows: usize,
    ncols: usize,
    elements: Box<[f32]>,
}

impl Debug for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.elements.chunks(self.ncols.max(1))).finish()
    }
}

impl Matrix {
    /// Initializes a matrix of size `nrows × ncols`, all zeroes.
    pub fn zeroed(nrows: usize, ncols: usize) -> Self {
        Self {
            nrows,
            ncols,
            elements: bytemuck::zeroed_slice_box(nrows * ncols),
        }
    }

    pub fn filled(nrows: usize, ncols: usize, value: f32) -> Self {
        Self {
            nrows,
            ncols,
            elements: vec![value; nrows * ncols].into_boxed_slice(),
        }
    }

    /// # Panics
    ///
    /// - if `elements.len() != nrows * ncols`
    #[track_caller]
    pub fn from_row_major(nrows: usize, ncols: usize, elements: impl Into<Box<[f32]>>) -> Self {
        let elements = elements.into();
        assert_eq!(
            elements.len(),
            nrows * ncols,
            "matrix of {nrows}×{ncols} needs {} elements",
            nrows * ncols,
        );
        Self {
            nrows,
            ncols,
            elements,
        }
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.nrows, self.ncols)
    }

    pub fn get(&self, row: usize, column: usize) -> Option<f32> {
        if row < self.nrows && column < self.ncols {
            Some(self.elements[row * self.ncols + column])
        } else {
            None
        }
    }

    /// Flat element view.
    pub fn elements(&self) -> &[f32] {
        &self.elements
    }

    /// Flat element view.
    pub fn elements_mut(&mut self) -> &mut [f32] {
        &mut self.elements
    }

    pub fn as_mat_ref(&self) -> MatRef<'_, f32> {
        MatRef::from_row_major_slice(&self.elements[..], self.nrows, self.ncols)
    }

    pub fn as_mat_mut(&mut self) -> MatMut<'_, f32> {
        MatMut::from_row_major_slice_mut(&mut self.elements[..], self.nrows, self.ncols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_major_layout() {
        let m = Matrix::from_row_major(2, 3, vec![1., 2., 3., 4., 5., 6.]);
        assert_eq!(m.get(1, 0), Some(4.));
        assert_eq!(m.get(0, 2), Some(3.));
        assert_eq!(m.get(2, 0), None);
        let view = m.as_mat_ref();
        assert_eq!(view[(1, 2)], 6.);
        assert_eq!(view.nrows(), 2);
        assert_eq!(view.ncols(), 3);
    }

    #[test]
    fn zeroed_is_zero() {
        let m = Matrix::zeroed(3, 4);
        assert_eq!(m.elements().len(), 12);
        assert!(m.elements().iter().all(|&x| x == 0.0));
    }

    #[test]
    #[should_panic]
    fn from_row_major_checks_length() {
        Matrix::from_row_major(2, 2, vec![1., 2., 3.]);
    }
}
