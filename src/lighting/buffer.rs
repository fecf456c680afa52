//! Packed per-attribute light storage.

/// Flat `f32` array holding one attribute for every light of a bucket.
///
/// Resizing keeps the backing allocation and the values of the lights that
/// remain; [`view`](Self::view) covers the current light count only.
#[derive(Debug, Clone)]
pub struct LightBuffer {
    data: Vec<f32>,
    stride: usize,
    count: usize,
}

impl LightBuffer {
    #[must_use]
    pub fn new(stride: usize) -> Self {
        Self {
            data: Vec::new(),
            stride,
            count: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Number of lights the buffer is sized for.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Sizes the buffer for `count` lights. Returns whether the count changed.
    ///
    /// New entries are zeroed.
    pub fn resize(&mut self, count: usize) -> bool {
        if count == self.count {
            return false;
        }
        self.data.resize(count * self.stride, 0.0);
        self.count = count;
        true
    }

    /// Mutable slot of light `index`.
    ///
    /// # Panics
    /// If `index` is out of range.
    pub fn slot_mut(&mut self, index: usize) -> &mut [f32] {
        let start = index * self.stride;
        &mut self.data[start..start + self.stride]
    }

    #[must_use]
    pub fn slot(&self, index: usize) -> Option<&[f32]> {
        let start = index * self.stride;
        self.data.get(start..start + self.stride)
    }

    /// Values for the current light count, ready for upload.
    #[inline]
    #[must_use]
    pub fn view(&self) -> &[f32] {
        &self.data[..self.count * self.stride]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resize_preserves_prefix() {
        let mut buffer = LightBuffer::new(3);
        assert!(buffer.resize(2));
        buffer.slot_mut(0).copy_from_slice(&[1.0, 2.0, 3.0]);
        buffer.slot_mut(1).copy_from_slice(&[4.0, 5.0, 6.0]);

        assert!(buffer.resize(3));
        assert_eq!(buffer.view(), [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 0.0, 0.0, 0.0]);
        assert!(!buffer.resize(3));

        assert!(buffer.resize(1));
        assert_eq!(buffer.view(), [1.0, 2.0, 3.0]);
        assert!(buffer.slot(1).is_none());
    }
}
