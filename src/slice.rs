use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SliceError {
    #[error("slice at offset {offset} with length {len} does not fit in a buffer of {capacity} bytes")]
    OutOfBounds {
        offset: usize,
        len: usize,
        capacity: usize
    }
}

fn check_bounds(offset: usize, len: usize, capacity: usize) -> Result<std::ops::Range<usize>, SliceError> {
    match offset.checked_add(len) {
        Some(end) if end <= capacity => Ok(offset..end),
        _ => Err(SliceError::OutOfBounds { offset, len, capacity })
    }
}

/// A readable (buffer, offset, length) view into caller-owned memory
///
/// The bounds are not checked on construction. A session checks them
/// when the slice is passed to a step, before the engine is touched
#[derive(Debug, Clone, Copy)]
pub struct BufferSlice<'a> {
    buffer: &'a [u8],
    offset: usize,
    len: usize
}

impl<'a> BufferSlice<'a> {
    /// Creates a new BufferSlice over the specified part of the buffer
    pub fn new(buffer: &'a [u8], offset: usize, len: usize) -> Self {
        Self {
            buffer,
            offset,
            len
        }
    }

    /// Creates a new BufferSlice covering the whole buffer
    pub fn whole(buffer: &'a [u8]) -> Self {
        Self::new(buffer, 0, buffer.len())
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the viewed bytes, or an error if the view does
    /// not fit in the backing buffer
    pub fn bind(&self) -> Result<&'a [u8], SliceError> {
        let range = check_bounds(self.offset, self.len, self.buffer.len())?;
        Ok(&self.buffer[range])
    }
}

/// A writable (buffer, offset, length) view into caller-owned memory
///
/// See [BufferSlice]
#[derive(Debug)]
pub struct BufferSliceMut<'a> {
    buffer: &'a mut [u8],
    offset: usize,
    len: usize
}

impl<'a> BufferSliceMut<'a> {
    /// Creates a new BufferSliceMut over the specified part of the buffer
    pub fn new(buffer: &'a mut [u8], offset: usize, len: usize) -> Self {
        Self {
            buffer,
            offset,
            len
        }
    }

    /// Creates a new BufferSliceMut covering the whole buffer
    pub fn whole(buffer: &'a mut [u8]) -> Self {
        let len = buffer.len();
        Self::new(buffer, 0, len)
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the viewed bytes, or an error if the view does
    /// not fit in the backing buffer
    pub fn bind(&mut self) -> Result<&mut [u8], SliceError> {
        let range = check_bounds(self.offset, self.len, self.buffer.len())?;
        Ok(&mut self.buffer[range])
    }
}
