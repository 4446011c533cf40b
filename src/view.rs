//! Read-only windows over the file buffer.
//!
//! A [`ByteView`] is an `(offset, length)` pair over a shared [`Bytes`]
//! buffer. Slicing produces another view over the same allocation, so the
//! element reader can hand out value spans without copying anything.

use std::fmt;

use bytes::Bytes;

use crate::error::DicomError;
use crate::util;
use crate::CommonResult;

#[derive(Clone)]
pub struct ByteView {
    buffer: Bytes,
    offset: usize,
    length: usize,
}

impl ByteView {
    /// View over the whole buffer.
    pub fn new(buffer: impl Into<Bytes>) -> Self {
        let buffer = buffer.into();
        let length = buffer.len();

        ByteView {
            buffer,
            offset: 0,
            length,
        }
    }

    /// View starting at `offset`; `length` defaults to the rest of the buffer.
    ///
    /// Fails if `offset` lies past the end or `length` exceeds what remains.
    pub fn with_range(
        buffer: Bytes,
        offset: usize,
        length: Option<usize>,
    ) -> CommonResult<Self> {
        if offset > buffer.len() {
            return Err(DicomError::range(
                offset,
                format!("offset {} > buffer length {}", offset, buffer.len()),
            ));
        }

        let remaining = buffer.len() - offset;
        let length = match length {
            None => remaining,
            Some(length) if length > remaining => {
                return Err(DicomError::range(
                    offset,
                    format!("length {} > remaining {}", length, remaining),
                ));
            }
            Some(length) => length,
        };

        Ok(ByteView {
            buffer,
            offset,
            length,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.length
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Absolute position of the first byte in the backing buffer.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buffer[self.offset..self.offset + self.length]
    }

    /// Zero-copy handle on the viewed bytes.
    pub fn to_bytes(&self) -> Bytes {
        self.buffer.slice(self.offset..self.offset + self.length)
    }

    /// Sub-view `[start, stop)` relative to this view.
    ///
    /// Bounds past the end are clamped to the view length; headers in the
    /// wild sometimes claim more bytes than the file holds.
    pub fn slice(&self, start: usize, stop: usize) -> CommonResult<ByteView> {
        if start > stop {
            return Err(DicomError::range(
                self.offset + start,
                format!("slice start {} > stop {}", start, stop),
            ));
        }

        let start = start.min(self.length);
        let stop = stop.min(self.length);

        ByteView::with_range(self.buffer.clone(), self.offset + start, Some(stop - start))
    }

    /// Everything from `start` to the end of the view.
    pub fn slice_from(&self, start: usize) -> CommonResult<ByteView> {
        self.slice(start, self.length.max(start))
    }

    /// Length-1 view at `index`.
    pub fn index(&self, index: usize) -> CommonResult<ByteView> {
        if index >= self.length {
            return Err(DicomError::range(
                self.offset + index,
                format!("index {} >= length {}", index, self.length),
            ));
        }

        self.slice(index, index + 1)
    }

    /// Position of the first occurrence of `pattern`, relative to the view.
    pub fn find(&self, pattern: &[u8]) -> Option<usize> {
        if pattern.is_empty() || pattern.len() > self.length {
            return None;
        }

        self.as_slice()
            .windows(pattern.len())
            .position(|window| window == pattern)
    }

    /// Exactly `count` bytes at `at`, failing instead of clamping.
    pub fn read_bytes(&self, at: usize, count: usize) -> CommonResult<&[u8]> {
        match at.checked_add(count) {
            Some(end) if end <= self.length => Ok(&self.as_slice()[at..end]),
            _ => Err(DicomError::range(
                self.offset + at,
                format!(
                    "need {} bytes, {} remain",
                    count,
                    self.length.saturating_sub(at)
                ),
            )),
        }
    }

    pub fn read_u16(&self, at: usize, little_endian: bool) -> CommonResult<u16> {
        Ok(util::read_u16(self.read_bytes(at, 2)?, little_endian))
    }

    pub fn read_u32(&self, at: usize, little_endian: bool) -> CommonResult<u32> {
        Ok(util::read_u32(self.read_bytes(at, 4)?, little_endian))
    }
}

impl fmt::Debug for ByteView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteView")
            .field("offset", &self.offset)
            .field("length", &self.length)
            .finish()
    }
}
