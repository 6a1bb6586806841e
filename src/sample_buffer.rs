use std::ops::Index;

use crate::constants::SAMPLE_CHUNK_SIZE;
use crate::error::OutOfBounds;

/// Append-only `f32` series stored in fixed-size chunks.
///
/// Growing never moves earlier samples; a full chunk stays put and the next
/// append allocates a fresh one. Lookups are one division and one modulo.
#[derive(Clone, Debug)]
pub struct SampleBuffer {
    chunk_size: usize,
    chunks: Vec<Box<[f32]>>,
    len: usize,
}

impl Default for SampleBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleBuffer {
    pub fn new() -> Self {
        Self::with_chunk_size(SAMPLE_CHUNK_SIZE)
    }

    /// Panics when `chunk_size` is zero.
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        assert!(chunk_size > 0, "sample buffer chunk size must be positive");
        Self {
            chunk_size,
            chunks: Vec::new(),
            len: 0,
        }
    }

    pub fn append(&mut self, value: f32) {
        let offset = self.len % self.chunk_size;
        if offset == 0 {
            self.chunks.push(vec![0.0; self.chunk_size].into_boxed_slice());
        }
        if let Some(chunk) = self.chunks.last_mut() {
            chunk[offset] = value;
        }
        self.len += 1;
    }

    pub fn get(&self, index: usize) -> Result<f32, OutOfBounds> {
        if index >= self.len {
            return Err(OutOfBounds {
                index,
                len: self.len,
            });
        }
        Ok(self.chunks[index / self.chunk_size][index % self.chunk_size])
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn last(&self) -> Option<f32> {
        self.len.checked_sub(1).and_then(|idx| self.get(idx).ok())
    }

    pub fn iter(&self) -> impl Iterator<Item = f32> + '_ {
        self.chunks
            .iter()
            .flat_map(|chunk| chunk.iter().copied())
            .take(self.len)
    }
}

impl Index<usize> for SampleBuffer {
    type Output = f32;

    fn index(&self, index: usize) -> &f32 {
        if index >= self.len {
            panic!(
                "{}",
                OutOfBounds {
                    index,
                    len: self.len
                }
            );
        }
        &self.chunks[index / self.chunk_size][index % self.chunk_size]
    }
}
