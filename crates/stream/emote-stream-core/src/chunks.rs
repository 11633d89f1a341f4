//! Chunked face-image reassembly.
//!
//! Three independent pipelines (binary, grayscale, RGB565), each keyed by an
//! incrementing image id with a chunks-received bitmask. A chunk for a new
//! image id discards the partial image in progress; a completed image is
//! handed off exactly once.

use serde::{Deserialize, Serialize};

use crate::error::StreamError;

/// Display is 128x64.
pub const FACE_IMAGE_WIDTH: usize = 128;
pub const FACE_IMAGE_HEIGHT: usize = 64;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum FaceImageFormat {
    /// 1 bit per pixel.
    Binary,
    /// 8 bits per pixel.
    Grayscale,
    /// 16 bits per pixel.
    Rgb565,
}

impl FaceImageFormat {
    pub fn image_bytes(self) -> usize {
        let pixels = FACE_IMAGE_WIDTH * FACE_IMAGE_HEIGHT;
        match self {
            FaceImageFormat::Binary => pixels / 8,
            FaceImageFormat::Grayscale => pixels,
            FaceImageFormat::Rgb565 => pixels * 2,
        }
    }

    pub fn chunk_count(self) -> u8 {
        match self {
            FaceImageFormat::Binary => 2,
            FaceImageFormat::Grayscale => 8,
            FaceImageFormat::Rgb565 => 16,
        }
    }

    pub fn chunk_bytes(self) -> usize {
        self.image_bytes() / self.chunk_count() as usize
    }

    fn full_mask(self) -> u32 {
        (1u32 << self.chunk_count()) - 1
    }
}

/// Inbound chunk of one face image.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FaceImageChunk {
    pub image_id: u32,
    pub chunk_index: u8,
    pub data: Vec<u8>,
}

/// A fully reassembled image ready for the face-override path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FaceImage {
    pub format: FaceImageFormat,
    pub data: Vec<u8>,
}

/// Result of feeding one chunk.
#[derive(Clone, Debug, PartialEq)]
pub enum ChunkOutcome {
    /// Accepted; image still incomplete.
    Pending,
    /// Final chunk arrived; the image is handed off here exactly once.
    Complete(FaceImage),
    /// A new image id preempted the one in progress; the partial image was
    /// discarded and this chunk starts the new image.
    Restarted { discarded_id: u32 },
}

#[derive(Debug)]
pub struct FaceImageAssembler {
    format: FaceImageFormat,
    image_id: u32,
    received: u32,
    data: Vec<u8>,
    active: bool,
    last_completed: Option<u32>,
}

impl FaceImageAssembler {
    pub fn new(format: FaceImageFormat) -> Self {
        Self {
            format,
            image_id: 0,
            received: 0,
            data: vec![0; format.image_bytes()],
            active: false,
            last_completed: None,
        }
    }

    #[inline]
    pub fn format(&self) -> FaceImageFormat {
        self.format
    }

    #[inline]
    pub fn in_progress(&self) -> bool {
        self.active
    }

    /// Feed one chunk. Duplicate chunks are idempotent; chunks of an image
    /// already completed are ignored.
    pub fn handle_chunk(&mut self, chunk: &FaceImageChunk) -> Result<ChunkOutcome, StreamError> {
        let count = self.format.chunk_count();
        if chunk.chunk_index >= count {
            return Err(StreamError::ChunkIndexOutOfRange {
                index: chunk.chunk_index,
                count,
            });
        }
        if self.last_completed == Some(chunk.image_id) {
            return Ok(ChunkOutcome::Pending);
        }

        let mut discarded = None;
        if self.active && chunk.image_id != self.image_id {
            log::warn!(
                "face image {} discarded ({}/{} chunks), restarting for {}",
                self.image_id,
                self.received.count_ones(),
                count,
                chunk.image_id
            );
            discarded = Some(self.image_id);
        }
        if !self.active || discarded.is_some() {
            self.image_id = chunk.image_id;
            self.received = 0;
            self.data.fill(0);
            self.active = true;
        }

        self.copy_chunk(chunk);
        self.received |= 1 << chunk.chunk_index;

        if self.received == self.format.full_mask() {
            self.active = false;
            self.received = 0;
            self.last_completed = Some(self.image_id);
            let data = std::mem::replace(&mut self.data, vec![0; self.format.image_bytes()]);
            return Ok(ChunkOutcome::Complete(FaceImage {
                format: self.format,
                data,
            }));
        }
        if let Some(discarded_id) = discarded {
            return Ok(ChunkOutcome::Restarted { discarded_id });
        }
        Ok(ChunkOutcome::Pending)
    }

    fn copy_chunk(&mut self, chunk: &FaceImageChunk) {
        let stride = self.format.chunk_bytes();
        let start = chunk.chunk_index as usize * stride;
        let len = chunk.data.len().min(stride);
        self.data[start..start + len].copy_from_slice(&chunk.data[..len]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(image_id: u32, index: u8, format: FaceImageFormat) -> FaceImageChunk {
        FaceImageChunk {
            image_id,
            chunk_index: index,
            data: vec![index + 1; format.chunk_bytes()],
        }
    }

    #[test]
    fn completes_after_last_chunk_any_order() {
        let format = FaceImageFormat::Binary;
        // Both delivery orders of the two binary chunks.
        for order in [[0u8, 1u8], [1u8, 0u8]] {
            let mut asm = FaceImageAssembler::new(format);
            assert_eq!(
                asm.handle_chunk(&chunk(7, order[0], format)).unwrap(),
                ChunkOutcome::Pending
            );
            match asm.handle_chunk(&chunk(7, order[1], format)).unwrap() {
                ChunkOutcome::Complete(img) => {
                    assert_eq!(img.data.len(), format.image_bytes());
                    // Chunk 0 fills the first half with 1s regardless of order.
                    assert_eq!(img.data[0], 1);
                    assert_eq!(img.data[format.chunk_bytes()], 2);
                }
                other => panic!("expected completion, got {other:?}"),
            }
        }
    }

    #[test]
    fn hands_off_exactly_once() {
        let format = FaceImageFormat::Binary;
        let mut asm = FaceImageAssembler::new(format);
        asm.handle_chunk(&chunk(3, 0, format)).unwrap();
        assert!(matches!(
            asm.handle_chunk(&chunk(3, 1, format)).unwrap(),
            ChunkOutcome::Complete(_)
        ));
        // Late duplicate of the completed image does not re-emit.
        assert_eq!(
            asm.handle_chunk(&chunk(3, 1, format)).unwrap(),
            ChunkOutcome::Pending
        );
        assert!(!asm.in_progress());
    }

    #[test]
    fn new_image_id_discards_partial() {
        let format = FaceImageFormat::Grayscale;
        let mut asm = FaceImageAssembler::new(format);
        asm.handle_chunk(&chunk(1, 0, format)).unwrap();
        asm.handle_chunk(&chunk(1, 1, format)).unwrap();
        assert_eq!(
            asm.handle_chunk(&chunk(2, 0, format)).unwrap(),
            ChunkOutcome::Restarted { discarded_id: 1 }
        );
        // Completing image 2 requires all of its own chunks.
        for i in 1..format.chunk_count() - 1 {
            assert_eq!(
                asm.handle_chunk(&chunk(2, i, format)).unwrap(),
                ChunkOutcome::Pending
            );
        }
        assert!(matches!(
            asm.handle_chunk(&chunk(2, format.chunk_count() - 1, format))
                .unwrap(),
            ChunkOutcome::Complete(_)
        ));
    }

    #[test]
    fn rejects_out_of_range_index() {
        let format = FaceImageFormat::Binary;
        let mut asm = FaceImageAssembler::new(format);
        let err = asm.handle_chunk(&chunk(1, 2, format)).unwrap_err();
        assert_eq!(err, StreamError::ChunkIndexOutOfRange { index: 2, count: 2 });
    }

    #[test]
    fn rgb565_permutation_completes_once() {
        let format = FaceImageFormat::Rgb565;
        let mut asm = FaceImageAssembler::new(format);
        // A scrambled full permutation of the 16 chunks.
        let order = [5u8, 0, 12, 3, 9, 1, 15, 7, 2, 11, 4, 13, 6, 10, 8, 14];
        let mut completions = 0;
        for idx in order {
            if let ChunkOutcome::Complete(_) = asm.handle_chunk(&chunk(9, idx, format)).unwrap() {
                completions += 1;
            }
        }
        assert_eq!(completions, 1);
    }
}
