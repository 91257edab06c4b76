//! The block source is the external collaborator that delivers contiguous
//! 2048-byte logical blocks. The core never performs raw device I/O or CSS
//! decryption itself; it only consumes this trait.

use std::io::{self, Read, Seek, SeekFrom};

use log::debug;

use crate::LOGICAL_BLOCK_SIZE;

/// Delivers logical blocks starting at `lbn`. Returns the number of whole
/// blocks actually delivered into `dst` (which must be at least
/// `count * LOGICAL_BLOCK_SIZE` bytes), or an I/O error.
///
/// `encrypted` is carried through for callers that need it (e.g. a
/// CSS-aware transport); UDF structures themselves are never scrambled, so
/// every call from this crate passes `false`.
pub trait BlockSource {
    fn read_blocks(&mut self, lbn: u32, count: u32, dst: &mut [u8], encrypted: bool)
        -> io::Result<u32>;
}

impl<T: Read + Seek> BlockSource for T {
    fn read_blocks(
        &mut self,
        lbn: u32,
        count: u32,
        dst: &mut [u8],
        _encrypted: bool,
    ) -> io::Result<u32> {
        let want = count as usize * LOGICAL_BLOCK_SIZE;
        self.seek(SeekFrom::Start(lbn as u64 * LOGICAL_BLOCK_SIZE as u64))?;
        match self.read_exact(&mut dst[..want]) {
            Ok(()) => Ok(count),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(0),
            Err(e) => Err(e),
        }
    }
}

/// Loops until `count` blocks starting at `lbn` are fully delivered into
/// `dst`, or the source fails. Per the error-handling design, any
/// underlying failure (including a short read) propagates as "zero blocks
/// delivered", not as a partial result.
pub fn read_all_or_fail<S: BlockSource>(source: &mut S, lbn: u32, count: u32, dst: &mut [u8]) -> u32 {
    let mut delivered = 0u32;
    while delivered < count {
        let remaining = count - delivered;
        let dst_offset = delivered as usize * LOGICAL_BLOCK_SIZE;
        match source.read_blocks(lbn + delivered, remaining, &mut dst[dst_offset..], false) {
            Ok(0) => {
                debug!("read_all_or_fail: underrun at lbn {}", lbn + delivered);
                return 0;
            }
            Ok(n) => delivered += n,
            Err(e) => {
                debug!("read_all_or_fail: source failed at lbn {}: {}", lbn + delivered, e);
                return 0;
            }
        }
    }
    delivered
}
