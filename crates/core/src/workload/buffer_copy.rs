// LabWired FI Profiler - Fault-Injection Test Target
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use core::hint::black_box;

use super::{Diagnostic, Verdict, Workload};

/// Initial content of a copy buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferInit<'a> {
    /// Every byte set to the same value.
    Fill(u8),
    /// Explicit leading bytes; the remainder is zero.
    Sequence(&'a [u8]),
}

impl BufferInit<'_> {
    pub fn apply(&self, buf: &mut [u8]) {
        match *self {
            Self::Fill(byte) => buf.fill(byte),
            Self::Sequence(seq) => {
                let n = seq.len().min(buf.len());
                buf[..n].copy_from_slice(&seq[..n]);
                buf[n..].fill(0);
            }
        }
    }

    /// Byte at `index` of a buffer initialised this way.
    pub const fn byte_at(&self, index: usize) -> u8 {
        match *self {
            Self::Fill(byte) => byte,
            Self::Sequence(seq) => {
                if index < seq.len() {
                    seq[index]
                } else {
                    0
                }
            }
        }
    }

    /// Whether a `size`-byte buffer initialised this way differs from one
    /// initialised with `other` in at least one byte.
    pub const fn differs_from(&self, other: &BufferInit<'_>, size: usize) -> bool {
        let mut i = 0;
        while i < size {
            if self.byte_at(i) != other.byte_at(i) {
                return true;
            }
            i += 1;
        }
        false
    }

    const fn fits(&self, size: usize) -> bool {
        match *self {
            Self::Fill(_) => true,
            Self::Sequence(seq) => seq.len() <= size,
        }
    }
}

/// Copies a source buffer over a destination buffer of the same size.
///
/// Both buffers are re-initialised before every cycle. A fault report carries
/// the whole destination so the host can see which lanes or words were hit.
#[derive(Debug, Clone)]
pub struct BufferCopy<const N: usize> {
    source: [u8; N],
    destination: [u8; N],
    source_init: BufferInit<'static>,
    destination_init: BufferInit<'static>,
}

impl<const N: usize> BufferCopy<N> {
    /// Panics (at compile time when used in a const item) for a zero size,
    /// an init sequence longer than `N`, or inits that produce the same
    /// image, where an untouched destination would pass as a good copy.
    pub const fn new(source_init: BufferInit<'static>, destination_init: BufferInit<'static>) -> Self {
        assert!(N > 0, "copy buffers must not be empty");
        assert!(source_init.fits(N), "source init sequence is longer than the buffer");
        assert!(
            destination_init.fits(N),
            "destination init sequence is longer than the buffer"
        );
        assert!(
            source_init.differs_from(&destination_init, N),
            "source and destination must start out different"
        );
        Self {
            source: [0; N],
            destination: [0; N],
            source_init,
            destination_init,
        }
    }

    pub fn source(&self) -> &[u8; N] {
        &self.source
    }

    pub fn destination(&self) -> &[u8; N] {
        &self.destination
    }

    /// Direct access to the post-copy image, for tests and fault models.
    pub fn destination_mut(&mut self) -> &mut [u8; N] {
        &mut self.destination
    }
}

impl<const N: usize> Workload for BufferCopy<N> {
    /// The observation is the destination buffer itself.
    type Observed = ();

    const FAULT_PAYLOAD_LEN: usize = N;

    fn prepare(&mut self) {
        self.source_init.apply(&mut self.source);
        self.destination_init.apply(&mut self.destination);
        // Forget the known contents so the copy below is not folded into a
        // fill of the destination.
        let _ = black_box(&mut self.source);
        let _ = black_box(&mut self.destination);
    }

    #[inline(always)]
    fn run(&mut self) {
        self.destination.copy_from_slice(&self.source);
    }

    fn evaluate(&self, _observed: ()) -> Verdict<'_> {
        let source = black_box(&self.source);
        let destination = black_box(&self.destination);
        if source == destination {
            Verdict::Expected
        } else {
            Verdict::Fault(Diagnostic::Buffer(destination))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SEQ: &[u8] = &[0x01, 0x02, 0x03];

    #[test]
    fn test_prepare_resets_both_buffers() {
        let mut copy = BufferCopy::<68>::new(BufferInit::Fill(0xAA), BufferInit::Fill(0xBB));
        copy.prepare();
        assert!(copy.source().iter().all(|&b| b == 0xAA));
        assert!(copy.destination().iter().all(|&b| b == 0xBB));

        copy.run();
        copy.destination_mut()[3] = 0x00;
        copy.prepare();
        assert!(copy.destination().iter().all(|&b| b == 0xBB));
    }

    #[test]
    fn test_sequence_is_zero_padded() {
        let mut copy = BufferCopy::<6>::new(BufferInit::Sequence(SEQ), BufferInit::Fill(0xBB));
        copy.prepare();
        assert_eq!(copy.source(), &[0x01, 0x02, 0x03, 0x00, 0x00, 0x00]);
        assert_eq!(BufferInit::Sequence(SEQ).byte_at(1), 0x02);
        assert_eq!(BufferInit::Sequence(SEQ).byte_at(5), 0x00);
    }

    #[test]
    fn test_fault_free_copy() {
        let mut copy = BufferCopy::<68>::new(BufferInit::Fill(0xAA), BufferInit::Fill(0xBB));
        copy.prepare();
        copy.run();
        assert_eq!(copy.destination(), copy.source());
        assert_eq!(copy.evaluate(()), Verdict::Expected);
    }

    #[test]
    fn test_skipped_copy_reports_untouched_destination() {
        let mut copy = BufferCopy::<8>::new(BufferInit::Fill(0xAA), BufferInit::Fill(0xBB));
        copy.prepare();
        assert_eq!(
            copy.evaluate(()),
            Verdict::Fault(Diagnostic::Buffer(&[0xBB; 8]))
        );
    }

    #[test]
    fn test_identical_images_detected() {
        assert!(!BufferInit::Fill(0x00).differs_from(&BufferInit::Sequence(&[]), 4));
        assert!(!BufferInit::Sequence(&[0x5A, 0x5A]).differs_from(&BufferInit::Fill(0x5A), 2));
        assert!(BufferInit::Sequence(&[0x00, 0x01]).differs_from(&BufferInit::Fill(0x00), 2));
    }

    #[test]
    #[should_panic(expected = "source and destination must start out different")]
    fn test_zero_fill_and_empty_sequence_rejected() {
        let _ = BufferCopy::<4>::new(BufferInit::Fill(0x00), BufferInit::Sequence(&[]));
    }

    #[test]
    #[should_panic(expected = "source and destination must start out different")]
    fn test_sequence_matching_fill_rejected() {
        let _ = BufferCopy::<3>::new(
            BufferInit::Sequence(&[0x7E, 0x7E, 0x7E]),
            BufferInit::Fill(0x7E),
        );
    }

    proptest! {
        #[test]
        fn test_single_corrupted_byte_reports_full_destination(
            index in 0usize..68,
            flip in 1u8..=255,
        ) {
            let mut copy = BufferCopy::<68>::new(BufferInit::Fill(0xAA), BufferInit::Fill(0xBB));
            copy.prepare();
            copy.run();
            copy.destination_mut()[index] ^= flip;

            let mut expected = [0xAAu8; 68];
            expected[index] ^= flip;
            match copy.evaluate(()) {
                Verdict::Fault(Diagnostic::Buffer(image)) => prop_assert_eq!(image, &expected[..]),
                other => prop_assert!(false, "unexpected verdict {:?}", other),
            }
        }

        #[test]
        fn test_any_sequence_copies_cleanly(
            src in prop::collection::vec(any::<u8>(), 0..=32),
            dst in prop::collection::vec(any::<u8>(), 0..=32),
        ) {
            let src: &'static [u8] = Box::leak(src.into_boxed_slice());
            let dst: &'static [u8] = Box::leak(dst.into_boxed_slice());
            prop_assume!(BufferInit::Sequence(src).differs_from(&BufferInit::Sequence(dst), 32));
            let mut copy = BufferCopy::<32>::new(BufferInit::Sequence(src), BufferInit::Sequence(dst));
            copy.prepare();
            copy.run();
            prop_assert_eq!(copy.evaluate(()), Verdict::Expected);
            prop_assert_eq!(&copy.destination()[..src.len()], src);
        }
    }
}
