// Copyright 2026 the Native Bridge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Toy image and document functions bound into the demo module.
//!
//! The byte codecs are deliberately simple. What matters is their shape: argument validation,
//! declared domain errors, per-row checkpoints, and a document handle the host keeps between
//! calls.

use native_bridge::codec::{Encode, Encoder};
use native_bridge::error::{Failure, NativeResult};
use native_bridge::resource::ResourceHandle;
use native_bridge::stepper::{Budget, Progress, Resumable};
use native_bridge::term::{Atom, Term};

/// Domain errors of the codecs, encoded as atoms.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CodecError {
    /// Pixel buffer length does not match `width * height * channels`.
    SizeMismatch,
    /// The run-length stream ended inside a pair.
    Truncated,
    /// A run of length zero.
    ZeroRun,
}

impl Encode for CodecError {
    fn encode(self, e: &mut Encoder<'_>) -> Term {
        e.atom(match self {
            Self::SizeMismatch => "size_mismatch",
            Self::Truncated => "truncated",
            Self::ZeroRun => "zero_run",
        })
    }
}

/// Inverts every pixel channel, one row per checkpoint.
pub(crate) struct Invert {
    pixels: Vec<u8>,
    stride: usize,
    row: usize,
}

impl Resumable for Invert {
    type Output = Vec<u8>;
    type Error = CodecError;

    fn step(&mut self, budget: &mut Budget) -> Result<Progress<Vec<u8>>, Failure<CodecError>> {
        let rows = self.pixels.len() / self.stride;
        while self.row < rows {
            let start = self.row * self.stride;
            for px in &mut self.pixels[start..start + self.stride] {
                *px = !*px;
            }
            self.row += 1;
            if self.row < rows && budget.checkpoint() {
                return Ok(Progress::Yield);
            }
        }
        Ok(Progress::Done(core::mem::take(&mut self.pixels)))
    }
}

pub(crate) fn invert(
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    channels: u32,
) -> NativeResult<Invert, CodecError> {
    if !(1..=4).contains(&channels) {
        return Err(Failure::bad_arg("channels must be between 1 and 4"));
    }
    let stride = usize::try_from(u64::from(width) * u64::from(channels))
        .map_err(|_| Failure::Domain(CodecError::SizeMismatch))?;
    let expected = u64::from(width) * u64::from(height) * u64::from(channels);
    if stride == 0 || u64::try_from(pixels.len()).ok() != Some(expected) {
        return Err(Failure::Domain(CodecError::SizeMismatch));
    }
    Ok(Invert {
        pixels,
        stride,
        row: 0,
    })
}

/// Run-length encodes bytes as `(count, value)` pairs.
pub(crate) struct RleEncode {
    input: Vec<u8>,
    pos: usize,
    out: Vec<u8>,
}

impl Resumable for RleEncode {
    type Output = Vec<u8>;
    type Error = CodecError;

    fn step(&mut self, budget: &mut Budget) -> Result<Progress<Vec<u8>>, Failure<CodecError>> {
        while let Some(&value) = self.input.get(self.pos) {
            let run = self.input[self.pos..]
                .iter()
                .take(usize::from(u8::MAX))
                .take_while(|&&b| b == value)
                .count();
            let count = u8::try_from(run).map_err(|_| Failure::fault("run exceeds 255"))?;
            self.out.extend_from_slice(&[count, value]);
            self.pos += run;
            if self.pos < self.input.len() && budget.checkpoint() {
                return Ok(Progress::Yield);
            }
        }
        Ok(Progress::Done(core::mem::take(&mut self.out)))
    }
}

pub(crate) fn rle_encode(input: Vec<u8>) -> NativeResult<RleEncode, CodecError> {
    Ok(RleEncode {
        out: Vec::with_capacity(input.len() / 2),
        input,
        pos: 0,
    })
}

/// Expands `(count, value)` pairs.
pub(crate) struct RleDecode {
    input: Vec<u8>,
    pos: usize,
    out: Vec<u8>,
}

impl Resumable for RleDecode {
    type Output = Vec<u8>;
    type Error = CodecError;

    fn step(&mut self, budget: &mut Budget) -> Result<Progress<Vec<u8>>, Failure<CodecError>> {
        while self.pos < self.input.len() {
            let &[count, value] = self.input.get(self.pos..self.pos + 2).unwrap_or_default() else {
                return Err(Failure::Domain(CodecError::Truncated));
            };
            if count == 0 {
                return Err(Failure::Domain(CodecError::ZeroRun));
            }
            self.out
                .extend(core::iter::repeat_n(value, usize::from(count)));
            self.pos += 2;
            if self.pos < self.input.len() && budget.checkpoint() {
                return Ok(Progress::Yield);
            }
        }
        Ok(Progress::Done(core::mem::take(&mut self.out)))
    }
}

pub(crate) fn rle_decode(input: Vec<u8>) -> NativeResult<RleDecode, CodecError> {
    Ok(RleDecode {
        input,
        pos: 0,
        out: Vec::new(),
    })
}

/// A parsed document the host holds on to between calls.
#[derive(Debug)]
pub(crate) struct Document {
    pages: Vec<String>,
}

pub(crate) fn open_document(pages: Vec<String>) -> NativeResult<ResourceHandle<Document>> {
    if pages.is_empty() {
        return Err(Failure::bad_arg("a document needs at least one page"));
    }
    Ok(ResourceHandle::alloc(Document { pages }))
}

pub(crate) fn page_count(doc: ResourceHandle<Document>) -> NativeResult<usize> {
    Ok(doc.pages.len())
}

pub(crate) fn render_page(doc: ResourceHandle<Document>, index: usize) -> NativeResult<String, Atom> {
    doc.pages
        .get(index)
        .map(|text| format!("[page {}] {text}", index + 1))
        .ok_or_else(|| Failure::Domain(Atom::new("out_of_range")))
}
