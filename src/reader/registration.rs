//! Frame-to-frame drift estimation by phase correlation

use std::io::{Read, Seek};
use std::sync::Arc;

use log::debug;
use ndarray::{Array2, ErrorKind, ShapeError};
use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};
use serde::Serialize;

use crate::metadata::DimensionId;

use super::{Coordinates, ReaderError, SeriesReader};

/// Integer translation between two planes
///
/// `x` runs along the first plane axis, `y` along the second.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Displacement {
    /// Shift along the first plane axis
    pub x: i64,
    /// Shift along the second plane axis
    pub y: i64,
}

/// Phase correlator for planes of a fixed `(height, width)` shape
///
/// Transform plans are built once and reused for every pair.
pub struct PhaseCorrelator {
    height: usize,
    width: usize,
    row_forward: Arc<dyn Fft<f64>>,
    row_inverse: Arc<dyn Fft<f64>>,
    column_forward: Arc<dyn Fft<f64>>,
    column_inverse: Arc<dyn Fft<f64>>,
}

impl PhaseCorrelator {
    /// Plan transforms for `(height, width)` planes
    pub fn new(height: usize, width: usize) -> Self {
        let mut planner = FftPlanner::<f64>::new();
        Self {
            height,
            width,
            row_forward: planner.plan_fft_forward(width),
            row_inverse: planner.plan_fft_inverse(width),
            column_forward: planner.plan_fft_forward(height),
            column_inverse: planner.plan_fft_inverse(height),
        }
    }

    /// Estimate the shift `d` such that `moved(p) ≈ reference(p - d)`
    ///
    /// Components larger than half the axis length wrap to negative values.
    pub fn estimate(
        &self,
        reference: &Array2<u8>,
        moved: &Array2<u8>,
    ) -> Result<Displacement, ReaderError> {
        let shape = (self.height, self.width);
        if reference.dim() != shape || moved.dim() != shape {
            return Err(ShapeError::from_kind(ErrorKind::IncompatibleShape).into());
        }
        if self.height == 0 || self.width == 0 {
            return Ok(Displacement::default());
        }

        let a = self.forward(reference);
        let b = self.forward(moved);

        let mut spectrum: Vec<Complex64> = a
            .iter()
            .zip(&b)
            .map(|(a, b)| {
                let r = a.conj() * b;
                let norm = r.norm();
                if norm <= f64::EPSILON {
                    Complex64::new(0.0, 0.0)
                } else {
                    r / norm
                }
            })
            .collect();
        self.transform_2d(&mut spectrum, false);

        let mut peak = 0;
        for (i, value) in spectrum.iter().enumerate() {
            if value.re > spectrum[peak].re {
                peak = i;
            }
        }

        Ok(Displacement {
            x: fold(peak % self.width, self.width),
            y: fold(peak / self.width, self.height),
        })
    }

    fn forward(&self, plane: &Array2<u8>) -> Vec<Complex64> {
        let mut buffer: Vec<Complex64> = plane
            .iter()
            .map(|&v| Complex64::new(f64::from(v), 0.0))
            .collect();
        self.transform_2d(&mut buffer, true);
        buffer
    }

    /// Row transforms, then column transforms through a transposed copy
    fn transform_2d(&self, buffer: &mut Vec<Complex64>, forward: bool) {
        let (rows, columns) = if forward {
            (&self.row_forward, &self.column_forward)
        } else {
            (&self.row_inverse, &self.column_inverse)
        };
        rows.process(buffer);
        let mut transposed = transpose(buffer, self.height, self.width);
        columns.process(&mut transposed);
        *buffer = transpose(&transposed, self.width, self.height);
    }
}

/// Transpose a row-major `rows x columns` buffer
fn transpose(buffer: &[Complex64], rows: usize, columns: usize) -> Vec<Complex64> {
    let mut out = Vec::with_capacity(buffer.len());
    for c in 0..columns {
        for r in 0..rows {
            out.push(buffer[r * columns + c]);
        }
    }
    out
}

fn fold(index: usize, len: usize) -> i64 {
    if index > len / 2 {
        index as i64 - len as i64
    } else {
        index as i64
    }
}

impl<R: Read + Seek> SeriesReader<'_, R> {
    /// Displacement of every frame relative to the previous one
    ///
    /// Uses the middle Z plane when the series has a Z axis. The first
    /// frame is always `{0, 0}`.
    pub fn estimate_displacements_2d(&mut self) -> Result<Vec<Displacement>, ReaderError> {
        let metadata = self.metadata();
        let frame_count = metadata.frame_count();
        let has_t = metadata.dimension(DimensionId::T).is_some();
        let mut base = Coordinates::new();
        if let Some(z) = metadata.dimension(DimensionId::Z) {
            if !metadata.is_plane_axis(DimensionId::Z) {
                base.set(DimensionId::Z, z.count / 2);
            }
        }

        let plane_at = |t: u64| {
            let mut coords = base.clone();
            if has_t {
                coords.set(DimensionId::T, t);
            }
            coords
        };

        let mut displacements = Vec::with_capacity(frame_count as usize);
        if frame_count == 0 {
            return Ok(displacements);
        }
        displacements.push(Displacement::default());

        let mut previous = self.read_plane(&plane_at(0))?;
        let (height, width) = previous.dim();
        let correlator = PhaseCorrelator::new(height, width);
        for t in 1..frame_count {
            let current = self.read_plane(&plane_at(t))?;
            let displacement = correlator.estimate(&previous, &current)?;
            debug!("Frame {}: displacement {:?}", t, displacement);
            displacements.push(displacement);
            previous = current;
        }
        Ok(displacements)
    }
}
