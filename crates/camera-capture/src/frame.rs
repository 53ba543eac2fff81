//! Camera frame types

use crate::ExtractError;

/// One image plane as handed out by the camera subsystem
#[derive(Debug, Clone)]
pub struct Plane {
    /// Raw plane bytes
    pub data: Vec<u8>,
    /// Bytes between the starts of two consecutive rows
    pub row_stride: usize,
    /// Bytes between two consecutive samples of a row
    pub pixel_stride: usize,
}

impl Plane {
    /// Create a tightly packed plane (pixel stride 1)
    pub fn packed(data: Vec<u8>, row_stride: usize) -> Self {
        Self {
            data,
            row_stride,
            pixel_stride: 1,
        }
    }

    /// Minimum number of bytes needed to hold `cols` x `rows` samples
    fn required_len(&self, cols: usize, rows: usize) -> usize {
        (rows - 1) * self.row_stride + (cols - 1) * self.pixel_stride + 1
    }

    /// Check that `cols` x `rows` samples can be read from this plane
    fn check(&self, name: &'static str, cols: usize, rows: usize) -> Result<(), ExtractError> {
        if self.pixel_stride == 0 || self.row_stride < (cols - 1) * self.pixel_stride + 1 {
            return Err(ExtractError::InvalidStride {
                plane: name,
                row_stride: self.row_stride,
                pixel_stride: self.pixel_stride,
            });
        }

        let expected = self.required_len(cols, rows);
        if self.data.len() < expected {
            return Err(ExtractError::PlaneTooSmall {
                plane: name,
                expected,
                actual: self.data.len(),
            });
        }
        Ok(())
    }

    #[inline]
    fn sample(&self, col: usize, row: usize) -> u8 {
        self.data[row * self.row_stride + col * self.pixel_stride]
    }
}

/// Clockwise rotation needed to make a frame upright
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl TryFrom<u32> for Rotation {
    type Error = ExtractError;

    fn try_from(degrees: u32) -> Result<Self, Self::Error> {
        match degrees % 360 {
            0 => Ok(Rotation::Deg0),
            90 => Ok(Rotation::Deg90),
            180 => Ok(Rotation::Deg180),
            270 => Ok(Rotation::Deg270),
            _ => Err(ExtractError::UnsupportedRotation(degrees)),
        }
    }
}

impl Rotation {
    /// Rotation in degrees
    pub fn degrees(&self) -> u32 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// Whether width and height trade places
    pub fn swaps_dimensions(&self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }
}

/// A single YUV 4:2:0 capture from the camera.
///
/// The frame owns its planes; handing it to the extractor by value releases
/// the buffers as soon as extraction is done.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Luma plane
    pub y: Plane,
    /// Cb plane
    pub u: Plane,
    /// Cr plane
    pub v: Plane,
    /// Sensor width in pixels
    pub width: u32,
    /// Sensor height in pixels
    pub height: u32,
    /// Clockwise rotation reported by the sensor
    pub rotation_degrees: u32,
    /// Capture timestamp (nanoseconds)
    pub timestamp_ns: u64,
    /// Frame sequence number
    pub sequence: u64,
}

impl Frame {
    /// Build a frame from a packed I420 buffer (Y, then U, then V)
    pub fn from_i420(data: &[u8], width: u32, height: u32) -> Result<Self, ExtractError> {
        if width == 0 || height == 0 {
            return Err(ExtractError::EmptyFrame { width, height });
        }

        let (w, h) = (width as usize, height as usize);
        let (cw, ch) = chroma_dimensions(width, height);
        let luma_len = w * h;
        let chroma_len = cw * ch;
        let expected = luma_len + 2 * chroma_len;
        if data.len() < expected {
            return Err(ExtractError::PlaneTooSmall {
                plane: "I420",
                expected,
                actual: data.len(),
            });
        }

        let (y, rest) = data.split_at(luma_len);
        let (u, rest) = rest.split_at(chroma_len);
        let v = &rest[..chroma_len];

        Ok(Self {
            y: Plane::packed(y.to_vec(), w),
            u: Plane::packed(u.to_vec(), cw),
            v: Plane::packed(v.to_vec(), cw),
            width,
            height,
            rotation_degrees: 0,
            timestamp_ns: 0,
            sequence: 0,
        })
    }

    /// Set the sensor rotation
    pub fn with_rotation(mut self, degrees: u32) -> Self {
        self.rotation_degrees = degrees;
        self
    }

    /// Set sequence number and timestamp
    pub fn with_sequence(mut self, sequence: u64, timestamp_ns: u64) -> Self {
        self.sequence = sequence;
        self.timestamp_ns = timestamp_ns;
        self
    }

    /// Chroma plane dimensions (half resolution, rounded up)
    pub fn chroma_dimensions(&self) -> (usize, usize) {
        chroma_dimensions(self.width, self.height)
    }

    /// Interleave the three planes into a single NV21 buffer.
    ///
    /// Layout is the packed luma plane followed by one `V, U` pair per
    /// chroma sample. Cr comes first; the converter reads it in that order.
    pub fn to_nv21(&self) -> Result<Vec<u8>, ExtractError> {
        if self.width == 0 || self.height == 0 {
            return Err(ExtractError::EmptyFrame {
                width: self.width,
                height: self.height,
            });
        }

        let (w, h) = (self.width as usize, self.height as usize);
        let (cw, ch) = self.chroma_dimensions();

        self.y.check("Y", w, h)?;
        self.u.check("U", cw, ch)?;
        self.v.check("V", cw, ch)?;

        let mut nv21 = Vec::with_capacity(w * h + 2 * cw * ch);

        for row in 0..h {
            if self.y.pixel_stride == 1 {
                let start = row * self.y.row_stride;
                nv21.extend_from_slice(&self.y.data[start..start + w]);
            } else {
                nv21.extend((0..w).map(|col| self.y.sample(col, row)));
            }
        }

        for row in 0..ch {
            for col in 0..cw {
                nv21.push(self.v.sample(col, row));
                nv21.push(self.u.sample(col, row));
            }
        }

        Ok(nv21)
    }
}

pub(crate) fn chroma_dimensions(width: u32, height: u32) -> (usize, usize) {
    ((width as usize + 1) / 2, (height as usize + 1) / 2)
}

/// Compressed, upright image derived from a [`Frame`]
#[derive(Debug, Clone)]
pub struct EncodedImage {
    /// JPEG bytes
    pub bytes: Vec<u8>,
    /// Width after rotation
    pub width: u32,
    /// Height after rotation
    pub height: u32,
    /// Sequence number of the source frame
    pub sequence: u64,
}

impl EncodedImage {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
