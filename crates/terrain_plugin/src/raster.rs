//! Decoded RGBA rasters and the windows display tiles read from them.

use crate::source::FetchError;

/// A decoded RGBA8 image, row-major from the north-west corner.
#[derive(Clone, Debug, PartialEq)]
pub struct Raster {
  pub width: u32,
  pub height: u32,
  pub pixels: Vec<[u8; 4]>,
}

/// Normalized sub-rectangle of a raster: `[u0, u0 + span] × [v0, v0 + span]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RasterWindow {
  pub u0: f64,
  pub v0: f64,
  pub span: f64,
}

impl RasterWindow {
  pub const FULL: RasterWindow = RasterWindow {
    u0: 0.0,
    v0: 0.0,
    span: 1.0,
  };
}

fn check_extent(width: u32, height: u32) -> Result<(), FetchError> {
  if width == 0 || height == 0 {
    return Err(FetchError::Malformed(format!(
      "empty raster {}x{}",
      width, height
    )));
  }
  Ok(())
}

impl Raster {
  /// Raster with every pixel set to `rgba`.
  pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
    Self {
      width,
      height,
      pixels: vec![rgba; width as usize * height as usize],
    }
  }

  /// Build from a packed RGBA byte buffer.
  pub fn from_rgba(width: u32, height: u32, bytes: &[u8]) -> Result<Self, FetchError> {
    check_extent(width, height)?;
    let expected = width as usize * height as usize * 4;
    if bytes.len() != expected {
      return Err(FetchError::Malformed(format!(
        "expected {} bytes for {}x{} RGBA, got {}",
        expected,
        width,
        height,
        bytes.len()
      )));
    }
    let pixels = bytes
      .chunks_exact(4)
      .map(|c| [c[0], c[1], c[2], c[3]])
      .collect();
    Ok(Self {
      width,
      height,
      pixels,
    })
  }

  /// Reject rasters that cannot be sampled: no pixels, or a pixel buffer
  /// that does not match the stated size.
  pub fn validate(&self) -> Result<(), FetchError> {
    check_extent(self.width, self.height)?;
    let expected = self.width as usize * self.height as usize;
    if self.pixels.len() != expected {
      return Err(FetchError::Malformed(format!(
        "{}x{} raster holds {} pixels",
        self.width,
        self.height,
        self.pixels.len()
      )));
    }
    Ok(())
  }

  #[inline]
  pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
    self.pixels[(y * self.width + x) as usize]
  }

  #[inline]
  pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
    let idx = (y * self.width + x) as usize;
    self.pixels[idx] = rgba;
  }

  /// Packed RGBA bytes.
  pub fn to_rgba_bytes(&self) -> Vec<u8> {
    self.pixels.iter().flatten().copied().collect()
  }

  /// Copy the window out at its native resolution (at least one pixel).
  pub fn crop(&self, window: RasterWindow) -> Raster {
    let x0 = ((window.u0 * self.width as f64).floor() as u32).min(self.width - 1);
    let y0 = ((window.v0 * self.height as f64).floor() as u32).min(self.height - 1);
    let w = ((window.span * self.width as f64).round() as u32)
      .clamp(1, self.width - x0);
    let h = ((window.span * self.height as f64).round() as u32)
      .clamp(1, self.height - y0);

    let mut out = Raster::filled(w, h, [0; 4]);
    for y in 0..h {
      for x in 0..w {
        out.set_pixel(x, y, self.pixel(x0 + x, y0 + y));
      }
    }
    out
  }

  /// Copy `src` into this raster with its north-west corner at `(x0, y0)`.
  /// Pixels falling outside are dropped.
  pub fn blit(&mut self, src: &Raster, x0: u32, y0: u32) {
    for y in 0..src.height {
      let ty = y0 + y;
      if ty >= self.height {
        break;
      }
      for x in 0..src.width {
        let tx = x0 + x;
        if tx >= self.width {
          break;
        }
        self.set_pixel(tx, ty, src.pixel(x, y));
      }
    }
  }
}
