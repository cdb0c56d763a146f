/* Fingerprint image capture, conversion, and download. */
use crate::engine::Driver;
use crate::error::{DriverError, Result};
use crate::protocol::{BufferId, Command, IMAGE_HEIGHT, IMAGE_WIDTH};

impl Driver {
    /// Capture a fingerprint image into the image buffer. `free` skips
    /// backlight control, useful when the caller manages lighting itself.
    pub async fn image_capture(&self, free: bool) -> Result<()> {
        let command = if free { Command::ImageCaptureFree } else { Command::ImageCapture };
        let _lock = self.serialize_commands().await;
        self.command_set(command.opcode(), &[], &[]).await
    }

    /// Convert the captured image into a feature set stored in `buffer`.
    pub async fn image_convert(&self, buffer: BufferId) -> Result<()> {
        let _lock = self.serialize_commands().await;
        self.command_set(Command::ImageConvert.opcode(), &[buffer.id()], &[]).await
    }

    /// Download the raw fingerprint image and unpack it into a
    /// `IMAGE_WIDTH * IMAGE_HEIGHT` grayscale raster, one byte per pixel,
    /// row-major.
    ///
    /// The sensor packs two 4-bit pixels per byte; each nibble is expanded to
    /// the low 4 bits shifted out of an 8-bit grayscale value (so the result
    /// spans the low half of the 0-255 range).
    pub async fn image_download(&self) -> Result<Vec<u8>> {
        let _lock = self.serialize_commands().await;
        let (_, data) = self.command_get(Command::ImageDownload.opcode(), &[], true).await?;
        unpack_image(&data)
    }
}

/// Expand a packed two-pixels-per-byte raw image into a one-byte-per-pixel
/// grayscale raster. Split out of `image_download` so the unpacking math is
/// unit-testable without a live transaction.
fn unpack_image(data: &[u8]) -> Result<Vec<u8>> {
    let half_width = IMAGE_WIDTH / 2;
    let expected = half_width * IMAGE_HEIGHT;
    if data.len() < expected {
        return Err(DriverError::Argument(format!(
            "image payload too short: got {} bytes, expected at least {expected}",
            data.len()
        )));
    }

    let mut pixels = vec![0u8; IMAGE_WIDTH * IMAGE_HEIGHT];
    for y in 0..IMAGE_HEIGHT {
        let row_offset = half_width * y;
        for x in 0..half_width {
            let byte = data[row_offset + x];
            let idx = 2 * x;
            pixels[y * IMAGE_WIDTH + idx] = (byte >> 4) << 4;
            pixels[y * IMAGE_WIDTH + idx + 1] = (byte & 0x0F) << 4;
        }
    }
    Ok(pixels)
}
