use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, RgbaImage};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Fallback file name for compositor exports.
pub const COMPOSITION_FILENAME: &str = "composition.png";
/// Fallback file name for liquify exports.
pub const LIQUIFY_FILENAME: &str = "liquified.png";

/// Decode any supported raster format into RGBA.
pub fn decode_image(bytes: &[u8]) -> Result<RgbaImage> {
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

/// Read and decode an image file.  The encoded bytes are returned as well so
/// callers can keep the original for background removal.
pub fn load_image_file(path: &Path) -> Result<(RgbaImage, Vec<u8>)> {
    let bytes = fs::read(path)?;
    let image = decode_image(&bytes)?;
    crate::log_info!(
        "loaded {} ({}×{}, {} bytes)",
        path.display(),
        image.width(),
        image.height(),
        bytes.len()
    );
    Ok((image, bytes))
}

/// Encode an RGBA buffer as PNG bytes.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let encoder = PngEncoder::new(&mut out);
    encoder.write_image(image.as_raw(), image.width(), image.height(), ColorType::Rgba8)?;
    Ok(out)
}

/// A native "save as" picker.
pub trait SaveDialog {
    /// Ask the user where to save.  `None` means the user cancelled.
    fn pick_save_path(&self, default_name: &str) -> Option<PathBuf>;
}

/// Save exported bytes.  When a picker is available it decides the
/// destination (and a cancel saves nothing); otherwise the bytes are written
/// to `fallback_dir/default_name`.  Returns the path written, if any.
pub fn save_export(
    bytes: &[u8],
    dialog: Option<&dyn SaveDialog>,
    fallback_dir: &Path,
    default_name: &str,
) -> Result<Option<PathBuf>> {
    let path = match dialog {
        Some(dialog) => match dialog.pick_save_path(default_name) {
            Some(path) => path,
            None => {
                crate::log_info!("export cancelled");
                return Ok(None);
            }
        },
        None => fallback_dir.join(default_name),
    };
    write_bytes(&path, bytes)?;
    crate::log_info!("exported {} bytes to {}", bytes.len(), path.display());
    Ok(Some(path))
}

fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(bytes)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    struct FixedDialog(Option<PathBuf>);

    impl SaveDialog for FixedDialog {
        fn pick_save_path(&self, _default_name: &str) -> Option<PathBuf> {
            self.0.clone()
        }
    }

    fn sample() -> RgbaImage {
        RgbaImage::from_fn(5, 3, |x, y| Rgba([x as u8 * 40, y as u8 * 80, 3, (x * 50) as u8]))
    }

    #[test]
    fn png_keeps_pixels_and_alpha() {
        let img = sample();
        let bytes = encode_png(&img).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        assert_eq!(decode_image(&bytes).unwrap(), img);
    }

    #[test]
    fn garbage_fails_to_decode() {
        assert!(decode_image(b"definitely not pixels").is_err());
    }

    #[test]
    fn fallback_writes_fixed_name() {
        let dir = tempfile::tempdir().unwrap();
        let written = save_export(b"abc", None, dir.path(), COMPOSITION_FILENAME).unwrap();
        let expected = dir.path().join("composition.png");
        assert_eq!(written, Some(expected.clone()));
        assert_eq!(fs::read(expected).unwrap(), b"abc");
    }

    #[test]
    fn dialog_choice_wins_over_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let chosen = dir.path().join("mine.png");
        let dialog = FixedDialog(Some(chosen.clone()));
        let written = save_export(b"xyz", Some(&dialog), dir.path(), LIQUIFY_FILENAME).unwrap();
        assert_eq!(written, Some(chosen.clone()));
        assert!(chosen.exists());
        assert!(!dir.path().join(LIQUIFY_FILENAME).exists());
    }

    #[test]
    fn cancelled_dialog_saves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let dialog = FixedDialog(None);
        let written = save_export(b"xyz", Some(&dialog), dir.path(), LIQUIFY_FILENAME).unwrap();
        assert_eq!(written, None);
        assert!(!dir.path().join(LIQUIFY_FILENAME).exists());
    }

    #[test]
    fn load_image_file_returns_original_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.png");
        let bytes = encode_png(&sample()).unwrap();
        fs::write(&path, &bytes).unwrap();
        let (img, original) = load_image_file(&path).unwrap();
        assert_eq!(img, sample());
        assert_eq!(original, bytes);
    }
}
