use anyhow::{Context, Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::path::Path;

pub const JPEG_MIME: &str = "image/jpeg";

/// Image bytes on their way to the extraction client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    pub mime: String,
    pub name: Option<String>,
}

impl ImagePayload {
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read image file: {}", path.display()))?;
        let name = path
            .file_name()
            .and_then(|value| value.to_str())
            .map(|value| value.to_string());
        Self::from_bytes(bytes, name.as_deref())
    }

    /// Builds a payload from raw bytes, sniffing the mime type.
    ///
    /// Falls back to the file extension of `name` when the bytes are not
    /// recognised.
    pub fn from_bytes(bytes: Vec<u8>, name: Option<&str>) -> Result<Self> {
        if bytes.is_empty() {
            return Err(anyhow!("image data is empty"));
        }
        let mime = match sniff_image_mime(&bytes) {
            Some(mime) => mime,
            None => name
                .and_then(|name| Path::new(name).extension())
                .and_then(|ext| ext.to_str())
                .and_then(|ext| mime_from_extension(&ext.to_lowercase()))
                .ok_or_else(|| {
                    anyhow!(
                        "unable to detect image type for '{}'",
                        name.unwrap_or("stdin")
                    )
                })?
                .to_string(),
        };
        Ok(Self {
            bytes,
            mime,
            name: name.map(|value| value.to_string()),
        })
    }

    /// Accepts `data:<mime>;base64,<data>` or bare base64.
    pub fn from_data_uri(input: &str) -> Result<Self> {
        let (declared, encoded) = split_data_uri(input.trim());
        let bytes = BASE64
            .decode(encoded.trim())
            .with_context(|| "image data is not valid base64")?;
        if bytes.is_empty() {
            return Err(anyhow!("image data is empty"));
        }
        let mime = sniff_image_mime(&bytes)
            .or_else(|| declared.filter(|mime| mime.starts_with("image/")).map(str::to_string))
            .unwrap_or_else(|| JPEG_MIME.to_string());
        Ok(Self {
            bytes,
            mime,
            name: None,
        })
    }

    /// Encodes a still frame as JPEG.
    pub fn from_frame(frame: &DynamicImage) -> Result<Self> {
        let rgb = DynamicImage::ImageRgb8(frame.to_rgb8());
        let mut buffer = Cursor::new(Vec::new());
        rgb.write_to(&mut buffer, ImageFormat::Jpeg)
            .with_context(|| "failed to encode frame as JPEG")?;
        Ok(Self {
            bytes: buffer.into_inner(),
            mime: JPEG_MIME.to_string(),
            name: None,
        })
    }

    pub fn base64(&self) -> String {
        BASE64.encode(&self.bytes)
    }

    /// Displayable preview of the image.
    pub fn preview_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, self.base64())
    }
}

fn split_data_uri(input: &str) -> (Option<&str>, &str) {
    let Some(rest) = input.strip_prefix("data:") else {
        return (None, input);
    };
    let Some((header, data)) = rest.split_once(',') else {
        return (None, input);
    };
    let Some(mime) = header.strip_suffix(";base64") else {
        return (None, input);
    };
    (Some(mime).filter(|mime| !mime.is_empty()), data)
}

fn sniff_image_mime(bytes: &[u8]) -> Option<String> {
    let kind = infer::get(bytes)?;
    let detected = kind.mime_type();
    if detected.starts_with("image/") {
        Some(detected.to_string())
    } else {
        None
    }
}

fn mime_from_extension(ext: &str) -> Option<&'static str> {
    match ext {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some(JPEG_MIME),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "tiff" | "tif" => Some("image/tiff"),
        "heic" => Some("image/heic"),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) fn sample_png() -> Vec<u8> {
    let image = DynamicImage::new_rgb8(4, 3);
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Png).unwrap();
    buffer.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_data_uri_header() {
        assert_eq!(
            split_data_uri("data:image/jpeg;base64,AAAA"),
            (Some("image/jpeg"), "AAAA")
        );
        assert_eq!(split_data_uri("data:;base64,QUJD"), (None, "QUJD"));
        assert_eq!(split_data_uri("AAAA"), (None, "AAAA"));
        assert_eq!(
            split_data_uri("data:text/plain,hello"),
            (None, "data:text/plain,hello")
        );
    }

    #[test]
    fn data_uri_round_trips_to_bytes() {
        let png = sample_png();
        let uri = format!("data:image/png;base64,{}", BASE64.encode(&png));
        let payload = ImagePayload::from_data_uri(&uri).unwrap();
        assert_eq!(payload.bytes, png);
        assert_eq!(payload.mime, "image/png");
        assert_eq!(payload.preview_uri(), uri);
    }

    #[test]
    fn bare_base64_defaults_to_jpeg_when_unrecognised() {
        let payload = ImagePayload::from_data_uri("AQIDBA==").unwrap();
        assert_eq!(payload.bytes, vec![1, 2, 3, 4]);
        assert_eq!(payload.mime, JPEG_MIME);
    }

    #[test]
    fn rejects_invalid_base64() {
        assert!(ImagePayload::from_data_uri("data:image/png;base64,@@@").is_err());
        assert!(ImagePayload::from_data_uri("").is_err());
    }

    #[test]
    fn from_bytes_uses_extension_as_fallback() {
        let payload = ImagePayload::from_bytes(vec![0, 1, 2], Some("scan.JPG")).unwrap();
        assert_eq!(payload.mime, JPEG_MIME);
        assert!(ImagePayload::from_bytes(vec![0, 1, 2], Some("notes.txt")).is_err());
        assert!(ImagePayload::from_bytes(Vec::new(), Some("scan.png")).is_err());
    }

    #[test]
    fn from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("passport.png");
        std::fs::write(&path, sample_png()).unwrap();
        let payload = ImagePayload::from_path(&path).unwrap();
        assert_eq!(payload.mime, "image/png");
        assert_eq!(payload.name.as_deref(), Some("passport.png"));
    }

    #[test]
    fn frames_are_encoded_as_jpeg() {
        let frame = DynamicImage::new_rgba8(8, 8);
        let payload = ImagePayload::from_frame(&frame).unwrap();
        assert_eq!(payload.mime, JPEG_MIME);
        assert_eq!(infer::get(&payload.bytes).unwrap().mime_type(), JPEG_MIME);
    }
}
