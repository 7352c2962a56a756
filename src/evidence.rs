use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    WebP,
    Unknown,
}

impl ImageFormat {
    /// Guess the format from the leading magic bytes.
    pub fn sniff(bytes: &[u8]) -> Self {
        match bytes {
            [0xFF, 0xD8, 0xFF, ..] => ImageFormat::Jpeg,
            [0x89, b'P', b'N', b'G', ..] => ImageFormat::Png,
            [b'G', b'I', b'F', b'8', ..] => ImageFormat::Gif,
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => ImageFormat::WebP,
            _ => ImageFormat::Unknown,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::Gif => "gif",
            ImageFormat::WebP => "webp",
            ImageFormat::Unknown => "bin",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
            ImageFormat::Gif => "gif",
            ImageFormat::WebP => "webp",
            ImageFormat::Unknown => "unknown",
        }
    }
}

/// Page image the backend retrieved to support an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evidence {
    pub image: Vec<u8>,
    pub page: Option<u32>,
}

impl Evidence {
    /// Build evidence from the reply fields.
    ///
    /// A missing or blank image means there is no evidence, whatever the page
    /// number says. The backend sends `""` and page `0` when nothing matched.
    pub fn from_reply(
        image_b64: Option<&str>,
        page: Option<u32>,
    ) -> Result<Option<Self>, base64::DecodeError> {
        let Some(encoded) = image_b64.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(None);
        };

        // Tolerate a data URL in place of bare base64
        let encoded = match encoded.split_once(";base64,") {
            Some((prefix, rest)) if prefix.starts_with("data:") => rest,
            _ => encoded,
        };

        let image = STANDARD.decode(encoded)?;
        Ok(Some(Self { image, page }))
    }

    pub fn format(&self) -> ImageFormat {
        ImageFormat::sniff(&self.image)
    }

    pub fn caption(&self) -> String {
        match self.page {
            Some(page) => format!("📄 Retrieved from Page {}:", page),
            None => "📄 Retrieved page:".to_string(),
        }
    }

    pub fn summary(&self) -> String {
        format!("[{} image, {}]", self.format().label(), human_size(self.image.len()))
    }

    pub fn file_name(&self, entry: usize) -> String {
        let page = self
            .page
            .map(|p| p.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        format!("page-{}-{}.{}", page, entry, self.format().extension())
    }

    /// Write the image into `dir`, creating it if needed.
    pub fn save_in(&self, dir: &Path, entry: usize) -> io::Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name(entry));
        fs::write(&path, &self.image)?;
        Ok(path)
    }
}

fn human_size(bytes: usize) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;

    let b = bytes as f64;
    if b >= MIB {
        format!("{:.1} MiB", b / MIB)
    } else if b >= KIB {
        format!("{:.1} KiB", b / KIB)
    } else {
        format!("{} B", bytes)
    }
}
