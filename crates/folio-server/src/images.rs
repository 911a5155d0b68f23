//! Filesystem storage for book cover images.
//!
//! Images are decoded, re-encoded as JPEG and stored under
//! `{storage_dir}/{book_id}/{hash}.jpg` with a `{hash}_thumb.jpg` variant
//! scaled to the configured thumbnail width. Paths handed to the database are
//! relative to the storage directory.

use std::io::Cursor;
use std::path::{Component, Path, PathBuf};

use folio_core::config::ImageConfig;
use folio_core::{BookId, Error, Result};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use sha2::{Digest, Sha256};

/// Metadata about a stored image file.
#[derive(Debug, Clone)]
pub struct StoredImage {
    /// Content hash (first 16 hex chars of SHA-256 of the uploaded bytes).
    pub hash: String,
    pub width: u32,
    pub height: u32,
    /// Path of the full-size file relative to the storage directory.
    pub path: String,
}

pub struct ImageStore {
    base_dir: PathBuf,
    max_upload_bytes: usize,
    thumbnail_width: u32,
}

impl ImageStore {
    pub fn new(config: &ImageConfig) -> Self {
        Self {
            base_dir: config.storage_dir.clone(),
            max_upload_bytes: config.max_upload_bytes,
            thumbnail_width: config.thumbnail_width,
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Decode `data`, write the JPEG and its thumbnail, and describe the
    /// result. Storing the same bytes twice rewrites the same files.
    pub fn store(&self, book_id: BookId, data: &[u8]) -> Result<StoredImage> {
        if data.is_empty() {
            return Err(Error::Validation("Image body is empty".into()));
        }
        if data.len() > self.max_upload_bytes {
            return Err(Error::Validation(format!(
                "Image is {} bytes; the limit is {}",
                data.len(),
                self.max_upload_bytes
            )));
        }

        let hash = compute_hash(data);
        let img = image::load_from_memory(data)
            .map_err(|e| Error::Validation(format!("Unsupported or corrupt image: {e}")))?;
        // JPEG has no alpha channel.
        let img = DynamicImage::ImageRgb8(img.to_rgb8());
        let (width, height) = (img.width(), img.height());

        let dir = self.base_dir.join(book_id.to_string());
        std::fs::create_dir_all(&dir)?;

        let path = format!("{book_id}/{hash}.jpg");
        std::fs::write(self.base_dir.join(&path), encode_jpeg(&img)?)?;

        if self.thumbnail_width > 0 {
            let thumb = if width > self.thumbnail_width {
                img.resize(self.thumbnail_width, u32::MAX, FilterType::Lanczos3)
            } else {
                img
            };
            std::fs::write(self.base_dir.join(thumb_path(&path)), encode_jpeg(&thumb)?)?;
        }

        tracing::debug!(%book_id, %hash, width, height, "Stored image");
        Ok(StoredImage {
            hash,
            width,
            height,
            path,
        })
    }

    /// Read a stored file. With `thumb` the thumbnail is preferred and the
    /// full-size file is the fallback.
    pub fn read(&self, rel_path: &str, thumb: bool) -> Result<Vec<u8>> {
        if thumb {
            match std::fs::read(self.resolve(&thumb_path(rel_path))?) {
                Ok(bytes) => return Ok(bytes),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        match std::fs::read(self.resolve(rel_path)?) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::not_found("image file", rel_path))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a stored file and its thumbnail. Missing files are ignored.
    pub fn remove(&self, rel_path: &str) -> Result<()> {
        for p in [rel_path.to_string(), thumb_path(rel_path)] {
            match std::fs::remove_file(self.resolve(&p)?) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Join a stored relative path onto the base directory, refusing
    /// anything that could escape it.
    fn resolve(&self, rel_path: &str) -> Result<PathBuf> {
        let rel = Path::new(rel_path);
        if !rel.components().all(|c| matches!(c, Component::Normal(_))) {
            return Err(Error::Validation(format!("Invalid image path '{rel_path}'")));
        }
        Ok(self.base_dir.join(rel))
    }
}

/// `abc/123.jpg` becomes `abc/123_thumb.jpg`.
pub fn thumb_path(path: &str) -> String {
    match path.strip_suffix(".jpg") {
        Some(stem) => format!("{stem}_thumb.jpg"),
        None => format!("{path}_thumb"),
    }
}

/// Compute a content hash for image data (first 16 hex chars of SHA-256).
fn compute_hash(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    hex::encode(&digest[..8])
}

fn encode_jpeg(img: &DynamicImage) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Jpeg)
        .map_err(|e| Error::Internal(format!("Failed to encode JPEG: {e}")))?;
    Ok(buf.into_inner())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A small PNG with an alpha channel.
    pub(crate) fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 40, 40, 128]));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    fn store(dir: &Path, thumbnail_width: u32) -> ImageStore {
        ImageStore::new(&ImageConfig {
            storage_dir: dir.to_path_buf(),
            max_upload_bytes: 1024 * 1024,
            thumbnail_width,
        })
    }

    #[test]
    fn stores_jpeg_and_thumbnail() {
        let dir = tempfile::tempdir().unwrap();
        let s = store(dir.path(), 50);
        let book = BookId::new();
        let stored = s.store(book, &png(300, 450)).unwrap();

        assert_eq!((stored.width, stored.height), (300, 450));
        assert_eq!(stored.hash.len(), 16);
        assert_eq!(stored.path, format!("{book}/{}.jpg", stored.hash));

        let full = image::load_from_memory(&s.read(&stored.path, false).unwrap()).unwrap();
        assert_eq!(full.width(), 300);
        let thumb = image::load_from_memory(&s.read(&stored.path, true).unwrap()).unwrap();
        assert_eq!(thumb.width(), 50);
        assert_eq!(thumb.height(), 75);
    }

    #[test]
    fn thumbnail_falls_back_to_full_size() {
        let dir = tempfile::tempdir().unwrap();
        let s = store(dir.path(), 0);
        let stored = s.store(BookId::new(), &png(20, 20)).unwrap();
        let bytes = s.read(&stored.path, true).unwrap();
        assert_eq!(image::load_from_memory(&bytes).unwrap().width(), 20);
    }

    #[test]
    fn rejects_garbage_and_oversized_bodies() {
        let dir = tempfile::tempdir().unwrap();
        let s = store(dir.path(), 50);
        assert!(matches!(
            s.store(BookId::new(), b"definitely not an image"),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            s.store(BookId::new(), &vec![0u8; 2 * 1024 * 1024]),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn remove_is_idempotent_and_paths_are_confined() {
        let dir = tempfile::tempdir().unwrap();
        let s = store(dir.path(), 50);
        let stored = s.store(BookId::new(), &png(100, 100)).unwrap();
        s.remove(&stored.path).unwrap();
        s.remove(&stored.path).unwrap();
        assert!(matches!(s.read(&stored.path, false), Err(Error::NotFound { .. })));
        assert!(matches!(s.read("../etc/passwd", false), Err(Error::Validation(_))));
    }

    #[test]
    fn thumb_path_naming() {
        assert_eq!(thumb_path("a/b.jpg"), "a/b_thumb.jpg");
    }
}
