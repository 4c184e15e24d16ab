//! Slide frame sources.
//!
//! The deck is rendered to images by an external tool; a frame source only
//! has to say how many frames exist and where each image lives.

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors from frame sources.
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Slide directory not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to list slides in {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Frame {index} out of range (deck has {count} frames)")]
    OutOfRange { index: usize, count: usize },
}

/// Result type for frame operations.
pub type FrameResult<T> = Result<T, FrameError>;

/// Per-frame slide images.
pub trait FrameSource: Send + Sync {
    fn frame_count(&self) -> usize;

    /// Image file for frame `index`.
    fn frame_image(&self, index: usize) -> FrameResult<PathBuf>;
}

/// Image extensions recognised as slides.
pub const SLIDE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

/// Frames read from a directory of rendered slide images.
///
/// Files are ordered with a natural sort so `slide_2.png` precedes
/// `slide_10.png`.
#[derive(Debug, Clone)]
pub struct ImageDirFrameSource {
    dir: PathBuf,
    images: Vec<PathBuf>,
}

impl ImageDirFrameSource {
    /// Scan `dir`; with `skip_first` the first image (title slide) is dropped.
    pub fn open(dir: impl Into<PathBuf>, skip_first: bool) -> FrameResult<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(FrameError::NotFound(dir));
        }

        let entries = fs::read_dir(&dir).map_err(|source| FrameError::Io {
            path: dir.clone(),
            source,
        })?;

        let mut images: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && is_slide_image(p))
            .collect();
        images.sort_by(|a, b| natural_cmp(&file_name(a), &file_name(b)));

        if skip_first && !images.is_empty() {
            let title = images.remove(0);
            tracing::debug!("Skipping title slide {}", title.display());
        }

        tracing::info!("Found {} slide frame(s) in {}", images.len(), dir.display());
        Ok(Self { dir, images })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn images(&self) -> &[PathBuf] {
        &self.images
    }
}

impl FrameSource for ImageDirFrameSource {
    fn frame_count(&self) -> usize {
        self.images.len()
    }

    fn frame_image(&self, index: usize) -> FrameResult<PathBuf> {
        self.images
            .get(index)
            .cloned()
            .ok_or(FrameError::OutOfRange {
                index,
                count: self.images.len(),
            })
    }
}

fn is_slide_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SLIDE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Compare strings treating runs of ASCII digits as numbers.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let (mut a, mut b) = (a, b);
    loop {
        match (a.chars().next(), b.chars().next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(ca), Some(cb)) if ca.is_ascii_digit() && cb.is_ascii_digit() => {
                let (na, rest_a) = split_digits(a);
                let (nb, rest_b) = split_digits(b);
                let ord = compare_numeric(na, nb);
                if ord != Ordering::Equal {
                    return ord;
                }
                a = rest_a;
                b = rest_b;
            }
            (Some(ca), Some(cb)) => {
                let ord = ca.to_ascii_lowercase().cmp(&cb.to_ascii_lowercase());
                if ord != Ordering::Equal {
                    return ord;
                }
                a = &a[ca.len_utf8()..];
                b = &b[cb.len_utf8()..];
            }
        }
    }
}

fn split_digits(s: &str) -> (&str, &str) {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s.split_at(end)
}

fn compare_numeric(a: &str, b: &str) -> Ordering {
    let a_trim = a.trim_start_matches('0');
    let b_trim = b.trim_start_matches('0');
    a_trim
        .len()
        .cmp(&b_trim.len())
        .then_with(|| a_trim.cmp(b_trim))
        // "01" after "1" so distinct names never compare equal
        .then_with(|| a.len().cmp(&b.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn natural_sort_orders_numbers_by_value() {
        let mut names = vec!["slide_10.png", "slide_2.png", "slide_1.png", "Slide_3.png"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(names, vec!["slide_1.png", "slide_2.png", "Slide_3.png", "slide_10.png"]);
    }

    #[test]
    fn leading_zeros_compare_by_value() {
        assert_eq!(natural_cmp("slide_09", "slide_10"), Ordering::Less);
        assert_eq!(natural_cmp("a", "a"), Ordering::Equal);
        assert_ne!(natural_cmp("a01", "a1"), Ordering::Equal);
    }

    #[test]
    fn scans_images_and_skips_title() {
        let dir = tempdir().unwrap();
        for name in ["slide_10.png", "slide_2.jpg", "slide_1.png", "notes.txt", "slide_3.WEBP"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }

        let all = ImageDirFrameSource::open(dir.path(), false).unwrap();
        assert_eq!(all.frame_count(), 4);
        assert!(all.frame_image(0).unwrap().ends_with("slide_1.png"));
        assert!(all.frame_image(3).unwrap().ends_with("slide_10.png"));

        let skipped = ImageDirFrameSource::open(dir.path(), true).unwrap();
        assert_eq!(skipped.frame_count(), 3);
        assert!(skipped.frame_image(0).unwrap().ends_with("slide_2.jpg"));
        assert!(matches!(
            skipped.frame_image(3),
            Err(FrameError::OutOfRange { index: 3, count: 3 })
        ));
    }

    #[test]
    fn missing_directory_is_reported() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            ImageDirFrameSource::open(dir.path().join("nope"), false),
            Err(FrameError::NotFound(_))
        ));
    }
}
