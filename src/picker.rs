//! Stand-in for a platform image picker: takes a user-entered path, verifies
//! the process may read it, and decodes the file into memory. Picking never
//! persists anything; the caller decides what to do with the image.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories::BaseDirs;
use image::DynamicImage;
use thiserror::Error;

use crate::imaging::{self, ImagingError};

/// Ways a pick can fail. Denied access is its own variant because the UI
/// surfaces it as a notice, while everything else is only logged.
#[derive(Debug, Error)]
pub enum PickError {
    /// The process lacks read access to the file.
    #[error("no permission to read {}", .path.display())]
    PermissionDenied {
        /// The path that was refused.
        path: PathBuf,
    },
    /// The file could not be opened or read for any other reason.
    #[error("failed to read {}", .path.display())]
    Io {
        /// The path that failed.
        path: PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: io::Error,
    },
    /// The file was readable but not a decodable image.
    #[error("{} is not a usable image", .path.display())]
    Decode {
        /// The path that failed.
        path: PathBuf,
        /// Underlying decoder error.
        #[source]
        source: ImagingError,
    },
}

/// Expand a leading `~` to the user's home directory so the form accepts the
/// paths people actually type. Anything else passes through untouched.
pub fn expand_home(input: &str) -> PathBuf {
    if input == "~" || input.starts_with("~/") {
        if let Some(base_dirs) = BaseDirs::new() {
            let home = base_dirs.home_dir();
            return match input.strip_prefix("~/") {
                Some(rest) => home.join(rest),
                None => home.to_path_buf(),
            };
        }
    }
    PathBuf::from(input)
}

/// Verify read access to `path`, classifying denial apart from other I/O
/// problems. Runs before any bytes are read so a denial aborts the pick
/// cleanly.
pub fn check_read_access(path: &Path) -> Result<(), PickError> {
    match fs::File::open(path) {
        Ok(_) => Ok(()),
        Err(source) if source.kind() == io::ErrorKind::PermissionDenied => {
            Err(PickError::PermissionDenied {
                path: path.to_path_buf(),
            })
        }
        Err(source) => Err(PickError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// The pick itself: access check, read, decode. The decoded image stays in
/// memory only; storage happens later, on save.
pub fn pick_image(path: &Path) -> Result<DynamicImage, PickError> {
    check_read_access(path)?;

    let bytes = fs::read(path).map_err(|source| PickError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    imaging::decode_image(&bytes).map_err(|source| PickError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};

    fn temp_file(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("recipe-book-picker-{}-{}", name, std::process::id()))
    }

    #[test]
    fn test_pick_image_decodes_a_real_file() {
        let source = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            200,
            100,
            Rgba([200, 40, 40, 255]),
        ));
        let bytes = imaging::encode_for_storage(&source).unwrap();
        let path = temp_file("decode.png");
        fs::write(&path, bytes).unwrap();

        let picked = pick_image(&path).unwrap();
        assert_eq!(picked.dimensions(), (300, 150));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_pick_image_missing_file_is_io() {
        let err = pick_image(Path::new("/definitely/not/here.png")).unwrap_err();
        assert!(matches!(err, PickError::Io { .. }));
    }

    #[test]
    fn test_pick_image_non_image_is_decode() {
        let path = temp_file("not-an-image.txt");
        fs::write(&path, b"shopping list").unwrap();

        let err = pick_image(&path).unwrap_err();
        assert!(matches!(err, PickError::Decode { .. }));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_check_read_access_accepts_readable_file() {
        let path = temp_file("readable");
        fs::write(&path, b"ok").unwrap();

        assert!(check_read_access(&path).is_ok());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_expand_home_rewrites_tilde_paths() {
        let expanded = expand_home("~/pictures/pasta.png");
        assert!(!expanded.starts_with("~"));
        assert!(expanded.ends_with("pictures/pasta.png"));

        assert_eq!(expand_home("/tmp/pasta.png"), PathBuf::from("/tmp/pasta.png"));
    }
}
