//! Binding to the pdfium shared library.
//!
//! Resolution order, first match wins:
//!
//! 1. `PDFIUM_LIB_PATH`: a path to the library file, or to a directory
//!    containing it under its platform name.
//! 2. The platform library name in the current working directory.
//! 3. The system library search path.

use crate::error::ConvertError;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable pointing at libpdfium or its directory.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Bind to pdfium following the resolution order above.
pub fn bind_pdfium() -> Result<Pdfium, ConvertError> {
    let mut attempts = Vec::new();

    if let Some(path) = env_library_path() {
        match try_bind(&path) {
            Ok(p) => return Ok(p),
            Err(e) => attempts.push(e),
        }
    }

    let local = PathBuf::from(Pdfium::pdfium_platform_library_name_at_path("./"));
    if local.exists() {
        match try_bind(&local) {
            Ok(p) => return Ok(p),
            Err(e) => attempts.push(e),
        }
    }

    match Pdfium::bind_to_system_library() {
        Ok(bindings) => {
            debug!("Bound pdfium from the system library path");
            Ok(Pdfium::new(bindings))
        }
        Err(e) => {
            attempts.push(format!("system library: {e:?}"));
            Err(ConvertError::PdfiumBindingFailed(attempts.join("; ")))
        }
    }
}

/// Bind to a pdfium library at an explicit `path`.
pub fn bind_pdfium_from_path(path: &Path) -> Result<Pdfium, ConvertError> {
    try_bind(path).map_err(ConvertError::PdfiumBindingFailed)
}

fn try_bind(path: &Path) -> Result<Pdfium, String> {
    Pdfium::bind_to_library(path)
        .map(|bindings| {
            debug!("Bound pdfium from {}", path.display());
            Pdfium::new(bindings)
        })
        .map_err(|e| format!("{}: {e:?}", path.display()))
}

/// Resolve `PDFIUM_LIB_PATH` to a library file path, if set.
fn env_library_path() -> Option<PathBuf> {
    let raw = std::env::var(PDFIUM_LIB_PATH_ENV).ok()?;
    if raw.is_empty() {
        return None;
    }
    Some(resolve_library_path(Path::new(&raw)))
}

fn resolve_library_path(path: &Path) -> PathBuf {
    if path.is_dir() {
        let dir = path.to_string_lossy().to_string();
        PathBuf::from(Pdfium::pdfium_platform_library_name_at_path(&dir))
    } else {
        path.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_resolves_to_platform_name() {
        let dir = std::env::temp_dir();
        let resolved = resolve_library_path(&dir);
        assert!(resolved.starts_with(&dir));
        assert_ne!(resolved, dir);
    }

    #[test]
    fn file_path_is_kept() {
        let p = Path::new("/opt/pdfium/lib/libpdfium.so");
        assert_eq!(resolve_library_path(p), p.to_path_buf());
    }

    #[test]
    fn missing_library_path_fails_with_binding_error() {
        let err = bind_pdfium_from_path(Path::new("/definitely/not/libpdfium.so"))
            .err()
            .expect("binding a missing file must fail");
        assert!(matches!(err, ConvertError::PdfiumBindingFailed(_)));
    }
}
