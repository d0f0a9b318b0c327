//! Pipeline stages shared by the Page Rasterizer and Biometric Normalizer.
//!
//! Each submodule implements exactly one transformation step and consumes
//! the previous step's surface by value.
//!
//! ## Data Flow
//!
//! ```text
//! PDF   ──▶ render ─────────────────────────────────▶ encode
//!           (pdfium, page 0)                           (JPEG)
//!
//! Photo ──▶ decode ──▶ whiten? ──▶ crop ──▶ scale ──▶ encode
//!           (image)    (mask)      (center) (Lanczos3)
//! ```
//!
//! 1. [`decode`]: raster bytes to an RGBA surface at native resolution
//! 2. [`render`]: first PDF page to a surface at `scale`; runs in
//!    `spawn_blocking` because pdfium is synchronous
//! 3. [`whiten`]: mask stencil plus white backdrop
//! 4. [`crop`]: aspect-preserving center crop and exact-size rescale
//! 5. [`encode`]: flatten to opaque RGB and JPEG-encode

pub mod crop;
pub mod decode;
pub mod encode;
pub mod render;
pub mod whiten;
