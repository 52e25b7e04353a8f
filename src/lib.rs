#![deny(unsafe_code)]
#![warn(
    clippy::all,
    clippy::doc_markdown,
    clippy::enum_glob_use,
    clippy::exit,
    clippy::explicit_into_iter_loop,
    clippy::filter_map_next,
    clippy::fn_params_excessive_bools,
    clippy::inefficient_to_string,
    clippy::invalid_upcast_comparisons,
    clippy::large_types_passed_by_value,
    clippy::let_unit_value,
    clippy::macro_use_imports,
    clippy::map_flatten,
    clippy::map_unwrap_or,
    clippy::match_same_arms,
    clippy::mem_forget,
    clippy::mut_mut,
    clippy::needless_borrow,
    clippy::needless_continue,
    clippy::option_option,
    clippy::string_add_assign,
    clippy::string_add,
    clippy::todo,
    clippy::unimplemented,
    clippy::unnested_or_patterns,
    clippy::unused_self,
    clippy::verbose_file_reads,
    future_incompatible,
    nonstandard_style,
    rust_2018_idioms
)]

//! `exemplar-inpaint` removes objects from images by exemplar-based
//! inpainting, following Criminisi, Perez and Toyama's "Object Removal by
//! Exemplar-Based Inpainting" (CVPR 2003).
//!
//! A mask selects the region to remove. The engine fills it from the
//! boundary inward: each step it picks the boundary patch where known
//! texture and image structure give the most information, finds the
//! best-matching patch elsewhere in the frame, and clones it over the hole.
//! Structures such as edges and lines are continued into the filled region
//! instead of being smeared, which is what sets this approach apart from
//! diffusion-based inpainting.
//!
//! Two API levels are provided:
//!
//! * [`Session`] loads images through the `image` crate, fills them and
//!   hands back the result. Start here.
//! * [`Engine`] runs on caller-owned pixel buffers in several packed and
//!   planar layouts, so video pipelines can fill frames without copies.
//!
//! ## Usage
//! Session follows a "builder pattern" for defining parameters, meaning you chain functions together.
//!
//! ```no_run
//! // Create a new session with default parameters
//! let session = exemplar_inpaint::Session::builder()
//!     // The image to repair
//!     .image(&"imgs/photo.jpg")
//!     // White pixels in the mask mark the object to remove
//!     .mask(&"imgs/object.png")
//!     // Build the session
//!     .build().expect("failed to build session");
//!
//! // Fill the masked region
//! let filled = session.run().expect("inpaint failed");
//!
//! // Save the result to disk
//! filled.save("photo_fixed.jpg").expect("failed to save image");
//! ```
mod engine;
mod errors;
mod frame;
pub mod session;
mod utils;
use utils::*;

pub use image;
use std::path::Path;

pub use engine::{Dilate, Engine, RunParams};
pub use errors::Error;
pub use frame::{FrameMut, MaskRef, PackedFrame, PixelLayout, PlanarFrame};
pub use session::{Session, SessionBuilder};
pub use utils::{load_dynamic_image, ImageSource};

/// Simple dimensions struct
#[derive(Copy, Clone)]
#[cfg_attr(test, derive(Debug, PartialEq))]
pub struct Dims {
    pub width: u32,
    pub height: u32,
}

impl Dims {
    pub fn square(size: u32) -> Self {
        Self {
            width: size,
            height: size,
        }
    }
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// The filled image produced by a [`Session`] run.
pub struct Inpainted {
    image: image::RgbaImage,
    steps: i32,
}

impl Inpainted {
    /// The number of fill steps the engine executed. Negative when the run
    /// aborted because the mask left no usable boundary, for example a mask
    /// covering the whole frame.
    pub fn steps(&self) -> i32 {
        self.steps
    }

    /// Saves the filled image to the specified path
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let path = path.as_ref();
        if let Some(parent_path) = path.parent() {
            std::fs::create_dir_all(&parent_path)?;
        }

        self.image.save(&path)?;
        Ok(())
    }

    /// Writes the filled image to the specified stream
    pub fn write<W: std::io::Write>(
        self,
        writer: &mut W,
        fmt: image::ImageOutputFormat,
    ) -> Result<(), Error> {
        let dyn_img = self.into_image();
        Ok(dyn_img.write_to(writer, fmt)?)
    }

    /// Returns the filled image
    pub fn into_image(self) -> image::DynamicImage {
        image::DynamicImage::ImageRgba8(self.image)
    }
}

impl AsRef<image::RgbaImage> for Inpainted {
    fn as_ref(&self) -> &image::RgbaImage {
        &self.image
    }
}
