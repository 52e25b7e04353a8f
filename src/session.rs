use crate::*;

/// An object-removal session over an image loaded through the `image` crate.
///
/// Calling `run()` fills the masked region in place and returns the result,
/// consuming the session in the process. The lower-level [`Engine`] API
/// works directly on caller-owned pixel buffers and supports more layouts;
/// the session covers the common load-fill-save flow.
///
/// # Example
/// ```no_run
/// let session = exemplar_inpaint::Session::builder()
///     .image(&"imgs/photo.jpg")
///     .mask(&"imgs/scratch.png")
///     .build().expect("failed to build session");
///
/// let filled = session.run().expect("inpaint failed");
/// filled.save("imgs/photo_fixed.jpg").expect("failed to save image");
/// ```
pub struct Session {
    image: image::RgbaImage,
    mask: Option<image::RgbaImage>,
    engine: Engine,
    params: RunParams,
}

impl Session {
    /// Creates a new session with default parameters.
    pub fn builder<'a>() -> SessionBuilder<'a> {
        SessionBuilder::default()
    }

    /// Runs the fill and outputs the completed image.
    pub fn run(self) -> Result<Inpainted, Error> {
        let Session {
            mut image,
            mask,
            mut engine,
            params,
        } = self;

        let stride = image.width() as usize * 4;
        let steps = {
            let buf: &mut [u8] = &mut image;
            let mut frame = FrameMut::packed(engine.layout(), buf, stride);
            let mask_ref = mask
                .as_ref()
                .map(|m| MaskRef::packed(m.as_raw(), m.width() as usize * 4));
            engine.run(&mut frame, mask_ref.as_ref(), &params)?
        };

        Ok(Inpainted { image, steps })
    }
}

/// Builds a session by setting parameters and adding input images, calling
/// `build` will check all of the provided inputs to verify that the fill
/// can run on them
#[derive(Default)]
pub struct SessionBuilder<'a> {
    image: Option<ImageSource<'a>>,
    mask: Option<ImageSource<'a>>,
    params: RunParams,
}

impl<'a> SessionBuilder<'a> {
    /// Creates a new `SessionBuilder`, can also be created via
    /// `Session::builder()`
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the image to fill. Required.
    pub fn image<I: Into<ImageSource<'a>>>(mut self, image: I) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Sets the mask image marking the region to remove. Pixels whose color
    /// matches `mask_color` exactly become the hole; the mask must have the
    /// same dimensions as the image.
    ///
    /// Without a mask the image's own alpha channel selects the hole:
    /// pixels with alpha above 127 are removed.
    pub fn mask<I: Into<ImageSource<'a>>>(mut self, mask: I) -> Self {
        self.mask = Some(mask.into());
        self
    }

    /// Sets the color that marks hole pixels in the mask, as `0xRRGGBB`.
    /// White by default.
    pub fn mask_color(mut self, color: u32) -> Self {
        self.params.mask_color = color;
        self
    }

    /// Sets the comparison window half-extents, in pixels. Larger windows
    /// copy texture more coherently but blur fine structure. 4x4 by
    /// default.
    pub fn window(mut self, half_width: i32, half_height: i32) -> Self {
        self.params.window_x = half_width;
        self.params.window_y = half_height;
        self
    }

    /// Sets the donor search radius. `0` (the default) estimates one from
    /// the hole thickness, negative values search the whole frame.
    pub fn search_radius(mut self, radius: i32) -> Self {
        self.params.radius = radius;
        self
    }

    /// Grows the mask by one pixel in the given directions before filling.
    pub fn dilate(mut self, dilate: Dilate) -> Self {
        self.params.dilate = dilate;
        self
    }

    /// Caps the number of fill steps.
    pub fn max_steps(mut self, steps: i32) -> Self {
        self.params.max_steps = steps;
        self
    }

    /// Loads the inputs and verifies that they agree with each other.
    pub fn build(self) -> Result<Session, Error> {
        let image = match self.image {
            Some(src) => load_image(src)?,
            None => return Err(Error::NoImage),
        };
        let dims = Dims::new(image.width(), image.height());

        let (mask, layout) = match self.mask {
            Some(src) => {
                let mask = load_image(src)?;
                if mask.width() != dims.width || mask.height() != dims.height {
                    return Err(Error::SizeMismatch(errors::SizeMismatch {
                        expected: (dims.width, dims.height),
                        actual: (mask.width(), mask.height()),
                        what: "mask",
                    }));
                }
                (Some(mask), PixelLayout::Rgbx32)
            }
            None => (None, PixelLayout::RgbaAlphaMask),
        };

        let engine = Engine::new(dims, layout)?;

        Ok(Session {
            image,
            mask,
            engine,
            params: self.params,
        })
    }
}
