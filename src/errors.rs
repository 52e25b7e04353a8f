use crate::frame::PixelLayout;
use std::fmt;

#[derive(Debug)]
pub struct InvalidRange {
    pub(crate) min: i64,
    pub(crate) max: i64,
    pub(crate) value: i64,
    pub(crate) name: &'static str,
}

impl fmt::Display for InvalidRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "parameter '{}' - value '{}' is outside the range of {}-{}",
            self.name, self.value, self.min, self.max
        )
    }
}

#[derive(Debug)]
pub struct SizeMismatch {
    pub(crate) expected: (u32, u32),
    pub(crate) actual: (u32, u32),
    pub(crate) what: &'static str,
}

impl fmt::Display for SizeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "the {} size ({}x{}) must match the frame size ({}x{})",
            self.what, self.actual.0, self.actual.1, self.expected.0, self.expected.1
        )
    }
}

#[derive(Debug)]
pub enum Error {
    /// An error in the image library occurred, eg failed to load/save
    Image(image::ImageError),
    /// An input parameter had an invalid range specified
    InvalidRange(InvalidRange),
    /// The frame or mask geometry doesn't match the engine's dimensions
    SizeMismatch(SizeMismatch),
    /// A buffer is too short for the declared stride and dimensions
    BufferTooSmall(&'static str),
    /// The frame handed to `run` doesn't use the layout the engine was
    /// initialized with
    LayoutMismatch {
        engine: PixelLayout,
        frame: PixelLayout,
    },
    /// The layout needs a separate mask buffer and none was provided
    MissingMask(PixelLayout),
    /// The mask buffer's plane structure doesn't match the frame layout
    MaskKind(PixelLayout),
    /// The layout embeds its own mask, a separate buffer is not accepted
    UnexpectedMask(PixelLayout),
    /// Io is notoriously error free with no problems, but we cover it just in case!
    Io(std::io::Error),
    /// No input image was given to the session builder
    NoImage,
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Image(err) => Some(err),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image(ie) => write!(f, "{}", ie),
            Self::InvalidRange(ir) => write!(f, "{}", ir),
            Self::SizeMismatch(sm) => write!(f, "{}", sm),
            Self::BufferTooSmall(what) => write!(
                f,
                "the {} buffer is too small for the declared stride and dimensions",
                what
            ),
            Self::LayoutMismatch { engine, frame } => write!(
                f,
                "the engine was initialized for {:?} but the frame is {:?}",
                engine, frame
            ),
            Self::MissingMask(layout) => write!(
                f,
                "pixel layout {:?} requires a separate mask buffer",
                layout
            ),
            Self::MaskKind(layout) => write!(
                f,
                "pixel layout {:?} needs a mask with the same plane structure as the frame",
                layout
            ),
            Self::UnexpectedMask(layout) => write!(
                f,
                "pixel layout {:?} embeds its mask in the alpha channel, drop the separate mask",
                layout
            ),
            Self::Io(io) => write!(f, "{}", io),
            Self::NoImage => write!(f, "an input image must be provided before building"),
        }
    }
}

impl From<image::ImageError> for Error {
    fn from(ie: image::ImageError) -> Self {
        Self::Image(ie)
    }
}

impl From<std::io::Error> for Error {
    fn from(io: std::io::Error) -> Self {
        Self::Io(io)
    }
}
