//! ImageWriter port - persistence of assembled images

use std::path::{Path, PathBuf};

use crate::domain::entities::Image;
use crate::error::PipelineResult;

/// Writes an assembled image to the output directory
///
/// Implementations must publish atomically: either the complete image
/// appears at the returned path, or nothing does.
pub trait ImageWriter {
    fn write(&self, image: &Image, out_dir: &Path) -> PipelineResult<PathBuf>;
}

impl<W: ImageWriter + ?Sized> ImageWriter for &W {
    fn write(&self, image: &Image, out_dir: &Path) -> PipelineResult<PathBuf> {
        (**self).write(image, out_dir)
    }
}
