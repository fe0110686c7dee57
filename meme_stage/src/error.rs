//! Errors surfaced by the stage collaborators.  None of them stop a frame:
//! a failed image load becomes a placeholder, a bad replay line is skipped.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StageError {
    #[error("cannot open window: {0}")]
    Window(#[from] minifb::Error),

    #[error("cannot load image {}: {source}", .path.display())]
    Image {
        path:   PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("image {} has no pixels", .0.display())]
    EmptyImage(PathBuf),

    #[error("cannot open replay {}: {source}", .path.display())]
    Replay {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot save screenshot {}: {source}", .path.display())]
    Screenshot {
        path:   PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("headless mode needs a replay file")]
    HeadlessWithoutReplay,
}
