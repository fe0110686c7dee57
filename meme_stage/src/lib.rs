//! # meme_stage
//!
//! Gesture-driven meme overlay.  Landmark frames flow in from a keyboard
//! simulator or a recorded replay; each frame is turned into features,
//! matched against the meme rules, and fed to the lifecycle coordinator,
//! whose activate/deactivate intents drive the overlay and the sound player.
//!
//! ```text
//! source ──Frame──▶ extractor ──FeatureMap──▶ matcher ──Option<meme>──▶ lifecycle
//!                                                                         │ Intent
//!                                                      overlay ◀──────────┤
//!                                                      audio   ◀──────────┘
//! ```
//!
//! ## Run modes
//!
//! * (default): **Simulation**, keyboard shortcuts pose a synthetic person.
//! * `--replay FILE`: frames from a JSON-lines recording, one `Frame` per line.
//! * `--replay FILE --headless`: no window, intents are logged.
//!
//! ### Simulation keyboard shortcuts
//!
//! | Key | Effect |
//! |---|---|
//! | `1` `2` `3` `4` | Neutral / T-pose / arms crossed / salute |
//! | `Z` / `X` | Cycle left / right hand: hidden, fist, peace, point, open |
//! | `A` / `D` | Raise or lower the left / right hand |
//! | `F` | Face on / off |
//! | `W` | Eyes wide |
//! | `J` | Head jitter (lowers face stillness) |
//! | `R` | Reload the meme configuration |
//! | `S` | Save a screenshot under `screenshots/` |
//! | `Q` / `Esc` | Quit |

//! ## Features
//!
//! | Feature | Effect |
//! |---|---|
//! | `audio` | Play meme sounds on the default output device through `rodio`. Without it, sounds are only logged. |

pub mod error;
pub mod lifecycle;
pub mod source;
pub mod audio;
pub mod overlay;
pub mod visualizer;
pub mod app;

pub use app::{run, run_headless, AppConfig, AppState, ReplaySummary};
pub use error::StageError;
pub use lifecycle::{dispatch, Intent, IntentSink, LifecycleCoordinator, MemeState};
