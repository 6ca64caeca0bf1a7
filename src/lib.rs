// tapedeck library - the pieces behind the terminal player
// Playback core lives in audio/, the terminal front end in ui/

pub mod audio;     // engine, queue, tick driver, scanning, metadata
pub mod config;    // settings and defaults
pub mod error;     // typed errors for everything below the binaries
pub mod logging;   // file logging + stderr handling
pub mod ui;        // terminal interface and update loop

// Export the stuff other modules actually use
pub use audio::{AudioFile, AudioPlayer, Library, MusicScanner, Queue};
pub use config::Config;
pub use error::{Error, Result};
