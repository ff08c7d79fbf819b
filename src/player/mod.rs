//! Playback core: the episode model, the shared session store, and the
//! bridge that keeps an audio resource in step with the session.

mod bridge;
pub(crate) mod episode;
#[cfg(unix)]
mod mpv;
mod resource;
mod session;

pub use bridge::AudioBridge;
pub use episode::Episode;
#[cfg(unix)]
pub use mpv::MpvResource;
pub use resource::{AudioResource, MediaEvent, ResourceError, UnavailableResource};
pub use session::{PlaybackSession, SessionChange};
