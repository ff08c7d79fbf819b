use thiserror::Error;

/// Lifecycle notifications emitted by an audio resource.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MediaEvent {
    Started,
    Paused,
    /// Current position in seconds.
    TimeAdvanced(f64),
    /// File is loaded and its length in seconds is known.
    MetadataReady { duration: f64 },
    /// Natural end of media. Never emitted while looping.
    Ended,
}

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("audio backend unavailable: {0}")]
    Unavailable(String),
    #[error("audio backend I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// The single physical playback pipeline driven by the bridge.
///
/// Commands are fire-and-forget: the resource confirms through later
/// [`MediaEvent`]s, never through the return value.
pub trait AudioResource {
    fn load(&mut self, url: &str, autoplay: bool) -> Result<(), ResourceError>;
    fn play(&mut self) -> Result<(), ResourceError>;
    fn pause(&mut self) -> Result<(), ResourceError>;
    /// Out-of-range offsets are clamped by the resource.
    fn seek(&mut self, seconds: f64) -> Result<(), ResourceError>;
    fn set_looping(&mut self, looping: bool) -> Result<(), ResourceError>;
    fn unload(&mut self) -> Result<(), ResourceError>;
    fn poll_events(&mut self) -> Vec<MediaEvent>;
}

/// Stand-in used when no real backend could be started; every command
/// fails with the original reason so the bridge logs it.
pub struct UnavailableResource {
    reason: String,
}

impl UnavailableResource {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn fail(&self) -> Result<(), ResourceError> {
        Err(ResourceError::Unavailable(self.reason.clone()))
    }
}

impl AudioResource for UnavailableResource {
    fn load(&mut self, _url: &str, _autoplay: bool) -> Result<(), ResourceError> {
        self.fail()
    }

    fn play(&mut self) -> Result<(), ResourceError> {
        self.fail()
    }

    fn pause(&mut self) -> Result<(), ResourceError> {
        self.fail()
    }

    fn seek(&mut self, _seconds: f64) -> Result<(), ResourceError> {
        self.fail()
    }

    fn set_looping(&mut self, _looping: bool) -> Result<(), ResourceError> {
        self.fail()
    }

    fn unload(&mut self) -> Result<(), ResourceError> {
        Ok(())
    }

    fn poll_events(&mut self) -> Vec<MediaEvent> {
        Vec::new()
    }
}

impl<R: AudioResource + ?Sized> AudioResource for Box<R> {
    fn load(&mut self, url: &str, autoplay: bool) -> Result<(), ResourceError> {
        (**self).load(url, autoplay)
    }

    fn play(&mut self) -> Result<(), ResourceError> {
        (**self).play()
    }

    fn pause(&mut self) -> Result<(), ResourceError> {
        (**self).pause()
    }

    fn seek(&mut self, seconds: f64) -> Result<(), ResourceError> {
        (**self).seek(seconds)
    }

    fn set_looping(&mut self, looping: bool) -> Result<(), ResourceError> {
        (**self).set_looping(looping)
    }

    fn unload(&mut self) -> Result<(), ResourceError> {
        (**self).unload()
    }

    fn poll_events(&mut self) -> Vec<MediaEvent> {
        (**self).poll_events()
    }
}
