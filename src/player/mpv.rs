use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::process::{Child, Command as ProcessCommand, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use serde_json::{Value, json};
use tracing::{debug, info, warn};

use super::resource::{AudioResource, MediaEvent, ResourceError};

const OBS_PAUSE: u64 = 1;
const OBS_TIME_POS: u64 = 2;
const OBS_DURATION: u64 = 3;

const CONNECT_ATTEMPTS: usize = 40;
const CONNECT_DELAY: Duration = Duration::from_millis(50);

/// mpv running idle in the background, driven over its JSON IPC socket.
pub struct MpvResource {
    child: Child,
    stream: UnixStream,
    socket_path: PathBuf,
    events: mpsc::Receiver<MediaEvent>,
    next_request_id: u64,
}

impl MpvResource {
    pub fn spawn(bin: &Path, socket_path: PathBuf) -> Result<Self, ResourceError> {
        if let Some(parent) = socket_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let _ = fs::remove_file(&socket_path);

        let mut child = ProcessCommand::new(bin)
            .arg("--idle=yes")
            .arg("--no-video")
            .arg("--no-terminal")
            .arg("--keep-open=no")
            .arg(format!("--input-ipc-server={}", socket_path.display()))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| {
                ResourceError::Unavailable(format!("failed to launch {}: {err}", bin.display()))
            })?;

        let stream = match connect(&mut child, &socket_path) {
            Ok(stream) => stream,
            Err(err) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(err);
            }
        };
        info!(pid = child.id(), socket = %socket_path.display(), "mpv connected");

        let reader = stream.try_clone()?;
        let (tx, events) = mpsc::channel();
        thread::spawn(move || read_events(reader, tx));

        let mut resource = Self {
            child,
            stream,
            socket_path,
            events,
            next_request_id: 100,
        };
        resource.send(json!(["observe_property", OBS_PAUSE, "pause"]))?;
        resource.send(json!(["observe_property", OBS_TIME_POS, "time-pos"]))?;
        resource.send(json!(["observe_property", OBS_DURATION, "duration"]))?;
        Ok(resource)
    }

    fn send(&mut self, command: Value) -> Result<(), ResourceError> {
        let request_id = self.next_request_id;
        self.next_request_id += 1;
        let mut line = json!({ "command": command, "request_id": request_id }).to_string();
        debug!(request_id, %line, "mpv command");
        line.push('\n');
        self.stream.write_all(line.as_bytes())?;
        Ok(())
    }

    fn set_pause(&mut self, paused: bool) -> Result<(), ResourceError> {
        self.send(json!(["set_property", "pause", paused]))
    }
}

fn connect(child: &mut Child, socket_path: &Path) -> Result<UnixStream, ResourceError> {
    for _ in 0..CONNECT_ATTEMPTS {
        if let Some(status) = child.try_wait()? {
            return Err(ResourceError::Unavailable(format!(
                "mpv exited during startup with {status}"
            )));
        }
        match UnixStream::connect(socket_path) {
            Ok(stream) => return Ok(stream),
            Err(_) => thread::sleep(CONNECT_DELAY),
        }
    }
    Err(ResourceError::Unavailable(format!(
        "mpv socket {} never became ready",
        socket_path.display()
    )))
}

impl AudioResource for MpvResource {
    fn load(&mut self, url: &str, autoplay: bool) -> Result<(), ResourceError> {
        self.set_pause(!autoplay)?;
        self.send(json!(["loadfile", url, "replace"]))
    }

    fn play(&mut self) -> Result<(), ResourceError> {
        self.set_pause(false)
    }

    fn pause(&mut self) -> Result<(), ResourceError> {
        self.set_pause(true)
    }

    fn seek(&mut self, seconds: f64) -> Result<(), ResourceError> {
        self.send(json!(["seek", seconds, "absolute"]))
    }

    fn set_looping(&mut self, looping: bool) -> Result<(), ResourceError> {
        let value = if looping { "inf" } else { "no" };
        self.send(json!(["set_property", "loop-file", value]))
    }

    fn unload(&mut self) -> Result<(), ResourceError> {
        self.send(json!(["stop"]))
    }

    fn poll_events(&mut self) -> Vec<MediaEvent> {
        self.events.try_iter().collect()
    }
}

impl Drop for MpvResource {
    fn drop(&mut self) {
        let _ = self.send(json!(["quit"]));
        thread::sleep(CONNECT_DELAY);
        if matches!(self.child.try_wait(), Ok(None)) {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
        let _ = fs::remove_file(&self.socket_path);
    }
}

fn read_events(stream: UnixStream, tx: mpsc::Sender<MediaEvent>) {
    let mut state = ReaderState::default();
    for line in BufReader::new(stream).lines() {
        let Ok(line) = line else {
            break;
        };
        let Ok(message) = serde_json::from_str::<Value>(&line) else {
            warn!(%line, "unparseable mpv message");
            continue;
        };
        if let Some(event) = state.translate(&message)
            && tx.send(event).is_err()
        {
            break;
        }
    }
    debug!("mpv event reader finished");
}

/// Tracks just enough mpv state to map its messages onto [`MediaEvent`]s.
#[derive(Debug, Default)]
pub(crate) struct ReaderState {
    file_active: bool,
    paused: bool,
    duration: Option<f64>,
    /// `file-loaded` seen but metadata not reported yet.
    metadata_pending: bool,
}

impl ReaderState {
    pub(crate) fn translate(&mut self, message: &Value) -> Option<MediaEvent> {
        if let Some(error) = message.get("error").and_then(Value::as_str) {
            if error != "success" {
                warn!(error, request_id = ?message.get("request_id"), "mpv rejected command");
            }
            return None;
        }

        match message.get("event").and_then(Value::as_str)? {
            "property-change" => self.property_change(message),
            "start-file" => {
                self.file_active = true;
                self.duration = None;
                self.metadata_pending = false;
                None
            }
            "file-loaded" => {
                self.file_active = true;
                self.metadata_pending = true;
                self.take_metadata()
            }
            "playback-restart" if self.file_active && !self.paused => Some(MediaEvent::Started),
            "end-file" => {
                self.file_active = false;
                self.metadata_pending = false;
                let reason = message
                    .get("reason")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown");
                match reason {
                    "eof" => Some(MediaEvent::Ended),
                    "error" => {
                        warn!(
                            detail = ?message.get("file_error"),
                            "mpv failed to play file"
                        );
                        None
                    }
                    _ => None,
                }
            }
            _ => None,
        }
    }

    fn property_change(&mut self, message: &Value) -> Option<MediaEvent> {
        let id = message.get("id").and_then(Value::as_u64)?;
        let data = message.get("data").unwrap_or(&Value::Null);
        match id {
            OBS_PAUSE => {
                self.paused = data.as_bool().unwrap_or(false);
                if !self.file_active {
                    return None;
                }
                Some(if self.paused {
                    MediaEvent::Paused
                } else {
                    MediaEvent::Started
                })
            }
            OBS_TIME_POS => data.as_f64().map(MediaEvent::TimeAdvanced),
            OBS_DURATION => {
                self.duration = data.as_f64();
                self.take_metadata()
            }
            _ => None,
        }
    }

    /// mpv may publish `duration` before or after `file-loaded`.
    fn take_metadata(&mut self) -> Option<MediaEvent> {
        if !self.metadata_pending {
            return None;
        }
        let duration = self.duration?;
        self.metadata_pending = false;
        Some(MediaEvent::MetadataReady { duration })
    }
}
