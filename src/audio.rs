// Audio - sounds decoded once from the sound directory, played through rodio
//
// Playing a sound that is already going starts it over on a fresh sink, while
// a paused sound picks up where it stopped.
// The output stream must outlive every sink, so the engine owns it and sounds
// only hold a handle.

use crate::error::{HopError, HopResult};
use rodio::source::Buffered;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

type SoundSource = Buffered<Decoder<BufReader<File>>>;

pub struct AudioEngine {
    // Dropping the stream silences every sink created from the handle.
    _stream: OutputStream,
    handle: OutputStreamHandle,
    sound_dir: PathBuf,
}

impl AudioEngine {
    /// Opens the default output device.
    pub fn new(sound_dir: impl Into<PathBuf>) -> HopResult<Self> {
        let (stream, handle) = OutputStream::try_default().map_err(|e| {
            log::warn!("No audio output available: {}", e);
            HopError::AudioUnavailable
        })?;

        let sound_dir = sound_dir.into();
        log::info!("Audio ready, loading sounds from {:?}", sound_dir);
        Ok(Self {
            _stream: stream,
            handle,
            sound_dir,
        })
    }

    pub fn sound_dir(&self) -> &Path {
        &self.sound_dir
    }

    /// Loads and decodes `file_name` from the sound directory.
    pub fn create_sound(&self, file_name: &str, looping: bool) -> HopResult<Sound> {
        let path = sound_path(&self.sound_dir, file_name);
        let source = load_source(&path).inspect_err(|e| log::warn!("{}", e))?;

        log::debug!("Loaded sound {:?} (looping: {})", path, looping);
        Ok(Sound {
            handle: self.handle.clone(),
            source,
            looping,
            sink: None,
            path,
        })
    }
}

impl std::fmt::Debug for AudioEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioEngine")
            .field("sound_dir", &self.sound_dir)
            .finish_non_exhaustive()
    }
}

pub(crate) fn sound_path(sound_dir: &Path, file_name: &str) -> PathBuf {
    sound_dir.join(file_name)
}

fn load_source(path: &Path) -> HopResult<SoundSource> {
    let sound_error = |reason: String| HopError::Sound {
        path: path.to_path_buf(),
        reason,
    };

    let file = File::open(path).map_err(|e| sound_error(e.to_string()))?;
    let decoder = Decoder::new(BufReader::new(file)).map_err(|e| sound_error(e.to_string()))?;
    Ok(decoder.buffered())
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum PlayAction {
    /// Nothing played yet
    Start,
    /// Continue where `pause` stopped
    Resume,
    /// Back to the first sample
    Restart,
}

/// What `play` does with the sink left from the previous play.
fn play_action(paused: bool, finished: bool) -> PlayAction {
    if paused && !finished {
        PlayAction::Resume
    } else {
        PlayAction::Restart
    }
}

/// A decoded sound ready to play.

pub struct Sound {
    handle: OutputStreamHandle,
    source: SoundSource,
    looping: bool,
    sink: Option<Sink>,
    path: PathBuf,
}

impl Sound {
    /// Resumes a paused sound. Otherwise plays from the start, cutting off
    /// the previous play if it is still going.
    pub fn play(&mut self) -> HopResult<()> {
        let action = match &self.sink {
            Some(sink) => play_action(sink.is_paused(), sink.empty()),
            None => PlayAction::Start,
        };

        if action == PlayAction::Resume {
            if let Some(sink) = &self.sink {
                sink.play();
            }
            return Ok(());
        }

        let sink = Sink::try_new(&self.handle).map_err(|e| HopError::Sound {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        if self.looping {
            sink.append(self.source.clone().repeat_infinite());
        } else {
            sink.append(self.source.clone());
        }

        if let Some(old) = self.sink.replace(sink) {
            old.stop();
        }
        Ok(())
    }

    pub fn pause(&mut self) {
        if let Some(sink) = &self.sink {
            sink.pause();
        }
    }

    pub fn is_playing(&self) -> bool {
        self.sink
            .as_ref()
            .is_some_and(|s| !s.is_paused() && !s.empty())
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for Sound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sound")
            .field("path", &self.path)
            .field("looping", &self.looping)
            .finish_non_exhaustive()
    }
}
