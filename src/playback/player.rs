use super::backend::{AudioBackend, BackendError, FinishSignal, TrackEnd};
use super::probe::probe_duration;
use rodio::source::EmptyCallback;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use std::error::Error as StdError;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// rodio output. Must stay on the thread that created it (the stream is not `Send`).
pub struct RodioBackend {
    _stream: OutputStream,
    stream_handle: OutputStreamHandle,
}

pub struct RodioTrack {
    sink: Sink,
    duration: Option<Duration>,
}

impl RodioBackend {
    pub fn new() -> Result<Self, BackendError> {
        let (stream, stream_handle) =
            OutputStream::try_default().map_err(|e| BackendError::Device(Box::new(e)))?;

        Ok(Self {
            _stream: stream,
            stream_handle,
        })
    }
}

fn open_error<E>(path: &Path, error: E) -> BackendError
where
    E: StdError + Send + Sync + 'static,
{
    BackendError::Open {
        path: path.to_path_buf(),
        source: Box::new(error),
    }
}

impl AudioBackend for RodioBackend {
    type Handle = RodioTrack;

    fn open(&mut self, path: &Path, finished: FinishSignal) -> Result<RodioTrack, BackendError> {
        let file = File::open(path).map_err(|e| open_error(path, e))?;
        let source = Decoder::new(BufReader::new(file)).map_err(|e| open_error(path, e))?;
        // Headerless VBR mp3 decodes fine but won't report a length
        let duration = source.total_duration().or_else(|| probe_duration(path));

        let sink = Sink::try_new(&self.stream_handle).map_err(|e| open_error(path, e))?;
        sink.pause();
        sink.append(source);

        // Runs on the audio thread once the decoder is drained; never reached after stop()
        sink.append(EmptyCallback::<f32>::new(Box::new(move || {
            finished.fire(TrackEnd::Completed);
        })));

        debug!(?duration, "Opened {}", path.display());
        Ok(RodioTrack { sink, duration })
    }

    fn play(&mut self, handle: &RodioTrack) {
        handle.sink.play();
    }

    fn pause(&mut self, handle: &RodioTrack) {
        handle.sink.pause();
    }

    fn stop(&mut self, handle: &RodioTrack) {
        handle.sink.stop();
    }

    fn position(&self, handle: &RodioTrack) -> Duration {
        handle.sink.get_pos()
    }

    fn duration(&self, handle: &RodioTrack) -> Option<Duration> {
        handle.duration
    }

    fn set_volume(&mut self, handle: &RodioTrack, level: f32) {
        handle.sink.set_volume(level.clamp(0.0, 1.0));
    }
}
