//! Still-image and video output for a rendered chat surface.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use serde::Serialize;

use crate::font_assets::sha256_hex;
use crate::raster::{frame_size, FrameOptions, Rasterizer};
use crate::render::ChatSurface;
use crate::timeline::DEFAULT_FPS;

pub const STILL_SCALE: u32 = 2;
pub const CAPTURE_FAILED: &str = "Failed to capture image.";

pub fn unix_millis() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn still_file_name(millis: i64) -> String {
    format!("chat-mock-{millis}.png")
}

pub fn video_file_name(millis: i64, container: VideoContainer) -> String {
    format!("chat-record-{millis}.{}", container.extension())
}

/// Where an export lands: a directory that receives a timestamped name, or
/// an exact file path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Dir(PathBuf),
    File(PathBuf),
}

impl OutputTarget {
    pub fn resolve(&self, default_name: &str) -> PathBuf {
        match self {
            Self::Dir(dir) => dir.join(default_name),
            Self::File(path) => path.clone(),
        }
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory {}", parent.display())),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptureSummary {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub sha256: String,
}

/// Renders `surface` at [`STILL_SCALE`] and writes a PNG.
pub fn capture_png(
    raster: &mut Rasterizer,
    surface: &ChatSurface,
    target: &OutputTarget,
) -> Result<CaptureSummary> {
    let path = target.resolve(&still_file_name(unix_millis()));
    write_png(raster, surface, &path).context(CAPTURE_FAILED)
}

fn write_png(raster: &mut Rasterizer, surface: &ChatSurface, path: &Path) -> Result<CaptureSummary> {
    let pixmap = raster.render(surface, FrameOptions::still(STILL_SCALE))?;
    let png = pixmap
        .encode_png()
        .map_err(|error| anyhow!("failed to encode PNG: {error}"))?;
    ensure_parent(path)?;
    fs::write(path, &png).with_context(|| format!("failed to write {}", path.display()))?;

    let summary = CaptureSummary {
        path: path.to_path_buf(),
        width: pixmap.width(),
        height: pixmap.height(),
        sha256: sha256_hex(&png),
    };
    tracing::info!(path = %summary.path.display(), sha256 = %summary.sha256, "captured still image");
    Ok(summary)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoContainer {
    /// H.264 in MP4.
    Mp4,
    /// ProRes 4444 with alpha in QuickTime.
    Mov,
}

impl VideoContainer {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Mov => "mov",
        }
    }

    pub fn for_target(target: &OutputTarget) -> Self {
        match target {
            OutputTarget::File(path)
                if path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("mov")) =>
            {
                Self::Mov
            }
            _ => Self::Mp4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSettings {
    pub target: OutputTarget,
    pub fps: u32,
    pub scale: u32,
}

impl RecordSettings {
    pub fn new(target: OutputTarget) -> Self {
        Self {
            target,
            fps: DEFAULT_FPS,
            scale: STILL_SCALE,
        }
    }

    pub fn frame_options(&self, elapsed_ms: u64) -> FrameOptions {
        FrameOptions {
            scale: self.scale,
            elapsed_ms,
        }
    }
}

/// What a capture backend is asked to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub container: VideoContainer,
    pub output_path: PathBuf,
}

/// Consumes raw RGBA frames on the capture worker thread.
pub trait CaptureBackend: Send {
    fn label(&self) -> &'static str;
    fn run(self: Box<Self>, frames: mpsc::Receiver<Vec<u8>>) -> Result<()>;
}

pub type StreamOpener = Box<dyn FnMut(&StreamRequest) -> Result<Box<dyn CaptureBackend>>>;

struct FfmpegBackend {
    child: Child,
    stdin: ChildStdin,
}

impl FfmpegBackend {
    fn spawn(request: &StreamRequest) -> Result<Self> {
        let mut command = Command::new("ffmpeg");
        command
            .arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .arg("-y")
            .arg("-f")
            .arg("rawvideo")
            .arg("-pix_fmt")
            .arg("rgba")
            .arg("-s:v")
            .arg(format!("{}x{}", request.width, request.height))
            .arg("-r")
            .arg(request.fps.to_string())
            .arg("-i")
            .arg("-")
            .arg("-an");

        match request.container {
            VideoContainer::Mov => {
                command
                    .arg("-c:v")
                    .arg("prores_ks")
                    .arg("-profile:v")
                    .arg("4444")
                    .arg("-pix_fmt")
                    .arg("yuva444p10le");
            }
            VideoContainer::Mp4 => {
                command
                    .arg("-c:v")
                    .arg("libx264")
                    .arg("-preset")
                    .arg("medium")
                    .arg("-crf")
                    .arg("18")
                    .arg("-pix_fmt")
                    .arg("yuv420p")
                    .arg("-movflags")
                    .arg("+faststart");
            }
        }

        command
            .arg(&request.output_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit());

        let child = command.spawn().map_err(|error| {
            if error.kind() == ErrorKind::NotFound {
                anyhow!(
                    "ffmpeg was not found on PATH. Install ffmpeg and verify `ffmpeg -version` works before recording."
                )
            } else {
                anyhow!("failed to spawn ffmpeg: {error}")
            }
        })?;

        Self::attach(child)
    }

    fn attach(mut child: Child) -> Result<Self> {
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("failed to capture ffmpeg stdin"))?;
        Ok(Self { child, stdin })
    }
}

impl CaptureBackend for FfmpegBackend {
    fn label(&self) -> &'static str {
        "ffmpeg"
    }

    fn run(self: Box<Self>, frames: mpsc::Receiver<Vec<u8>>) -> Result<()> {
        let Self { mut child, mut stdin } = *self;
        let written = frames
            .into_iter()
            .try_for_each(|frame| stdin.write_all(&frame))
            .and_then(|()| stdin.flush());
        drop(stdin);

        if let Err(error) = written {
            // Reap the encoder so a failed pipe does not leave a zombie.
            let _ = child.kill();
            let status = child.wait().context("failed waiting for ffmpeg process")?;
            return Err(error).with_context(|| format!("ffmpeg stopped reading frames ({status})"));
        }
        let status = child.wait().context("failed waiting for ffmpeg process")?;
        if !status.success() {
            bail!("ffmpeg failed with status {status}");
        }
        Ok(())
    }
}

fn ffmpeg_opener() -> StreamOpener {
    Box::new(|request| {
        ensure_parent(&request.output_path)?;
        Ok(Box::new(FfmpegBackend::spawn(request)?) as Box<dyn CaptureBackend>)
    })
}

const FRAME_QUEUE_DEPTH: usize = 4;

/// Frame queue feeding a backend that runs on its own thread.
struct CaptureStream {
    queue: mpsc::SyncSender<Vec<u8>>,
    worker: JoinHandle<Result<()>>,
}

impl CaptureStream {
    fn open(backend: Box<dyn CaptureBackend>) -> Result<Self> {
        let label = backend.label();
        let (queue, frames) = mpsc::sync_channel(FRAME_QUEUE_DEPTH);
        let worker = thread::Builder::new()
            .name(format!("chatmock-{label}"))
            .spawn(move || backend.run(frames))
            .with_context(|| format!("failed to start the {label} capture thread"))?;
        Ok(Self { queue, worker })
    }

    fn send(&self, frame: Vec<u8>) -> Result<()> {
        if self.queue.send(frame).is_err() {
            bail!("capture backend stopped before the recording ended");
        }
        Ok(())
    }

    /// Closes the queue and waits until the backend has flushed.
    fn close(self) -> Result<()> {
        let Self { queue, worker } = self;
        drop(queue);
        worker
            .join()
            .unwrap_or_else(|_| Err(anyhow!("capture thread panicked")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecorderState {
    Idle,
    Recording,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordingSummary {
    pub path: PathBuf,
    pub container: VideoContainer,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub frames: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderEvent {
    Started { path: PathBuf },
    /// The stream could not be opened; the recorder is still idle.
    StartFailed,
    Finished(RecordingSummary),
}

struct ActiveRecording {
    stream: CaptureStream,
    request: StreamRequest,
    frame_len: usize,
    frames: u64,
}

/// Two-state video recorder. `toggle` starts a capture stream from idle and
/// finalizes the file from recording.
pub struct Recorder {
    settings: RecordSettings,
    opener: StreamOpener,
    active: Option<ActiveRecording>,
}

impl Recorder {
    pub fn new(settings: RecordSettings) -> Self {
        Self::with_opener(settings, ffmpeg_opener())
    }

    pub fn with_opener(settings: RecordSettings, opener: StreamOpener) -> Self {
        Self {
            settings,
            opener,
            active: None,
        }
    }

    pub fn settings(&self) -> &RecordSettings {
        &self.settings
    }

    pub fn state(&self) -> RecorderState {
        if self.active.is_some() {
            RecorderState::Recording
        } else {
            RecorderState::Idle
        }
    }

    pub fn toggle(&mut self) -> Result<RecorderEvent> {
        match self.active.take() {
            None => Ok(self.start()),
            Some(active) => self.stop(active).map(RecorderEvent::Finished),
        }
    }

    fn start(&mut self) -> RecorderEvent {
        let (width, height) = frame_size(self.settings.scale);
        let container = VideoContainer::for_target(&self.settings.target);
        let request = StreamRequest {
            width,
            height,
            fps: self.settings.fps.max(1),
            container,
            output_path: self
                .settings
                .target
                .resolve(&video_file_name(unix_millis(), container)),
        };

        let opened = (self.opener)(&request).and_then(CaptureStream::open);
        match opened {
            Ok(stream) => {
                tracing::info!(path = %request.output_path.display(), "recording started");
                let path = request.output_path.clone();
                self.active = Some(ActiveRecording {
                    stream,
                    frame_len: width as usize * height as usize * 4,
                    request,
                    frames: 0,
                });
                RecorderEvent::Started { path }
            }
            Err(error) => {
                tracing::error!("failed to start recording: {error:#}");
                RecorderEvent::StartFailed
            }
        }
    }

    fn stop(&mut self, active: ActiveRecording) -> Result<RecordingSummary> {
        active
            .stream
            .close()
            .with_context(|| format!("failed to finalize {}", active.request.output_path.display()))?;
        let summary = RecordingSummary {
            path: active.request.output_path.clone(),
            container: active.request.container,
            width: active.request.width,
            height: active.request.height,
            fps: active.request.fps,
            frames: active.frames,
        };
        tracing::info!(path = %summary.path.display(), frames = summary.frames, "recording finished");
        Ok(summary)
    }

    /// Queues one straight-RGBA frame. Frames pushed while idle are ignored.
    pub fn push_frame(&mut self, frame: Vec<u8>) -> Result<()> {
        let Some(active) = self.active.as_mut() else {
            tracing::debug!("recorder idle; dropping frame");
            return Ok(());
        };
        if frame.len() != active.frame_len {
            bail!(
                "frame size mismatch: expected {} bytes, got {}",
                active.frame_len,
                frame.len()
            );
        }
        active.stream.send(frame)?;
        active.frames += 1;
        Ok(())
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            if let Err(error) = active.stream.close() {
                tracing::warn!("recording released with error: {error:#}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::{mpsc, Arc, Mutex};

    use anyhow::{anyhow, Result};

    use super::{
        capture_png, still_file_name, video_file_name, CaptureBackend, CaptureStream,
        FfmpegBackend, OutputTarget, RecordSettings, Recorder, RecorderEvent, RecorderState,
        StreamOpener, StreamRequest, VideoContainer, CAPTURE_FAILED,
    };
    use crate::raster::{frame_size, Rasterizer};
    use crate::session::Studio;

    struct MemoryBackend {
        frames: Arc<Mutex<Vec<usize>>>,
    }

    impl CaptureBackend for MemoryBackend {
        fn label(&self) -> &'static str {
            "memory"
        }

        fn run(self: Box<Self>, frames: mpsc::Receiver<Vec<u8>>) -> Result<()> {
            for frame in frames {
                self.frames.lock().expect("frame log").push(frame.len());
            }
            Ok(())
        }
    }

    fn memory_opener(
        log: Arc<Mutex<Vec<usize>>>,
        requests: Arc<Mutex<Vec<StreamRequest>>>,
    ) -> StreamOpener {
        Box::new(move |request| {
            requests.lock().expect("request log").push(request.clone());
            Ok(Box::new(MemoryBackend {
                frames: Arc::clone(&log),
            }) as Box<dyn CaptureBackend>)
        })
    }

    #[test]
    fn file_names_carry_the_timestamp() {
        assert_eq!(still_file_name(42), "chat-mock-42.png");
        assert_eq!(video_file_name(42, VideoContainer::Mp4), "chat-record-42.mp4");
        assert_eq!(video_file_name(42, VideoContainer::Mov), "chat-record-42.mov");
    }

    #[test]
    fn mov_targets_select_prores() {
        assert_eq!(
            VideoContainer::for_target(&OutputTarget::File(PathBuf::from("clip.MOV"))),
            VideoContainer::Mov
        );
        assert_eq!(
            VideoContainer::for_target(&OutputTarget::Dir(PathBuf::from("out"))),
            VideoContainer::Mp4
        );
    }

    #[test]
    fn still_capture_writes_a_double_size_png() {
        let dir = tempfile::tempdir().expect("tempdir");
        let studio = Studio::new();
        let mut raster = Rasterizer::new(None);
        let summary = capture_png(
            &mut raster,
            &studio.surface(),
            &OutputTarget::Dir(dir.path().to_path_buf()),
        )
        .expect("capture");

        let name = summary
            .path
            .file_name()
            .and_then(|name| name.to_str())
            .expect("file name");
        assert!(name.starts_with("chat-mock-") && name.ends_with(".png"), "{name}");
        let decoded = image::open(&summary.path).expect("decode png");
        assert_eq!((decoded.width(), decoded.height()), (750, 1584));
        assert_eq!(summary.sha256.len(), 64);
    }

    #[test]
    fn still_capture_failure_is_reported_to_the_user() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blocker = dir.path().join("taken");
        std::fs::write(&blocker, b"file").expect("write blocker");
        let studio = Studio::new();
        let mut raster = Rasterizer::new(None);
        let error = capture_png(
            &mut raster,
            &studio.surface(),
            &OutputTarget::File(blocker.join("out.png")),
        )
        .expect_err("parent is a file");
        assert_eq!(error.to_string(), CAPTURE_FAILED);
    }

    #[test]
    fn recorder_toggles_between_idle_and_recording() {
        let frames = Arc::new(Mutex::new(Vec::new()));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let mut recorder = Recorder::with_opener(
            RecordSettings {
                target: OutputTarget::Dir(PathBuf::from("clips")),
                fps: 24,
                scale: 1,
            },
            memory_opener(Arc::clone(&frames), Arc::clone(&requests)),
        );
        assert_eq!(recorder.state(), RecorderState::Idle);
        recorder.push_frame(vec![0; 4]).expect("idle frames are ignored");

        let started = recorder.toggle().expect("start");
        assert!(matches!(started, RecorderEvent::Started { .. }));
        assert_eq!(recorder.state(), RecorderState::Recording);

        let (width, height) = frame_size(1);
        let frame_len = (width * height * 4) as usize;
        for _ in 0..3 {
            recorder.push_frame(vec![255; frame_len]).expect("push");
        }
        assert!(recorder.push_frame(vec![0; 8]).is_err(), "wrong size is rejected");

        let RecorderEvent::Finished(summary) = recorder.toggle().expect("stop") else {
            panic!("second toggle should finish the recording");
        };
        assert_eq!(recorder.state(), RecorderState::Idle);
        assert_eq!(summary.frames, 3);
        assert_eq!(summary.fps, 24);
        assert_eq!(frames.lock().expect("frames").len(), 3);

        let request = requests.lock().expect("requests")[0].clone();
        assert!(request.output_path.starts_with("clips"));
        assert_eq!(request.container, VideoContainer::Mp4);
        let name = request.output_path.to_string_lossy().into_owned();
        assert!(name.contains("chat-record-") && name.ends_with(".mp4"), "{name}");
    }

    #[test]
    fn start_failure_leaves_the_recorder_idle() {
        let mut recorder = Recorder::with_opener(
            RecordSettings::new(OutputTarget::Dir(PathBuf::from("clips"))),
            Box::new(|_| Err(anyhow!("capture permission denied"))),
        );
        assert_eq!(recorder.toggle().expect("toggle"), RecorderEvent::StartFailed);
        assert_eq!(recorder.state(), RecorderState::Idle);
    }

    #[test]
    fn dropping_a_recording_releases_the_stream() {
        let frames = Arc::new(Mutex::new(Vec::new()));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let mut recorder = Recorder::with_opener(
            RecordSettings {
                target: OutputTarget::File(PathBuf::from("clip.mov")),
                fps: 30,
                scale: 1,
            },
            memory_opener(Arc::clone(&frames), Arc::clone(&requests)),
        );
        recorder.toggle().expect("start");
        let (width, height) = frame_size(1);
        recorder
            .push_frame(vec![0; (width * height * 4) as usize])
            .expect("push");
        drop(recorder);
        // The worker drained the channel and exited before drop returned.
        assert_eq!(frames.lock().expect("frames").len(), 1);
        assert_eq!(
            requests.lock().expect("requests")[0].container,
            VideoContainer::Mov
        );
    }

    #[cfg(unix)]
    #[test]
    fn encoder_exiting_early_fails_the_stream() {
        let child = std::process::Command::new("sh")
            .args(["-c", "exit 0"])
            .stdin(std::process::Stdio::piped())
            .spawn()
            .expect("spawn sh");
        let backend = FfmpegBackend::attach(child).expect("attach");
        let stream = CaptureStream::open(Box::new(backend)).expect("open");
        for _ in 0..4 {
            if stream.send(vec![0; 1 << 20]).is_err() {
                break;
            }
        }
        let error = stream.close().expect_err("encoder never read its input");
        assert!(
            format!("{error:#}").contains("ffmpeg stopped reading frames"),
            "{error:#}"
        );
    }
}
