//! `VideoFrameSource` backed by shelling out to `ffmpeg`, the way the
//! pipeline's render adapter shells out to `ffmpeg` for muxing rather than
//! linking a container-decoding library directly.

use std::path::{Path, PathBuf};
use std::process::Command;

use videogen_core::{PipelineError, VideoFrame, VideoFrameSource};

pub struct FfmpegFrameSource {
    _workdir: tempfile::TempDir,
    frame_paths: Vec<PathBuf>,
    duration_secs: f64,
    next_index: usize,
    last_returned: Option<u32>,
}

impl FfmpegFrameSource {
    /// Extracts every frame of `video_path` to PNGs in a scratch directory
    /// via `ffmpeg -i <video> frame_%06d.png`, then serves them back through
    /// `next_sampled_frame`'s stride logic. Probing `duration_secs` uses
    /// `ffprobe`.
    pub fn open(video_path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let video_path = video_path.as_ref();
        let workdir = tempfile::tempdir().map_err(PipelineError::Io)?;

        let status = Command::new("ffmpeg")
            .arg("-y")
            .arg("-i")
            .arg(video_path)
            .arg(workdir.path().join("frame_%06d.png"))
            .status()
            .map_err(PipelineError::Io)?;
        if !status.success() {
            return Err(PipelineError::Artifact(format!(
                "ffmpeg frame extraction failed for {}",
                video_path.display()
            )));
        }

        let mut frame_paths: Vec<PathBuf> = std::fs::read_dir(workdir.path())
            .map_err(PipelineError::Io)?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.extension().map(|e| e == "png").unwrap_or(false))
            .collect();
        frame_paths.sort();

        let duration_secs = probe_duration_secs(video_path).unwrap_or(0.0);

        Ok(Self {
            _workdir: workdir,
            frame_paths,
            duration_secs,
            next_index: 0,
            last_returned: None,
        })
    }
}

fn probe_duration_secs(video_path: &Path) -> Option<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(video_path)
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout).ok()?.trim().parse().ok()
}

impl VideoFrameSource for FfmpegFrameSource {
    fn next_sampled_frame(&mut self, stride: u32) -> Option<VideoFrame> {
        if self.next_index >= self.frame_paths.len() {
            return None;
        }
        let idx = self.next_index;
        let path = &self.frame_paths[idx];
        let img = image::open(path).ok()?.to_rgb8();
        let (width, height) = img.dimensions();

        let frame_index = self.last_returned.map(|l| l as u64 + stride as u64).unwrap_or(idx as u64);
        let timestamp_secs = if self.frame_paths.is_empty() {
            0.0
        } else {
            (idx as f64 / self.frame_paths.len() as f64) * self.duration_secs
        };

        self.last_returned = Some(idx as u32);
        self.next_index = idx + stride.max(1) as usize;

        Some(VideoFrame {
            width,
            height,
            rgb: img.into_raw(),
            frame_index,
            timestamp_secs,
        })
    }

    fn duration_secs(&self) -> f64 {
        self.duration_secs
    }
}
