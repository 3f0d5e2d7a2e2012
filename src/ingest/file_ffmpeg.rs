//! Local file frame source using FFmpeg.
//!
//! Frames are decoded in order and converted to RGB24. Each frame's timestamp
//! is its presentation time in milliseconds relative to the stream's start
//! time, so a file whose first pts is non-zero still starts near 0.

use anyhow::{anyhow, Context, Result};
use ffmpeg_next as ffmpeg;

use super::file::{FileConfig, FileStats};
use crate::frame::Frame;

/// `AV_NOPTS_VALUE`: the stream declares no start time.
const NO_PTS: i64 = i64::MIN;

pub(crate) struct FfmpegFileSource {
    config: FileConfig,
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    time_base_ms: f64,
    /// Stream start pts, or 0 when the container does not declare one.
    start_pts: i64,
    fps: f64,
    frame_count: u64,
    eof_sent: bool,
}

impl FfmpegFileSource {
    pub(crate) fn new(config: FileConfig) -> Result<Self> {
        ffmpeg::init().context("initialize ffmpeg")?;
        let input = ffmpeg::format::input(&config.path)
            .with_context(|| format!("failed to open file input '{}' with ffmpeg", config.path))?;
        let input_stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| anyhow!("file has no video track"))?;
        let stream_index = input_stream.index();
        let time_base_ms = f64::from(input_stream.time_base()) * 1000.0;
        let fps = f64::from(input_stream.avg_frame_rate());
        let start_pts = match input_stream.start_time() {
            NO_PTS => 0,
            pts => pts,
        };
        let context = ffmpeg::codec::context::Context::from_parameters(input_stream.parameters())
            .context("load video decoder parameters")?;
        let decoder = context
            .decoder()
            .video()
            .context("open ffmpeg video decoder")?;

        let scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::util::format::pixel::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .context("create ffmpeg scaler")?;

        Ok(Self {
            config,
            input,
            stream_index,
            decoder,
            scaler,
            time_base_ms,
            start_pts,
            fps: if fps.is_finite() { fps } else { 0.0 },
            frame_count: 0,
            eof_sent: false,
        })
    }

    pub(crate) fn connect(&mut self) -> Result<()> {
        log::info!(
            "FileSource: connected to {} (ffmpeg, {:.0} fps)",
            self.config.path,
            self.fps
        );
        Ok(())
    }

    pub(crate) fn next_frame(&mut self) -> Result<Option<Frame>> {
        let mut decoded = ffmpeg::frame::Video::empty();

        loop {
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                return self.convert(&decoded).map(Some);
            }
            if self.eof_sent {
                return Ok(None);
            }

            match self.input.packets().next() {
                Some((stream, packet)) => {
                    if stream.index() != self.stream_index {
                        continue;
                    }
                    self.decoder
                        .send_packet(&packet)
                        .context("send packet to ffmpeg decoder")?;
                }
                None => {
                    self.decoder
                        .send_eof()
                        .context("flush ffmpeg decoder")?;
                    self.eof_sent = true;
                }
            }
        }
    }

    pub(crate) fn frames_per_second(&self) -> f64 {
        self.fps
    }

    pub(crate) fn stats(&self) -> FileStats {
        FileStats {
            frames_captured: self.frame_count,
            path: self.config.path.clone(),
        }
    }

    fn convert(&mut self, decoded: &ffmpeg::frame::Video) -> Result<Frame> {
        let mut rgb_frame = ffmpeg::frame::Video::empty();
        self.scaler
            .run(decoded, &mut rgb_frame)
            .context("scale frame to RGB")?;
        let (pixels, width, height) = frame_to_pixels(&rgb_frame)?;

        self.frame_count += 1;
        let timestamp_ms = decoded
            .timestamp()
            .map(|pts| pts_to_ms(pts, self.start_pts, self.time_base_ms))
            .unwrap_or_else(|| {
                // No pts: fall back to frame index at the nominal rate.
                if self.fps > 0.0 {
                    (self.frame_count - 1) as f64 * 1000.0 / self.fps
                } else {
                    0.0
                }
            });

        Frame::from_rgb(pixels, width, height, timestamp_ms)
    }
}

/// Presentation time in ms relative to the stream start.
fn pts_to_ms(pts: i64, start_pts: i64, time_base_ms: f64) -> f64 {
    pts.saturating_sub(start_pts) as f64 * time_base_ms
}

fn frame_to_pixels(frame: &ffmpeg::frame::Video) -> Result<(Vec<u8>, u32, u32)> {
    let width = frame.width();
    let height = frame.height();
    let row_bytes = (width as usize) * 3;
    let stride = frame.stride(0);
    let data = frame.data(0);

    if stride == row_bytes {
        let pixels = data
            .get(..row_bytes * height as usize)
            .context("ffmpeg frame is shorter than its dimensions")?;
        return Ok((pixels.to_vec(), width, height));
    }

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        let end = start + row_bytes;
        pixels.extend_from_slice(
            data.get(start..end)
                .context("ffmpeg frame row is out of bounds")?,
        );
    }

    Ok((pixels, width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_are_relative_to_stream_start() {
        // 1/90000 time base, as used by MPEG-TS.
        let time_base_ms = 1000.0 / 90_000.0;
        assert_eq!(pts_to_ms(126_000, 126_000, time_base_ms), 0.0);
        assert_eq!(pts_to_ms(216_000, 126_000, time_base_ms), 1000.0);
        assert_eq!(pts_to_ms(3_000, 0, 1.0), 3_000.0);
    }
}
