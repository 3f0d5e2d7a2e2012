//! Synthetic `stub://` frame generation shared by the file and camera sources.
//!
//! Frames are a deterministic pattern that only changes when the simulated
//! scene changes, so a content-hashing detector sees runs of identical frames
//! followed by a jump.

use anyhow::{anyhow, Result};

use crate::frame::Frame;

pub(crate) const STUB_SCHEME: &str = "stub://";

/// Parameters parsed from a `stub://name?key=value&...` locator.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct StubParams {
    pub name: String,
    /// Total frames before end of stream. `None` means endless.
    pub frames: Option<u64>,
    pub fps: f64,
    /// Frames per simulated scene.
    pub scene_len: u64,
    pub width: u32,
    pub height: u32,
}

impl StubParams {
    pub(crate) fn parse(locator: &str, default_frames: Option<u64>, default_fps: f64) -> Result<Self> {
        let rest = locator
            .strip_prefix(STUB_SCHEME)
            .ok_or_else(|| anyhow!("not a stub locator: {}", locator))?;
        let (name, query) = rest.split_once('?').unwrap_or((rest, ""));

        let mut params = Self {
            name: name.to_string(),
            frames: default_frames,
            fps: default_fps,
            scene_len: 30,
            width: 640,
            height: 480,
        };

        for pair in query.split('&').filter(|pair| !pair.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| anyhow!("malformed stub parameter '{}'", pair))?;
            let bad = || anyhow!("invalid value '{}' for stub parameter '{}'", value, key);
            match key {
                "frames" => params.frames = Some(value.parse().map_err(|_| bad())?),
                "fps" => params.fps = value.parse().map_err(|_| bad())?,
                "scene" => params.scene_len = value.parse().map_err(|_| bad())?,
                "width" => params.width = value.parse().map_err(|_| bad())?,
                "height" => params.height = value.parse().map_err(|_| bad())?,
                _ => return Err(anyhow!("unknown stub parameter '{}'", key)),
            }
        }

        if params.fps.is_nan() || params.fps <= 0.0 {
            return Err(anyhow!("stub fps must be greater than zero"));
        }
        if params.scene_len == 0 || params.width == 0 || params.height == 0 {
            return Err(anyhow!("stub scene, width and height must be non-zero"));
        }
        Ok(params)
    }
}

pub(crate) struct SyntheticFrames {
    params: StubParams,
    frame_count: u64,
}

impl SyntheticFrames {
    pub(crate) fn new(params: StubParams) -> Self {
        Self {
            params,
            frame_count: 0,
        }
    }

    pub(crate) fn params(&self) -> &StubParams {
        &self.params
    }

    pub(crate) fn frames_emitted(&self) -> u64 {
        self.frame_count
    }

    /// Next frame, or `None` once the configured frame count is reached.
    pub(crate) fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self
            .params
            .frames
            .is_some_and(|limit| self.frame_count >= limit)
        {
            return Ok(None);
        }

        let index = self.frame_count;
        self.frame_count += 1;

        let timestamp_ms = index as f64 * 1000.0 / self.params.fps;
        let pixels = self.generate_pixels(index / self.params.scene_len);
        Frame::from_rgb(pixels, self.params.width, self.params.height, timestamp_ms).map(Some)
    }

    fn generate_pixels(&self, scene: u64) -> Vec<u8> {
        let pixel_count = (self.params.width as usize) * (self.params.height as usize) * 3;
        (0..pixel_count)
            .map(|i| ((i as u64 / 3 + scene * 37) % 256) as u8)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stub_parameters() -> Result<()> {
        let p = StubParams::parse("stub://clip?frames=90&fps=15&scene=10&width=32&height=24", None, 30.0)?;
        assert_eq!(p.name, "clip");
        assert_eq!(p.frames, Some(90));
        assert_eq!(p.fps, 15.0);
        assert_eq!(p.scene_len, 10);
        assert_eq!((p.width, p.height), (32, 24));
        Ok(())
    }

    #[test]
    fn defaults_apply_without_query() -> Result<()> {
        let p = StubParams::parse("stub://front", Some(300), 30.0)?;
        assert_eq!(p.name, "front");
        assert_eq!(p.frames, Some(300));
        assert_eq!(p.fps, 30.0);
        Ok(())
    }

    #[test]
    fn rejects_unknown_or_bad_parameters() {
        assert!(StubParams::parse("stub://a?speed=2", None, 30.0).is_err());
        assert!(StubParams::parse("stub://a?fps=zero", None, 30.0).is_err());
        assert!(StubParams::parse("stub://a?fps=0", None, 30.0).is_err());
        assert!(StubParams::parse("file.mp4", None, 30.0).is_err());
    }

    #[test]
    fn frames_change_only_between_scenes() -> Result<()> {
        let params = StubParams::parse("stub://s?frames=5&scene=2&width=8&height=8", None, 10.0)?;
        let mut frames = SyntheticFrames::new(params);
        let mut all = Vec::new();
        while let Some(frame) = frames.next_frame()? {
            all.push(frame);
        }
        assert_eq!(all.len(), 5);
        assert_eq!(all[0].pixels(), all[1].pixels());
        assert_ne!(all[1].pixels(), all[2].pixels());
        assert_eq!(all[2].pixels(), all[3].pixels());
        assert_eq!(all[4].timestamp_ms, 400.0);
        assert_eq!(frames.frames_emitted(), 5);
        Ok(())
    }
}
