use std::time::Duration;

use crate::error::{Error, Result};

pub const DEFAULT_FRAMES_IN_FLIGHT: usize = 3;
pub const DEFAULT_SWAPCHAIN_BUFFERS: usize = 2;
pub const DEFAULT_FENCE_TIMEOUT: Duration = Duration::from_secs(10);

const ENV_FRAMES_IN_FLIGHT: &str = "FRAME_RING_FRAMES_IN_FLIGHT";
const ENV_SWAPCHAIN_BUFFERS: &str = "FRAME_RING_SWAPCHAIN_BUFFERS";
const ENV_FENCE_TIMEOUT_MS: &str = "FRAME_RING_FENCE_TIMEOUT_MS";

#[derive(Clone, Debug, PartialEq)]
pub struct RendererConfig {
    pub frames_in_flight: usize,
    pub swapchain_buffers: usize,
    /// `None` waits forever on a fence.
    pub fence_timeout: Option<Duration>,
    pub pass_count: usize,
    pub object_capacity: usize,
    pub material_capacity: usize,
    /// Per-frame vertices the payload rewrites every frame.
    pub dynamic_vertex_count: usize,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            frames_in_flight: DEFAULT_FRAMES_IN_FLIGHT,
            swapchain_buffers: DEFAULT_SWAPCHAIN_BUFFERS,
            fence_timeout: Some(DEFAULT_FENCE_TIMEOUT),
            pass_count: 1,
            object_capacity: 64,
            material_capacity: 16,
            dynamic_vertex_count: 0,
        }
    }
}

impl RendererConfig {
    pub fn with_frames_in_flight(mut self, frames_in_flight: usize) -> Self {
        self.frames_in_flight = frames_in_flight;
        self
    }

    pub fn with_swapchain_buffers(mut self, swapchain_buffers: usize) -> Self {
        self.swapchain_buffers = swapchain_buffers;
        self
    }

    pub fn with_fence_timeout(mut self, fence_timeout: Option<Duration>) -> Self {
        self.fence_timeout = fence_timeout;
        self
    }

    pub fn with_object_capacity(mut self, object_capacity: usize) -> Self {
        self.object_capacity = object_capacity;
        self
    }

    pub fn with_material_capacity(mut self, material_capacity: usize) -> Self {
        self.material_capacity = material_capacity;
        self
    }

    pub fn with_dynamic_vertex_count(mut self, dynamic_vertex_count: usize) -> Self {
        self.dynamic_vertex_count = dynamic_vertex_count;
        self
    }

    pub fn with_pass_count(mut self, pass_count: usize) -> Self {
        self.pass_count = pass_count;
        self
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_FRAMES_IN_FLIGHT) {
            config.frames_in_flight = parse_usize(ENV_FRAMES_IN_FLIGHT, &value)?;
        }

        if let Some(value) = lookup(ENV_SWAPCHAIN_BUFFERS) {
            config.swapchain_buffers = parse_usize(ENV_SWAPCHAIN_BUFFERS, &value)?;
        }

        if let Some(value) = lookup(ENV_FENCE_TIMEOUT_MS) {
            config.fence_timeout = match parse_usize(ENV_FENCE_TIMEOUT_MS, &value)? {
                0 => None,
                ms => Some(Duration::from_millis(ms as u64)),
            };
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.frames_in_flight == 0 {
            return Err(Error::Config("frames_in_flight must be at least 1".into()));
        }

        if self.swapchain_buffers < 2 {
            return Err(Error::Config(format!(
                "swapchain_buffers must be at least 2, got {}",
                self.swapchain_buffers
            )));
        }

        if self.pass_count == 0 {
            return Err(Error::Config("pass_count must be at least 1".into()));
        }

        Ok(())
    }
}

fn parse_usize(key: &str, value: &str) -> Result<usize> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{key}: `{value}` is not a non-negative integer")))
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, time::Duration};

    use super::RendererConfig;
    use crate::error::Error;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let config = RendererConfig::default();
        assert_eq!(config.frames_in_flight, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn env_overrides() {
        let config = RendererConfig::from_lookup(lookup(&[
            ("FRAME_RING_FRAMES_IN_FLIGHT", "2"),
            ("FRAME_RING_FENCE_TIMEOUT_MS", "250"),
        ]))
        .unwrap();

        assert_eq!(config.frames_in_flight, 2);
        assert_eq!(config.fence_timeout, Some(Duration::from_millis(250)));
    }

    #[test]
    fn zero_timeout_means_unbounded() {
        let config =
            RendererConfig::from_lookup(lookup(&[("FRAME_RING_FENCE_TIMEOUT_MS", "0")])).unwrap();
        assert_eq!(config.fence_timeout, None);
    }

    #[test]
    fn rejects_empty_ring() {
        let err = RendererConfig::from_lookup(lookup(&[("FRAME_RING_FRAMES_IN_FLIGHT", "0")]))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn rejects_garbage() {
        let err = RendererConfig::from_lookup(lookup(&[("FRAME_RING_SWAPCHAIN_BUFFERS", "two")]))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
