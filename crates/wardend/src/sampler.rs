//! Host resource sampling for the fuse.
//!
//! The fuse only needs two numbers per tick: global CPU utilisation and the
//! share of physical RAM in use. Sampling is behind a trait so the fuse state
//! machine can be driven by scripted readings in tests.

use sysinfo::System;
use thiserror::Error;

/// One CPU/RAM reading, both in percent
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ResourceSample {
    pub cpu_percent: f32,
    pub ram_percent: f32,
}

impl ResourceSample {
    pub fn new(cpu_percent: f32, ram_percent: f32) -> Self {
        Self {
            cpu_percent,
            ram_percent,
        }
    }
}

#[derive(Error, Debug)]
pub enum SampleError {
    #[error("no CPUs reported by the host")]
    NoCpus,

    #[error("total memory reported as zero")]
    NoMemory,
}

/// Source of host readings for the fuse sampling loop
pub trait ResourceSampler: Send + 'static {
    fn sample(&mut self) -> Result<ResourceSample, SampleError>;
}

/// Production sampler backed by sysinfo.
///
/// CPU usage is computed by sysinfo as the delta between two refreshes, so the
/// sampler keeps its `System` alive and primes it once on construction.
pub struct SysinfoSampler {
    sys: System,
}

impl SysinfoSampler {
    pub fn new() -> Self {
        let mut sys = System::new();
        sys.refresh_cpu();
        sys.refresh_memory();
        Self { sys }
    }
}

impl Default for SysinfoSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceSampler for SysinfoSampler {
    fn sample(&mut self) -> Result<ResourceSample, SampleError> {
        self.sys.refresh_cpu();
        self.sys.refresh_memory();

        if self.sys.cpus().is_empty() {
            return Err(SampleError::NoCpus);
        }
        let total = self.sys.total_memory();
        if total == 0 {
            return Err(SampleError::NoMemory);
        }

        let cpu_percent = self.sys.global_cpu_info().cpu_usage();
        let ram_percent = (self.sys.used_memory() as f64 / total as f64 * 100.0) as f32;

        Ok(ResourceSample::new(cpu_percent, ram_percent))
    }
}

/// Replays a fixed list of readings, then repeats the last one
#[cfg(test)]
#[derive(Debug, Clone)]
pub(crate) struct ScriptedSampler {
    readings: Vec<Result<ResourceSample, ()>>,
    next: usize,
}

#[cfg(test)]
impl ScriptedSampler {
    pub(crate) fn new(readings: Vec<ResourceSample>) -> Self {
        Self {
            readings: readings.into_iter().map(Ok).collect(),
            next: 0,
        }
    }

    /// Append a failed reading to the script
    pub(crate) fn then_fail(mut self) -> Self {
        self.readings.push(Err(()));
        self
    }

    pub(crate) fn then(mut self, sample: ResourceSample) -> Self {
        self.readings.push(Ok(sample));
        self
    }
}

#[cfg(test)]
impl ResourceSampler for ScriptedSampler {
    fn sample(&mut self) -> Result<ResourceSample, SampleError> {
        let idx = self.next.min(self.readings.len().saturating_sub(1));
        self.next += 1;
        match self.readings.get(idx) {
            Some(Ok(sample)) => Ok(*sample),
            _ => Err(SampleError::NoMemory),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sysinfo_sampler_reports_percentages() {
        let mut sampler = SysinfoSampler::new();
        // Minimal containers may hide /proc; the fuse treats that as a zero sample
        if let Ok(sample) = sampler.sample() {
            assert!((0.0..=100.0).contains(&sample.ram_percent));
            assert!(sample.cpu_percent >= 0.0);
        }
    }

    #[test]
    fn test_scripted_sampler_repeats_last() {
        let mut sampler = ScriptedSampler::new(vec![ResourceSample::new(1.0, 2.0)])
            .then(ResourceSample::new(3.0, 4.0));
        assert_eq!(sampler.sample().unwrap(), ResourceSample::new(1.0, 2.0));
        assert_eq!(sampler.sample().unwrap(), ResourceSample::new(3.0, 4.0));
        assert_eq!(sampler.sample().unwrap(), ResourceSample::new(3.0, 4.0));
    }

    #[test]
    fn test_scripted_sampler_failure() {
        let mut sampler = ScriptedSampler::new(vec![ResourceSample::new(1.0, 2.0)]).then_fail();
        assert!(sampler.sample().is_ok());
        assert!(sampler.sample().is_err());
    }
}
