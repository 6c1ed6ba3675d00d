//! Response delay sampling - simulate backend latency before answering.

mod lognormal;

pub use lognormal::LogNormalDelay;

use std::str::FromStr;
use std::time::Duration;

/// Inclusive delay range in milliseconds. `min == max == 0` means no delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    min_ms: u64,
    max_ms: u64,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DelayParseError {
    #[error("invalid delay value '{0}', expected milliseconds")]
    InvalidNumber(String),
    #[error("delay range minimum {0} exceeds maximum {1}")]
    InvertedRange(u64, u64),
}

impl DelayRange {
    pub const NONE: DelayRange = DelayRange { min_ms: 0, max_ms: 0 };

    pub fn new(min_ms: u64, max_ms: u64) -> Result<Self, DelayParseError> {
        if min_ms > max_ms {
            return Err(DelayParseError::InvertedRange(min_ms, max_ms));
        }
        Ok(Self { min_ms, max_ms })
    }

    pub fn is_zero(&self) -> bool {
        self.min_ms == 0 && self.max_ms == 0
    }

    /// Integer uniformly distributed in `[min, max]`.
    pub fn sample_ms(&self) -> u64 {
        if self.min_ms == self.max_ms {
            self.min_ms
        } else {
            use rand::Rng;
            rand::thread_rng().gen_range(self.min_ms..=self.max_ms)
        }
    }
}

/// Delay in `MAX` or `MIN-MAX` milliseconds form. A single value means a
/// uniform draw from `[0, MAX]`.
impl FromStr for DelayRange {
    type Err = DelayParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |v: &str| {
            v.trim()
                .parse::<u64>()
                .map_err(|_| DelayParseError::InvalidNumber(v.to_string()))
        };
        match s.split_once('-') {
            Some((min, max)) => DelayRange::new(parse(min)?, parse(max)?),
            None => {
                let max = parse(s)?;
                DelayRange::new(0, max)
            }
        }
    }
}

impl std::fmt::Display for DelayRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.min_ms, self.max_ms)
    }
}

/// The configured latency distribution for a server instance. Immutable
/// after construction; sampling is safe from concurrent request tasks
/// (thread-local generators).
#[derive(Debug, Clone)]
pub enum DelaySampler {
    Range(DelayRange),
    LogNormal(LogNormalDelay),
}

impl DelaySampler {
    pub fn none() -> Self {
        DelaySampler::Range(DelayRange::NONE)
    }

    pub fn is_zero(&self) -> bool {
        match self {
            DelaySampler::Range(range) => range.is_zero(),
            DelaySampler::LogNormal(_) => false,
        }
    }

    /// Non-negative delay in milliseconds.
    pub fn sample_ms(&self) -> u64 {
        match self {
            DelaySampler::Range(range) => range.sample_ms(),
            DelaySampler::LogNormal(dist) => dist.sample_ms(),
        }
    }

    /// Sleep for one sampled delay. The only intentional blocking point in
    /// the request fast path.
    pub async fn apply(&self) {
        if self.is_zero() {
            return;
        }
        let ms = self.sample_ms();
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_value_as_zero_to_max() {
        let range: DelayRange = "250".parse().unwrap();
        assert_eq!(range, DelayRange::new(0, 250).unwrap());
    }

    #[test]
    fn parses_min_max() {
        let range: DelayRange = "100-200".parse().unwrap();
        assert_eq!(range, DelayRange::new(100, 200).unwrap());
    }

    #[test]
    fn rejects_garbage_and_inverted_ranges() {
        assert!(matches!(
            "abc".parse::<DelayRange>(),
            Err(DelayParseError::InvalidNumber(_))
        ));
        assert_eq!(
            "200-100".parse::<DelayRange>(),
            Err(DelayParseError::InvertedRange(200, 100))
        );
    }

    #[test]
    fn zero_range_means_no_delay() {
        let range: DelayRange = "0".parse().unwrap();
        assert!(range.is_zero());
        assert_eq!(range.sample_ms(), 0);
        assert!(DelaySampler::Range(range).is_zero());
    }

    #[test]
    fn uniform_samples_stay_in_bounds() {
        let range = DelayRange::new(3, 12).unwrap();
        for _ in 0..10_000 {
            let ms = range.sample_ms();
            assert!((3..=12).contains(&ms), "sample {ms} out of range");
        }
    }

    #[test]
    fn uniform_samples_cover_the_range_evenly() {
        // ten buckets, 10k draws: expect ~1000 each, generous tolerance
        let range = DelayRange::new(0, 9).unwrap();
        let mut counts = [0u32; 10];
        for _ in 0..10_000 {
            counts[range.sample_ms() as usize] += 1;
        }
        for (value, count) in counts.iter().enumerate() {
            assert!(
                (700..=1300).contains(count),
                "value {value} drawn {count} times, outside [700, 1300]"
            );
        }
    }

    #[test]
    fn fixed_range_is_deterministic() {
        let range = DelayRange::new(42, 42).unwrap();
        assert_eq!(range.sample_ms(), 42);
    }

    #[test]
    fn applying_a_zero_sampler_returns_immediately() {
        tokio_test::block_on(DelaySampler::none().apply());
    }
}
