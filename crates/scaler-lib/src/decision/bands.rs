//! Intensity band resolution
//!
//! Maps a forecast sample to the replica cap of the band its intensity falls
//! into. Band `i` covers `(threshold[i-1], threshold[i]]`, the first band
//! starting at zero.

use crate::error::DecisionError;
use crate::models::{ForecastSample, IntensityBand};

/// Resolves a replica cap from ordered intensity bands
pub struct ReplicaBandResolver;

impl ReplicaBandResolver {
    /// Resolve the cap for `sample`.
    ///
    /// Intensities above every threshold fall back to the highest band.
    pub fn resolve(
        sample: Option<&ForecastSample>,
        bands: &[IntensityBand],
    ) -> Result<u32, DecisionError> {
        Self::select(sample, bands).map(|band| band.max_replicas)
    }

    /// The band `sample` falls into, borrowed from `bands`
    pub fn select<'a>(
        sample: Option<&ForecastSample>,
        bands: &'a [IntensityBand],
    ) -> Result<&'a IntensityBand, DecisionError> {
        let sample = sample.ok_or(DecisionError::NoForecast)?;
        let sorted = Self::sorted(bands);

        let last = *sorted
            .last()
            .ok_or_else(|| DecisionError::InvalidPolicy("no intensity bands configured".into()))?;

        let intensity = sample.intensity;
        let mut lower_bound = 0.0;
        for band in sorted {
            if intensity > lower_bound && intensity <= band.upper_threshold {
                return Ok(band);
            }
            lower_bound = band.upper_threshold;
        }

        Ok(last)
    }

    /// Bands in ascending threshold order.
    ///
    /// Sorts references; the caller's policy may be shared across evaluations.
    pub fn sorted(bands: &[IntensityBand]) -> Vec<&IntensityBand> {
        let mut sorted: Vec<&IntensityBand> = bands.iter().collect();
        sorted.sort_by(|a, b| a.upper_threshold.total_cmp(&b.upper_threshold));
        sorted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn bands() -> Vec<IntensityBand> {
        vec![
            IntensityBand::new(40.0, 80),
            IntensityBand::new(90.0, 20),
            IntensityBand::new(100.0, 10),
        ]
    }

    fn sample(intensity: f64) -> ForecastSample {
        ForecastSample::new(Utc::now(), 5, intensity)
    }

    #[test]
    fn test_upper_bound_is_inclusive() {
        assert_eq!(ReplicaBandResolver::resolve(Some(&sample(100.0)), &bands()), Ok(10));
        assert_eq!(ReplicaBandResolver::resolve(Some(&sample(40.0)), &bands()), Ok(80));
        assert_eq!(ReplicaBandResolver::resolve(Some(&sample(90.0)), &bands()), Ok(20));
    }

    #[test]
    fn test_intensity_inside_band() {
        assert_eq!(ReplicaBandResolver::resolve(Some(&sample(30.0)), &bands()), Ok(80));
        assert_eq!(ReplicaBandResolver::resolve(Some(&sample(67.0)), &bands()), Ok(20));
    }

    #[test]
    fn test_above_all_bands_uses_last_band() {
        assert_eq!(ReplicaBandResolver::resolve(Some(&sample(101.0)), &bands()), Ok(10));
    }

    #[test]
    fn test_zero_intensity_falls_through_to_last_band() {
        // The first band's lower bound is exclusive
        assert_eq!(ReplicaBandResolver::resolve(Some(&sample(0.0)), &bands()), Ok(10));
    }

    #[test]
    fn test_unsorted_bands_are_sorted_privately() {
        let mut unsorted = bands();
        unsorted.reverse();
        let before = unsorted.clone();

        assert_eq!(ReplicaBandResolver::resolve(Some(&sample(67.0)), &unsorted), Ok(20));
        assert_eq!(unsorted, before);
    }

    #[test]
    fn test_missing_sample_is_an_error() {
        assert_eq!(
            ReplicaBandResolver::resolve(None, &bands()),
            Err(DecisionError::NoForecast)
        );
    }

    #[test]
    fn test_empty_bands_is_invalid_policy() {
        assert!(matches!(
            ReplicaBandResolver::resolve(Some(&sample(10.0)), &[]),
            Err(DecisionError::InvalidPolicy(_))
        ));
    }

    #[test]
    fn test_select_borrows_the_chosen_band() {
        let bands = bands();
        let chosen = ReplicaBandResolver::select(Some(&sample(0.0)), &bands).unwrap();
        assert!(std::ptr::eq(chosen, &bands[2]));

        let chosen = ReplicaBandResolver::select(Some(&sample(41.0)), &bands).unwrap();
        assert!(std::ptr::eq(chosen, &bands[1]));
    }
}
