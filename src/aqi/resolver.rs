use crate::aqi::subindex::sub_index;
use crate::aqi::types::{AqiResult, PollutantReading, SubIndexResult};
use crate::config::AqiConfig;

/// Resolves a full reading into an [`AqiResult`].
///
/// Every present pollutant is scored in canonical order. The overall index
/// is the largest sub-index; on a tie the earlier pollutant governs.
/// Returns `None` when no pollutant produced a sub-index, which callers must
/// treat as "insufficient data" rather than a clean-air zero.
pub fn resolve(reading: &PollutantReading, config: &AqiConfig) -> Option<AqiResult> {
    let sub_indices: Vec<SubIndexResult> = reading
        .iter()
        .filter_map(|(pollutant, concentration)| {
            sub_index(concentration, pollutant, &config.breakpoints).map(|s| SubIndexResult {
                pollutant,
                sub_index: s,
            })
        })
        .collect();

    let worst = sub_indices
        .iter()
        .copied()
        .reduce(|best, next| if next.sub_index > best.sub_index { next } else { best })?;

    Some(AqiResult {
        index: worst.sub_index,
        governing: worst.pollutant,
        scale: config.scheme.classify(worst.sub_index),
        sub_indices,
    })
}
