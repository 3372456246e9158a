use crate::aqi::breakpoints::{Band, BreakpointTable};
use crate::aqi::types::Pollutant;

/// Converts one captured concentration into a sub-index.
///
/// CO is converted from µg/m³ to mg/m³ first. Returns `None` when the
/// pollutant has no table or the value falls outside every band (negative,
/// non-finite, or above the table's ceiling). Values are never extrapolated.
pub fn sub_index(concentration: f64, pollutant: Pollutant, table: &BreakpointTable) -> Option<u16> {
    let bands = table.bands(pollutant)?;
    interpolate(pollutant.scoring_value(concentration), bands)
}

/// Linear interpolation within the band covering `c`, rounded half up.
///
/// Band `i` covers `(bands[i-1].hi, bands[i].hi]`; the first band also
/// covers its own lower edge. A value in the gap below a band's `lo` scores
/// as that band's `lo`.
pub fn interpolate(c: f64, bands: &[Band]) -> Option<u16> {
    if !c.is_finite() || c < bands.first()?.lo {
        return None;
    }

    let band = bands.iter().find(|b| c <= b.hi)?;
    let c = c.max(band.lo);
    let slope = (band.index_hi - band.index_lo) / (band.hi - band.lo);
    let index = slope * (c - band.lo) + band.index_lo;

    // Non-negative, so round() (half away from zero) is half-up here.
    Some(index.round().clamp(0.0, super::breakpoints::MAX_INDEX) as u16)
}
