use super::ControllerConfig;

/// Temperature shift in °C for a price differential in percent.
///
/// `+49` means energy is 49 % more expensive than the reference, `-30` that it
/// is 30 % cheaper. Expensive energy yields a negative shift (heating is
/// delayed), cheap energy a positive one (heating is advanced). The result is
/// odd in the differential and bounded by `max_shift`; very large
/// differentials saturate to `±max_shift` at float precision.
pub fn price_shift(price_diff_percent: f64, max_shift: f64, steepness: f64) -> f64 {
    let p = price_diff_percent / 100.0;
    -max_shift * (steepness * p).tanh()
}

/// Base shift plus the price component when a price source is configured and
/// a reading is present. A missing price reading degrades to the base shift.
pub fn total_shift(config: &ControllerConfig, price_diff_percent: Option<f64>) -> f64 {
    let price_component = match price_diff_percent {
        Some(diff) if config.price_source => {
            price_shift(diff, config.max_price_shift, config.price_steepness)
        }
        _ => 0.0,
    };
    config.base_shift + price_component
}
