/// Current mcap as a whole multiple of the baseline. Falls back to 1 when
/// either side is missing or non-positive.
pub fn compute_multiplier(initial_mcap: f64, current_mcap: f64) -> u32 {
    if !(initial_mcap > 0.0 && current_mcap > 0.0) {
        return 1;
    }
    let ratio = (current_mcap / initial_mcap).round();
    if ratio.is_finite() && ratio >= 1.0 {
        ratio.min(u32::MAX as f64) as u32
    } else {
        1
    }
}

/// Only announce at 2x or better, and only above what was already announced.
pub fn should_follow_up(multiplier: u32, max_announced: u32) -> bool {
    multiplier >= 2 && multiplier > max_announced
}
