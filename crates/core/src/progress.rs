/// Weights of the segmented progress bar; they sum to 100.
pub const SEGMENT_WEIGHTS: [u32; 3] = [30, 30, 40];

/// Split a 0..=100 progress value across [`SEGMENT_WEIGHTS`], returning how
/// full each segment is as a rounded percentage.
#[must_use]
pub fn progress_segments(value: u32) -> [u32; 3] {
    let mut remaining = value.min(100);
    SEGMENT_WEIGHTS.map(|weight| {
        let filled = remaining.min(weight);
        remaining -= filled;
        (filled * 100 + weight / 2) / weight
    })
}

/// Encouragement shown at the end of a practice run, by accuracy band.
#[must_use]
pub fn completion_message(accuracy: u32) -> &'static str {
    match accuracy {
        85.. => "¡Excelente! Dominaste este tema.",
        60..=84 => "¡Buen trabajo! Un poco más y serás experto.",
        40..=59 => "Buen intento, sigue practicando para mejorar.",
        _ => "Cada intento cuenta, vuelve a intentarlo y mejorarás.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_fill_in_order() {
        assert_eq!(progress_segments(0), [0, 0, 0]);
        assert_eq!(progress_segments(45), [100, 50, 0]);
        assert_eq!(progress_segments(100), [100, 100, 100]);
        assert_eq!(progress_segments(250), [100, 100, 100]);
    }

    #[test]
    fn completion_bands() {
        assert_eq!(completion_message(85), "¡Excelente! Dominaste este tema.");
        assert_eq!(completion_message(60), "¡Buen trabajo! Un poco más y serás experto.");
        assert_eq!(completion_message(40), "Buen intento, sigue practicando para mejorar.");
        assert_eq!(completion_message(0), "Cada intento cuenta, vuelve a intentarlo y mejorarás.");
    }
}
