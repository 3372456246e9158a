/// Arithmetic mean of the finite values. Returns `None` when there are none,
/// so an absent pollutant never turns into a zero.
pub fn mean<I: IntoIterator<Item = f64>>(values: I) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));

    if count == 0 {
        return None;
    }
    Some(sum / count as f64)
}

/// Most frequent label; ties go to the label seen first.
pub fn plurality<'a, I: IntoIterator<Item = &'a str>>(labels: I) -> Option<&'a str> {
    let mut tally: Vec<(&str, usize)> = Vec::new();

    for label in labels {
        match tally.iter_mut().find(|(l, _)| *l == label) {
            Some((_, count)) => *count += 1,
            None => tally.push((label, 1)),
        }
    }

    tally
        .into_iter()
        .reduce(|best, next| if next.1 > best.1 { next } else { best })
        .map(|(label, _)| label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_skips_non_finite() {
        assert_eq!(mean([20.0, f64::NAN, 40.0, 60.0]), Some(40.0));
        assert_eq!(mean([f64::NAN]), None);
        assert_eq!(mean(Vec::<f64>::new()), None);
    }

    #[test]
    fn test_plurality_majority() {
        assert_eq!(plurality(["Good", "Moderate", "Moderate"]), Some("Moderate"));
    }

    #[test]
    fn test_plurality_tie_keeps_first_seen() {
        assert_eq!(plurality(["Poor", "Good", "Good", "Poor"]), Some("Poor"));
        assert_eq!(plurality(Vec::<&str>::new()), None);
    }
}
