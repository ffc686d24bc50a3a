use std::{num::NonZeroU32, sync::LazyLock};

use regex::Regex;

use crate::treatment::{ParsedInterval, Treatment};

// ascii only, `\d` would also match other scripts' digits
static DIGIT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[0-9]+").expect("digit run pattern is valid"));

/// Finds the first run of digits in `description` and reads it as a number of minutes.
///
/// Only the leftmost run is ever considered: `"cada 8 y luego 12"` gives 8.
/// A run that is zero or does not fit in a `u32` means there is no interval,
/// the same as a description with no digits at all.
#[must_use]
pub fn extract_interval(description: &str) -> Option<NonZeroU32> {
    let run = DIGIT_RUN.find(description)?;
    run.as_str().parse::<NonZeroU32>().ok()
}

/// Derives the repeat interval of every treatment, skipping the ones without one.
#[must_use]
pub fn parse_intervals(treatments: &[Treatment]) -> Vec<ParsedInterval> {
    treatments
        .iter()
        .filter_map(|treatment| {
            extract_interval(&treatment.description).map(|minutes| ParsedInterval {
                treatment_id: treatment.id.clone(),
                minutes,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minutes(description: &str) -> Option<u32> {
        extract_interval(description).map(NonZeroU32::get)
    }

    #[test]
    fn no_digits_is_no_interval() {
        assert_eq!(minutes("sin intervalo"), None);
        assert_eq!(minutes(""), None);
        assert_eq!(minutes("tomar con comida"), None);
    }

    #[test]
    fn reads_the_digit_run() {
        assert_eq!(minutes("tomar cada 8 horas"), Some(8));
        assert_eq!(minutes("cada 10"), Some(10));
        assert_eq!(minutes("120min"), Some(120));
    }

    #[test]
    fn first_run_wins() {
        assert_eq!(minutes("cada 8 y luego 12"), Some(8));
        assert_eq!(minutes("2 pastillas cada 30"), Some(2));
    }

    #[test]
    fn zero_or_overflow_is_not_defaulted() {
        assert_eq!(minutes("cada 0 minutos"), None);
        assert_eq!(minutes("0 y 15"), None);
        assert_eq!(minutes("cada 99999999999"), None);
        assert_eq!(minutes("cada 08"), Some(8));
    }

    #[test]
    fn non_ascii_digits_are_ignored() {
        assert_eq!(minutes("cada ٣ horas"), None);
    }

    #[test]
    fn skips_treatments_without_interval() {
        let treatments = vec![
            Treatment::new(1u64, "ibuprofeno", "cada 5"),
            Treatment::new(2u64, "reposo", "sin intervalo"),
        ];
        let parsed = parse_intervals(&treatments);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].treatment_id.as_str(), "1");
        assert_eq!(parsed[0].minutes.get(), 5);
    }
}
