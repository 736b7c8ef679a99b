//! Type inference logic for column analysis.

use crate::config::AnalysisConfig;
use crate::types::InferredType;
use crate::utils::{is_boolean_string, is_datetime_dtype, is_numeric_dtype, parse_numeric_string};
use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;
use std::collections::HashSet;

// Cheap shape check before trying chrono formats
static DATE_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{1,4}[-/.]\d{1,2}[-/.]\d{1,4}([T ]\d{1,2}:\d{2}(:\d{2})?)?$")
        .expect("Invalid regex: date shape")
});

/// A candidate date layout, tried in rank order.
struct DatePattern {
    format: &'static str,
    has_time: bool,
}

impl DatePattern {
    fn matches(&self, value: &str) -> bool {
        if self.has_time {
            NaiveDateTime::parse_from_str(value, self.format).is_ok()
        } else {
            NaiveDate::parse_from_str(value, self.format).is_ok()
        }
    }
}

const DATE_PATTERNS: [DatePattern; 8] = [
    DatePattern { format: "%Y-%m-%d", has_time: false },
    DatePattern { format: "%Y-%m-%dT%H:%M:%S", has_time: true },
    DatePattern { format: "%Y-%m-%d %H:%M:%S", has_time: true },
    DatePattern { format: "%Y/%m/%d", has_time: false },
    DatePattern { format: "%d/%m/%Y", has_time: false },
    DatePattern { format: "%m/%d/%Y", has_time: false },
    DatePattern { format: "%d-%m-%Y", has_time: false },
    DatePattern { format: "%d.%m.%Y", has_time: false },
];

fn looks_like_date(value: &str) -> bool {
    DATE_SHAPE.is_match(value) && DATE_PATTERNS.iter().any(|p| p.matches(value))
}

/// Share of sampled values falling in each value class.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct ClassFractions {
    pub numeric: f64,
    pub date: f64,
    pub boolean: f64,
    pub text: f64,
}

impl ClassFractions {
    fn of(sample: &[&str]) -> Self {
        let (mut numeric, mut date, mut boolean, mut text) = (0usize, 0usize, 0usize, 0usize);
        for value in sample {
            if parse_numeric_string(value).is_some() {
                numeric += 1;
            } else if looks_like_date(value) {
                date += 1;
            } else if is_boolean_string(value) {
                boolean += 1;
            } else {
                text += 1;
            }
        }
        let n = sample.len().max(1) as f64;
        Self {
            numeric: numeric as f64 / n,
            date: date as f64 / n,
            boolean: boolean as f64 / n,
            text: text as f64 / n,
        }
    }

    fn max(&self) -> f64 {
        self.numeric.max(self.date).max(self.boolean).max(self.text)
    }
}

/// Outcome of type inference for one column.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TypeGuess {
    pub inferred_type: InferredType,
    pub confidence: f64,
    pub date_format: Option<String>,
    pub fractions: Option<ClassFractions>,
}

impl TypeGuess {
    fn certain(inferred_type: InferredType) -> Self {
        Self {
            inferred_type,
            confidence: 1.0,
            date_format: None,
            fractions: None,
        }
    }
}

/// Infer the semantic type of a column.
///
/// `texts` is the rendered column; `distinct_count` counts distinct
/// non-missing renderings over the whole column.
pub(crate) fn infer_type(
    series: &Series,
    texts: &[Option<String>],
    distinct_count: usize,
    config: &AnalysisConfig,
) -> TypeGuess {
    if texts.iter().all(Option::is_none) {
        return TypeGuess {
            inferred_type: InferredType::Empty,
            confidence: 0.0,
            date_format: None,
            fractions: None,
        };
    }

    let dtype = series.dtype();
    if is_numeric_dtype(dtype) {
        return TypeGuess::certain(InferredType::Numeric);
    }
    if matches!(dtype, DataType::Boolean) {
        return TypeGuess::certain(InferredType::Boolean);
    }
    if is_datetime_dtype(dtype) {
        return TypeGuess::certain(InferredType::Date);
    }

    let sample: Vec<&str> = texts
        .iter()
        .flatten()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .take(config.type_sample_size)
        .collect();

    if sample.is_empty() {
        return TypeGuess {
            inferred_type: InferredType::Categorical,
            confidence: 0.0,
            date_format: None,
            fractions: None,
        };
    }

    classify_sample(&sample, texts.len(), distinct_count, config)
}

fn classify_sample(
    sample: &[&str],
    row_count: usize,
    distinct_count: usize,
    config: &AnalysisConfig,
) -> TypeGuess {
    let lowered: HashSet<String> = sample.iter().map(|s| s.to_ascii_lowercase()).collect();
    if lowered.len() <= 2 && lowered.iter().all(|v| is_boolean_string(v)) {
        return TypeGuess::certain(InferredType::Boolean);
    }

    let fractions = ClassFractions::of(sample);
    let guess = |inferred_type, confidence: f64| TypeGuess {
        inferred_type,
        confidence: confidence.clamp(0.0, 1.0),
        date_format: None,
        fractions: Some(fractions),
    };

    if fractions.numeric >= config.numeric_parse_ratio {
        return guess(InferredType::Numeric, fractions.numeric);
    }

    let n = sample.len() as f64;
    for pattern in &DATE_PATTERNS {
        let matched = sample
            .iter()
            .filter(|v| DATE_SHAPE.is_match(v) && pattern.matches(v))
            .count();
        let ratio = matched as f64 / n;
        if ratio >= config.date_match_ratio {
            return TypeGuess {
                date_format: Some(pattern.format.to_string()),
                ..guess(InferredType::Date, ratio)
            };
        }
    }

    let present = [fractions.numeric, fractions.date, fractions.boolean, fractions.text]
        .iter()
        .filter(|f| **f >= config.mixed_min_fraction)
        .count();
    let typed_present = [fractions.numeric, fractions.date, fractions.boolean]
        .iter()
        .any(|f| *f >= config.mixed_min_fraction);
    if present >= 2 && typed_present {
        return guess(InferredType::Mixed, fractions.max());
    }

    let cardinality_ratio = distinct_count as f64 / row_count.max(1) as f64;
    if cardinality_ratio > config.high_cardinality_ratio
        && distinct_count >= config.high_cardinality_min_distinct
    {
        return guess(InferredType::HighCardinality, cardinality_ratio);
    }

    guess(InferredType::Categorical, fractions.text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn infer(values: &[Option<&str>]) -> TypeGuess {
        let series = Series::new("col".into(), values);
        let texts: Vec<Option<String>> = values.iter().map(|v| v.map(str::to_string)).collect();
        let distinct: HashSet<&str> = values.iter().flatten().copied().collect();
        infer_type(&series, &texts, distinct.len(), &AnalysisConfig::default())
    }

    #[test]
    fn test_numeric_strings() {
        let guess = infer(&[Some("1.5"), Some("2"), Some("$3"), None]);
        assert_eq!(guess.inferred_type, InferredType::Numeric);
        assert_eq!(guess.confidence, 1.0);
    }

    #[test]
    fn test_native_numeric() {
        let series = Series::new("n".into(), &[1i64, 2, 3]);
        let texts = vec![Some("1".to_string()), Some("2".to_string()), Some("3".to_string())];
        let guess = infer_type(&series, &texts, 3, &AnalysisConfig::default());
        assert_eq!(guess.inferred_type, InferredType::Numeric);
    }

    #[test]
    fn test_boolean_vocabulary() {
        let guess = infer(&[Some("Yes"), Some("no"), Some("yes"), Some("NO")]);
        assert_eq!(guess.inferred_type, InferredType::Boolean);
    }

    #[test]
    fn test_iso_dates() {
        let guess = infer(&[
            Some("2024-01-05"),
            Some("2024-02-10"),
            Some("2024-03-15"),
            Some("2024-04-20"),
        ]);
        assert_eq!(guess.inferred_type, InferredType::Date);
        assert_eq!(guess.date_format.as_deref(), Some("%Y-%m-%d"));
    }

    #[test]
    fn test_first_matching_date_pattern_wins() {
        // Valid both day-first and month-first; day-first ranks higher
        let guess = infer(&[Some("01/02/2024"), Some("03/04/2024"), Some("05/06/2024")]);
        assert_eq!(guess.inferred_type, InferredType::Date);
        assert_eq!(guess.date_format.as_deref(), Some("%d/%m/%Y"));
    }

    #[test]
    fn test_mixed_numbers_and_dates() {
        let guess = infer(&[
            Some("12"),
            Some("2024-01-05"),
            Some("7"),
            Some("2024-02-01"),
            Some("3"),
        ]);
        assert_eq!(guess.inferred_type, InferredType::Mixed);
        let fractions = guess.fractions.unwrap();
        assert!((fractions.numeric - 0.6).abs() < 1e-12);
        assert!((fractions.date - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_numbers_with_text_placeholders_are_mixed() {
        let guess = infer(&[Some("10"), Some("20"), Some("unknown"), Some("30"), Some("40")]);
        assert_eq!(guess.inferred_type, InferredType::Mixed);
    }

    #[test]
    fn test_categorical() {
        let guess = infer(&[Some("red"), Some("blue"), Some("red"), Some("green")]);
        assert_eq!(guess.inferred_type, InferredType::Categorical);
    }

    #[test]
    fn test_high_cardinality() {
        let values: Vec<String> = (0..30).map(|i| format!("user-{i}@example.com")).collect();
        let refs: Vec<Option<&str>> = values.iter().map(|v| Some(v.as_str())).collect();
        let guess = infer(&refs);
        assert_eq!(guess.inferred_type, InferredType::HighCardinality);
    }

    #[test]
    fn test_all_missing_is_empty() {
        let guess = infer(&[None, None]);
        assert_eq!(guess.inferred_type, InferredType::Empty);
        assert_eq!(guess.confidence, 0.0);
    }
}
