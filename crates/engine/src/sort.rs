//! Comparators for attribute-derived gallery ordering.

use chrono::{DateTime, Utc};
use core_types::{ImageRef, SortCriterion, SortDirection};
use std::cmp::Ordering;

/// Compare two images under a sort criterion and direction.
///
/// Filenames compare case-insensitively with numeric-aware segments
/// (`img2` before `img10`); date criteria compare chronologically over
/// RFC 3339 metadata values with unparsable/missing values ordered after
/// present ones; text criteria compare metadata values as plain strings.
pub fn compare(
    a: &ImageRef,
    b: &ImageRef,
    criterion: &SortCriterion,
    direction: SortDirection,
) -> Ordering {
    let ordering = match criterion {
        SortCriterion::Filename => natural_compare(&a.filename, &b.filename),
        SortCriterion::Date(key) => compare_dates(a.metadata_str(key), b.metadata_str(key)),
        SortCriterion::Text(key) => a
            .metadata_str(key)
            .unwrap_or("")
            .cmp(b.metadata_str(key).unwrap_or("")),
    };

    match direction {
        SortDirection::Ascending => ordering,
        SortDirection::Descending => ordering.reverse(),
    }
}

/// Case-insensitive comparison that treats digit runs as numbers.
pub fn natural_compare(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();

    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return a.cmp(b), // full tie-break keeps sorts stable across case
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(lc), Some(rc)) => {
                if lc.is_ascii_digit() && rc.is_ascii_digit() {
                    let ln = take_number(&mut left);
                    let rn = take_number(&mut right);
                    match compare_digit_runs(&ln, &rn) {
                        Ordering::Equal => {}
                        other => return other,
                    }
                } else {
                    let lc_fold = lc.to_lowercase();
                    let rc_fold = rc.to_lowercase();
                    match lc_fold.cmp(rc_fold) {
                        Ordering::Equal => {
                            left.next();
                            right.next();
                        }
                        other => return other,
                    }
                }
            }
        }
    }
}

fn take_number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut out = String::new();
    while let Some(c) = chars.peek() {
        if c.is_ascii_digit() {
            out.push(*c);
            chars.next();
        } else {
            break;
        }
    }
    out
}

/// Compare digit runs numerically without overflowing: strip leading zeros,
/// then longer run wins, then lexical.
fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn compare_dates(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (parse_date(a), parse_date(b)) {
        (Some(da), Some(db)) => da.cmp(&db),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn parse_date(raw: Option<&str>) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw?)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn image(filename: &str, metadata: &[(&str, &str)]) -> ImageRef {
        ImageRef {
            id: filename.to_string(),
            url: format!("https://example.com/{filename}"),
            filename: filename.to_string(),
            metadata: metadata
                .iter()
                .map(|(k, v)| (k.to_string(), serde_json::Value::from(*v)))
                .collect::<HashMap<_, _>>(),
        }
    }

    fn sorted_filenames(mut images: Vec<ImageRef>, direction: SortDirection) -> Vec<String> {
        images.sort_by(|a, b| compare(a, b, &SortCriterion::Filename, direction));
        images.into_iter().map(|i| i.filename).collect()
    }

    #[test]
    fn filenames_sort_numeric_aware() {
        let names = sorted_filenames(
            vec![
                image("shot10.jpg", &[]),
                image("shot2.jpg", &[]),
                image("Shot1.jpg", &[]),
            ],
            SortDirection::Ascending,
        );
        assert_eq!(names, vec!["Shot1.jpg", "shot2.jpg", "shot10.jpg"]);
    }

    #[test]
    fn descending_reverses() {
        let names = sorted_filenames(
            vec![image("a.jpg", &[]), image("b.jpg", &[])],
            SortDirection::Descending,
        );
        assert_eq!(names, vec!["b.jpg", "a.jpg"]);
    }

    #[test]
    fn leading_zeros_compare_by_value() {
        // equal numeric value falls back to the byte-wise tie-break
        assert_eq!(natural_compare("img007", "img7"), Ordering::Less);
        assert_eq!(natural_compare("img008", "img9"), Ordering::Less);
        assert_eq!(natural_compare("img10", "img9"), Ordering::Greater);
    }

    #[test]
    fn dates_sort_chronologically_with_missing_last() {
        let a = image("a.jpg", &[("captured_at", "2024-03-01T10:00:00Z")]);
        let b = image("b.jpg", &[("captured_at", "2023-12-31T23:59:00Z")]);
        let c = image("c.jpg", &[]);
        let criterion = SortCriterion::Date("captured_at".into());

        let mut images = vec![a, b, c];
        images.sort_by(|x, y| compare(x, y, &criterion, SortDirection::Ascending));
        let names: Vec<_> = images.iter().map(|i| i.filename.as_str()).collect();
        assert_eq!(names, vec!["b.jpg", "a.jpg", "c.jpg"]);
    }

    #[test]
    fn text_criterion_compares_metadata_plainly() {
        let a = image("a.jpg", &[("angle", "front-three-quarter")]);
        let b = image("b.jpg", &[("angle", "rear")]);
        let criterion = SortCriterion::Text("angle".into());
        assert_eq!(
            compare(&a, &b, &criterion, SortDirection::Ascending),
            Ordering::Less
        );
    }
}
