//! Fill-gaps metadata merging.
//!
//! Earlier-known values always win: an incoming value is only taken when the
//! existing field is missing or empty.

use crate::record::Fields;

/// Merges `incoming` into a copy of `existing` and returns the result.
///
/// Idempotent: `merge(&merge(a, b), b) == merge(a, b)`.
#[must_use]
pub fn merge(existing: &Fields, incoming: &Fields) -> Fields {
    let mut merged = existing.clone();
    merge_into(&mut merged, incoming);
    merged
}

/// Merges `incoming` into `existing` in place.
///
/// Returns the number of fields that were written.
pub fn merge_into(existing: &mut Fields, incoming: &Fields) -> usize {
    let mut written = 0;
    for (name, value) in incoming {
        match existing.get_mut(name) {
            Some(current) if !current.is_empty() => {}
            Some(current) => {
                if current != value {
                    current.clone_from(value);
                    written += 1;
                }
            }
            None => {
                existing.insert(name.clone(), value.clone());
                written += 1;
            }
        }
    }
    written
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_merge_keeps_existing_non_empty_values() {
        let existing = fields(&[("title", "Seed Title")]);
        let incoming = fields(&[("title", "Crossref Title")]);
        assert_eq!(merge(&existing, &incoming), existing);
    }

    #[test]
    fn test_merge_fills_missing_and_empty_values() {
        let existing = fields(&[("title", ""), ("authors", "A. Author")]);
        let incoming = fields(&[("title", "Filled"), ("publisher", "ACM")]);

        let merged = merge(&existing, &incoming);
        assert_eq!(merged.get("title").unwrap(), "Filled");
        assert_eq!(merged.get("publisher").unwrap(), "ACM");
        assert_eq!(merged.get("authors").unwrap(), "A. Author");
    }

    #[test]
    fn test_merge_inserts_empty_incoming_values_as_present() {
        let merged = merge(&Fields::new(), &fields(&[("abstract", "")]));
        assert_eq!(merged.get("abstract").map(String::as_str), Some(""));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let a = fields(&[("title", ""), ("doi", "10.1/a")]);
        let b = fields(&[("title", "T"), ("doi", "10.1/other"), ("abstract", "")]);
        let once = merge(&a, &b);
        assert_eq!(merge(&once, &b), once);
    }

    #[test]
    fn test_merge_precedence_over_repeated_merges() {
        let mut node = Fields::new();
        merge_into(&mut node, &fields(&[("title", "First")]));
        merge_into(&mut node, &fields(&[("title", "Second")]));
        assert_eq!(node.get("title").unwrap(), "First");
    }

    #[test]
    fn test_merge_into_counts_written_fields() {
        let mut node = fields(&[("title", "Kept"), ("abstract", "")]);
        let written = merge_into(
            &mut node,
            &fields(&[("title", "Ignored"), ("abstract", "Filled"), ("doi", "10.1/a")]),
        );
        assert_eq!(written, 2);
    }
}
