//! Natural filename ordering: "image2.jpg" < "image10.jpg"

use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum NaturalSortPart {
    Num(u64),
    Str(String),
}

/// Generate a natural sort key (case-insensitive, digit runs compared numerically)
pub fn natural_sort_key(s: &str) -> Vec<NaturalSortPart> {
    let mut parts = Vec::new();
    let mut current_num = String::new();
    let mut current_str = String::new();

    for c in s.chars() {
        if c.is_ascii_digit() {
            if !current_str.is_empty() {
                parts.push(NaturalSortPart::Str(current_str.to_lowercase()));
                current_str.clear();
            }
            current_num.push(c);
        } else {
            if !current_num.is_empty() {
                push_number(&mut parts, &current_num);
                current_num.clear();
            }
            current_str.push(c);
        }
    }

    if !current_num.is_empty() {
        push_number(&mut parts, &current_num);
    }
    if !current_str.is_empty() {
        parts.push(NaturalSortPart::Str(current_str.to_lowercase()));
    }

    parts
}

fn push_number(parts: &mut Vec<NaturalSortPart>, digits: &str) {
    match digits.parse::<u64>() {
        Ok(n) => parts.push(NaturalSortPart::Num(n)),
        // Longer than u64: fall back to text so ordering stays total
        Err(_) => parts.push(NaturalSortPart::Str(digits.to_string())),
    }
}

/// Compare two names in natural order
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    natural_sort_key(a)
        .cmp(&natural_sort_key(b))
        .then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_natural_sort() {
        let mut names = vec!["image10.jpg", "image2.jpg", "image1.jpg", "image20.jpg"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(names, vec!["image1.jpg", "image2.jpg", "image10.jpg", "image20.jpg"]);
    }

    #[test]
    fn test_natural_sort_case_insensitive() {
        let mut names = vec!["b.jpg", "C.jpg", "A.jpg"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(names, vec!["A.jpg", "b.jpg", "C.jpg"]);
    }

    #[test]
    fn test_zero_padded_equal_numbers_are_stable() {
        assert_eq!(natural_cmp("001.jpg", "1.jpg"), "001.jpg".cmp("1.jpg"));
        assert_eq!(natural_cmp("002.jpg", "010.jpg"), Ordering::Less);
    }
}
