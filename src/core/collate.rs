//! Natural ordering of captured values
//!
//! Digit runs compare by numeric value and letters compare case-insensitively,
//! so `frame2` sorts before `Frame10`. Strings that differ only in case or in
//! leading zeros fall back to a plain comparison to keep the order total.

use std::cmp::Ordering;
use std::iter::Peekable;
use std::str::Chars;

/// Compares two strings in natural order
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    compare_chunks(a, b).then_with(|| a.cmp(b))
}

/// Compares two tuples element by element in natural order, shorter first on ties
pub fn compare_tuples<S: AsRef<str>>(a: &[S], b: &[S]) -> Ordering {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| natural_cmp(x.as_ref(), y.as_ref()))
        .find(|ordering| ordering.is_ne())
        .unwrap_or_else(|| a.len().cmp(&b.len()))
}

fn compare_chunks(a: &str, b: &str) -> Ordering {
    let mut a = a.chars().peekable();
    let mut b = b.chars().peekable();

    loop {
        match (a.peek().copied(), b.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let x = take_digits(&mut a);
                let y = take_digits(&mut b);
                let ordering = compare_numbers(&x, &y);
                if ordering.is_ne() {
                    return ordering;
                }
            }
            (Some(x), Some(y)) => {
                a.next();
                b.next();
                let ordering = x.to_lowercase().cmp(y.to_lowercase());
                if ordering.is_ne() {
                    return ordering;
                }
            }
        }
    }
}

fn take_digits(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(c) = chars.next_if(|c| c.is_ascii_digit()) {
        digits.push(c);
    }
    digits
}

/// Compares digit strings by value without parsing, so any length works
fn compare_numbers(a: &str, b: &str) -> Ordering {
    let a_trimmed = a.trim_start_matches('0');
    let b_trimmed = b.trim_start_matches('0');
    a_trimmed
        .len()
        .cmp(&b_trimmed.len())
        .then_with(|| a_trimmed.cmp(b_trimmed))
        .then_with(|| a.len().cmp(&b.len()))
}
