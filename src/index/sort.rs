//! Sort policies for directory listings.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::filetype::FiletypeRegistry;

use super::{Directory, File, SortOrder};

/// Human-natural compare: runs of digits are grouped and compared
/// numerically rather than character-by-character, so `"img2"` sorts
/// before `"img10"`.
pub fn natural_compare(a: &str, b: &str) -> Ordering {
    let mut a_chars = a.chars().peekable();
    let mut b_chars = b.chars().peekable();

    loop {
        match (a_chars.peek(), b_chars.peek()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(ac), Some(bc)) => {
                if ac.is_ascii_digit() && bc.is_ascii_digit() {
                    let a_num = take_digits(&mut a_chars);
                    let b_num = take_digits(&mut b_chars);
                    let a_val: u128 = a_num.parse().unwrap_or(u128::MAX);
                    let b_val: u128 = b_num.parse().unwrap_or(u128::MAX);
                    match a_val.cmp(&b_val) {
                        Ordering::Equal => {
                            // Equal numeric value: fall back to the literal
                            // digit string so "007" still ranks after "7".
                            match a_num.len().cmp(&b_num.len()) {
                                Ordering::Equal => continue,
                                other => return other,
                            }
                        }
                        other => return other,
                    }
                } else {
                    let ac = ac.to_ascii_lowercase();
                    let bc = bc.to_ascii_lowercase();
                    match ac.cmp(&bc) {
                        Ordering::Equal => {
                            a_chars.next();
                            b_chars.next();
                        }
                        other => return other,
                    }
                }
            }
        }
    }
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars>) -> String {
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

/// Order subdirectories per the selected policy. Directories have no
/// "last modified" concept distinct from their name in this index, so
/// `LastModified` degrades to `last_sync_time` with name as tiebreaker.
pub fn sort_directories(dirs: &mut [Directory], order: SortOrder) {
    match order {
        SortOrder::NaturalName | SortOrder::NameOnly => {
            dirs.sort_by(|a, b| natural_compare(&a.fqpn, &b.fqpn));
        }
        SortOrder::LastModified => {
            dirs.sort_by(|a, b| {
                mtime_desc(a.last_sync_time, b.last_sync_time)
                    .then_with(|| natural_compare(&a.fqpn, &b.fqpn))
            });
        }
    }
}

/// Order files per the selected policy. `NaturalName` and `LastModified`
/// group link-kind files ahead of ordinary files; `NameOnly` ignores
/// kind entirely.
pub fn sort_files(files: &mut [File], order: SortOrder, registry: &FiletypeRegistry) {
    let is_link = |f: &File| registry.get_by_ext(&f.filetype_ext).is_link;

    match order {
        SortOrder::NaturalName => {
            files.sort_by(|a, b| {
                link_rank(is_link(a))
                    .cmp(&link_rank(is_link(b)))
                    .then_with(|| natural_compare(&a.name, &b.name))
            });
        }
        SortOrder::LastModified => {
            files.sort_by(|a, b| {
                link_rank(is_link(a))
                    .cmp(&link_rank(is_link(b)))
                    .then_with(|| mtime_desc(a.mtime, b.mtime))
                    .then_with(|| natural_compare(&a.name, &b.name))
            });
        }
        SortOrder::NameOnly => {
            files.sort_by(|a, b| natural_compare(&a.name, &b.name));
        }
    }
}

fn link_rank(is_link: bool) -> u8 {
    if is_link {
        0
    } else {
        1
    }
}

fn mtime_desc(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    // Descending: newest first. Missing mtimes sort last.
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_are_grouped_numerically() {
        assert_eq!(natural_compare("img2", "img10"), Ordering::Less);
        assert_eq!(natural_compare("img10", "img2"), Ordering::Greater);
        assert_eq!(natural_compare("img2", "img2"), Ordering::Equal);
    }

    #[test]
    fn case_insensitive() {
        assert_eq!(natural_compare("Apple", "apple"), Ordering::Equal);
        assert_eq!(natural_compare("Apple", "banana"), Ordering::Less);
    }

    #[test]
    fn equal_numeric_value_breaks_tie_on_digit_length() {
        assert_eq!(natural_compare("page7", "page07"), Ordering::Less);
    }
}
