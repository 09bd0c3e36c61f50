//! Maven version ordering and range expressions.
//!
//! [`Version`] compares the way Maven repositories expect: numeric segments
//! numerically, well-known qualifiers (`alpha`, `beta`, `rc`, `SNAPSHOT`, ...)
//! below the plain release, and `1.0` equal to `1`.

mod range;

pub use range::{Bound, VersionConstraint, VersionRange};

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Qualifiers in ascending order; the empty string is the release itself.
const QUALIFIERS: [&str; 7] = ["alpha", "beta", "milestone", "rc", "snapshot", "", "sp"];

/// Index of the release (empty) qualifier in [`QUALIFIERS`].
const RELEASE_INDEX: usize = 5;

#[derive(Debug, Clone)]
enum Item {
    /// Decimal digits without leading zeros ("" is zero).
    Int(String),
    /// Comparable form of a qualifier, see [`comparable_qualifier`].
    Str(String),
    List(Vec<Item>),
}

impl Item {
    fn is_null(&self) -> bool {
        match self {
            Item::Int(digits) => digits.is_empty(),
            Item::Str(q) => q == &RELEASE_INDEX.to_string(),
            Item::List(items) => items.is_empty(),
        }
    }

    fn compare(&self, other: Option<&Item>) -> Ordering {
        match (self, other) {
            (Item::Int(digits), None) => {
                if digits.is_empty() {
                    Ordering::Equal
                } else {
                    Ordering::Greater
                }
            }
            (Item::Int(a), Some(Item::Int(b))) => a.len().cmp(&b.len()).then_with(|| a.cmp(b)),
            (Item::Int(_), Some(_)) => Ordering::Greater,

            (Item::Str(q), None) => q.as_str().cmp(RELEASE_INDEX.to_string().as_str()),
            (Item::Str(_), Some(Item::Int(_))) => Ordering::Less,
            (Item::Str(a), Some(Item::Str(b))) => a.cmp(b),
            (Item::Str(_), Some(Item::List(_))) => Ordering::Less,

            (Item::List(items), None) => match items.first() {
                Some(first) => first.compare(None),
                None => Ordering::Equal,
            },
            (Item::List(_), Some(Item::Int(_))) => Ordering::Less,
            (Item::List(_), Some(Item::Str(_))) => Ordering::Greater,
            (Item::List(left), Some(Item::List(right))) => {
                let len = left.len().max(right.len());
                for i in 0..len {
                    let result = match (left.get(i), right.get(i)) {
                        (Some(l), r) => l.compare(r),
                        (None, Some(r)) => r.compare(None).reverse(),
                        (None, None) => Ordering::Equal,
                    };
                    if result != Ordering::Equal {
                        return result;
                    }
                }
                Ordering::Equal
            }
        }
    }
}

/// Maps a qualifier to a string that sorts in Maven order.
fn comparable_qualifier(qualifier: &str, followed_by_digit: bool) -> String {
    let qualifier = match qualifier {
        "a" if followed_by_digit => "alpha",
        "b" if followed_by_digit => "beta",
        "m" if followed_by_digit => "milestone",
        "ga" | "final" | "release" => "",
        "cr" => "rc",
        other => other,
    };

    match QUALIFIERS.iter().position(|q| *q == qualifier) {
        Some(index) => index.to_string(),
        None => format!("{}-{}", QUALIFIERS.len(), qualifier),
    }
}

fn parse_item(is_digit: bool, text: &str, followed_by_digit: bool) -> Item {
    if is_digit {
        Item::Int(text.trim_start_matches('0').to_string())
    } else {
        Item::Str(comparable_qualifier(text, followed_by_digit))
    }
}

/// Drops trailing null items, looking through nested lists.
fn normalize(items: &mut Vec<Item>) {
    let mut i = items.len();
    while i > 0 {
        i -= 1;
        if let Item::List(inner) = &mut items[i] {
            normalize(inner);
        }
        if items[i].is_null() {
            items.remove(i);
        } else if !matches!(items[i], Item::List(_)) {
            break;
        }
    }
}

/// Splits a version string into nested items.
///
/// `.` separates items of one list; `-` and digit/letter transitions open
/// a nested list.
fn parse_items(text: &str) -> Item {
    let version = text.to_lowercase();
    let chars: Vec<char> = version.chars().collect();

    // Path of indices from the root to the list currently being filled.
    let mut root: Vec<Item> = Vec::new();
    let mut path: Vec<usize> = Vec::new();

    fn current<'a>(root: &'a mut Vec<Item>, path: &[usize]) -> &'a mut Vec<Item> {
        let mut list = root;
        for &index in path {
            list = match &mut list[index] {
                Item::List(inner) => inner,
                _ => unreachable!("path only points at lists"),
            };
        }
        list
    }

    fn open_list(root: &mut Vec<Item>, path: &mut Vec<usize>) {
        let list = current(root, path);
        list.push(Item::List(Vec::new()));
        let index = list.len() - 1;
        path.push(index);
    }

    let mut is_digit = false;
    let mut start = 0;

    for (i, &c) in chars.iter().enumerate() {
        let segment: String = chars[start..i].iter().collect();
        if c == '.' {
            let item = if i == start {
                Item::Int(String::new())
            } else {
                parse_item(is_digit, &segment, false)
            };
            current(&mut root, &path).push(item);
            start = i + 1;
        } else if c == '-' {
            let item = if i == start {
                Item::Int(String::new())
            } else {
                parse_item(is_digit, &segment, false)
            };
            current(&mut root, &path).push(item);
            start = i + 1;
            open_list(&mut root, &mut path);
        } else if c.is_ascii_digit() {
            if !is_digit && i > start {
                current(&mut root, &path).push(parse_item(false, &segment, true));
                start = i;
                open_list(&mut root, &mut path);
            }
            is_digit = true;
        } else {
            if is_digit && i > start {
                current(&mut root, &path).push(parse_item(true, &segment, false));
                start = i;
                open_list(&mut root, &mut path);
            }
            is_digit = false;
        }
    }

    if chars.len() > start {
        let segment: String = chars[start..].iter().collect();
        current(&mut root, &path).push(parse_item(is_digit, &segment, false));
    }

    normalize(&mut root);
    Item::List(root)
}

/// A concrete version with Maven ordering.
///
/// Equality follows the ordering, so `1.0` equals `1`; [`fmt::Display`]
/// keeps the text the version was created from.
#[derive(Debug, Clone)]
pub struct Version {
    text: String,
    items: Item,
}

impl Version {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let items = parse_items(text.trim());
        Self { text, items }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Whether the text names a snapshot or other pre-release channel build.
    pub fn is_snapshot(&self) -> bool {
        self.text.to_lowercase().contains("snapshot")
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.items.compare(Some(&other.items))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl FromStr for Version {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            anyhow::bail!("Version must not be empty");
        }
        Ok(Version::new(s.trim()))
    }
}

impl From<&str> for Version {
    fn from(s: &str) -> Self {
        Version::new(s)
    }
}
