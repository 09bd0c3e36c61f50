//! Version range expressions such as `[1.0,2.0)` or `[1.0,1.5],[2.0,)`.

use anyhow::{Result, bail};
use std::fmt;
use std::str::FromStr;

use super::Version;

/// One end of a [`VersionRange`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bound {
    pub version: Version,
    pub inclusive: bool,
}

/// A single bracketed interval. A missing bound is unbounded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    pub lower: Option<Bound>,
    pub upper: Option<Bound>,
}

impl VersionRange {
    pub fn contains(&self, version: &Version) -> bool {
        let above_lower = match &self.lower {
            Some(bound) if bound.inclusive => version >= &bound.version,
            Some(bound) => version > &bound.version,
            None => true,
        };
        let below_upper = match &self.upper {
            Some(bound) if bound.inclusive => version <= &bound.version,
            Some(bound) => version < &bound.version,
            None => true,
        };
        above_lower && below_upper
    }

    /// Parses the inside of one bracket pair, brackets included.
    fn parse(text: &str) -> Result<Self> {
        let open = text.chars().next();
        let close = text.chars().last();
        let lower_inclusive = match open {
            Some('[') => true,
            Some('(') => false,
            _ => bail!("Invalid version range '{}': expected '[' or '('", text),
        };
        let upper_inclusive = match close {
            Some(']') => true,
            Some(')') => false,
            _ => bail!("Invalid version range '{}': expected ']' or ')'", text),
        };

        let inner = text[1..text.len() - 1].trim();
        match inner.split_once(',') {
            None => {
                if !lower_inclusive || !upper_inclusive || inner.is_empty() {
                    bail!("Invalid version range '{}': single versions need '[v]'", text);
                }
                let version = Version::new(inner);
                Ok(VersionRange {
                    lower: Some(Bound {
                        version: version.clone(),
                        inclusive: true,
                    }),
                    upper: Some(Bound {
                        version,
                        inclusive: true,
                    }),
                })
            }
            Some((lower, upper)) => {
                let (lower, upper) = (lower.trim(), upper.trim());
                if upper.contains(',') {
                    bail!("Invalid version range '{}': too many bounds", text);
                }
                let lower = (!lower.is_empty()).then(|| Bound {
                    version: Version::new(lower),
                    inclusive: lower_inclusive,
                });
                let upper = (!upper.is_empty()).then(|| Bound {
                    version: Version::new(upper),
                    inclusive: upper_inclusive,
                });
                if let (Some(l), Some(u)) = (&lower, &upper)
                    && l.version > u.version
                {
                    bail!(
                        "Invalid version range '{}': lower bound is above upper bound",
                        text
                    );
                }
                Ok(VersionRange { lower, upper })
            }
        }
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let exact = match (&self.lower, &self.upper) {
            (Some(l), Some(u)) => l.inclusive && u.inclusive && l.version == u.version,
            _ => false,
        };
        if exact {
            if let Some(l) = &self.lower {
                return write!(f, "[{}]", l.version);
            }
        }

        match &self.lower {
            Some(b) => write!(f, "{}{}", if b.inclusive { '[' } else { '(' }, b.version)?,
            None => f.write_str("(")?,
        }
        f.write_str(",")?;
        match &self.upper {
            Some(b) => write!(f, "{}{}", b.version, if b.inclusive { ']' } else { ')' }),
            None => f.write_str(")"),
        }
    }
}

/// What the version field of a coordinate asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionConstraint {
    /// A plain version such as `1.2`: a soft requirement that resolves to itself.
    Soft(Version),
    /// One or more intervals; a version matches if any interval contains it.
    Ranges(Vec<VersionRange>),
}

impl VersionConstraint {
    pub fn is_range(&self) -> bool {
        matches!(self, VersionConstraint::Ranges(_))
    }

    pub fn contains(&self, version: &Version) -> bool {
        match self {
            VersionConstraint::Soft(v) => v == version,
            VersionConstraint::Ranges(ranges) => ranges.iter().any(|r| r.contains(version)),
        }
    }
}

impl FromStr for VersionConstraint {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        if text.is_empty() {
            bail!("Version must not be empty");
        }
        if !text.starts_with('[') && !text.starts_with('(') {
            if text.contains([',', '[', ']', '(', ')']) {
                bail!("Invalid version '{}'", text);
            }
            return Ok(VersionConstraint::Soft(Version::new(text)));
        }

        let mut ranges = Vec::new();
        let mut rest = text;
        while !rest.is_empty() {
            let end = rest
                .find([']', ')'])
                .ok_or_else(|| anyhow::anyhow!("Unbounded version range '{}'", text))?;
            ranges.push(VersionRange::parse(&rest[..=end])?);

            rest = rest[end + 1..].trim_start();
            if let Some(after_comma) = rest.strip_prefix(',') {
                rest = after_comma.trim_start();
                if rest.is_empty() {
                    bail!("Invalid version range '{}': trailing ','", text);
                }
            } else if !rest.is_empty() {
                bail!("Invalid version range '{}': expected ',' between ranges", text);
            }
        }

        Ok(VersionConstraint::Ranges(ranges))
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionConstraint::Soft(v) => write!(f, "{}", v),
            VersionConstraint::Ranges(ranges) => {
                let parts: Vec<String> = ranges.iter().map(|r| r.to_string()).collect();
                f.write_str(&parts.join(","))
            }
        }
    }
}
