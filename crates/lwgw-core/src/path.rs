//! Resource paths into a device's object tree.
//!
//! A path is a `/`-separated list of numeric ids (object, instance,
//! resource). Attributes keep the path text they were declared with; it is
//! only parsed when an operation actually needs it, so a malformed path is
//! an error at use time rather than at document parse time.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Errors produced when parsing a resource path
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("empty resource path")]
    Empty,

    #[error("empty segment in resource path '{0}'")]
    EmptySegment(String),

    #[error("invalid segment '{segment}' in resource path '{path}'")]
    InvalidSegment { path: String, segment: String },
}

/// Numeric path such as `/5/0/3`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourcePath(Vec<u16>);

impl ResourcePath {
    /// Build a path from its numeric ids
    ///
    /// ```
    /// # use lwgw_core::ResourcePath;
    /// assert_eq!(ResourcePath::new(&[5, 0, 3]).to_string(), "/5/0/3");
    /// ```
    pub fn new(ids: &[u16]) -> Self {
        Self(ids.to_vec())
    }

    pub fn ids(&self) -> &[u16] {
        &self.0
    }

    pub fn object_id(&self) -> Option<u16> {
        self.0.first().copied()
    }

    pub fn instance_id(&self) -> Option<u16> {
        self.0.get(1).copied()
    }

    pub fn resource_id(&self) -> Option<u16> {
        self.0.get(2).copied()
    }

    /// True when the path addresses a single resource (object/instance/resource)
    pub fn is_resource(&self) -> bool {
        self.0.len() == 3
    }
}

impl FromStr for ResourcePath {
    type Err = PathError;

    /// Parse `"/3/0/3"` or `"3/0/3"`.
    ///
    /// ```
    /// # use lwgw_core::ResourcePath;
    /// let p: ResourcePath = "3/0/3".parse().unwrap();
    /// assert_eq!(p.ids(), &[3, 0, 3]);
    /// assert!("/3//3".parse::<ResourcePath>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let stripped = trimmed.strip_prefix('/').unwrap_or(trimmed);
        if stripped.is_empty() {
            return Err(PathError::Empty);
        }

        let mut ids = Vec::new();
        for segment in stripped.split('/') {
            if segment.is_empty() {
                return Err(PathError::EmptySegment(s.to_string()));
            }
            let id = segment
                .parse::<u16>()
                .map_err(|_| PathError::InvalidSegment {
                    path: s.to_string(),
                    segment: segment.to_string(),
                })?;
            ids.push(id);
        }
        Ok(Self(ids))
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for id in &self.0 {
            write!(f, "/{}", id)?;
        }
        Ok(())
    }
}

impl Serialize for ResourcePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ResourcePath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_with_leading_slash() {
        let p: ResourcePath = "/5/0/3".parse().unwrap();
        assert_eq!(p.ids(), &[5, 0, 3]);
        assert_eq!(p.object_id(), Some(5));
        assert_eq!(p.instance_id(), Some(0));
        assert_eq!(p.resource_id(), Some(3));
        assert!(p.is_resource());
    }

    #[test]
    fn parse_without_leading_slash() {
        let p: ResourcePath = "3303/0/5700".parse().unwrap();
        assert_eq!(p.to_string(), "/3303/0/5700");
    }

    #[test]
    fn parse_object_only() {
        let p: ResourcePath = "/3".parse().unwrap();
        assert!(!p.is_resource());
        assert_eq!(p.resource_id(), None);
    }

    #[test]
    fn reject_empty() {
        assert_eq!("".parse::<ResourcePath>(), Err(PathError::Empty));
        assert_eq!("/".parse::<ResourcePath>(), Err(PathError::Empty));
    }

    #[test]
    fn reject_empty_segment() {
        assert!(matches!(
            "/5//3".parse::<ResourcePath>(),
            Err(PathError::EmptySegment(_))
        ));
        assert!(matches!(
            "/5/0/".parse::<ResourcePath>(),
            Err(PathError::EmptySegment(_))
        ));
    }

    #[test]
    fn reject_non_numeric_and_negative() {
        assert!(matches!(
            "/5/a/3".parse::<ResourcePath>(),
            Err(PathError::InvalidSegment { .. })
        ));
        assert!(matches!(
            "/5/-1/3".parse::<ResourcePath>(),
            Err(PathError::InvalidSegment { .. })
        ));
    }

    #[test]
    fn serde_as_string() {
        let p = ResourcePath::new(&[0, 0, 5]);
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, "\"/0/0/5\"");
        let back: ResourcePath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}
