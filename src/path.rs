use std::{fmt, str::FromStr};

use crate::error::{Error, Result};

/// Absolute, normalized location in the remote namespace.
///
/// Paths always start with `/`, never contain empty or `.` segments and
/// never climb above the root. A fully qualified address such as
/// `webhdfs://namenode:9870/user/data` is reduced to its path part.
/// Relative input is refused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RemotePath(String);

impl RemotePath {
    #[must_use]
    pub fn root() -> Self {
        Self("/".to_owned())
    }

    pub fn parse(path: &str) -> Result<Self> {
        let trimmed = path.trim();
        let trimmed = match trimmed.find("://") {
            Some(idx) => {
                let rest = &trimmed[idx + 3..];
                rest.find('/').map_or("/", |slash| &rest[slash..])
            }
            None => trimmed,
        };

        if trimmed.is_empty() || trimmed.contains('\0') {
            return Err(Error::InvalidPath(path.to_owned()));
        }
        if !trimmed.starts_with('/') {
            return Err(Error::InvalidPath(format!("{path} (remote paths must be absolute)")));
        }

        let mut segments = Vec::new();
        for segment in trimmed.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    if segments.pop().is_none() {
                        return Err(Error::InvalidPath(path.to_owned()));
                    }
                }
                name => segments.push(name),
            }
        }

        Ok(Self(format!("/{}", segments.join("/"))))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Returns the enclosing directory, or `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }

        match self.0.rfind('/') {
            Some(0) | None => Some(Self::root()),
            Some(idx) => Some(Self(self.0[..idx].to_owned())),
        }
    }

    /// Returns the last segment, or `None` for the root.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        if self.is_root() {
            return None;
        }

        self.0.rsplit('/').next()
    }

    pub fn join(&self, name: &str) -> Result<Self> {
        Self::parse(&format!("{}/{}", self.0, name))
    }

    /// Returns `true` if `self` lies strictly below `ancestor`.
    #[must_use]
    pub fn is_descendant_of(&self, ancestor: &Self) -> bool {
        if ancestor.is_root() {
            return !self.is_root();
        }

        self.0
            .strip_prefix(ancestor.as_str())
            .is_some_and(|rest| rest.starts_with('/'))
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|segment| !segment.is_empty())
    }
}

impl fmt::Display for RemotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RemotePath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl AsRef<str> for RemotePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
