//! Property selection

use serde::{Deserialize, Serialize};

/// An ordered list of property paths, accepted as a bare path or a list
///
/// Order is kept and duplicates are not removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathList(Vec<String>);

impl PathList {
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }
}

/// Expected property values in text form, accepted the same bare-or-list way
pub type ValueList = PathList;

impl From<&str> for PathList {
    fn from(path: &str) -> Self {
        PathList(vec![path.to_string()])
    }
}

impl From<String> for PathList {
    fn from(path: String) -> Self {
        PathList(vec![path])
    }
}

impl From<Vec<String>> for PathList {
    fn from(paths: Vec<String>) -> Self {
        PathList(paths)
    }
}

impl From<Vec<&str>> for PathList {
    fn from(paths: Vec<&str>) -> Self {
        PathList(paths.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for PathList {
    fn from(paths: &[&str]) -> Self {
        PathList(paths.iter().map(|p| p.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for PathList {
    fn from(paths: [&str; N]) -> Self {
        PathList(paths.iter().map(|p| p.to_string()).collect())
    }
}

/// Which properties a bulk retrieval should return
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selector {
    /// Every property of the type
    #[default]
    All,
    /// Only these paths, in this order
    Paths(PathList),
}

impl Selector {
    /// Path set to send, `None` for fetch-all
    ///
    /// An empty list selects everything, same as no selector at all.
    pub fn into_path_set(self) -> Option<Vec<String>> {
        match self {
            Selector::All => None,
            Selector::Paths(paths) if paths.is_empty() => None,
            Selector::Paths(paths) => Some(paths.into_vec()),
        }
    }
}

impl From<PathList> for Selector {
    fn from(paths: PathList) -> Self {
        Selector::Paths(paths)
    }
}

macro_rules! selector_from_paths {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Selector {
                fn from(paths: $ty) -> Self {
                    Selector::Paths(paths.into())
                }
            }

            impl From<Option<$ty>> for Selector {
                fn from(paths: Option<$ty>) -> Self {
                    paths.map_or(Selector::All, |p| Selector::Paths(p.into()))
                }
            }
        )*
    };
}

selector_from_paths!(&str, String, Vec<String>, Vec<&str>);

impl<const N: usize> From<[&str; N]> for Selector {
    fn from(paths: [&str; N]) -> Self {
        Selector::Paths(paths.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySpec {
    #[serde(rename = "type")]
    pub type_name: String,
    pub all: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_set: Option<Vec<String>>,
}

impl PropertySpec {
    pub fn new(type_name: &str, selector: impl Into<Selector>) -> Self {
        let path_set = selector.into().into_path_set();
        Self {
            type_name: type_name.to_string(),
            all: path_set.is_none(),
            path_set,
        }
    }

    /// Explicit path set, never fetch-all, as used for change filters
    pub fn paths(type_name: &str, paths: &PathList) -> Self {
        Self {
            type_name: type_name.to_string(),
            all: false,
            path_set: Some(paths.as_slice().to_vec()),
        }
    }
}
