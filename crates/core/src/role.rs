use serde::{Deserialize, Serialize};
use std::fmt;

/// Which input of an alignment or comparison a cloud is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloudRole {
    Sample,
    Reference,
}

impl fmt::Display for CloudRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CloudRole::Sample => "sample",
            CloudRole::Reference => "reference",
        })
    }
}
