use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where a moved subtree lands relative to its target node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveDirection {
    /// Immediately before the target, under the target's parent
    PreviousSibling,
    /// Immediately after the target, under the target's parent
    NextSibling,
    /// Under the target, at the target's right bound, so after any children
    /// it already has
    FirstChild,
    /// Under the target, ahead of any children it already has
    LeadingChild,
}

impl MoveDirection {
    /// Whether the target becomes the new parent
    pub fn nests_under_target(&self) -> bool {
        matches!(self, MoveDirection::FirstChild | MoveDirection::LeadingChild)
    }

    /// Left bound at which the subtree should start, expressed in the
    /// numbering that is current before the source is detached
    pub fn anchor(&self, target_lft: i64, target_rgt: i64) -> i64 {
        match self {
            MoveDirection::PreviousSibling => target_lft,
            MoveDirection::NextSibling => target_rgt + 1,
            MoveDirection::FirstChild => target_rgt,
            MoveDirection::LeadingChild => target_lft + 1,
        }
    }

    /// Depth the moved node will have
    pub fn destination_depth(&self, target_depth: i64) -> i64 {
        if self.nests_under_target() {
            target_depth + 1
        } else {
            target_depth
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MoveDirection::PreviousSibling => "previous_sibling",
            MoveDirection::NextSibling => "next_sibling",
            MoveDirection::FirstChild => "first_child",
            MoveDirection::LeadingChild => "leading_child",
        }
    }
}

impl fmt::Display for MoveDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MoveDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "previous_sibling" | "left" => Ok(MoveDirection::PreviousSibling),
            "next_sibling" | "right" => Ok(MoveDirection::NextSibling),
            "first_child" | "inner" => Ok(MoveDirection::FirstChild),
            "leading_child" => Ok(MoveDirection::LeadingChild),
            other => Err(format!("Unknown move direction '{}'", other)),
        }
    }
}
