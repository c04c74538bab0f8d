//! Named operations understood by the backend.

use serde::Deserialize;
use serde_json::{Value, json};

use super::GraphQlRequest;

const GET_TOP_STATUS_SNAPSHOTS: &str = r#"
query getTopStatusSnapshots($offset: Int, $limit: Int) {
    getTopStatusSnapshots(offset: $offset, limit: $limit) {
        user {
            id
            name
        }
    }
}
"#;

const ISSUE_GROW_ACTION: &str = r#"
mutation issueGrowAction {
    issueGrowAction
}
"#;

const COMMIT_GROW_ACTION: &str = r#"
mutation commitGrowAction {
    commitGrowAction
}
"#;

const CURRENT_USER: &str = r#"
query CurrentUser {
    currentUser {
        name
        totalPoint
    }
}
"#;

const COMMIT_SPIN_ACTION: &str = r#"
mutation commitSpinAction {
    commitSpinAction
}
"#;

/// Page size of the `getTopStatusSnapshots` probe.
pub const TOP_STATUS_LIMIT: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `getTopStatusSnapshots(offset: 0, limit: 100)`, read-only.
    TopStatusSnapshots,
    IssueGrowAction,
    CommitGrowAction,
    CurrentUser,
    CommitSpinAction,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::TopStatusSnapshots => "getTopStatusSnapshots",
            Self::IssueGrowAction => "issueGrowAction",
            Self::CommitGrowAction => "commitGrowAction",
            Self::CurrentUser => "CurrentUser",
            Self::CommitSpinAction => "commitSpinAction",
        }
    }

    pub fn request(&self) -> GraphQlRequest {
        let (query, variables) = match self {
            Self::TopStatusSnapshots => (
                GET_TOP_STATUS_SNAPSHOTS,
                Some(json!({ "offset": 0, "limit": TOP_STATUS_LIMIT })),
            ),
            Self::IssueGrowAction => (ISSUE_GROW_ACTION, None),
            Self::CommitGrowAction => (COMMIT_GROW_ACTION, None),
            Self::CurrentUser => (CURRENT_USER, None),
            Self::CommitSpinAction => (COMMIT_SPIN_ACTION, None),
        };
        GraphQlRequest { query, variables }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// `currentUser { name totalPoint }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub name: String,
    pub total_point: i64,
}

impl CurrentUser {
    /// Pull `data.currentUser` out of a successful response.
    ///
    /// Returns `None` when the payload lacks the user or either field.
    pub fn from_response(body: &Value) -> Option<Self> {
        let user = body.get("data")?.get("currentUser")?;
        serde_json::from_value(user.clone()).ok()
    }
}
