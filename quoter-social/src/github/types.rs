use serde::{Deserialize, Serialize};

pub const STATUS_MUTATION: &str = r#"
mutation($input: ChangeUserStatusInput!) {
  changeUserStatus(input: $input) {
    status {
      message
      emoji
      expiresAt
    }
  }
}
"#;

pub const VIEWER_STATUS_QUERY: &str = r#"
query {
  viewer {
    status {
      message
      emoji
      expiresAt
    }
  }
}
"#;

#[derive(Debug, Clone, Serialize)]
pub struct GraphQlRequest<V> {
    pub query: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<V>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationVariables {
    pub input: ChangeUserStatusInput,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeUserStatusInput {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    /// ISO-8601 UTC with a literal `Z` suffix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

pub type StatusMutation = GraphQlRequest<MutationVariables>;

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlResponse<T> {
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlError {
    #[serde(default)]
    pub message: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangeUserStatusData {
    #[serde(default, rename = "changeUserStatus")]
    pub change_user_status: Option<StatusPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusPayload {
    #[serde(default)]
    pub status: Option<StatusNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ViewerData {
    #[serde(default)]
    pub viewer: Option<Viewer>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Viewer {
    #[serde(default)]
    pub status: Option<StatusNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusNode {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub emoji: Option<String>,
    #[serde(default, rename = "expiresAt")]
    pub expires_at: Option<String>,
}
