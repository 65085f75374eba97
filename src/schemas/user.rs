use serde::{Deserialize, Serialize};

/// The authenticated teacher identity the auth provider reports. Students
/// taking an exam have no account at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
}
