use serde::{Deserialize, Serialize};

/// The authenticated account, as returned by `/auth/me/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
}

impl User {
    pub fn display_name(&self) -> String {
        format!("{} <{}>", self.username, self.email)
    }
}
