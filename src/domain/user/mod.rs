//! User domain: the authenticated profile pushed on the private channel.

use crate::shared::serde_util::opt_string_or_int;
use serde::{Deserialize, Serialize};

/// Profile from the bare `user` message.
///
/// Only the identifying fields are typed; everything else the server sends
/// is kept verbatim in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    #[serde(default, deserialize_with = "opt_string_or_int")]
    pub id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
