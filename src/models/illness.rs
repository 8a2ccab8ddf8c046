use serde::{Deserialize, Serialize};

use super::enums::IllnessSeverity;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Illness {
    pub id: i64,
    pub name: String,
    pub severity: IllnessSeverity,
}
