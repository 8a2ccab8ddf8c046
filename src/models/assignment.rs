use serde::{Deserialize, Serialize};

/// Join row linking one doctor to one patient. The pair is the identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Assignment {
    pub doctor_id: i64,
    pub patient_id: i64,
}
