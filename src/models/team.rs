use serde::{Deserialize, Serialize};

/// An organizational unit that incurs purchases. Reference data, seeded by
/// migration and never managed through this application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: i64,
    pub name: String,
}
