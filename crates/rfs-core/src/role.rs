//! Pursuit roles and their collision-priority order.

/// The role sequence a leader walks when assigning ranked candidates.
/// Agents ranked past the end are clamped to [`Role::Scout`].
pub const PURSUIT_ROLES: [Role; 4] = [
    Role::Lead,
    Role::Triangulation,
    Role::Backup,
    Role::Scout,
];

/// An agent's role in an active pursuit.
///
/// Priority order LEAD > TRIANGULATION > BACKUP > SCOUT > UNASSIGNED is used
/// only for collision tie-breaking.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default,
         serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Lead,
    Triangulation,
    Backup,
    Scout,
    #[default]
    Unassigned,
}

impl Role {
    /// Collision-avoidance priority.  Higher holds course; lower yields.
    #[inline]
    pub fn priority(self) -> i8 {
        match self {
            Role::Lead          => 3,
            Role::Triangulation => 2,
            Role::Backup        => 1,
            Role::Scout         => 0,
            Role::Unassigned    => -1,
        }
    }

    /// `true` for any role that participates in an active pursuit.
    #[inline]
    pub fn is_assigned(self) -> bool {
        self != Role::Unassigned
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Lead          => "LEAD",
            Role::Triangulation => "TRIANGULATION",
            Role::Backup        => "BACKUP",
            Role::Scout         => "SCOUT",
            Role::Unassigned    => "UNASSIGNED",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
