use crate::records::RoleRecord;

/// Capability a caller can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Start uploads and downloads
    ManageSync,
    /// Edit settings, including the PIN
    ManageSettings,
    /// Everything
    Admin,
}

impl Capability {
    /// Parses the names used in a role's comma-separated capability list.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "manage_sync" | "sync" => Some(Self::ManageSync),
            "manage_settings" | "settings" => Some(Self::ManageSettings),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// Answers "does the current caller hold capability X".
pub trait AccessGuard: Send + Sync {
    fn has_capability(&self, capability: Capability) -> bool;
}

/// Fixed capability set; `Admin` implies every other capability.
#[derive(Debug, Clone, Default)]
pub struct StaticAccess {
    capabilities: Vec<Capability>,
}

impl StaticAccess {
    pub fn new(capabilities: Vec<Capability>) -> Self {
        Self { capabilities }
    }

    /// Capabilities granted by a stored role. Unknown names are ignored.
    pub fn from_role(role: &RoleRecord) -> Self {
        Self::new(
            role.capability_list()
                .into_iter()
                .filter_map(Capability::parse)
                .collect(),
        )
    }

    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }
}

impl AccessGuard for StaticAccess {
    fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(&Capability::Admin) || self.capabilities.contains(&capability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_implies_everything() {
        let admin = StaticAccess::new(vec![Capability::Admin]);
        assert!(admin.has_capability(Capability::ManageSync));
        assert!(admin.has_capability(Capability::ManageSettings));
    }

    #[test]
    fn role_capabilities_are_parsed_leniently() {
        let role = RoleRecord {
            capabilities: Some("Manage_Sync, reports ,".to_string()),
            ..RoleRecord::default()
        };
        let access = StaticAccess::from_role(&role);
        assert_eq!(access.capabilities(), &[Capability::ManageSync]);
        assert!(!access.has_capability(Capability::ManageSettings));
    }
}
