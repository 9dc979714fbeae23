use uuid::Uuid;

/// Permission level of an auth rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    All,
    Read,
    Create,
    Update,
    Delete,
    None,
}

impl Permission {
    pub fn from_wire(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ALL" => Some(Permission::All),
            "READ" => Some(Permission::Read),
            "CREATE" => Some(Permission::Create),
            "UPDATE" => Some(Permission::Update),
            "DELETE" => Some(Permission::Delete),
            "NONE" => Some(Permission::None),
            _ => None,
        }
    }
}

/// Auth rule attached to a resource. Advisory only; the remote service
/// enforces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Auth {
    pub id: Uuid,
    pub name: String,
    pub permission: Permission,
}
