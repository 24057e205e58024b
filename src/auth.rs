use anyhow::anyhow;
use argon2::Config;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Closed role set. There is no self-service registration; accounts are
/// created at bootstrap or by the sample seeding routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Teacher,
    Student,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Teacher => "teacher",
            Role::Student => "student",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "admin" => Some(Role::Admin),
            "teacher" => Some(Role::Teacher),
            "student" => Some(Role::Student),
            _ => None,
        }
    }

    /// Capability check performed at the IPC boundary. Admin access is
    /// admin-only; teacher access also admits admin; student access
    /// admits any logged-in role.
    pub fn allows(self, required: Role) -> bool {
        match required {
            Role::Admin => self == Role::Admin,
            Role::Teacher => matches!(self, Role::Admin | Role::Teacher),
            Role::Student => true,
        }
    }
}

/// The logged-in user held in daemon state between requests.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: String,
    pub username: String,
    pub full_name: String,
    pub role: Role,
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt: [u8; 32] = rand::thread_rng().gen();
    let config = Config::default();
    argon2::hash_encoded(password.as_bytes(), &salt, &config)
        .map_err(|e| anyhow!("failed to hash password: {}", e))
}

pub fn verify_password(encoded: &str, password: &str) -> bool {
    argon2::verify_encoded(encoded, password.as_bytes()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let encoded = hash_password("admin123").expect("hash");
        assert!(verify_password(&encoded, "admin123"));
        assert!(!verify_password(&encoded, "admin124"));
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!verify_password("not-an-argon2-hash", "whatever"));
    }

    #[test]
    fn role_levels() {
        assert!(Role::Admin.allows(Role::Admin));
        assert!(Role::Admin.allows(Role::Teacher));
        assert!(Role::Teacher.allows(Role::Teacher));
        assert!(!Role::Teacher.allows(Role::Admin));
        assert!(Role::Student.allows(Role::Student));
        assert!(!Role::Student.allows(Role::Teacher));
    }

    #[test]
    fn role_round_trips_through_strings() {
        for role in [Role::Admin, Role::Teacher, Role::Student] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("superuser"), None);
    }
}
