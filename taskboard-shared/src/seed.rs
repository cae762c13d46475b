//! Demo accounts
//!
//! One account per role, all with the password `password123`. Existing
//! accounts are left untouched, so seeding is safe to run on every start.

use crate::models::Role;
use crate::service::{AccountService, Registration, ServiceError};

pub const DEMO_PASSWORD: &str = "password123";

pub const DEMO_USERS: [(&str, &str, Role); 3] = [
    ("Admin User", "admin@taskboard.local", Role::Admin),
    ("Manager User", "manager@taskboard.local", Role::Manager),
    ("Member User", "member@taskboard.local", Role::Member),
];

/// Creates any missing demo account; returns how many were created
pub async fn seed_demo_users(accounts: &AccountService) -> Result<usize, ServiceError> {
    let mut created = 0;

    for (name, email, role) in DEMO_USERS {
        let registration = Registration {
            email: email.to_string(),
            password: DEMO_PASSWORD.to_string(),
            name: name.to_string(),
            role: Some(role),
        };

        match accounts.register(registration).await {
            Ok(user) => {
                tracing::info!(email, role = %user.role, "seeded demo user");
                created += 1;
            }
            Err(ServiceError::AlreadyExists(_)) => {
                tracing::debug!(email, "demo user already exists, skipping");
            }
            Err(e) => return Err(e),
        }
    }

    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::HashCost;
    use crate::store::MemoryStore;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_seeding_is_idempotent() {
        let accounts = AccountService::new(
            Arc::new(MemoryStore::new()),
            "seed-test-secret-at-least-32-bytes".to_string(),
            Duration::from_secs(5),
        )
        .with_hash_cost(HashCost::Minimal);

        assert_eq!(seed_demo_users(&accounts).await.unwrap(), 3);
        assert_eq!(seed_demo_users(&accounts).await.unwrap(), 0);

        let session = accounts
            .login("member@taskboard.local", DEMO_PASSWORD)
            .await
            .unwrap();
        assert_eq!(session.user.role, Role::Member);
    }
}
