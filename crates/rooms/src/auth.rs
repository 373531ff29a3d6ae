use std::time::{Duration, SystemTime};

use dashmap::DashMap;
use rand::RngCore;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Power {
    Host,
    Admin,
}

#[derive(Debug, Clone)]
pub struct AuthEntry {
    pub expire: SystemTime,
    pub power: Power,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("password did not match any configured role")]
    InvalidPassword,
    #[error("requested role exceeds the granted power")]
    InsufficientPower,
}

pub struct LoginResult {
    pub key: String,
    pub expire_hours: u64,
    pub power: Power,
}

/// In-process store of auth keys minted by `login`, validated by lookup
/// and expiry check, evicted lazily (no background sweep).
pub struct AuthStore {
    entries: DashMap<String, AuthEntry>,
    host_password: String,
    admin_password: String,
    key_ttl: Duration,
}

impl AuthStore {
    pub fn new(host_password: String, admin_password: String, key_ttl_hours: u64) -> Self {
        Self {
            entries: DashMap::new(),
            host_password,
            admin_password,
            key_ttl: Duration::from_secs(key_ttl_hours * 3600),
        }
    }

    pub fn login(
        &self,
        password: &str,
        requested_role: Option<Power>,
    ) -> Result<LoginResult, AuthError> {
        let granted = if password == self.admin_password {
            Power::Admin
        } else if password == self.host_password {
            Power::Host
        } else {
            return Err(AuthError::InvalidPassword);
        };

        if let Some(requested) = requested_role {
            if requested > granted {
                return Err(AuthError::InsufficientPower);
            }
        }

        let key = generate_key();
        let expire = SystemTime::now() + self.key_ttl;
        self.entries.insert(
            key.clone(),
            AuthEntry {
                expire,
                power: granted,
            },
        );

        Ok(LoginResult {
            key,
            expire_hours: self.key_ttl.as_secs() / 3600,
            power: granted,
        })
    }

    /// True iff the key exists, is unexpired, and its power is at least
    /// `required`. Expired keys are evicted as a side effect of lookup.
    pub fn validate(&self, key: &str, required: Power) -> bool {
        let Some(entry) = self.entries.get(key) else {
            return false;
        };
        if entry.expire <= SystemTime::now() {
            drop(entry);
            self.entries.remove(key);
            return false;
        }
        entry.power >= required
    }

    pub fn power_of(&self, key: &str) -> Option<Power> {
        let entry = self.entries.get(key)?;
        if entry.expire <= SystemTime::now() {
            return None;
        }
        Some(entry.power)
    }
}

fn generate_key() -> String {
    let mut bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> AuthStore {
        AuthStore::new("host-pw".into(), "admin-pw".into(), 3)
    }

    #[test]
    fn login_grants_power_matching_password() {
        let store = store();
        let host = store.login("host-pw", None).unwrap();
        assert_eq!(host.power, Power::Host);
        let admin = store.login("admin-pw", None).unwrap();
        assert_eq!(admin.power, Power::Admin);
    }

    #[test]
    fn wrong_password_is_rejected() {
        let store = store();
        assert!(matches!(
            store.login("nope", None),
            Err(AuthError::InvalidPassword)
        ));
    }

    #[test]
    fn requested_role_above_granted_power_fails() {
        let store = store();
        assert!(matches!(
            store.login("host-pw", Some(Power::Admin)),
            Err(AuthError::InsufficientPower)
        ));
    }

    #[test]
    fn validate_uses_power_at_least_semantics() {
        let store = store();
        let admin = store.login("admin-pw", None).unwrap();
        assert!(store.validate(&admin.key, Power::Host));
        assert!(store.validate(&admin.key, Power::Admin));

        let host = store.login("host-pw", None).unwrap();
        assert!(store.validate(&host.key, Power::Host));
        assert!(!store.validate(&host.key, Power::Admin));
    }

    #[test]
    fn expired_key_fails_validation_and_is_evicted() {
        let store = AuthStore::new("host-pw".into(), "admin-pw".into(), 0);
        let login = store.login("host-pw", None).unwrap();
        std::thread::sleep(Duration::from_millis(5));
        assert!(!store.validate(&login.key, Power::Host));
        assert!(store.power_of(&login.key).is_none());
    }
}
