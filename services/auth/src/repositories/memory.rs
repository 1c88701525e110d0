//! In-memory repositories for handler tests

use async_trait::async_trait;
use chrono::Utc;
use common::error::{DatabaseError, DatabaseResult};
use common::user::User;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use super::{ConfCodeRepository, UserRepository};
use crate::models::ConfCode;

#[derive(Clone, Default)]
pub struct MemoryUserRepository {
    users: Arc<Mutex<HashMap<Uuid, User>>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a user directly, bypassing uniqueness checks
    pub fn insert(&self, user: User) {
        self.users.lock().unwrap().insert(user.id, user);
    }

    pub fn get(&self, id: Uuid) -> Option<User> {
        self.users.lock().unwrap().get(&id).cloned()
    }

    pub fn get_by_email(&self, email: &str) -> Option<User> {
        self.users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.email == email)
            .cloned()
    }

    pub fn count(&self) -> usize {
        self.users.lock().unwrap().len()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create(&self, user: &User) -> DatabaseResult<User> {
        let mut users = self.users.lock().unwrap();
        if users.values().any(|u| u.email == user.email) {
            return Err(DatabaseError::UniqueViolation("users_email_key".to_string()));
        }
        if users.values().any(|u| u.username == user.username) {
            return Err(DatabaseError::UniqueViolation(
                "users_username_key".to_string(),
            ));
        }
        users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<User>> {
        Ok(self.get(id))
    }

    async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<User>> {
        Ok(self.get_by_email(email))
    }

    async fn email_taken(&self, email: &str, except: Option<Uuid>) -> DatabaseResult<bool> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .any(|u| u.email == email && Some(u.id) != except))
    }

    async fn username_taken(&self, username: &str, except: Option<Uuid>) -> DatabaseResult<bool> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .any(|u| u.username == username && Some(u.id) != except))
    }

    async fn list(&self, offset: i64, limit: i64) -> DatabaseResult<(Vec<User>, i64)> {
        let mut users: Vec<User> = self.users.lock().unwrap().values().cloned().collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        let total = users.len() as i64;
        let page = users
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn update(&self, user: &User) -> DatabaseResult<User> {
        let mut users = self.users.lock().unwrap();
        let stored = users
            .get_mut(&user.id)
            .ok_or(DatabaseError::Query(sqlx::Error::RowNotFound))?;
        let password_hash = stored.password_hash.clone();
        *stored = User {
            password_hash,
            updated_at: Utc::now(),
            ..user.clone()
        };
        Ok(stored.clone())
    }

    async fn set_password(&self, id: Uuid, password_hash: &str) -> DatabaseResult<()> {
        if let Some(user) = self.users.lock().unwrap().get_mut(&id) {
            user.password_hash = password_hash.to_string();
        }
        Ok(())
    }

    // No properties table in these tests
    async fn owns_property(&self, _id: Uuid) -> DatabaseResult<bool> {
        Ok(false)
    }
}

#[derive(Clone, Default)]
pub struct MemoryConfCodeRepository {
    codes: Arc<Mutex<Vec<ConfCode>>>,
}

impl MemoryConfCodeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, code: ConfCode) {
        self.codes.lock().unwrap().push(code);
    }

    pub fn for_user(&self, user_id: Uuid) -> Vec<ConfCode> {
        self.codes
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ConfCodeRepository for MemoryConfCodeRepository {
    async fn create(&self, user_id: Uuid, code: &str) -> DatabaseResult<ConfCode> {
        let conf_code = ConfCode {
            id: Uuid::new_v4(),
            user_id,
            code: code.to_string(),
            created_at: Utc::now(),
        };
        self.insert(conf_code.clone());
        Ok(conf_code)
    }

    async fn find(&self, user_id: Uuid, code: &str) -> DatabaseResult<Option<ConfCode>> {
        Ok(self
            .codes
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|c| c.user_id == user_id && c.code == code)
            .cloned())
    }

    async fn delete_for_user(&self, user_id: Uuid) -> DatabaseResult<u64> {
        let mut codes = self.codes.lock().unwrap();
        let before = codes.len();
        codes.retain(|c| c.user_id != user_id);
        Ok((before - codes.len()) as u64)
    }
}
