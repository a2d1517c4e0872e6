//! Mock sign-in against a fixed user table

use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// A known user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

struct Account {
    user: User,
    password: &'static str,
}

fn account(id: &str, username: &str, name: &str, password: &'static str) -> Account {
    Account {
        user: User {
            id: id.to_string(),
            username: username.to_string(),
            email: format!("{}@videomeet.com", username),
            name: name.to_string(),
            avatar: None,
        },
        password,
    }
}

static ACCOUNTS: LazyLock<Vec<Account>> = LazyLock::new(|| {
    vec![
        account("1", "admin", "Administrator", "admin123"),
        account("2", "john", "John Doe", "john123"),
        account("3", "sarah", "Sarah Wilson", "sarah123"),
        account("4", "mike", "Mike Johnson", "mike123"),
    ]
});

/// Check a username/password pair
pub fn authenticate(username: &str, password: &str) -> Option<User> {
    let username = username.trim();
    ACCOUNTS
        .iter()
        .find(|a| a.user.username == username && a.password == password)
        .map(|a| a.user.clone())
}

pub fn user_by_id(user_id: &str) -> Option<User> {
    ACCOUNTS
        .iter()
        .find(|a| a.user.id == user_id)
        .map(|a| a.user.clone())
}

/// Name to show for a user id
pub fn display_name_for(user_id: &str) -> String {
    user_by_id(user_id)
        .map(|u| u.name)
        .unwrap_or_else(|| "Unknown User".to_string())
}

/// Every known user
pub fn users() -> Vec<User> {
    ACCOUNTS.iter().map(|a| a.user.clone()).collect()
}
