use crate::workflow::{Actor, Role};
use serde::Serialize;

/// Roster entry. Passwords are compared as plain text.
#[derive(Debug, Clone)]
pub struct UserAccount {
    pub id: String,
    pub username: String,
    pub password: String,
    pub role: Role,
    pub name: String,
    pub email: String,
}

/// What a login hands back to the UI: the account without its password.
#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub id: String,
    pub username: String,
    pub role: Role,
    pub name: String,
    pub email: String,
}

impl UserAccount {
    fn new(id: &str, username: &str, password: &str, role: Role, name: &str, email: &str) -> Self {
        Self {
            id: id.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            role,
            name: name.to_string(),
            email: email.to_string(),
        }
    }

    pub fn actor(&self) -> Actor {
        Actor {
            id: self.id.clone(),
            name: self.name.clone(),
            role: self.role,
        }
    }

    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id.clone(),
            username: self.username.clone(),
            role: self.role,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

pub fn default_roster() -> Vec<UserAccount> {
    vec![
        UserAccount::new(
            "admin1",
            "admin",
            "admin123",
            Role::Admin,
            "Dr. Rajesh Kumar",
            "rajesh.kumar@spit.edu",
        ),
        UserAccount::new(
            "admin2",
            "principal",
            "principal123",
            Role::Admin,
            "Dr. Priya Sharma",
            "priya.sharma@spit.edu",
        ),
        UserAccount::new(
            "teacher1",
            "teacher1",
            "teacher123",
            Role::Teacher,
            "Prof. Amit Desai",
            "amit.desai@spit.edu",
        ),
        UserAccount::new(
            "teacher2",
            "teacher2",
            "teacher123",
            Role::Teacher,
            "Prof. Sneha Patil",
            "sneha.patil@spit.edu",
        ),
        UserAccount::new(
            "teacher3",
            "teacher3",
            "teacher123",
            Role::Teacher,
            "Prof. Arjun Mehta",
            "arjun.mehta@spit.edu",
        ),
    ]
}

pub fn authenticate<'a>(
    roster: &'a [UserAccount],
    username: &str,
    password: &str,
) -> Option<&'a UserAccount> {
    roster
        .iter()
        .find(|u| u.username == username && u.password == password)
}
