//! Who is using the booking flow, passed explicitly from the application root.
//!
//! Components that need a signed-in user or a manager ask the session for a
//! capability value instead of looking up a global current user.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Customer,
    Employee,
    Manager,
}

impl std::str::FromStr for Role {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "customer" | "user" => Ok(Role::Customer),
            "employee" => Ok(Role::Employee),
            "manager" | "superuser" => Ok(Role::Manager),
            other => Err(SessionError::UnknownRole(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub email: String,
    pub role: Role,
}

/// Read-only session state. Built once at startup.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    user: Option<UserProfile>,
    token: Option<String>,
}

impl SessionContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn signed_in(user: UserProfile, token: Option<String>) -> Self {
        Self {
            user: Some(user),
            token,
        }
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    /// Capability for anything that requires a signed-in user.
    pub fn authenticated(&self) -> Result<Authenticated<'_>, SessionError> {
        let user = self.user.as_ref().ok_or(SessionError::NotSignedIn)?;
        Ok(Authenticated {
            user,
            token: self.token.as_deref(),
        })
    }

    /// Capability for manager-only screens.
    pub fn manager(&self) -> Result<ManagerAccess<'_>, SessionError> {
        let auth = self.authenticated()?;
        if auth.user.role != Role::Manager {
            return Err(SessionError::Forbidden(auth.user.role));
        }
        Ok(ManagerAccess { auth })
    }
}

/// Proof that a user is signed in.
#[derive(Debug, Clone, Copy)]
pub struct Authenticated<'a> {
    user: &'a UserProfile,
    token: Option<&'a str>,
}

impl<'a> Authenticated<'a> {
    pub fn user(&self) -> &'a UserProfile {
        self.user
    }

    pub fn token(&self) -> Option<&'a str> {
        self.token
    }
}

/// Proof that a manager is signed in.
#[derive(Debug, Clone, Copy)]
pub struct ManagerAccess<'a> {
    auth: Authenticated<'a>,
}

impl<'a> ManagerAccess<'a> {
    pub fn authenticated(&self) -> Authenticated<'a> {
        self.auth
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    NotSignedIn,
    Forbidden(Role),
    UnknownRole(String),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::NotSignedIn => write!(f, "sign in first"),
            SessionError::Forbidden(role) => write!(f, "not allowed for role {role:?}"),
            SessionError::UnknownRole(s) => write!(f, "unknown role: {s}"),
        }
    }
}

impl std::error::Error for SessionError {}
