//! Opaque login material handed to the session client.
//!
//! The core never prompts for or stores credentials; whoever starts the run
//! builds a [`Credentials`] handle and the dispatcher passes it through.

use std::fmt;
use std::path::{Path, PathBuf};

use secrecy::SecretString;

/// How a session authenticates.
pub enum Secret {
    Password(SecretString),
    PrivateKey {
        path: PathBuf,
        passphrase: Option<SecretString>,
    },
}

/// Username plus secret, shared read-only by every device task.
pub struct Credentials {
    username: String,
    secret: Secret,
}

impl Credentials {
    /// Password login.
    pub fn password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: Secret::Password(SecretString::from(password.into())),
        }
    }

    /// Public-key login with an optional key passphrase.
    pub fn private_key(
        username: impl Into<String>,
        path: impl AsRef<Path>,
        passphrase: Option<String>,
    ) -> Self {
        Self {
            username: username.into(),
            secret: Secret::PrivateKey {
                path: path.as_ref().to_path_buf(),
                passphrase: passphrase.map(SecretString::from),
            },
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn secret(&self) -> &Secret {
        &self.secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.secret {
            Secret::Password(_) => "password",
            Secret::PrivateKey { .. } => "private-key",
        };
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("secret", &format_args!("<{} redacted>", kind))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn test_debug_redacts_password() {
        let creds = Credentials::password("admin", "hunter2");
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("admin"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_password_is_retrievable() {
        let creds = Credentials::password("admin", "hunter2");
        match creds.secret() {
            Secret::Password(p) => assert_eq!(p.expose_secret(), "hunter2"),
            Secret::PrivateKey { .. } => panic!("expected password"),
        }
    }
}
