//! Registration and sign-in against the users table.

use log::info;

use crate::db::{
    models::{NewUser, Role, User},
    Database,
};
use crate::error::{Result, ServiceError, ValidationError};

const MIN_PASSWORD_LEN: usize = 6;
const MIN_PHONE_LEN: usize = 10;

/// Identity handed to the session layer after a successful sign-in.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: i64,
    pub name: String,
    pub role: Role,
}

#[derive(Clone)]
pub struct AuthService {
    db: Database,
}

impl AuthService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn validated(account: NewUser) -> Result<NewUser> {
        let email = account.email.trim().to_string();
        if email.is_empty() {
            return Err(ValidationError::Required("email").into());
        }
        let password = account.password.trim().to_string();
        if password.is_empty() {
            return Err(ValidationError::Required("password").into());
        }
        let name = account.name.trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::Required("name").into());
        }
        let address = account.address.trim().to_string();
        if address.is_empty() {
            return Err(ValidationError::Required("address").into());
        }
        let phone = account.phone.trim().to_string();
        if phone.is_empty() {
            return Err(ValidationError::Required("phone").into());
        }

        if !email.contains('@') {
            return Err(ValidationError::BadEmail.into());
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::PasswordTooShort.into());
        }
        if phone.chars().count() < MIN_PHONE_LEN {
            return Err(ValidationError::PhoneTooShort.into());
        }

        Ok(NewUser {
            email,
            password,
            name,
            address,
            phone,
            role: account.role,
        })
    }

    pub async fn register(&self, account: NewUser) -> Result<User> {
        let account = Self::validated(account)?;
        let user = self.db.insert_user(account).await?;
        info!("Registered {} account {} ({})", user.role, user.id, user.email);
        Ok(user)
    }

    /// Check a credential pair and return who signed in.
    ///
    /// Passwords are stored and compared in plaintext.
    // TODO: store salted hashes instead; needs a lazy rehash of legacy
    // rows on first successful sign-in.
    pub async fn verify(&self, email: &str, password: &str) -> Result<AuthenticatedUser> {
        let email = email.trim();
        let password = password.trim();
        if email.is_empty() {
            return Err(ValidationError::Required("email").into());
        }
        if password.is_empty() {
            return Err(ValidationError::Required("password").into());
        }
        if !email.contains('@') {
            return Err(ValidationError::BadEmail.into());
        }

        let user = self
            .db
            .find_user_by_credentials(email.to_string(), password.to_string())
            .await?;

        match user {
            Some(user) => {
                info!("User {} signed in as {}", user.id, user.role);
                Ok(AuthenticatedUser {
                    user_id: user.id,
                    name: user.name,
                    role: user.role,
                })
            }
            None => Err(ServiceError::InvalidCredentials),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    fn service() -> AuthService {
        AuthService::new(Database::open_in_memory().unwrap())
    }

    fn registration(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            password: "hunter22".to_string(),
            name: "Test Person".to_string(),
            address: "1 Main Road".to_string(),
            phone: "0123456789".to_string(),
            role: Role::Customer,
        }
    }

    #[tokio::test]
    async fn register_then_verify_round_trip() {
        let auth = service();
        let user = auth.register(registration("kim@example.com")).await.unwrap();

        let identity = auth.verify("kim@example.com", "hunter22").await.unwrap();
        assert_eq!(identity.user_id, user.id);
        assert_eq!(identity.role, Role::Customer);
        assert_eq!(identity.name, "Test Person");
    }

    #[tokio::test]
    async fn register_rejects_bad_fields() {
        let auth = service();

        let mut no_at = registration("plainaddress");
        no_at.email = "plainaddress".to_string();
        let err = auth.register(no_at).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::BadEmail)
        ));

        let mut short_pw = registration("a@example.com");
        short_pw.password = "abc".to_string();
        let err = auth.register(short_pw).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::PasswordTooShort)
        ));

        let mut short_phone = registration("b@example.com");
        short_phone.phone = "12345".to_string();
        let err = auth.register(short_phone).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::PhoneTooShort)
        ));

        let mut blank_name = registration("c@example.com");
        blank_name.name = "   ".to_string();
        let err = auth.register(blank_name).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::Required("name"))
        ));
    }

    #[tokio::test]
    async fn register_rejects_whitespace_only_password() {
        let auth = service();

        let mut blank_pw = registration("d@example.com");
        blank_pw.password = "      ".to_string();
        let err = auth.register(blank_pw).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::Required("password"))
        ));
    }

    #[tokio::test]
    async fn padded_password_is_trimmed_on_both_sides_of_sign_in() {
        let auth = service();

        let mut padded = registration("pat@example.com");
        padded.password = "  secret9  ".to_string();
        auth.register(padded).await.unwrap();

        // Stored trimmed, so the bare password signs in.
        let identity = auth.verify("pat@example.com", "secret9").await.unwrap();
        assert_eq!(identity.name, "Test Person");

        // Padded input is trimmed before the lookup too.
        auth.verify("pat@example.com", "  secret9  ").await.unwrap();
    }

    #[tokio::test]
    async fn verify_rejects_unknown_credentials() {
        let auth = service();
        auth.register(registration("dana@example.com")).await.unwrap();

        let err = auth.verify("dana@example.com", "wrong-pass").await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidCredentials));

        let err = auth.verify("nobody@example.com", "hunter22").await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidCredentials));
    }

    #[tokio::test]
    async fn verify_requires_well_formed_email() {
        let auth = service();
        let err = auth.verify("", "whatever9").await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::Required("email"))
        ));

        let err = auth.verify("not-an-email", "whatever9").await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::BadEmail)
        ));
    }
}
