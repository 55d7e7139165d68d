use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::parse_role,
    models::{NewUser, User},
};
use crate::error::{Result, ServiceError};

fn row_to_user(row: &Row) -> Result<User> {
    let role: String = row.get("role")?;

    Ok(User {
        id: row.get("id")?,
        email: row.get("email")?,
        name: row.get("name")?,
        address: row.get("address")?,
        phone: row.get("phone")?,
        role: parse_role(&role)?,
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

impl Database {
    /// Insert a registered account. The caller has already validated the
    /// fields; the UNIQUE index on email is the last line of defense.
    pub async fn insert_user(&self, account: NewUser) -> Result<User> {
        self.execute(move |conn| {
            let inserted = conn.execute(
                "INSERT INTO users (email, password, role, name, address, phone)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    account.email,
                    account.password,
                    account.role.as_str(),
                    account.name,
                    account.address,
                    account.phone,
                ],
            );
            if let Err(err) = inserted {
                if is_unique_violation(&err) {
                    return Err(ServiceError::EmailTaken);
                }
                return Err(err.into());
            }

            let user_id = conn.last_insert_rowid();

            let mut stmt = conn.prepare(
                "SELECT id, email, role, name, address, phone
                 FROM users
                 WHERE id = ?1",
            )?;
            let mut rows = stmt.query(params![user_id])?;
            let user = match rows.next()? {
                Some(row) => row_to_user(row)?,
                None => {
                    return Err(ServiceError::Storage(
                        "user not found after insert".into(),
                    ))
                }
            };

            Ok(user)
        })
        .await
    }

    /// Plaintext credential lookup. Returns the matching account, or
    /// `None` when no row has this exact email/password pair.
    pub async fn find_user_by_credentials(
        &self,
        email: String,
        password: String,
    ) -> Result<Option<User>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, email, role, name, address, phone
                 FROM users
                 WHERE email = ?1 AND password = ?2",
            )?;

            let mut rows = stmt.query(params![email, password])?;
            let user = match rows.next()? {
                Some(row) => Some(row_to_user(row)?),
                None => None,
            };
            Ok(user)
        })
        .await
    }

    pub async fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, email, role, name, address, phone
                 FROM users
                 WHERE id = ?1",
            )?;

            let mut rows = stmt.query(params![user_id])?;
            let user = match rows.next()? {
                Some(row) => Some(row_to_user(row)?),
                None => None,
            };
            Ok(user)
        })
        .await
    }

    /// All accounts, newest first.
    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, email, role, name, address, phone
                 FROM users
                 ORDER BY id DESC",
            )?;

            let mut rows = stmt.query([])?;
            let mut users = Vec::new();
            while let Some(row) = rows.next()? {
                users.push(row_to_user(row)?);
            }

            Ok(users)
        })
        .await
    }

    /// Accounts that can be assigned to bookings, ordered by name.
    /// `LOWER(role)` because rows written by earlier app versions stored
    /// capitalized roles.
    pub async fn list_drivers(&self) -> Result<Vec<User>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, email, role, name, address, phone
                 FROM users
                 WHERE LOWER(role) = 'driver'
                 ORDER BY name ASC",
            )?;

            let mut rows = stmt.query([])?;
            let mut drivers = Vec::new();
            while let Some(row) = rows.next()? {
                drivers.push(row_to_user(row)?);
            }

            Ok(drivers)
        })
        .await
    }

    /// Delete an account and every booking it owns as customer. Bookings
    /// that reference the account as driver are detached instead: the
    /// driver column is cleared and assigned rows return to pending, the
    /// same shape a decline leaves behind. The store runs with foreign
    /// keys on, so a plain row delete would be rejected while references
    /// remain.
    pub async fn delete_user(&self, user_id: i64) -> Result<()> {
        self.execute(move |conn| {
            let tx = conn.transaction()?;

            // 1. Remove the account's own bookings.
            tx.execute(
                "DELETE FROM bookings WHERE user_id = ?1",
                params![user_id],
            )?;

            // 2. Detach the account from bookings it was driving.
            tx.execute(
                "UPDATE bookings
                 SET driver_id = NULL,
                     status = CASE WHEN status = 'assigned' THEN 'pending' ELSE status END
                 WHERE driver_id = ?1",
                params![user_id],
            )?;

            // 3. Delete the account itself.
            let rows_affected = tx.execute(
                "DELETE FROM users WHERE id = ?1",
                params![user_id],
            )?;

            if rows_affected == 0 {
                return Err(ServiceError::UserNotFound(user_id));
            }

            tx.commit()?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use crate::db::models::{NewUser, Role};
    use crate::db::Database;
    use crate::error::ServiceError;

    fn account(email: &str, role: Role) -> NewUser {
        NewUser {
            email: email.to_string(),
            password: "secret99".to_string(),
            name: format!("{} person", email),
            address: "12 Test Lane".to_string(),
            phone: "0712345678".to_string(),
            role,
        }
    }

    #[tokio::test]
    async fn insert_and_fetch_user() {
        let db = Database::open_in_memory().unwrap();
        let created = db
            .insert_user(account("amy@example.com", Role::Customer))
            .await
            .unwrap();

        let fetched = db.get_user(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.email, "amy@example.com");
        assert_eq!(fetched.role, Role::Customer);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        db.insert_user(account("dup@example.com", Role::Customer))
            .await
            .unwrap();

        let err = db
            .insert_user(account("dup@example.com", Role::Driver))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::EmailTaken));
    }

    #[tokio::test]
    async fn credential_lookup_requires_exact_match() {
        let db = Database::open_in_memory().unwrap();
        db.insert_user(account("bob@example.com", Role::Driver))
            .await
            .unwrap();

        let hit = db
            .find_user_by_credentials("bob@example.com".into(), "secret99".into())
            .await
            .unwrap();
        assert!(hit.is_some());

        let miss = db
            .find_user_by_credentials("bob@example.com".into(), "wrong".into())
            .await
            .unwrap();
        assert!(miss.is_none());
    }

    #[tokio::test]
    async fn user_listing_is_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let first = db
            .insert_user(account("one@example.com", Role::Customer))
            .await
            .unwrap();
        let second = db
            .insert_user(account("two@example.com", Role::Driver))
            .await
            .unwrap();

        let users = db.list_users().await.unwrap();
        let ids: Vec<_> = users.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn drivers_listing_is_sorted_by_name() {
        let db = Database::open_in_memory().unwrap();
        let mut zed = account("zed@example.com", Role::Driver);
        zed.name = "Zed".to_string();
        let mut ann = account("ann@example.com", Role::Driver);
        ann.name = "Ann".to_string();
        db.insert_user(zed).await.unwrap();
        db.insert_user(ann).await.unwrap();
        db.insert_user(account("cust@example.com", Role::Customer))
            .await
            .unwrap();

        let drivers = db.list_drivers().await.unwrap();
        let names: Vec<_> = drivers.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Ann", "Zed"]);
    }

    #[tokio::test]
    async fn delete_missing_user_errors() {
        let db = Database::open_in_memory().unwrap();
        let err = db.delete_user(4242).await.unwrap_err();
        assert!(matches!(err, ServiceError::UserNotFound(4242)));
    }
}
