//! User queries.

use super::Repository;
use crate::model::{generate_passcode, User};
use crate::schema::{PASSCODE_INDEX, USERNAME_INDEX};
use chatdb_core::{StoreResult, TransactionMode};
use tracing::{debug, warn};

/// Repository of [`User`]s.
pub type UserRepository<'s> = Repository<'s, User>;

/// Fresh passcodes tried before accepting a collision.
const PASSCODE_ATTEMPTS: usize = 8;

impl Repository<'_, User> {
    /// Inserts `user`, re-rolling its passcode while it collides with an
    /// existing one. After a few attempts a colliding passcode is kept:
    /// uniqueness is best effort.
    pub async fn add_with_fresh_passcode(&self, mut user: User) -> StoreResult<User> {
        self.runner
            .run(&[crate::schema::USERS], TransactionMode::ReadWrite, |txn| {
                let mut users = txn.collection::<User>();
                for attempt in 1..=PASSCODE_ATTEMPTS {
                    if users
                        .get_all_by_index(PASSCODE_INDEX, user.passcode.as_str())?
                        .is_empty()
                    {
                        break;
                    }
                    if attempt == PASSCODE_ATTEMPTS {
                        warn!(user_id = %user.id, "keeping colliding passcode");
                        break;
                    }
                    debug!(attempt, "passcode collision, generating another");
                    user.passcode = generate_passcode();
                }
                users.add(&user)?;
                Ok(user)
            })
            .await
    }

    /// First user with this exact username and passcode.
    pub async fn find_by_username_and_passcode(
        &self,
        username: &str,
        passcode: &str,
    ) -> StoreResult<Option<User>> {
        Ok(self
            .get_all_by_index(USERNAME_INDEX, username)
            .await?
            .into_iter()
            .find(|u| u.passcode == passcode))
    }

    /// First user whose username or passcode equals `query` exactly.
    ///
    /// This is a full scan and grows linearly with the number of users.
    pub async fn find_by_username_or_passcode(&self, query: &str) -> StoreResult<Option<User>> {
        Ok(self
            .get_all()
            .await?
            .into_iter()
            .find(|u| u.username == query || u.passcode == query))
    }
}
