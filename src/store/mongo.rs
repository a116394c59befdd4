use mongodb::{
    bson::{doc, Document},
    options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument, UpdateOptions},
    Client, ClientSession, Database,
};
use rocket::{futures::TryStreamExt, http::Status};

use crate::error::{Error, Result};
use crate::model::{
    db::{Deputy, NewUser, User, UserVote, VoteRejection, MAX_VOTES},
    mongodb::{ensure_indexes_exist, is_duplicate_key_error, Coll, Id, TransactionRetry},
};

use super::{CastVote, VoteStore};

/// How many times a vote transaction is attempted before a write conflict is reported.
const MAX_TRANSACTION_ATTEMPTS: u32 = 20;

/// How many times a commit with an unknown outcome is repeated.
const MAX_COMMIT_ATTEMPTS: u32 = 5;

/// A MongoDB-backed store.
///
/// Vote casting uses multi-document transactions, so the server must be a replica set.
pub struct MongoStore {
    client: Client,
    db: Database,
    users: Coll<User>,
    new_users: Coll<NewUser>,
    deputies: Coll<Deputy>,
    user_votes: Coll<UserVote>,
}

impl MongoStore {
    /// Wrap an existing connection, using the named database.
    pub fn new(client: Client, db_name: &str) -> Self {
        let db = client.database(db_name);
        Self {
            users: Coll::from_db(&db),
            new_users: Coll::from_db(&db),
            deputies: Coll::from_db(&db),
            user_votes: Coll::from_db(&db),
            client,
            db,
        }
    }

    /// Connect to the database and ensure the required indexes exist.
    pub async fn connect(db_uri: &str, db_name: &str) -> Result<Self> {
        let client = Client::with_uri_str(db_uri).await?;
        let store = Self::new(client, db_name);
        ensure_indexes_exist(&store.db).await?;
        Ok(store)
    }

    /// The underlying database.
    pub fn database(&self) -> &Database {
        &self.db
    }

    fn user_filter(user_id: Id) -> Document {
        doc! { "user_id": *user_id }
    }

    /// Create the user's record if it is missing. Racing upserts can trip the unique
    /// index on `user_id`; the loser simply reads the winner's record.
    async fn ensure_user_votes(&self, user_id: Id) -> Result<UserVote> {
        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();
        let insert = doc! {
            "$setOnInsert": { "has_voted": false, "voted_deputies": [] }
        };
        let result = self
            .user_votes
            .find_one_and_update(Self::user_filter(user_id), insert, options)
            .await;
        let record = match result {
            Ok(record) => record,
            Err(e) if is_duplicate_key_error(&e) => {
                self.user_votes
                    .find_one(Self::user_filter(user_id), None)
                    .await?
            }
            Err(e) => return Err(e.into()),
        };
        record.ok_or_else(|| {
            Error::Status(
                Status::InternalServerError,
                format!("Vote record for user {user_id} missing after upsert"),
            )
        })
    }

    /// One attempt at casting a vote, inside its own transaction.
    async fn try_cast_vote(&self, user_id: Id, deputy_id: &str) -> Result<UserVote> {
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        match self.cast_vote_in(&mut session, user_id, deputy_id).await {
            Ok(record) => {
                Self::commit(&mut session, user_id).await?;
                Ok(record)
            }
            Err(e) => {
                if let Err(abort_err) = session.abort_transaction().await {
                    warn!("Failed to abort vote transaction for user {user_id}: {abort_err}");
                }
                Err(e)
            }
        }
    }

    /// Commit the session's transaction. A commit whose outcome is unknown is repeated on
    /// its own, since rerunning the transaction could find the vote already applied.
    async fn commit(session: &mut ClientSession, user_id: Id) -> Result<()> {
        let mut attempt = 1;
        loop {
            match session.commit_transaction().await {
                Err(e)
                    if TransactionRetry::for_error(&e) == TransactionRetry::Commit
                        && attempt < MAX_COMMIT_ATTEMPTS =>
                {
                    debug!("Vote commit for user {user_id} has unknown outcome, recommitting");
                    attempt += 1;
                }
                result => return Ok(result?),
            }
        }
    }

    async fn cast_vote_in(
        &self,
        session: &mut ClientSession,
        user_id: Id,
        deputy_id: &str,
    ) -> Result<UserVote> {
        // Read and check the record.
        let record = self
            .user_votes
            .find_one_with_session(Self::user_filter(user_id), None, session)
            .await?
            .ok_or_else(|| {
                Error::Status(
                    Status::InternalServerError,
                    format!("No vote record for user {user_id}"),
                )
            })?;
        record.check(deputy_id)?;

        // Append the vote. The filter repeats the checks, so a concurrent writer can never
        // push the record past the limit; it will instead cause a write conflict.
        let mut guarded = doc! {
            "_id": *record.id,
            "voted_deputies": { "$ne": deputy_id },
        };
        guarded.insert(
            format!("voted_deputies.{}", MAX_VOTES - 1),
            doc! { "$exists": false },
        );
        let max_votes = MAX_VOTES as i32;
        let append = vec![
            doc! { "$set": {
                "voted_deputies": { "$concatArrays": ["$voted_deputies", [{ "$literal": deputy_id }]] },
            }},
            doc! { "$set": {
                "has_voted": { "$gte": [{ "$size": "$voted_deputies" }, max_votes] },
            }},
        ];
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        let updated = self
            .user_votes
            .find_one_and_update_with_session(guarded, append, options, session)
            .await?
            .ok_or_else(|| {
                Error::Status(
                    Status::InternalServerError,
                    format!("Vote record for user {user_id} changed mid-transaction"),
                )
            })?;

        // Count it. An unknown deputy aborts the whole transaction.
        let result = self
            .deputies
            .update_one_with_session(
                doc! { "_id": deputy_id },
                doc! { "$inc": { "votes": 1 } },
                None,
                session,
            )
            .await?;
        if result.matched_count == 0 {
            return Err(VoteRejection::DeputyNotFound(deputy_id.to_string()).into());
        }

        Ok(updated)
    }
}

#[rocket::async_trait]
impl VoteStore for MongoStore {
    async fn seed_deputies(&self, deputies: Vec<Deputy>) -> Result<()> {
        let upsert = UpdateOptions::builder().upsert(true).build();
        let mut inserted = 0;
        for deputy in deputies {
            let insert = doc! {
                "$setOnInsert": {
                    "name": deputy.name.as_str(),
                    "faction": deputy.faction.as_str(),
                    "votes": i64::from(deputy.votes),
                }
            };
            let result = self
                .deputies
                .update_one(doc! { "_id": deputy.id.as_str() }, insert, upsert.clone())
                .await?;
            if result.upserted_id.is_some() {
                inserted += 1;
            }
        }
        info!("Seeded {inserted} new deputies");
        Ok(())
    }

    async fn user(&self, id: Id) -> Result<Option<User>> {
        Ok(self.users.find_one(id.as_doc(), None).await?)
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>> {
        let with_username = doc! {
            "username": username,
        };
        Ok(self.users.find_one(with_username, None).await?)
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        let result = self.new_users.insert_one(&user, None).await;
        let inserted = match result {
            Ok(inserted) => inserted,
            Err(e) if is_duplicate_key_error(&e) => {
                return Err(Error::bad_request("Username already exists"));
            }
            Err(e) => return Err(e.into()),
        };
        let id: Id = inserted
            .inserted_id
            .as_object_id()
            .unwrap() // Safe because the ID comes directly from the database.
            .into();
        Ok(User { id, user })
    }

    async fn deputies(&self) -> Result<Vec<Deputy>> {
        let leaderboard = FindOptions::builder()
            .sort(doc! { "votes": -1, "_id": 1 })
            .build();
        let deputies = self
            .deputies
            .find(doc! {}, leaderboard)
            .await?
            .try_collect()
            .await?;
        Ok(deputies)
    }

    async fn user_votes(&self, user_id: Id) -> Result<UserVote> {
        self.ensure_user_votes(user_id).await
    }

    async fn cast_vote(&self, user_id: Id, deputy_id: &str) -> Result<CastVote> {
        self.ensure_user_votes(user_id).await?;

        let mut attempt = 1;
        let record = loop {
            match self.try_cast_vote(user_id, deputy_id).await {
                Err(Error::Db(e))
                    if TransactionRetry::for_error(&e) == TransactionRetry::Transaction
                        && attempt < MAX_TRANSACTION_ATTEMPTS =>
                {
                    debug!("Vote by user {user_id} conflicted on attempt {attempt}, retrying");
                    attempt += 1;
                }
                result => break result?,
            }
        };

        // Read after the commit, so later votes always see a leaderboard at least this new.
        let leaderboard = match self.deputies().await {
            Ok(deputies) => Some(deputies),
            Err(e) => {
                error!("Vote by user {user_id} stored, but the leaderboard read failed: {e}");
                None
            }
        };

        Ok(CastVote {
            record,
            leaderboard,
        })
    }
}
