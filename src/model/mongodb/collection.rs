use std::ops::Deref;

use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};

use crate::model::db::{Deputy, NewUser, User, UserVote};

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// User collections
const USERS: &str = "users";
impl MongoCollection for User {
    const NAME: &'static str = USERS;
}
impl MongoCollection for NewUser {
    const NAME: &'static str = USERS;
}

// Deputy collection
const DEPUTIES: &str = "deputies";
impl MongoCollection for Deputy {
    const NAME: &'static str = DEPUTIES;
}

// Vote record collection
impl MongoCollection for UserVote {
    const NAME: &'static str = "user_votes";
}

/// Ensure that all the required indexes exist on the given database.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();

    // User collection.
    let user_index = IndexModel::builder()
        .keys(doc! {"username": 1})
        .options(unique.clone())
        .build();
    Coll::<User>::from_db(db)
        .create_index(user_index, None)
        .await?;

    // Vote record collection: at most one record per user.
    let user_vote_index = IndexModel::builder()
        .keys(doc! {"user_id": 1})
        .options(unique)
        .build();
    Coll::<UserVote>::from_db(db)
        .create_index(user_vote_index, None)
        .await?;

    // Deputy collection, for the leaderboard sort.
    let deputy_index = IndexModel::builder()
        .keys(doc! {"votes": -1, "_id": 1})
        .build();
    Coll::<Deputy>::from_db(db)
        .create_index(deputy_index, None)
        .await?;

    Ok(())
}
