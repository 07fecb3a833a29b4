use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, PooledConnection};
use std::fmt;

pub mod contribution;
pub mod event;
pub mod expense;
pub mod invitation;
pub mod job_registry;

pub type DbThreadPool = diesel::r2d2::Pool<ConnectionManager<PgConnection>>;
pub type DbConnection = PooledConnection<ConnectionManager<PgConnection>>;

pub fn create_db_thread_pool(database_uri: &str, max_db_connections: u32) -> DbThreadPool {
    let connection_manager = ConnectionManager::<PgConnection>::new(database_uri);
    diesel::r2d2::Pool::builder()
        .max_size(max_db_connections)
        .build(connection_manager)
        .expect("Failed to create DB thread pool")
}

#[derive(Debug)]
pub enum DaoError {
    DbThreadPoolFailure(r2d2::Error),
    QueryFailure(diesel::result::Error),
    // A conditional status update found the contribution in a terminal state
    IllegalTransition,
    InvitationExpired,
    InvitationAlreadyUsed,
    // Access code generation exhausted its collision-retry budget
    OutOfCodeRetries,
}

impl std::error::Error for DaoError {}

impl fmt::Display for DaoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaoError::DbThreadPoolFailure(e) => {
                write!(f, "DaoError: Failed to obtain DB connection: {e}")
            }
            DaoError::QueryFailure(e) => {
                write!(f, "DaoError: Query failed: {e}")
            }
            DaoError::IllegalTransition => {
                write!(f, "DaoError: Contribution status is terminal")
            }
            DaoError::InvitationExpired => {
                write!(f, "DaoError: Invitation has expired")
            }
            DaoError::InvitationAlreadyUsed => {
                write!(f, "DaoError: Invitation was already redeemed")
            }
            DaoError::OutOfCodeRetries => {
                write!(f, "DaoError: Could not generate a unique access code")
            }
        }
    }
}

impl From<r2d2::Error> for DaoError {
    fn from(error: r2d2::Error) -> Self {
        DaoError::DbThreadPoolFailure(error)
    }
}

impl From<diesel::result::Error> for DaoError {
    fn from(error: diesel::result::Error) -> Self {
        DaoError::QueryFailure(error)
    }
}
