pub mod error;
pub mod models;
pub mod observation_repository;
pub mod schema;

pub use error::DbError;
pub use models::*;
pub use observation_repository::ObservationRepository;
