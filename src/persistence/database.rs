mod postgres;

pub use postgres::repository::Repository;
