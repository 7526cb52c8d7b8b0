pub mod entries;
pub mod health;
pub mod patients;
pub mod trends;
pub mod weeks;
