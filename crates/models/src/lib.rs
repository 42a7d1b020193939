pub mod errors;
pub mod db;
pub mod user;
pub mod store;
pub mod payment;
pub mod notification;

#[cfg(test)]
mod tests;
