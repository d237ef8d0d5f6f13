pub mod auth;
pub mod buddies;
pub mod comparison;
pub mod health;
pub mod hits;
pub mod jobs;
pub mod personalia;
pub mod recent;
pub mod users;
