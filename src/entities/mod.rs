//! Entity module - Contains the SeaORM entity definitions for the database.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod configuration;

pub use configuration::{
    Column as ConfigurationColumn, Entity as Configuration, Model as ConfigurationModel,
};
