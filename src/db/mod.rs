//! Persistence module split across logical submodules.

mod connection;
mod recipes;
mod worker;

pub use connection::{data_dir, open_in_memory, open_store, store_path};
pub use recipes::{delete_recipe, fetch_recipe, fetch_recipes, insert_recipe};
pub use worker::{
    StoreEvent, StoreHandle, StorePool, StoreReply, StoreRequest, Subscriptions, Ticket,
    STORE_WORKERS,
};
