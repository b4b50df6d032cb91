mod grocery_list;
mod item;
pub mod names;
mod user;

pub use grocery_list::{GroceryList, InvariantError, ListId, ListRecord};
pub use item::{GroceryItem, ItemId, PooledItem};
pub use names::{ItemName, NameError};
pub use user::User;
