//! Domain models for the cart and order API.
//!
//! These types represent validated domain objects, separate from database
//! row types. Row types live next to the queries in `db::postgres`.

pub mod cart;
pub mod item;
pub mod order;
pub mod user;

pub use cart::{Cart, CartItem, CartLine, CartView};
pub use item::{Item, ItemUpdate, NewItem};
pub use order::{Order, OrderDetail, OrderLine, OrderWithUser, PlacedOrder};
pub use user::{LoginSession, User};
