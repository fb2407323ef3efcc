mod inventory;
mod listing;
mod login;

pub use inventory::InventoryView;
pub use listing::ListingView;
pub use login::LoginView;
