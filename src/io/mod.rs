/// Step-log CSV export.
pub mod export;
/// Price and capacity CSV input.
pub mod load;
