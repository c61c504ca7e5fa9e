pub mod chat_area;
pub mod entry_view;
pub mod header;
pub mod input_bar;
