mod short_link;

pub use short_link::{
    create_handler, delete_handler, resolve_handler, stats_handler, update_handler,
};
