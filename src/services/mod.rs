mod locks;
mod short_link;

pub use locks::KeyedLocks;
pub use short_link::ShortLinkService;
