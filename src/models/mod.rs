mod short_link;

pub use short_link::{
    CreateShortLinkDto, MessageResponse, ResolveResponse, ShortLinkRecord, StatsResponse,
    UpdateShortLinkDto,
};
