use scenario_engine::{EndPoint, HttpMethod};

pub const LOGIN: EndPoint = EndPoint::new(HttpMethod::Post, "/auths/token/");

// Partner
pub static CREATE_SERIES: EndPoint = EndPoint::new(HttpMethod::Post, "/todo/series/partner/");
pub static ITEMS_BY_TITLE: EndPoint = EndPoint::new(HttpMethod::Get, "/todo/items/manage/partner/");
pub const TEAM_ITEMS_BY_TITLE: EndPoint = EndPoint::new(HttpMethod::Get, "/todo/items/partner/");
pub static UPDATE_SERIES: EndPoint = EndPoint::new(HttpMethod::Put, "/todo/series/partner/{slug}/");
pub static DELETE_SERIES: EndPoint = EndPoint::new(HttpMethod::Delete, "/todo/series/partner/{slug}/");
pub const FINISH_TASK: EndPoint = EndPoint::new(HttpMethod::Post, "/todo/logs/partner");

// Backoffice
pub const PROFILE: EndPoint = EndPoint::new(HttpMethod::Get, "/auths/profile/");
pub static CREATE_SERIES_BACKOFFICE: EndPoint = EndPoint::new(HttpMethod::Post, "/todo/series/backoffice/");
pub static ITEMS_BY_TITLE_BACKOFFICE: EndPoint = EndPoint::new(HttpMethod::Get, "/todo/items/manage/backoffice/");
pub static UPDATE_SERIES_BACKOFFICE: EndPoint = EndPoint::new(HttpMethod::Put, "/todo/series/backoffice/{slug}/");
pub static DELETE_SERIES_BACKOFFICE: EndPoint = EndPoint::new(HttpMethod::Delete, "/todo/series/backoffice/{slug}/");
