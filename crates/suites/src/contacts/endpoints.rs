use scenario_engine::{EndPoint, HttpMethod};

pub const LOGIN: EndPoint = EndPoint::new(HttpMethod::Post, "/auths/token/");
pub const LIST_CONTACTS: EndPoint = EndPoint::new(HttpMethod::Get, "/network/contacts/");
pub const CREATE_CONTACT: EndPoint = EndPoint::new(HttpMethod::Post, "/network/contacts/");
pub const GET_CONTACT: EndPoint = EndPoint::new(HttpMethod::Get, "/network/contacts/{contact_slug}/");
pub const UPDATE_CONTACT: EndPoint = EndPoint::new(HttpMethod::Patch, "/network/contacts/{contact_slug}/");
pub const DELETE_CONTACT: EndPoint = EndPoint::new(HttpMethod::Delete, "/network/contacts/{contact_slug}/");
