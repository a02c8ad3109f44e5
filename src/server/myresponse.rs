use bytes::Bytes;
use http_body_util::Full;
use hyper::{header, Response, StatusCode};
use serde::Serialize;

use crate::{
    menu::models::{CompanyProfile, Role},
    timing::{
        daily::DayHours,
        hours::{
            convert_to_structured_data, group_consecutive_days, DisplayGroup,
            OpeningHoursSpecification,
        },
    },
};

/// What the public site needs for the footer and the contact page.
///
/// `hours` falls back to the default week when nothing has been saved yet.
#[derive(Serialize, Clone, Debug)]
pub struct ProfileResponse {
    phone_number: Option<String>,
    email: Option<String>,
    facebook_url: Option<String>,
    instagram_url: Option<String>,
    tiktok_url: Option<String>,
    hours: Vec<DayHours>,
    groups: Vec<DisplayGroup>,
    opening_hours: Vec<OpeningHoursSpecification>,
}

impl ProfileResponse {
    pub fn new(profile: Option<CompanyProfile>, default_hours: Vec<DayHours>) -> Self {
        let profile = profile.unwrap_or_else(|| CompanyProfile {
            id: 0,
            phone_number: None,
            email: None,
            hours_of_operation: None,
            facebook_url: None,
            instagram_url: None,
            tiktok_url: None,
            created_at: String::new(),
            updated_at: String::new(),
        });
        let hours = profile.hours_of_operation.unwrap_or(default_hours);
        Self {
            phone_number: profile.phone_number,
            email: profile.email,
            facebook_url: profile.facebook_url,
            instagram_url: profile.instagram_url,
            tiktok_url: profile.tiktok_url,
            groups: group_consecutive_days(&hours),
            opening_hours: convert_to_structured_data(&hours),
            hours,
        }
    }
}

#[derive(Serialize, Clone, Debug)]
pub struct RoleResponse {
    pub user_id: String,
    pub role: Role,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct StatsResponse {
    pub users: i64,
    pub categories: i64,
    pub menu_items: i64,
    pub messages: i64,
}

/// Builds a response with a JSON body.
pub fn json_response(status: StatusCode, body: Vec<u8>) -> Response<Full<Bytes>> {
    let mut res = Response::new(Full::new(Bytes::from(body)));
    *res.status_mut() = status;
    res.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );
    res
}

/// Builds a `{"error": ...}` response.
pub fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({ "error": message }).to_string();
    json_response(status, body.into_bytes())
}

/// Returns a 204 No Content response.
pub fn no_data() -> Response<Full<Bytes>> {
    let mut res = Response::new(Full::new(Bytes::new()));
    *res.status_mut() = StatusCode::NO_CONTENT;
    res
}
