use bytes::Bytes;
use chrono_tz::Tz;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::{
    body::{Body, Incoming},
    service::Service,
    Method, Request, Response, StatusCode,
};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use regex::Regex;
use rusqlite::Connection;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url_escape::decode;

use std::{collections::HashMap, error::Error, future::Future, pin::Pin, str::FromStr, sync::Arc};

use crate::{
    database::sqlite::{PooledConnection, SqliteDatabase, Table},
    menu::{
        models::{CategoryForm, ItemOptionForm, MenuItemForm, MessageForm, Role},
        reorder::{next_seq, resequence},
        tree::build_menu,
    },
    timing::{
        clock::timestamp,
        daily::DayHours,
        hours::validate_hours,
        schedule::{check_week, copy_to_all, default_hours},
    },
};

use super::{
    error::ApiError,
    myresponse::{json_response, no_data, ProfileResponse, RoleResponse, StatsResponse},
};

/// Header carrying the user id asserted by the authenticating proxy.
pub const USER_HEADER: &str = "x-user-id";

/// Largest request body read into memory.
pub const MAX_BODY: usize = 64 * 1024;

type ApiResult = Result<Response<Full<Bytes>>, ApiError>;

/// A request with its body read and its query string parsed.
struct ApiRequest {
    method: Method,
    path: String,
    params: HashMap<String, String>,
    user_id: Option<String>,
    body: Bytes,
}

#[derive(Deserialize)]
struct ReorderForm {
    from: usize,
    to: usize,
}

/// The Server
///
/// Handles every API endpoint for the public site and the admin panel. The
/// querying is done by `SqliteDatabase`, the hours logic lives in `timing`.
///
/// This struct implements the `Service` trait from `hyper`. It is cloned for
/// each connection; the clones share the connection pool.
#[derive(Clone)]
pub struct Server {
    connection_pool: Arc<Pool<SqliteConnectionManager>>,
    timezone: Tz,
    email_pattern: Regex,
}

impl Server {
    pub fn setup(
        connection_pool: Arc<Pool<SqliteConnectionManager>>,
        timezone: Tz,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            connection_pool,
            timezone,
            email_pattern: Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$")?,
        })
    }

    /// Parses the query parameters and returns a `hashmap` of key pair values
    /// Returns `None` if the parameters are malformed
    fn parse_params(text: &str) -> Option<HashMap<String, String>> {
        let mut map: HashMap<String, String> = HashMap::new();
        for pairs in text.split('&') {
            let mut iterator = pairs.split('=');
            map.insert(
                iterator.next()?.to_string(),
                decode(iterator.next()?).to_string(),
            );
        }
        Some(map)
    }

    /// Obtain a connection from the connection pool.
    fn get_connection(&self) -> Result<PooledConnection, ApiError> {
        Ok(self.connection_pool.get()?)
    }

    /// Obtain a connection, after checking the caller is an admin.
    ///
    /// Admin handlers call this before looking at the request, so anonymous
    /// callers get a 401 whatever they sent.
    fn admin_connection(&self, req: &ApiRequest) -> Result<PooledConnection, ApiError> {
        let user_id = req.user_id.as_deref().ok_or(ApiError::Unauthorized)?;
        let connection = self.get_connection()?;
        match SqliteDatabase::query_role(&connection, user_id)? {
            Some(role) if role.role == Role::Admin => Ok(connection),
            _ => {
                tracing::warn!(user_id, path = %req.path, "Admin route refused");
                Err(ApiError::Forbidden)
            }
        }
    }

    fn now(&self) -> String {
        timestamp(self.timezone)
    }

    fn param<T: FromStr>(req: &ApiRequest, key: &str) -> Result<T, ApiError> {
        let Some(value) = req.params.get(key) else {
            return Err(ApiError::BadRequest(format!("{} not provided.", key)));
        };
        value
            .parse()
            .map_err(|_| ApiError::BadRequest(format!("Malformed {}.", key)))
    }

    fn json<T: DeserializeOwned>(req: &ApiRequest) -> Result<T, ApiError> {
        Ok(serde_json::from_slice(&req.body)?)
    }

    fn require_name(name: &str) -> Result<(), ApiError> {
        if name.trim().is_empty() {
            return Err(ApiError::BadRequest("name is required.".to_string()));
        }
        Ok(())
    }

    /// Return a 200 OK response with the data provided.
    fn ok_data<T: Serialize>(body: &T) -> ApiResult {
        Ok(json_response(StatusCode::OK, serde_json::to_vec(body)?))
    }

    /// Return a 201 Created response with the data provided.
    fn created<T: Serialize>(body: &T) -> ApiResult {
        Ok(json_response(StatusCode::CREATED, serde_json::to_vec(body)?))
    }

    /// Reads the body and query string, routes the request and turns any error
    /// into its JSON response.
    pub async fn handle<B>(&self, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<Box<dyn Error + Send + Sync>>,
    {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let response = match Self::read_request(req).await {
            Ok(request) => self.route(&request),
            Err(err) => Err(err),
        }
        .unwrap_or_else(ApiError::into_response);
        tracing::info!(
            method = %method,
            path = %path,
            status = response.status().as_u16(),
            "Request handled"
        );
        response
    }

    async fn read_request<B>(req: Request<B>) -> Result<ApiRequest, ApiError>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<Box<dyn Error + Send + Sync>>,
    {
        let (parts, body) = req.into_parts();
        let params = match parts.uri.query() {
            None => HashMap::new(),
            Some(query) => Self::parse_params(query)
                .ok_or_else(|| ApiError::BadRequest("Malformed Parameters.".to_string()))?,
        };
        let user_id = parts
            .headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        let body = Limited::new(body, MAX_BODY)
            .collect()
            .await
            .map_err(|err| {
                if err.downcast_ref::<LengthLimitError>().is_some() {
                    ApiError::PayloadTooLarge(MAX_BODY)
                } else {
                    ApiError::Body(err.to_string())
                }
            })?
            .to_bytes();
        Ok(ApiRequest {
            method: parts.method,
            path: parts.uri.path().to_string(),
            params,
            user_id,
            body,
        })
    }

    fn route(&self, req: &ApiRequest) -> ApiResult {
        match (&req.method, req.path.as_str()) {
            (&Method::GET, "/api/menu") => self.menu(),
            (&Method::GET, "/api/profile") => self.profile(),
            (&Method::POST, "/api/messages") => self.create_message(req),
            (&Method::GET, "/api/account/role") => self.account_role(req),

            (&Method::GET, "/api/hours") => self.hours(req),
            (&Method::PUT, "/api/hours") => self.save_hours(req),
            (&Method::POST, "/api/hours/copy") => self.copy_hours(req),
            (&Method::GET, "/api/stats") => self.stats(req),
            (&Method::GET, "/api/messages") => self.messages(req),
            (&Method::DELETE, "/api/messages") => self.delete_row(req, Table::Messages),

            (&Method::GET, "/api/categories") => self.categories(req),
            (&Method::POST, "/api/categories") => self.create_category(req),
            (&Method::PUT, "/api/categories") => self.update_category(req),
            (&Method::DELETE, "/api/categories") => self.delete_row(req, Table::Category),
            (&Method::POST, "/api/categories/reorder") => self.reorder_categories(req),

            (&Method::GET, "/api/items") => self.menu_items(req),
            (&Method::POST, "/api/items") => self.create_menu_item(req),
            (&Method::PUT, "/api/items") => self.update_menu_item(req),
            (&Method::DELETE, "/api/items") => self.delete_row(req, Table::MenuItem),
            (&Method::POST, "/api/items/reorder") => self.reorder_menu_items(req),

            (&Method::GET, "/api/options") => self.item_options(req),
            (&Method::POST, "/api/options") => self.create_item_option(req),
            (&Method::PUT, "/api/options") => self.update_item_option(req),
            (&Method::DELETE, "/api/options") => self.delete_row(req, Table::ItemOptions),
            (&Method::POST, "/api/options/reorder") => self.reorder_item_options(req),

            _ => Err(ApiError::NotFound("Not found.".to_string())),
        }
    }

    /// The /api/menu endpoint. Categories with their items and options, all in
    /// display order.
    fn menu(&self) -> ApiResult {
        let connection = self.get_connection()?;
        let menu = build_menu(
            SqliteDatabase::query_categories(&connection)?,
            SqliteDatabase::query_all_menu_items(&connection)?,
            SqliteDatabase::query_all_item_options(&connection)?,
        );
        Self::ok_data(&menu)
    }

    /// The /api/profile endpoint. Contact details plus the business hours, both
    /// grouped for display and as structured data.
    fn profile(&self) -> ApiResult {
        let connection = self.get_connection()?;
        let profile = SqliteDatabase::query_profile(&connection)?;
        Self::ok_data(&ProfileResponse::new(profile, default_hours()))
    }

    fn create_message(&self, req: &ApiRequest) -> ApiResult {
        let form: MessageForm = Self::json(req)?;
        if [&form.name, &form.email, &form.message]
            .iter()
            .any(|field| field.trim().is_empty())
        {
            return Err(ApiError::BadRequest(
                "name, email and message are required.".to_string(),
            ));
        }
        if !self.email_pattern.is_match(form.email.trim()) {
            return Err(ApiError::BadRequest("Malformed email.".to_string()));
        }
        let connection = self.get_connection()?;
        let message = SqliteDatabase::insert_message(&connection, &form, &self.now())?;
        tracing::info!(id = message.id, "Contact message received");
        Self::created(&message)
    }

    /// Unknown users are basic users.
    fn account_role(&self, req: &ApiRequest) -> ApiResult {
        let user_id = req.user_id.clone().ok_or(ApiError::Unauthorized)?;
        let connection = self.get_connection()?;
        let role = SqliteDatabase::query_role(&connection, &user_id)?
            .map_or(Role::BasicUser, |role| role.role);
        Self::ok_data(&RoleResponse { user_id, role })
    }

    fn stored_hours(connection: &Connection) -> Result<Vec<DayHours>, ApiError> {
        let profile = SqliteDatabase::query_profile(connection)?;
        Ok(profile
            .and_then(|profile| profile.hours_of_operation)
            .unwrap_or_else(default_hours))
    }

    fn hours(&self, req: &ApiRequest) -> ApiResult {
        let connection = self.admin_connection(req)?;
        Self::ok_data(&Self::stored_hours(&connection)?)
    }

    /// Checks the shape of the week, then the hours themselves, before storing.
    fn store_hours(&self, connection: &Connection, hours: &[DayHours]) -> Result<(), ApiError> {
        check_week(hours)?;
        validate_hours(hours)?;
        SqliteDatabase::save_hours(connection, hours, &self.now())?;
        tracing::info!("Business hours saved");
        Ok(())
    }

    fn save_hours(&self, req: &ApiRequest) -> ApiResult {
        let mut connection = self.admin_connection(req)?;
        let hours: Vec<DayHours> = Self::json(req)?;
        let transaction = SqliteDatabase::begin_write(&mut connection)?;
        self.store_hours(&transaction, &hours)?;
        transaction.commit()?;
        Self::ok_data(&hours)
    }

    /// The /api/hours/copy endpoint. Applies one day's hours to the whole week.
    fn copy_hours(&self, req: &ApiRequest) -> ApiResult {
        let mut connection = self.admin_connection(req)?;
        let index: usize = Self::param(req, "index")?;
        let transaction = SqliteDatabase::begin_write(&mut connection)?;
        let hours = copy_to_all(&Self::stored_hours(&transaction)?, index)
            .ok_or_else(|| ApiError::BadRequest(format!("No day at index {}.", index)))?;
        self.store_hours(&transaction, &hours)?;
        transaction.commit()?;
        Self::ok_data(&hours)
    }

    fn stats(&self, req: &ApiRequest) -> ApiResult {
        let connection = self.admin_connection(req)?;
        Self::ok_data(&StatsResponse {
            users: SqliteDatabase::count(&connection, Table::UserRoles)?,
            categories: SqliteDatabase::count(&connection, Table::Category)?,
            menu_items: SqliteDatabase::count(&connection, Table::MenuItem)?,
            messages: SqliteDatabase::count(&connection, Table::Messages)?,
        })
    }

    fn messages(&self, req: &ApiRequest) -> ApiResult {
        let connection = self.admin_connection(req)?;
        Self::ok_data(&SqliteDatabase::query_messages(&connection)?)
    }

    fn delete_row(&self, req: &ApiRequest, table: Table) -> ApiResult {
        let connection = self.admin_connection(req)?;
        let id: i64 = Self::param(req, "id")?;
        if !SqliteDatabase::delete(&connection, table, id)? {
            return Err(ApiError::NotFound(format!("No {} with id {}.", table.name(), id)));
        }
        tracing::info!(table = table.name(), id, "Row deleted");
        Ok(no_data())
    }

    /// Returns a 404 unless `id` exists in `table`.
    fn require_row(connection: &Connection, table: Table, id: i64) -> Result<(), ApiError> {
        if !SqliteDatabase::exists(connection, table, id)? {
            return Err(ApiError::NotFound(format!("No {} with id {}.", table.name(), id)));
        }
        Ok(())
    }

    fn updated(found: bool, table: Table, id: i64) -> ApiResult {
        if !found {
            return Err(ApiError::NotFound(format!("No {} with id {}.", table.name(), id)));
        }
        Ok(no_data())
    }

    fn categories(&self, req: &ApiRequest) -> ApiResult {
        let connection = self.admin_connection(req)?;
        Self::ok_data(&SqliteDatabase::query_categories(&connection)?)
    }

    fn create_category(&self, req: &ApiRequest) -> ApiResult {
        let mut connection = self.admin_connection(req)?;
        let form: CategoryForm = Self::json(req)?;
        Self::require_name(&form.name)?;
        let transaction = SqliteDatabase::begin_write(&mut connection)?;
        let seq = next_seq(&SqliteDatabase::query_categories(&transaction)?);
        let category = SqliteDatabase::insert_category(&transaction, &form, seq, &self.now())?;
        transaction.commit()?;
        Self::created(&category)
    }

    fn update_category(&self, req: &ApiRequest) -> ApiResult {
        let connection = self.admin_connection(req)?;
        let id: i64 = Self::param(req, "id")?;
        let form: CategoryForm = Self::json(req)?;
        Self::require_name(&form.name)?;
        let found = SqliteDatabase::update_category(&connection, id, &form, &self.now())?;
        Self::updated(found, Table::Category, id)
    }

    /// Moves one category and writes the new rank of every category.
    fn reorder_categories(&self, req: &ApiRequest) -> ApiResult {
        let mut connection = self.admin_connection(req)?;
        let form: ReorderForm = Self::json(req)?;
        let transaction = SqliteDatabase::begin_write(&mut connection)?;
        let categories = resequence(
            SqliteDatabase::query_categories(&transaction)?,
            form.from,
            form.to,
        )?;
        let ranks: Vec<(i64, i64)> = categories.iter().map(|c| (c.id, c.seq)).collect();
        SqliteDatabase::update_seq(&transaction, Table::Category, &ranks)?;
        transaction.commit()?;
        Self::ok_data(&categories)
    }

    fn menu_items(&self, req: &ApiRequest) -> ApiResult {
        let connection = self.admin_connection(req)?;
        let category_id: i64 = Self::param(req, "category_id")?;
        Self::ok_data(&SqliteDatabase::query_menu_items(&connection, category_id)?)
    }

    fn create_menu_item(&self, req: &ApiRequest) -> ApiResult {
        let mut connection = self.admin_connection(req)?;
        let category_id: i64 = Self::param(req, "category_id")?;
        let form: MenuItemForm = Self::json(req)?;
        Self::require_name(&form.name)?;
        let transaction = SqliteDatabase::begin_write(&mut connection)?;
        Self::require_row(&transaction, Table::Category, category_id)?;
        let seq = next_seq(&SqliteDatabase::query_menu_items(&transaction, category_id)?);
        let item =
            SqliteDatabase::insert_menu_item(&transaction, category_id, &form, seq, &self.now())?;
        transaction.commit()?;
        Self::created(&item)
    }

    fn update_menu_item(&self, req: &ApiRequest) -> ApiResult {
        let connection = self.admin_connection(req)?;
        let id: i64 = Self::param(req, "id")?;
        let form: MenuItemForm = Self::json(req)?;
        Self::require_name(&form.name)?;
        let found = SqliteDatabase::update_menu_item(&connection, id, &form, &self.now())?;
        Self::updated(found, Table::MenuItem, id)
    }

    fn reorder_menu_items(&self, req: &ApiRequest) -> ApiResult {
        let mut connection = self.admin_connection(req)?;
        let category_id: i64 = Self::param(req, "category_id")?;
        let form: ReorderForm = Self::json(req)?;
        let transaction = SqliteDatabase::begin_write(&mut connection)?;
        let items = resequence(
            SqliteDatabase::query_menu_items(&transaction, category_id)?,
            form.from,
            form.to,
        )?;
        let ranks: Vec<(i64, i64)> = items.iter().map(|i| (i.id, i.seq)).collect();
        SqliteDatabase::update_seq(&transaction, Table::MenuItem, &ranks)?;
        transaction.commit()?;
        Self::ok_data(&items)
    }

    fn item_options(&self, req: &ApiRequest) -> ApiResult {
        let connection = self.admin_connection(req)?;
        let menu_item_id: i64 = Self::param(req, "menu_item_id")?;
        Self::ok_data(&SqliteDatabase::query_item_options(&connection, menu_item_id)?)
    }

    fn create_item_option(&self, req: &ApiRequest) -> ApiResult {
        let mut connection = self.admin_connection(req)?;
        let menu_item_id: i64 = Self::param(req, "menu_item_id")?;
        let form: ItemOptionForm = Self::json(req)?;
        Self::require_name(&form.name)?;
        let transaction = SqliteDatabase::begin_write(&mut connection)?;
        Self::require_row(&transaction, Table::MenuItem, menu_item_id)?;
        let seq = next_seq(&SqliteDatabase::query_item_options(&transaction, menu_item_id)?);
        let option = SqliteDatabase::insert_item_option(
            &transaction,
            menu_item_id,
            &form,
            seq,
            &self.now(),
        )?;
        transaction.commit()?;
        Self::created(&option)
    }

    fn update_item_option(&self, req: &ApiRequest) -> ApiResult {
        let connection = self.admin_connection(req)?;
        let id: i64 = Self::param(req, "id")?;
        let form: ItemOptionForm = Self::json(req)?;
        Self::require_name(&form.name)?;
        let found = SqliteDatabase::update_item_option(&connection, id, &form, &self.now())?;
        Self::updated(found, Table::ItemOptions, id)
    }

    fn reorder_item_options(&self, req: &ApiRequest) -> ApiResult {
        let mut connection = self.admin_connection(req)?;
        let menu_item_id: i64 = Self::param(req, "menu_item_id")?;
        let form: ReorderForm = Self::json(req)?;
        let transaction = SqliteDatabase::begin_write(&mut connection)?;
        let options = resequence(
            SqliteDatabase::query_item_options(&transaction, menu_item_id)?,
            form.from,
            form.to,
        )?;
        let ranks: Vec<(i64, i64)> = options.iter().map(|o| (o.id, o.seq)).collect();
        SqliteDatabase::update_seq(&transaction, Table::ItemOptions, &ranks)?;
        transaction.commit()?;
        Self::ok_data(&options)
    }
}

impl Service<Request<Incoming>> for Server {
    type Response = Response<Full<Bytes>>;
    type Error = hyper::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let server = self.clone();
        Box::pin(async move { Ok(server.handle(req).await) })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;
    use crate::database::setup::testing::memory_pool;

    const ADMIN: &str = "owner";
    const VISITOR: &str = "guest";
    const SEEDED: &str = "2024-05-01T00:00:00";

    fn server() -> Server {
        let pool = memory_pool();
        {
            let connection = pool.get().unwrap();
            SqliteDatabase::ensure_role(&connection, ADMIN, Role::Admin, SEEDED).unwrap();
            SqliteDatabase::ensure_role(&connection, VISITOR, Role::BasicUser, SEEDED).unwrap();
        }
        Server::setup(Arc::new(pool), chrono_tz::Europe::London).unwrap()
    }

    async fn send_raw(
        server: &Server,
        method: &str,
        uri: &str,
        user: Option<&str>,
        body: Bytes,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header(USER_HEADER, user);
        }
        let response = server.handle(builder.body(Full::new(body)).unwrap()).await;
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn send(
        server: &Server,
        method: &str,
        uri: &str,
        user: Option<&str>,
        body: Value,
    ) -> (StatusCode, Value) {
        let body = if body.is_null() {
            Bytes::new()
        } else {
            Bytes::from(body.to_string())
        };
        send_raw(server, method, uri, user, body).await
    }

    fn week_with_tuesday(open: &str, close: &str) -> Value {
        let mut hours = default_hours();
        hours[1] = DayHours::new_open("Tuesday", open, close);
        serde_json::to_value(hours).unwrap()
    }

    #[test]
    fn parses_and_decodes_params() {
        let map = Server::parse_params("name=Caf%C3%A9&id=3").unwrap();
        assert_eq!(map["name"], "Café");
        assert_eq!(map["id"], "3");
        assert_eq!(Server::parse_params("novalue"), None);
    }

    #[tokio::test]
    async fn profile_defaults_before_anything_is_saved() {
        let server = server();
        let (status, body) = send(&server, "GET", "/api/profile", None, Value::Null).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["groups"], json!([{
            "days": "Monday - Sunday",
            "hours": "9:00 AM - 5:00 PM",
            "is_closed": false
        }]));
        assert_eq!(body["opening_hours"].as_array().unwrap().len(), 7);
    }

    #[tokio::test]
    async fn saved_hours_show_up_grouped() {
        let server = server();
        let mut hours = default_hours();
        hours[5] = DayHours::new_closed("Saturday");
        hours[6] = DayHours::new_closed("Sunday");
        let hours = serde_json::to_value(&hours).unwrap();
        let (status, _) = send(&server, "PUT", "/api/hours", Some(ADMIN), hours).await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send(&server, "GET", "/api/profile", None, Value::Null).await;
        assert_eq!(body["groups"][0]["days"], "Monday - Friday");
        assert_eq!(body["groups"][1], json!({
            "days": "Saturday & Sunday",
            "hours": "Closed",
            "is_closed": true
        }));
        let opening_hours = body["opening_hours"].as_array().unwrap();
        assert_eq!(opening_hours.len(), 5);
        assert_eq!(opening_hours[0]["@type"], "OpeningHoursSpecification");
        assert_eq!(opening_hours[0]["opens"], "09:00");
    }

    #[tokio::test]
    async fn invalid_hours_are_refused_with_the_day() {
        let server = server();
        let (status, body) = send(
            &server,
            "PUT",
            "/api/hours",
            Some(ADMIN),
            week_with_tuesday("18:00", "09:00"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("Tuesday"));

        let (_, body) = send(&server, "GET", "/api/hours", Some(ADMIN), Value::Null).await;
        assert_eq!(body[1]["open_time"], "09:00");
    }

    #[tokio::test]
    async fn unpadded_hours_are_refused() {
        let server = server();
        let (status, body) = send(
            &server,
            "PUT",
            "/api/hours",
            Some(ADMIN),
            week_with_tuesday("10:00", "9:00"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Malformed time '9:00' for Tuesday");
    }

    #[tokio::test]
    async fn incomplete_week_is_refused() {
        let server = server();
        let hours = serde_json::to_value(&default_hours()[..5]).unwrap();
        let (status, body) = send(&server, "PUT", "/api/hours", Some(ADMIN), hours).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "A week needs exactly 7 days, got 5");
    }

    #[tokio::test]
    async fn copy_applies_one_day_to_all() {
        let server = server();
        let week = week_with_tuesday("11:00", "22:00");
        send(&server, "PUT", "/api/hours", Some(ADMIN), week).await;
        let uri = "/api/hours/copy?index=1";
        let (status, body) = send(&server, "POST", uri, Some(ADMIN), Value::Null).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[6]["day"], "Sunday");
        assert_eq!(body[6]["open_time"], "11:00");

        let uri = "/api/hours/copy?index=9";
        let (status, _) = send(&server, "POST", uri, Some(ADMIN), Value::Null).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn corrupt_stored_hours_are_a_server_error() {
        let server = server();
        {
            let connection = server.get_connection().unwrap();
            connection
                .execute(
                    "INSERT INTO company_profile (hours_of_operation, created_at, updated_at)
                     VALUES ('[{\"day\": 1}]', ?1, ?1)",
                    rusqlite::params![SEEDED],
                )
                .unwrap();
        }
        let (status, body) = send(&server, "GET", "/api/profile", None, Value::Null).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
    }

    #[tokio::test]
    async fn admin_routes_need_an_admin() {
        let server = server();
        let (status, _) = send(&server, "GET", "/api/stats", None, Value::Null).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = send(&server, "GET", "/api/stats", Some(VISITOR), Value::Null).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = send(&server, "GET", "/api/stats", Some("stranger"), Value::Null).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, body) = send(&server, "GET", "/api/stats", Some(ADMIN), Value::Null).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["users"], 2);
    }

    #[tokio::test]
    async fn anonymous_admin_calls_are_401_before_parsing() {
        let server = server();
        let garbage = || Bytes::from_static(b"garbage");
        let (status, _) = send_raw(&server, "PUT", "/api/hours", None, garbage()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = send_raw(&server, "POST", "/api/categories", None, garbage()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = send(&server, "DELETE", "/api/messages", None, Value::Null).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = send(&server, "POST", "/api/hours/copy", None, Value::Null).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send_raw(&server, "PUT", "/api/hours", Some(VISITOR), garbage()).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = send_raw(&server, "PUT", "/api/hours", Some(ADMIN), garbage()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn oversized_body_is_refused() {
        let server = server();
        let body = Bytes::from(vec![b'a'; MAX_BODY + 1]);
        let (status, body) = send_raw(&server, "POST", "/api/messages", None, body).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            body["error"],
            format!("Request body is larger than {} bytes.", MAX_BODY)
        );

        let message = json!({
            "name": "Ada",
            "email": "ada@example.com",
            "message": "a".repeat(MAX_BODY / 2)
        });
        let (status, _) = send(&server, "POST", "/api/messages", None, message).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn account_role_defaults_to_basic_user() {
        let server = server();
        let uri = "/api/account/role";
        let (_, body) = send(&server, "GET", uri, Some(ADMIN), Value::Null).await;
        assert_eq!(body["role"], "admin");
        let (_, body) = send(&server, "GET", uri, Some("stranger"), Value::Null).await;
        assert_eq!(body["role"], "basic_user");
        let (status, _) = send(&server, "GET", uri, None, Value::Null).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn contact_messages_round_trip() {
        let server = server();
        let (status, _) = send(
            &server,
            "POST",
            "/api/messages",
            None,
            json!({"name": "Ada", "email": "not-an-email", "message": "Hi"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, created) = send(
            &server,
            "POST",
            "/api/messages",
            None,
            json!({
                "name": "Ada",
                "email": "ada@example.com",
                "subject": "Booking",
                "message": "Table for two"
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, list) = send(&server, "GET", "/api/messages", Some(ADMIN), Value::Null).await;
        assert_eq!(list[0]["subject"], "Booking");

        let uri = format!("/api/messages?id={}", created["id"]);
        let (status, _) = send(&server, "DELETE", &uri, Some(ADMIN), Value::Null).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&server, "DELETE", &uri, Some(ADMIN), Value::Null).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn menu_is_built_and_reordered() {
        let server = server();
        for name in ["Starters", "Mains", "Desserts"] {
            let category = json!({"name": name});
            let (status, _) = send(&server, "POST", "/api/categories", Some(ADMIN), category).await;
            assert_eq!(status, StatusCode::CREATED);
        }
        let (_, categories) =
            send(&server, "GET", "/api/categories", Some(ADMIN), Value::Null).await;
        assert_eq!(categories[2]["seq"], 2);
        let mains = categories[1]["id"].as_i64().unwrap();

        let uri = format!("/api/items?category_id={}", mains);
        send(&server, "POST", &uri, Some(ADMIN), json!({"name": "Stew", "price": 14.0})).await;
        let (_, pie) = send(&server, "POST", &uri, Some(ADMIN), json!({"name": "Pie"})).await;
        assert_eq!(pie["seq"], 1);

        let uri = format!("/api/options?menu_item_id={}", pie["id"]);
        let gravy = json!({"name": "Extra gravy", "price": 1.5});
        let (status, _) = send(&server, "POST", &uri, Some(ADMIN), gravy).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, reordered) = send(
            &server,
            "POST",
            "/api/categories/reorder",
            Some(ADMIN),
            json!({"from": 2, "to": 0}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reordered[0]["name"], "Desserts");

        let uri = format!("/api/items/reorder?category_id={}", mains);
        send(&server, "POST", &uri, Some(ADMIN), json!({"from": 1, "to": 0})).await;

        let (_, menu) = send(&server, "GET", "/api/menu", None, Value::Null).await;
        let names: Vec<&str> = menu
            .as_array()
            .unwrap()
            .iter()
            .map(|category| category["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Desserts", "Starters", "Mains"]);
        assert_eq!(menu[2]["items"][0]["name"], "Pie");
        assert_eq!(menu[2]["items"][0]["options"][0]["name"], "Extra gravy");
    }

    #[tokio::test]
    async fn bad_reorder_and_missing_parents() {
        let server = server();
        let (status, _) = send(
            &server,
            "POST",
            "/api/categories/reorder",
            Some(ADMIN),
            json!({"from": 0, "to": 1}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let stew = || json!({"name": "Stew"});
        let uri = "/api/items?category_id=99";
        let (status, _) = send(&server, "POST", uri, Some(ADMIN), stew()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&server, "POST", "/api/items", Some(ADMIN), stew()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let uri = "/api/categories?id=99";
        let (status, _) = send(&server, "PUT", uri, Some(ADMIN), json!({"name": "x"})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let blank = json!({"name": "  "});
        let (status, _) = send(&server, "POST", "/api/categories", Some(ADMIN), blank).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, categories) =
            send(&server, "GET", "/api/categories", Some(ADMIN), Value::Null).await;
        assert_eq!(categories, json!([]));
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let server = server();
        let (status, body) = send(&server, "GET", "/api/nothing", None, Value::Null).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Not found.");
        let (status, body) = send(&server, "PATCH", "/api/menu", None, Value::Null).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Not found.");
    }
}
