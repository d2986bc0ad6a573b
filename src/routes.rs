use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use actix_multipart::Multipart;
use actix_web::http::header;
use actix_web::{web, HttpResponse};
use futures_util::TryStreamExt as _;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::db::QueryExecutor;
use crate::error::ApiError;
use crate::files;
use crate::pickle;
use crate::script::{self, Scope, ScriptEngine};
use crate::settings::AppConfig;
use crate::shell;
use crate::weak_crypto;
use crate::xml;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg
        // SQL injection
        .service(web::resource("/user/{user_id}").route(web::get().to(get_user)))
        .service(web::resource("/login").route(web::post().to(login)))
        .service(web::resource("/search").route(web::get().to(search_users)))
        .service(web::resource("/delete/{table_name}").route(web::get().to(delete_records)))
        // deserialization
        .service(web::resource("/load-session").route(web::post().to(load_session)))
        .service(web::resource("/import-data").route(web::post().to(import_data)))
        // code evaluation
        .service(web::resource("/calculate").route(web::get().to(calculate)))
        .service(web::resource("/filter").route(web::get().to(filter_data)))
        .service(web::resource("/config").route(web::post().to(update_config)))
        .service(web::resource("/template").route(web::post().to(render_template)))
        // shell
        .service(web::resource("/ping").route(web::get().to(ping_host)))
        .service(web::resource("/dns-lookup").route(web::get().to(dns_lookup)))
        .service(web::resource("/run").route(web::get().to(run_command)))
        // filesystem
        .service(web::resource("/file/{filename:.*}").route(web::get().to(get_file)))
        .service(web::resource("/download").route(web::get().to(download)))
        // markup
        .service(web::resource("/greet").route(web::get().to(greet)))
        .service(web::resource("/profile").route(web::get().to(profile)))
        .service(web::resource("/redirect").route(web::get().to(open_redirect)))
        // crypto, randomness, disclosure
        .service(web::resource("/hash-password").route(web::post().to(hash_password)))
        .service(web::resource("/debug").route(web::get().to(debug_info)))
        .service(web::resource("/reset-token").route(web::get().to(reset_token)))
        .service(web::resource("/session").route(web::get().to(session_id)))
        // outbound fetches
        .service(web::resource("/parse-xml").route(web::post().to(parse_xml)))
        .service(web::resource("/fetch-url").route(web::get().to(fetch_url)));
}

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn QueryExecutor>,
    pub engine: Arc<dyn ScriptEngine>,
    pub config: Arc<AppConfig>,
}

fn html(body: String) -> HttpResponse {
    HttpResponse::Ok().content_type("text/html; charset=utf-8").body(body)
}

fn display(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ---------------- SQL -----------------------------------------------

pub async fn get_user(data: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let user_id = path.into_inner();
    let query = format!("SELECT * FROM users WHERE id = '{}'", user_id);
    let result = data.db.fetch_one(&query).await?;
    Ok(HttpResponse::Ok().json(result))
}

#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

pub async fn login(data: web::Data<AppState>, form: web::Form<LoginForm>) -> Result<HttpResponse, ApiError> {
    let query = format!(
        "SELECT * FROM users WHERE username = '{}' AND password = '{}'",
        form.username, form.password
    );
    match data.db.fetch_one(&query).await? {
        Some(_) => Ok(HttpResponse::Ok().body("Login successful!")),
        None => Ok(HttpResponse::Unauthorized().body("Invalid credentials")),
    }
}

#[derive(Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    q: String,
}

pub async fn search_users(data: web::Data<AppState>, query: web::Query<SearchQuery>) -> Result<HttpResponse, ApiError> {
    let sql = "SELECT * FROM users WHERE name LIKE '%".to_string() + &query.q + "%'";
    let results = data.db.fetch_all(&sql).await?;
    Ok(HttpResponse::Ok().json(results))
}

pub async fn delete_records(data: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let table_name = path.into_inner();
    let sql = "DELETE FROM ".to_string() + &table_name + " WHERE expired = 1";
    data.db.execute(&sql).await?;
    Ok(HttpResponse::Ok().body("Records deleted"))
}

// ---------------- Deserialization -----------------------------------

pub async fn load_session(body: web::Bytes) -> Result<HttpResponse, ApiError> {
    let session = pickle::loads(&body)?;
    let name = session.get("username")?.map(display).unwrap_or_else(|| "Guest".into());
    Ok(HttpResponse::Ok().body(format!("Welcome back, {name}!")))
}

pub async fn import_data(mut payload: Multipart) -> Result<HttpResponse, ApiError> {
    while let Some(mut field) = payload.try_next().await? {
        if field.content_disposition().get_name() != Some("file") { continue; }
        let mut bytes: Vec<u8> = Vec::new();
        while let Some(chunk) = field.try_next().await? {
            bytes.extend_from_slice(&chunk);
        }
        let data = pickle::load(bytes.as_slice())?;
        return Ok(HttpResponse::Ok().body(format!("Imported {} records", data.len()?)));
    }
    Ok(HttpResponse::BadRequest().body("No file uploaded"))
}

// ---------------- Code evaluation -----------------------------------

#[derive(Deserialize)]
pub struct CalcQuery {
    #[serde(default = "default_expr")]
    expr: String,
}
fn default_expr() -> String { "0".into() }

pub async fn calculate(data: web::Data<AppState>, query: web::Query<CalcQuery>) -> Result<HttpResponse, ApiError> {
    let result = data.engine.eval(&query.expr, &Scope::new())?;
    Ok(HttpResponse::Ok().body(format!("Result: {result}")))
}

#[derive(Deserialize)]
pub struct FilterQuery {
    #[serde(default = "default_condition")]
    condition: String,
}
fn default_condition() -> String { "True".into() }

pub async fn filter_data(data: web::Data<AppState>, query: web::Query<FilterQuery>) -> Result<HttpResponse, ApiError> {
    let mut filtered = Vec::new();
    for x in 1..=10i64 {
        let mut scope = Scope::new();
        scope.insert("x".into(), x.into());
        if script::is_truthy(&data.engine.eval(&query.condition, &scope)?) {
            filtered.push(x);
        }
    }
    Ok(HttpResponse::Ok().body(format!("{filtered:?}")))
}

#[derive(Deserialize)]
pub struct ConfigForm {
    #[serde(default)]
    config: String,
}

pub async fn update_config(data: web::Data<AppState>, form: web::Form<ConfigForm>) -> Result<HttpResponse, ApiError> {
    data.engine.exec(&form.config)?;
    Ok(HttpResponse::Ok().body("Configuration updated"))
}

#[derive(Deserialize)]
pub struct TemplateRequest {
    template: String,
    #[serde(default)]
    context: BTreeMap<String, String>,
}

pub async fn render_template(data: web::Data<AppState>, payload: web::Json<TemplateRequest>) -> Result<HttpResponse, ApiError> {
    let rendered = script::process_template(&payload.template, &payload.context, data.engine.as_ref())?;
    Ok(HttpResponse::Ok().body(rendered))
}

// ---------------- Shell ---------------------------------------------

#[derive(Deserialize)]
pub struct PingQuery {
    #[serde(default = "default_host")]
    host: String,
}
fn default_host() -> String { "localhost".into() }

pub async fn ping_host(query: web::Query<PingQuery>) -> Result<HttpResponse, ApiError> {
    let result = shell::read_output(shell::ping_command(&query.host))?;
    Ok(html(format!("<pre>{result}</pre>")))
}

#[derive(Deserialize)]
pub struct DnsQuery {
    #[serde(default)]
    domain: String,
}

pub async fn dns_lookup(query: web::Query<DnsQuery>) -> Result<HttpResponse, ApiError> {
    let output = shell::read_output(shell::nslookup_command(&query.domain))?;
    Ok(HttpResponse::Ok().body(output))
}

#[derive(Deserialize)]
pub struct RunQuery {
    #[serde(default = "default_cmd")]
    cmd: String,
}
fn default_cmd() -> String { "echo hello".into() }

pub async fn run_command(query: web::Query<RunQuery>) -> Result<HttpResponse, ApiError> {
    log::info!("run: {}", query.cmd);
    let output = shell::check_output(shell::shell(&query.cmd))?;
    Ok(HttpResponse::Ok().body(output))
}

// ---------------- Filesystem ----------------------------------------

pub async fn get_file(data: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let file_path = files::upload_path(&data.config.upload_dir, &path.into_inner());
    let contents = tokio::fs::read_to_string(&file_path).await?;
    Ok(HttpResponse::Ok().body(contents))
}

#[derive(Deserialize)]
pub struct DownloadQuery {
    file: String,
}

pub async fn download(data: web::Data<AppState>, query: web::Query<DownloadQuery>) -> Result<HttpResponse, ApiError> {
    let download_path = files::download_path(&data.config.documents_root, &query.file);
    let bytes = tokio::fs::read(&download_path).await?;
    Ok(HttpResponse::Ok().content_type("application/octet-stream").body(bytes))
}

// ---------------- Markup & redirects --------------------------------

#[derive(Deserialize)]
pub struct GreetQuery {
    #[serde(default = "default_name")]
    name: String,
}
fn default_name() -> String { "Guest".into() }

pub async fn greet(data: web::Data<AppState>, query: web::Query<GreetQuery>) -> Result<HttpResponse, ApiError> {
    let template = format!("<h1>Hello, {}!</h1>", query.name);
    Ok(html(script::render_template_string(&template, data.engine.as_ref())?))
}

#[derive(Deserialize)]
pub struct ProfileQuery {
    #[serde(default)]
    user: String,
}

pub async fn profile(query: web::Query<ProfileQuery>) -> HttpResponse {
    html("<html><body><h1>Welcome, ".to_string() + &query.user + "!</h1></body></html>")
}

#[derive(Deserialize)]
pub struct RedirectQuery {
    #[serde(default = "default_url")]
    url: String,
}
fn default_url() -> String { "/".into() }

pub async fn open_redirect(query: web::Query<RedirectQuery>) -> HttpResponse {
    HttpResponse::Found().insert_header((header::LOCATION, query.into_inner().url)).finish()
}

// ---------------- Crypto, randomness, disclosure --------------------

#[derive(Deserialize)]
pub struct HashForm {
    #[serde(default)]
    password: String,
    algorithm: Option<String>,
}

pub async fn hash_password(form: web::Form<HashForm>) -> HttpResponse {
    let algorithm = form.algorithm.as_deref().unwrap_or("md5");
    let hash = match algorithm {
        "sha1" => weak_crypto::hash_password_sha1(&form.password),
        _ => weak_crypto::hash_password(&form.password),
    };
    HttpResponse::Ok().json(json!({ "algorithm": algorithm, "hash": hash }))
}

pub async fn debug_info(data: web::Data<AppState>) -> HttpResponse {
    log::warn!("debug dump requested");
    let secrets = &data.config.secrets;
    let env: HashMap<String, String> = std::env::vars().collect();
    HttpResponse::Ok().json(json!({
        "env": env,
        "database_password": secrets.database_password,
        "api_key": secrets.api_key,
        "aws_credentials": {
            "access_key": secrets.aws_access_key_id,
            "secret_key": secrets.aws_secret_access_key,
        },
        "database_dsn": secrets.database_dsn(),
        "secrets": secrets,
    }))
}

pub async fn reset_token() -> HttpResponse {
    HttpResponse::Ok().body(weak_crypto::generate_password_reset_token())
}

pub async fn session_id() -> HttpResponse {
    HttpResponse::Ok().body(weak_crypto::generate_session_id())
}

// ---------------- Outbound fetches ----------------------------------

pub async fn parse_xml(body: web::Bytes) -> Result<HttpResponse, ApiError> {
    let xml_data = String::from_utf8_lossy(&body);
    let tree = xml::parse_untrusted(&xml_data).await?;
    Ok(HttpResponse::Ok().content_type("application/xml").body(tree))
}

#[derive(Deserialize)]
pub struct FetchQuery {
    url: String,
}

pub async fn fetch_url(query: web::Query<FetchQuery>) -> Result<HttpResponse, ApiError> {
    let body = reqwest::get(&query.url).await?.text().await?;
    Ok(HttpResponse::Ok().body(body))
}
