use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use actix_web::{web, App, HttpResponse, HttpServer};
use error::SyncError;
use serde::{Deserialize, Serialize};
use store::Store;
use strum::IntoEnumIterator;
use sync::coordinator::{Coordinator, SeriesStatus};
use sync::fetch::ReqwestFetcher;
use sync::retry::RetrySupervisor;
use types::series::{DataSeries, MajorDataSeries};
use types::state::{DataSeriesState, UpdateState};
use types::version::DataVersion;

use query::MatchType;

use crate::cli::Options;

struct AppState {
    store: Arc<Store>,
    supervisor: RetrySupervisor<ReqwestFetcher>,
}

pub async fn start(options: Options) -> std::io::Result<()> {
    let config = config::Config::load(options.config.as_deref().map(PathBuf::from).as_deref())
        .expect("failed to load configuration");

    let bind_addr = match &options.bind {
        Some(addr) => addr.parse().expect("invalid --bind address"),
        None => config.bind_addr,
    };

    let store = Arc::new(Store::open(&config.data_dir).expect("failed to open store"));
    let fetcher = Arc::new(ReqwestFetcher::new());
    let coordinator = Coordinator::new(store.clone(), fetcher, config.base_url.clone(), Duration::from_secs(config.http_timeout_secs));
    let supervisor = RetrySupervisor::new(coordinator, config.retry.initial_backoff_ms_range(), config.retry.max_backoff_secs, config.retry.store_retry_attempts);

    let state = web::Data::new(AppState { store, supervisor });

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .route("/api/words", web::get().to(get_words))
            .route("/api/words/xref", web::get().to(get_words_xref))
            .route("/api/words/kanji/{c}", web::get().to(get_words_with_kanji))
            .route("/api/words/gloss", web::get().to(get_words_gloss))
            .route("/api/kanji", web::get().to(get_kanji))
            .route("/api/names", web::get().to(get_names))
            .route("/api/sync/{series}", web::post().to(post_sync))
            .route("/api/status", web::get().to(get_status))
    })
    .bind(bind_addr)?
    .run()
    .await
}

fn parse_match_type(raw: Option<&str>) -> MatchType {
    match raw {
        Some("starts-with") | Some("startsWith") => MatchType::StartsWith,
        _ => MatchType::Exact,
    }
}

#[derive(Deserialize)]
struct WordsParams {
    search: String,
    match_type: Option<String>,
    limit: Option<usize>,
}

async fn get_words(state: web::Data<AppState>, params: web::Query<WordsParams>) -> Result<HttpResponse, SyncError> {
    let results = query::get_words(&state.store, &params.search, parse_match_type(params.match_type.as_deref()), params.limit)?;
    Ok(HttpResponse::Ok().json(results))
}

#[derive(Deserialize)]
struct XrefParams {
    k: Option<String>,
    r: Option<String>,
    sense: Option<u8>,
}

async fn get_words_xref(state: web::Data<AppState>, params: web::Query<XrefParams>) -> Result<HttpResponse, SyncError> {
    let results = query::get_words_by_cross_reference(&state.store, params.k.as_deref(), params.r.as_deref(), params.sense)?;
    Ok(HttpResponse::Ok().json(results))
}

async fn get_words_with_kanji(state: web::Data<AppState>, c: web::Path<String>) -> Result<HttpResponse, SyncError> {
    let results = query::get_words_with_kanji(&state.store, &c)?;
    Ok(HttpResponse::Ok().json(results))
}

#[derive(Deserialize)]
struct GlossParams {
    search: String,
    #[serde(default = "default_lang")]
    lang: String,
    limit: Option<usize>,
}

fn default_lang() -> String {
    "en".to_string()
}

async fn get_words_gloss(state: web::Data<AppState>, params: web::Query<GlossParams>) -> Result<HttpResponse, SyncError> {
    let results = query::get_words_with_gloss(&state.store, &params.search, &params.lang, params.limit)?;
    Ok(HttpResponse::Ok().json(results))
}

#[derive(Deserialize)]
struct KanjiParams {
    kanji: String,
    #[serde(default = "default_lang")]
    lang: String,
}

async fn get_kanji(state: web::Data<AppState>, params: web::Query<KanjiParams>) -> Result<HttpResponse, SyncError> {
    let chars: Vec<char> = params.kanji.chars().collect();
    let results = query::get_kanji(&state.store, &chars, &params.lang, |msg| log::warn!("{msg}"))?;
    Ok(HttpResponse::Ok().json(results))
}

#[derive(Deserialize)]
struct NamesParams {
    search: String,
    match_type: Option<String>,
}

async fn get_names(state: web::Data<AppState>, params: web::Query<NamesParams>) -> Result<HttpResponse, SyncError> {
    let results = query::get_names(&state.store, &params.search, parse_match_type(params.match_type.as_deref()))?;
    Ok(HttpResponse::Ok().json(results))
}

async fn post_sync(state: web::Data<AppState>, series: web::Path<String>) -> Result<HttpResponse, SyncError> {
    let series = MajorDataSeries::from_str(&series).map_err(|_| SyncError::InvalidQuery(format!("unknown series {series:?}")))?;
    let lang = state.store.version(series.as_series())?.map(|v| v.lang).unwrap_or_else(|| "en".to_string());
    state.supervisor.update_with_retry(series, &lang).await?;
    Ok(HttpResponse::Accepted().finish())
}

#[derive(Serialize)]
struct StatusEntry {
    state: DataSeriesState,
    version: Option<DataVersion>,
    update_state: UpdateState,
}

impl From<SeriesStatus> for StatusEntry {
    fn from(s: SeriesStatus) -> Self {
        StatusEntry { state: s.state, version: s.version, update_state: s.update_state }
    }
}

async fn get_status(state: web::Data<AppState>) -> HttpResponse {
    let mut out: HashMap<String, StatusEntry> = HashMap::new();
    for series in DataSeries::iter() {
        out.insert(series.to_string(), state.supervisor.coordinator().status(series).into());
    }
    HttpResponse::Ok().json(out)
}
