use std::error::Error;
use std::sync::Arc;

use dotenvy::dotenv;
use tokio::runtime::Handle;

use rust_chatbot::chat::ChatServices;
use rust_chatbot::config::{AppConfig, StoreBackend};
use rust_chatbot::network::{FirebaseIdentity, FirestoreStore, RapidApiCompletion, build_http_client};
use rust_chatbot::session::SessionHub;
use rust_chatbot::storage::{
    self, ChatHistory, Database, DocumentStore, MemoryStore, SessionCache, SqliteDocumentStore,
};
use rust_chatbot::ui::ChatbotApp;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    env_logger::init();

    let config = AppConfig::load();
    let services = build_services(&config)?;
    run_ui(services)?;
    Ok(())
}

fn build_services(config: &AppConfig) -> Result<ChatServices, Box<dyn Error>> {
    let firebase_key = config
        .firebase
        .api_key
        .clone()
        .ok_or("FIREBASE_API_KEY is not set")?;

    storage::ensure_data_dir(&config.data_dir)?;
    let database = Database::new(config.database_path())?.shared();
    let client = build_http_client(config.http_timeout())?;

    let mut identity = FirebaseIdentity::new(
        client.clone(),
        firebase_key,
        SessionHub::new(),
        Some(SessionCache::new(database.clone())),
    );
    if let (Some(auth_url), Some(token_url)) = (&config.firebase.auth_url, &config.firebase.token_url)
    {
        identity = identity.with_endpoints(auth_url.clone(), token_url.clone());
    }
    let identity = Arc::new(identity);

    let backend = config.store_backend();
    let store: Arc<dyn DocumentStore> = match backend {
        StoreBackend::Firestore => {
            let project_id = config
                .firebase
                .project_id
                .clone()
                .ok_or("FIREBASE_PROJECT_ID is required for the firestore store")?;
            let mut store = FirestoreStore::new(client.clone(), project_id, identity.clone());
            if let Some(url) = &config.firebase.firestore_url {
                store = store.with_base_url(url.clone());
            }
            Arc::new(store)
        }
        StoreBackend::Sqlite => Arc::new(SqliteDocumentStore::new(database.clone())),
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    };
    log::info!("Chat history backend: {backend:?}");

    if config.completion.api_key.is_none() {
        log::warn!("RAPIDAPI_KEY is not set; sending messages will fail");
    }
    let completion = RapidApiCompletion::new(client, config.completion.api_key.clone())
        .with_endpoint(config.completion.url.clone(), config.completion.host.clone())
        .with_web_access(config.completion.web_access);

    // The session guard shows its loading state until this resolves.
    let restoring = identity.clone();
    tokio::spawn(async move {
        restoring.restore().await;
    });

    Ok(ChatServices {
        identity,
        history: ChatHistory::new(store),
        completion: Arc::new(completion),
    })
}

fn run_ui(services: ChatServices) -> Result<(), eframe::Error> {
    let runtime = Handle::current();
    let options = eframe::NativeOptions::default();

    eframe::run_native(
        "ChatBot",
        options,
        Box::new(move |cc| {
            log::info!("Client started");
            Ok(Box::new(ChatbotApp::new(cc, services, runtime)))
        }),
    )
}
