pub mod completion;
pub mod firestore;
pub mod identity;
pub mod transport;

pub use completion::RapidApiCompletion;
pub use firestore::FirestoreStore;
pub use identity::FirebaseIdentity;
pub use transport::build_http_client;
