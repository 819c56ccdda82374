//! Cloud Firestore backend for the folder store.
//!
//! - `FirestoreClient`: thin REST client over the Firestore v1 documents API
//! - `FirestoreFolderStore`: `FolderStore` implementation on top of it
//! - `FirebaseSession`: `Session` backed by a Firebase Auth refresh token
//!
//! Tokens are passed per-call; the client itself holds no credentials.

mod client;
mod codec;
mod session;
mod store;

pub use client::{FirestoreClient, FirestoreDocument, FIRESTORE_API_URL};
pub use codec::{decode_fields, decode_value, encode_fields, encode_value};
pub use session::{FirebaseSession, SECURE_TOKEN_URL};
pub use store::FirestoreFolderStore;
