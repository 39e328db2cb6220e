pub mod client;

pub use client::{ContentTransport, HttpTransport, RemoteBody, StreamedDownload};
